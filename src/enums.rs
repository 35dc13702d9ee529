use clap::ValueEnum;
use std::fmt;

/// Order in which input files are fed to the classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SortBy {
    /// Keep the order the directory listing returned.
    #[default]
    None,
    FileName,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelRepresentation {
    Unsigned,
    Signed,
}

impl PixelRepresentation {
    pub fn from_value(value: u16) -> Self {
        match value {
            1 => Self::Signed,
            _ => Self::Unsigned,
        }
    }
}

impl fmt::Display for PixelRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned => f.write_str("0 (unsigned)"),
            Self::Signed => f.write_str("1 (signed)"),
        }
    }
}
