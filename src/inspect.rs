//! Read-only look at an input directory before extracting it.
//!
//! The first input file (by name) is examined in detail: basic metadata,
//! pixel layout and a sample of its header. A handful of files are read
//! without pixel data for a study and series overview.

use crate::{
    enums::{PixelRepresentation, SortBy},
    extractor::{ExtractError, SeriesExtractor},
    normalizer::Window,
    reader::{ElementSetReader, PixelError, RawElementSet, ReadError},
    sidecar::SidecarRecord,
};

use dicom::{
    core::{PrimitiveValue, Tag, VR, dictionary::DataDictionary, header::Header},
    object::mem::InMemElement,
};
use dicom_dictionary_std::{StandardDataDictionary, tags};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;

const NOT_AVAILABLE: &str = "Not available";

#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Input(#[from] ExtractError),

    #[error("no .{extension} files in {path}")]
    NoFiles { path: PathBuf, extension: String },

    #[error(transparent)]
    Read(#[from] ReadError),
}

#[derive(Debug, Clone)]
pub struct InspectOptions {
    pub extension: String,
    /// Data set elements listed from the sample file.
    pub header_elements: usize,
    /// Files read for the study and series overview.
    pub overview_files: usize,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            extension: "dcm".to_string(),
            header_elements: 20,
            overview_files: 10,
        }
    }
}

/// Pixel layout of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelInfo {
    /// (rows, columns) of the decoded first frame
    pub shape: (usize, usize),
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub high_bit: Option<u16>,
    pub representation: PixelRepresentation,
    pub window: Option<Window>,
}

impl PixelInfo {
    pub fn from_elements(elements: &RawElementSet) -> Result<Self, PixelError> {
        let buffer = elements.pixel_buffer()?;
        Ok(Self {
            shape: buffer.dim(),
            bits_allocated: buffer.bits_allocated(),
            bits_stored: buffer.bits_stored(),
            high_bit: elements.u16(tags::HIGH_BIT),
            representation: buffer.representation(),
            window: Window::from_elements(elements),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    pub tag: Tag,
    pub alias: String,
    pub value: String,
}

impl HeaderLine {
    fn from_element(element: &InMemElement) -> Self {
        let tag = element.tag();
        let alias = StandardDataDictionary
            .by_tag(tag)
            .map(|entry| entry.alias)
            .unwrap_or("Unknown")
            .to_string();

        let value = if is_binary_vr(element.vr()) {
            let len = element
                .value()
                .primitive()
                .map_or(0, PrimitiveValue::calculate_byte_len);
            format!("Binary data ({len} bytes)")
        } else {
            match element.to_str() {
                Ok(value) => value.trim().to_string(),
                Err(_) => "(sequence)".to_string(),
            }
        };

        Self { tag, alias, value }
    }
}

fn is_binary_vr(vr: VR) -> bool {
    matches!(
        vr,
        VR::OB | VR::OD | VR::OF | VR::OL | VR::OV | VR::OW | VR::UN
    )
}

/// Detailed view of the sample file.
#[derive(Debug, Clone)]
pub struct SampleInspection {
    pub path: PathBuf,
    pub metadata: SidecarRecord,
    /// Pixel layout, or why it could not be decoded.
    pub pixels: Result<PixelInfo, String>,
    pub header: Vec<HeaderLine>,
}

/// Series seen per study, as (description, series UID).
#[derive(Debug, Clone, Default)]
pub struct DirectoryOverview {
    pub files_read: usize,
    pub studies: BTreeMap<String, BTreeSet<(String, String)>>,
}

impl DirectoryOverview {
    pub fn study_count(&self) -> usize {
        self.studies.len()
    }

    pub fn series_count(&self) -> usize {
        self.studies
            .values()
            .flatten()
            .map(|(_, uid)| uid)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

#[derive(Debug, Clone)]
pub struct Inspection {
    pub sample: SampleInspection,
    pub overview: DirectoryOverview,
}

pub struct DirectoryInspector;

impl DirectoryInspector {
    pub fn inspect(input: &Path, options: &InspectOptions) -> Result<Inspection, InspectError> {
        let files =
            SeriesExtractor::collect_input_files(input, &options.extension, SortBy::FileName)?;
        let Some(first) = files.first() else {
            return Err(InspectError::NoFiles {
                path: input.to_path_buf(),
                extension: options.extension.clone(),
            });
        };

        log::info!("Analyzing file: {}", first.display());
        let sample = Self::inspect_file(first, options.header_elements)?;
        let overview = Self::overview(&files[..files.len().min(options.overview_files)]);

        Ok(Inspection { sample, overview })
    }

    pub fn inspect_file(path: &Path, header_elements: usize) -> Result<SampleInspection, ReadError> {
        let elements = ElementSetReader::read(path, true)?;

        let mut metadata = SidecarRecord::new();
        for (key, tag) in [
            ("Patient Name", tags::PATIENT_NAME),
            ("Patient ID", tags::PATIENT_ID),
            ("Modality", tags::MODALITY),
            ("Study Date", tags::STUDY_DATE),
            ("Series Description", tags::SERIES_DESCRIPTION),
            ("Manufacturer", tags::MANUFACTURER),
        ] {
            metadata.push(key, elements.text(tag).as_deref().unwrap_or(NOT_AVAILABLE));
        }

        let pixels = PixelInfo::from_elements(&elements).map_err(|err| {
            log::warn!("Error processing pixel data of {}: {err}", path.display());
            err.to_string()
        });

        let header = elements
            .object()
            .iter()
            .take(header_elements)
            .map(HeaderLine::from_element)
            .collect();

        Ok(SampleInspection {
            path: path.to_path_buf(),
            metadata,
            pixels,
            header,
        })
    }

    fn overview(files: &[PathBuf]) -> DirectoryOverview {
        let mut overview = DirectoryOverview::default();
        for path in files {
            let elements = match ElementSetReader::read(path, false) {
                Ok(elements) => elements,
                Err(err) => {
                    log::warn!("Leaving {} out of the overview: {err}", path.display());
                    continue;
                }
            };
            let text = |tag| elements.text(tag).unwrap_or_else(|| "Unknown".to_string());

            overview.files_read += 1;
            overview
                .studies
                .entry(text(tags::STUDY_INSTANCE_UID))
                .or_default()
                .insert((text(tags::SERIES_DESCRIPTION), text(tags::SERIES_INSTANCE_UID)));
        }
        overview
    }
}

fn or_not_available(value: Option<impl fmt::Display>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |value| value.to_string())
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sample = &self.sample;
        writeln!(f, "Analyzing file: {}", sample.path.display())?;

        writeln!(f, "\n=== Basic DICOM Metadata ===")?;
        write!(f, "{}", sample.metadata)?;

        writeln!(f, "\n=== Image Information ===")?;
        match &sample.pixels {
            Ok(pixels) => {
                let (rows, columns) = pixels.shape;
                writeln!(f, "Image Shape: {rows}x{columns}")?;
                writeln!(f, "Bits Allocated: {}", pixels.bits_allocated)?;
                writeln!(f, "Bits Stored: {}", pixels.bits_stored)?;
                writeln!(f, "High Bit: {}", or_not_available(pixels.high_bit))?;
                writeln!(f, "Pixel Representation: {}", pixels.representation)?;
                writeln!(
                    f,
                    "Window Center: {}",
                    or_not_available(pixels.window.map(|window| window.center))
                )?;
                writeln!(
                    f,
                    "Window Width: {}",
                    or_not_available(pixels.window.map(|window| window.width))
                )?;
            }
            Err(err) => writeln!(f, "Error processing pixel data: {err}")?,
        }

        writeln!(
            f,
            "\n=== DICOM Header Sample (first {} elements) ===",
            sample.header.len()
        )?;
        for line in &sample.header {
            writeln!(
                f,
                "({:04X},{:04X}) {} = {}",
                line.tag.group(),
                line.tag.element(),
                line.alias,
                line.value
            )?;
        }

        let overview = &self.overview;
        writeln!(f, "\n=== Series/Study Information ===")?;
        writeln!(f, "Read {} files", overview.files_read)?;
        writeln!(f, "Found {} unique studies", overview.study_count())?;
        writeln!(f, "Found {} unique series", overview.series_count())?;
        for (study, series) in &overview.studies {
            writeln!(f, "Study UID: {study}")?;
            for (description, uid) in series {
                writeln!(f, "  - Series: {description} (UID: {uid})")?;
            }
        }
        Ok(())
    }
}
