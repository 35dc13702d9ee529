use crate::reader::{ElementSetReader, RawElementSet};

use dicom_dictionary_std::tags;
use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

/// Fallback for a missing series UID or description.
pub const UNKNOWN: &str = "unknown";

const UID_SUFFIX_LEN: usize = 8;

/// Directory-safe identifier of a series: the sanitized description followed
/// by the last eight characters of the Series Instance UID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey(String);

impl SeriesKey {
    pub fn new(series_uid: Option<&str>, description: Option<&str>) -> Self {
        let description = sanitize(description.unwrap_or(UNKNOWN));
        let uid = series_uid.unwrap_or(UNKNOWN);
        let suffix_start = uid
            .char_indices()
            .rev()
            .nth(UID_SUFFIX_LEN - 1)
            .map_or(0, |(i, _)| i);

        Self(format!("{description}_{}", sanitize(&uid[suffix_start..])))
    }

    pub fn from_elements(elements: &RawElementSet) -> Self {
        Self::new(
            elements.text(tags::SERIES_INSTANCE_UID).as_deref(),
            elements.text(tags::SERIES_DESCRIPTION).as_deref(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesBucket {
    pub key: SeriesKey,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

impl SkippedFile {
    pub fn new(path: &Path, reason: impl ToString) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Buckets files by [`SeriesKey`] in a single pass.
///
/// Buckets are kept in order of first appearance and their files in order of
/// insertion.
#[derive(Debug, Default)]
pub struct SeriesClassifier {
    buckets: Vec<SeriesBucket>,
    index: HashMap<SeriesKey, usize>,
    skipped: Vec<SkippedFile>,
}

impl SeriesClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the metadata of `path` and file it under its series. Files that
    /// fail to decode are remembered as skipped.
    pub fn classify(&mut self, path: &Path) -> Option<&SeriesKey> {
        match ElementSetReader::read(path, false) {
            Ok(elements) => Some(self.insert(SeriesKey::from_elements(&elements), path)),
            Err(err) => {
                log::warn!("Skipping {}: {err}", path.display());
                self.skipped.push(SkippedFile::new(path, err));
                None
            }
        }
    }

    pub fn insert(&mut self, key: SeriesKey, path: &Path) -> &SeriesKey {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.buckets.push(SeriesBucket {
                    key: key.clone(),
                    files: Vec::new(),
                });
                self.index.insert(key, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };

        let bucket = &mut self.buckets[position];
        bucket.files.push(path.to_path_buf());
        &bucket.key
    }

    pub fn buckets(&self) -> &[SeriesBucket] {
        &self.buckets
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn into_parts(self) -> (Vec<SeriesBucket>, Vec<SkippedFile>) {
        (self.buckets, self.skipped)
    }
}
