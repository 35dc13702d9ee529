//! `Key: Value` sidecar records.
//!
//! Every image gets one record, every series one summary record. The format
//! is one entry per line, split at the first colon; values may contain
//! further colons. Missing optional values are written as [`NOT_AVAILABLE`].

use crate::reader::RawElementSet;

use dicom_dictionary_std::tags;
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::{fmt, fs, io, path::Path};

/// Rendering of a missing value.
pub const NOT_AVAILABLE: &str = "N/A";

/// Ordered key/value lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarRecord {
    entries: Vec<(String, String)>,
}

impl SidecarRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Line breaks in the value would split the record and
    /// are replaced by spaces.
    pub fn push(&mut self, key: impl Into<String>, value: impl AsRef<str>) {
        let value = value.as_ref().replace(['\r', '\n'], " ");
        self.entries.push((key.into(), value));
    }

    fn push_or_na(&mut self, key: &str, value: Option<&str>) {
        self.push(key, value.unwrap_or(NOT_AVAILABLE));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse record text. Lines without a colon are ignored; keys and values
    /// are trimmed.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();
        Self { entries }
    }

    pub fn read_from(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path).map(|text| Self::parse(&text))
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_string())
    }
}

impl fmt::Display for SidecarRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{key}: {value}")?;
        }
        Ok(())
    }
}

impl Serialize for SidecarRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Per-image metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    pub filename: String,
    pub series_description: Option<String>,
    pub image_type: Option<String>,
    pub acquisition_date: Option<String>,
    pub acquisition_time: Option<String>,
    pub slice_location: Option<String>,
    pub instance_number: Option<String>,
}

impl ImageMetadata {
    pub fn from_elements(filename: impl Into<String>, elements: &RawElementSet) -> Self {
        Self {
            filename: filename.into(),
            series_description: elements.text(tags::SERIES_DESCRIPTION),
            image_type: elements.text(tags::IMAGE_TYPE),
            acquisition_date: elements.text(tags::ACQUISITION_DATE),
            acquisition_time: elements.text(tags::ACQUISITION_TIME),
            slice_location: elements.text(tags::SLICE_LOCATION),
            instance_number: elements.text(tags::INSTANCE_NUMBER),
        }
    }

    /// Slice location and instance number are left out when absent; every
    /// other field falls back to [`NOT_AVAILABLE`].
    pub fn to_record(&self) -> SidecarRecord {
        let mut record = SidecarRecord::new();
        record.push("Filename", &self.filename);
        record.push_or_na("Series Description", self.series_description.as_deref());
        record.push_or_na("Image Type", self.image_type.as_deref());
        record.push(
            "Acquisition Date/Time",
            format!(
                "{} {}",
                self.acquisition_date.as_deref().unwrap_or(NOT_AVAILABLE),
                self.acquisition_time.as_deref().unwrap_or(NOT_AVAILABLE)
            ),
        );
        if let Some(location) = &self.slice_location {
            record.push("Slice Location", location);
        }
        if let Some(number) = &self.instance_number {
            record.push("Instance Number", number);
        }
        record
    }
}

/// Snapshot of a series, taken from one of its files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesSummary {
    pub description: Option<String>,
    pub series_uid: Option<String>,
    pub study_description: Option<String>,
    pub image_count: usize,
    pub modality: Option<String>,
    pub manufacturer: Option<String>,
    /// (rows, columns)
    pub dimensions: Option<(u16, u16)>,
}

impl SeriesSummary {
    pub fn from_elements(elements: &RawElementSet, image_count: usize) -> Self {
        Self {
            description: elements.text(tags::SERIES_DESCRIPTION),
            series_uid: elements.text(tags::SERIES_INSTANCE_UID),
            study_description: elements.text(tags::STUDY_DESCRIPTION),
            image_count,
            modality: elements.text(tags::MODALITY),
            manufacturer: elements.text(tags::MANUFACTURER),
            dimensions: elements.dimensions(),
        }
    }

    pub fn to_record(&self) -> SidecarRecord {
        let mut record = SidecarRecord::new();
        record.push_or_na("Series Description", self.description.as_deref());
        record.push_or_na("Series UID", self.series_uid.as_deref());
        record.push_or_na("Study Description", self.study_description.as_deref());
        record.push("Number of Images", self.image_count.to_string());
        record.push_or_na("Modality", self.modality.as_deref());
        record.push_or_na("Manufacturer", self.manufacturer.as_deref());
        if let Some((rows, columns)) = self.dimensions {
            record.push("Image Dimensions", format!("{rows}x{columns}"));
        }
        record
    }
}
