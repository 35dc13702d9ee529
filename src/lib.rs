//! # DICOM-series library
//!
//! This crate turns a flat directory of DICOM files into per-series folders
//! of normalized 8-bit PNG images with small text sidecars, ready to be
//! browsed or handed to image analysis tools.
//!
//! This library is part of the dicom-rs ecosystem and leverages its
//! components to read the files and decode their pixel data.
//! Files are grouped by their Series Instance UID and Series Description.
//! Every image is windowed (when Window Center and Window Width are present)
//! and stretched to the full 0..=255 range. Optionally an anonymized copy of
//! each source file is written next to the series folders.
//!
//! DICOM files are assumed to have the following attributes:
//!  - No multiframe (always the first frame is used)
//!  - Single sample per pixel (always the first sample is used)
//!
//! Failures of single files never abort a run. They are logged and collected
//! in the returned [`RunReport`].
//!
//! On top of an extraction output, [`DatasetPackager`] builds a compact
//! package with JSON metadata and [`HtmlReport`] renders an overview page.
//! Before extracting, [`DirectoryInspector`] gives a quick look at one sample
//! file and the studies and series of a directory.
//!
//! # Examples
//!
//! ## Extracting every series of a directory
//!
//! ```no_run
//! # use dicom_series::{ExtractOptions, SeriesExtractor, SortBy};
//! # use std::path::{Path, PathBuf};
//! let options = ExtractOptions {
//!     output_dir: PathBuf::from("extracted"),
//!     sort_by: SortBy::FileName,
//!     ..Default::default()
//! };
//! let report = SeriesExtractor::extract(Path::new("dicom"), &options)
//!     .expect("should have found the input directory");
//! for series in &report.series {
//!     println!("{}: {} images", series.key, series.images.len());
//! }
//! ```

pub mod anonymize;
pub mod classifier;
pub mod enums;
pub mod extractor;
pub mod inspect;
pub mod materializer;
pub mod normalizer;
pub mod packager;
pub mod reader;
pub mod report;
pub mod sampler;
pub mod sidecar;

#[cfg(test)]
mod test_support;

pub use classifier::{SeriesBucket, SeriesClassifier, SeriesKey, SkippedFile};
pub use enums::SortBy;
pub use extractor::{ExtractError, ExtractOptions, RunReport, SeriesExtractor};
pub use inspect::{DirectoryInspector, InspectOptions, Inspection};
pub use materializer::{SeriesMaterializer, SeriesReport};
pub use normalizer::{IntensityNormalizer, NormalizedImage, Window};
pub use packager::{DatasetPackager, PackageOptions};
pub use reader::{ElementSetReader, RawElementSet, RawPixelBuffer};
pub use report::{HtmlReport, ReportOptions};
pub use sampler::Sampler;
