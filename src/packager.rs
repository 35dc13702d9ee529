//! Packaging of an extraction output for external analysis tools.
//!
//! A package holds, per selected series, the summary sidecar, a sampled
//! subset of the images and one JSON record per image, plus a
//! `dataset_summary.json` over all series and a short Markdown guide.

use crate::{
    materializer::{ANONYMIZED_DIR, SERIES_INFO_FILE},
    sampler::Sampler,
    sidecar::SidecarRecord,
};

use serde::Serialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const SUMMARY_FILE: &str = "dataset_summary.json";
pub const GUIDE_FILE: &str = "vlm_guide.md";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("input directory {0} does not exist")]
    InputNotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T, PackageError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T, PackageError> {
        self.map_err(|source| PackageError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Case-insensitive substrings; a series is kept if its name contains any
    /// of them. Empty keeps every series.
    pub series_filter: Vec<String>,
    /// Upper bound of images per series. `Some(0)` means no limit.
    pub max_images: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub dataset_info: DatasetInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub total_series: usize,
    pub source_dir: String,
    pub series: Vec<SeriesEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesEntry {
    pub name: String,
    pub total_images: usize,
    pub selected_images: usize,
    pub metadata: SidecarRecord,
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageEntry {
    pub filename: String,
    pub metadata: SidecarRecord,
}

#[derive(Serialize)]
struct ImageRecord<'a> {
    filename: &'a str,
    metadata: &'a SidecarRecord,
    series_name: &'a str,
}

impl DatasetSummary {
    pub fn image_count(&self) -> usize {
        self.dataset_info
            .series
            .iter()
            .map(|series| series.images.len())
            .sum()
    }
}

/// Series directories of an extraction output, sorted by name.
pub fn series_directories(input: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<_> = fs::read_dir(input)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| path.file_name().is_some_and(|name| name != ANONYMIZED_DIR))
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// `slice_*.png` files of one series directory, sorted by name.
pub fn series_images(series_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut images: Vec<_> = fs::read_dir(series_dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("slice_") && name.ends_with(".png"))
        })
        .collect();
    images.sort();
    Ok(images)
}

/// The sidecar next to `image`, or an empty record if there is none.
pub fn image_sidecar(image: &Path) -> SidecarRecord {
    let stem = image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path = image.with_file_name(format!("{stem}_metadata.txt"));
    SidecarRecord::read_from(&path).unwrap_or_default()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub struct DatasetPackager;

impl DatasetPackager {
    pub fn package(
        input: &Path,
        output: &Path,
        options: &PackageOptions,
    ) -> Result<DatasetSummary, PackageError> {
        if !input.is_dir() {
            return Err(PackageError::InputNotFound(input.to_path_buf()));
        }
        fs::create_dir_all(output).at(output)?;

        let all_series = series_directories(input).at(input)?;
        let selected: Vec<_> = all_series
            .iter()
            .filter(|dir| Self::matches_filter(&file_name(dir), &options.series_filter))
            .collect();
        if !options.series_filter.is_empty() {
            log::info!(
                "Filtered from {} to {} series based on filter: {:?}",
                all_series.len(),
                selected.len(),
                options.series_filter
            );
        }

        let series = selected
            .into_iter()
            .map(|dir| Self::package_series(dir, output, options.max_images))
            .collect::<Result<Vec<_>, _>>()?;

        let summary = DatasetSummary {
            dataset_info: DatasetInfo {
                total_series: series.len(),
                source_dir: input.display().to_string(),
                series,
            },
        };

        let summary_path = output.join(SUMMARY_FILE);
        Self::write_json(&summary_path, &summary)?;

        let guide_path = output.join(GUIDE_FILE);
        fs::write(&guide_path, GUIDE).at(&guide_path)?;

        log::info!(
            "Prepared {} series ({} images) in {}",
            summary.dataset_info.total_series,
            summary.image_count(),
            output.display()
        );

        Ok(summary)
    }

    fn matches_filter(name: &str, filter: &[String]) -> bool {
        let name = name.to_lowercase();
        filter.is_empty()
            || filter
                .iter()
                .any(|pattern| name.contains(&pattern.to_lowercase()))
    }

    fn package_series(
        series_dir: &Path,
        output: &Path,
        max_images: Option<usize>,
    ) -> Result<SeriesEntry, PackageError> {
        let name = file_name(series_dir);
        let series_output = output.join(&name);
        fs::create_dir_all(&series_output).at(&series_output)?;

        let info_path = series_dir.join(SERIES_INFO_FILE);
        let metadata = if info_path.is_file() {
            fs::copy(&info_path, series_output.join(SERIES_INFO_FILE)).at(&info_path)?;
            SidecarRecord::read_from(&info_path).at(&info_path)?
        } else {
            log::warn!("{} has no {SERIES_INFO_FILE}", series_dir.display());
            SidecarRecord::new()
        };

        let images = series_images(series_dir).at(series_dir)?;
        let selected = match max_images {
            Some(max) if max > 0 && images.len() > max => {
                let selected = Sampler::select(&images, max);
                log::info!(
                    "Limiting {name} from {} to {} images",
                    images.len(),
                    selected.len()
                );
                selected
            }
            _ => images.iter().collect(),
        };

        let mut entries = Vec::with_capacity(selected.len());
        for image in &selected {
            let filename = file_name(image);
            let metadata = image_sidecar(image);

            let destination = series_output.join(&filename);
            fs::copy(image, &destination).at(image)?;

            let record = ImageRecord {
                filename: &filename,
                metadata: &metadata,
                series_name: &name,
            };
            let stem = image
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            Self::write_json(&series_output.join(format!("{stem}.json")), &record)?;

            entries.push(ImageEntry { filename, metadata });
        }

        Ok(SeriesEntry {
            name,
            total_images: images.len(),
            selected_images: entries.len(),
            metadata,
            images: entries,
        })
    }

    fn write_json(path: &Path, value: &impl Serialize) -> Result<(), PackageError> {
        let json = serde_json::to_string_pretty(value).map_err(|source| PackageError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).at(path)
    }
}

const GUIDE: &str = r#"# Using This MRI Dataset with Vision Language Models

## Dataset Structure

This dataset contains MRI images organized by series. Each series represents a specific MRI sequence or view.

- Each series has its own directory
- PNG images are ready for direct input to VLMs
- JSON metadata files provide context for each image
- `dataset_summary.json` contains an overview of the entire dataset

## Tips for VLM Analysis

1. **Provide context**: Include the series information when analyzing images
2. **Include metadata**: Use the JSON metadata to provide context about each image
3. **Sequence understanding**: MRI scans are 3D volumes sliced into 2D images. The sequence of images is important.
4. **Multi-view analysis**: Consider using different series (sequences) of the same anatomy for more comprehensive analysis

## Example Prompts for VLMs

Example 1: "Analyze this MRI image. It's from the {series_name} series, which is {series_description}. The image is slice {slice_number} at location {slice_location}."

Example 2: "Compare these two MRI images from different sequences of the same anatomy. The first is a {series1_name} and the second is a {series2_name}."

Example 3: "Review this sequence of MRI images from the {series_name} series and describe what you observe."
"#;
