use crate::{
    anonymize::anonymize,
    classifier::{SeriesBucket, SeriesKey, SkippedFile},
    normalizer::{IntensityNormalizer, Window},
    reader::{ElementSetReader, PixelError, ReadError},
    sampler::Sampler,
    sidecar::{ImageMetadata, SeriesSummary},
};

use dicom::object::WriteError;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Directory below the output root that receives anonymized copies.
pub const ANONYMIZED_DIR: &str = "anonymized_dicoms";
pub const SERIES_INFO_FILE: &str = "series_info.txt";

pub fn image_file_name(index: usize) -> String {
    format!("slice_{index:04}.png")
}

pub fn metadata_file_name(index: usize) -> String {
    format!("slice_{index:04}_metadata.txt")
}

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Pixel(#[from] PixelError),

    #[error("failed to write anonymized copy: {0}")]
    Anonymized(#[from] WriteError),

    #[error("failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct MaterializedImage {
    /// Position of the source file in its bucket.
    pub index: usize,
    pub source: PathBuf,
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: ImageMetadata,
    /// (rows, columns) as declared by the file.
    pub dimensions: Option<(u16, u16)>,
}

/// Outcome of one series.
#[derive(Debug, Clone)]
pub struct SeriesReport {
    pub key: SeriesKey,
    pub directory: PathBuf,
    /// Files in the bucket, whether or not they made it.
    pub attempted: usize,
    pub images: Vec<MaterializedImage>,
    pub skipped: Vec<SkippedFile>,
    pub summary: Option<SeriesSummary>,
    /// Evenly spaced positions into `images` for previews.
    pub preview: Vec<usize>,
}

impl SeriesReport {
    pub fn failures(&self) -> usize {
        self.skipped.len()
    }
}

#[derive(Debug, Clone)]
pub struct SeriesMaterializer {
    output_root: PathBuf,
    anonymized_copies: bool,
    preview_count: usize,
}

impl SeriesMaterializer {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            anonymized_copies: true,
            preview_count: 9,
        }
    }

    pub fn with_anonymized_copies(mut self, enabled: bool) -> Self {
        self.anonymized_copies = enabled;
        self
    }

    pub fn with_preview_count(mut self, count: usize) -> Self {
        self.preview_count = count;
        self
    }

    /// Convert every file of `bucket` in order.
    ///
    /// Failures of single files are logged and recorded in the report. Only
    /// failing to create the series directory or the anonymized copy
    /// directory aborts the series.
    pub fn materialize(&self, bucket: &SeriesBucket) -> Result<SeriesReport, MaterializeError> {
        let directory = self.output_root.join(bucket.key.as_str());
        fs::create_dir_all(&directory)?;
        if self.anonymized_copies {
            fs::create_dir_all(self.output_root.join(ANONYMIZED_DIR))?;
        }

        log::info!(
            "Processing series {} ({} files)",
            bucket.key,
            bucket.files.len()
        );

        let mut images = Vec::new();
        let mut skipped = Vec::new();
        for (index, source) in bucket.files.iter().enumerate() {
            match self.materialize_file(&directory, index, source) {
                Ok(image) => images.push(image),
                Err(err) => {
                    log::warn!("Error processing {}: {err}", source.display());
                    skipped.push(SkippedFile::new(source, err));
                }
            }

            if index % 10 == 0 {
                log::debug!("  Processed {}/{}", index + 1, bucket.files.len());
            }
        }

        let summary = Self::summarize(bucket, &images);
        if let Some(summary) = &summary {
            let path = directory.join(SERIES_INFO_FILE);
            if let Err(err) = summary.to_record().write_to(&path) {
                log::warn!("Failed to write {}: {err}", path.display());
                skipped.push(SkippedFile::new(&path, err));
            }
        }

        if skipped.is_empty() {
            log::info!("Series {}: {} images", bucket.key, images.len());
        } else {
            log::warn!(
                "Series {}: {} images, {} failures",
                bucket.key,
                images.len(),
                skipped.len()
            );
        }

        let preview = Sampler::indices(images.len(), self.preview_count);
        Ok(SeriesReport {
            key: bucket.key.clone(),
            directory,
            attempted: bucket.files.len(),
            images,
            skipped,
            summary,
            preview,
        })
    }

    fn materialize_file(
        &self,
        directory: &Path,
        index: usize,
        source: &Path,
    ) -> Result<MaterializedImage, MaterializeError> {
        let elements = ElementSetReader::read(source, true)?;
        let filename = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.anonymized_copies {
            anonymize(&elements)
                .write_to_file(&self.output_root.join(ANONYMIZED_DIR).join(&filename))?;
        }

        let buffer = elements.pixel_buffer()?;
        let image = IntensityNormalizer::normalize(&buffer, Window::from_elements(&elements));

        let image_path = directory.join(image_file_name(index));
        image.save(&image_path)?;

        let metadata = ImageMetadata::from_elements(filename, &elements);
        let metadata_path = directory.join(metadata_file_name(index));
        metadata.to_record().write_to(&metadata_path)?;

        Ok(MaterializedImage {
            index,
            source: source.to_path_buf(),
            image_path,
            metadata_path,
            metadata,
            dimensions: elements.dimensions(),
        })
    }

    /// Summary from the first file whose metadata can be read. The images
    /// already materialized are only checked for matching dimensions.
    fn summarize(bucket: &SeriesBucket, images: &[MaterializedImage]) -> Option<SeriesSummary> {
        let first = bucket.files.iter().find_map(|path| {
            ElementSetReader::read(path, false)
                .inspect_err(|err| log::debug!("No summary from {}: {err}", path.display()))
                .ok()
        })?;
        let summary = SeriesSummary::from_elements(&first, bucket.files.len());

        for image in images {
            if image.dimensions != summary.dimensions {
                log::warn!(
                    "Series {}: {} has dimensions {:?}, summary records {:?}",
                    bucket.key,
                    image.source.display(),
                    image.dimensions,
                    summary.dimensions
                );
            }
        }

        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ElementSetBuilder, write_file};
    use crate::sidecar::SidecarRecord;
    use dicom::core::VR;
    use dicom_dictionary_std::tags;

    fn write_slice(dir: &Path, name: &str, instance: u16, values: &[u16]) -> PathBuf {
        let path = dir.join(name);
        let elements = ElementSetBuilder::new(&format!("1.2.3.{instance}"))
            .element(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.4.5.6.7.8")
            .text(tags::SERIES_DESCRIPTION, "T2 AX")
            .element(tags::PATIENT_NAME, VR::PN, "Doe^Jane")
            .element(tags::INSTANCE_NUMBER, VR::IS, instance.to_string().as_str())
            .pixels(2, 2, values)
            .build();
        write_file(&elements, &path);
        path
    }

    #[test]
    fn numbers_images_by_bucket_position_and_skips_bad_files() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let broken = input.path().join("b.dcm");
        std::fs::write(&broken, b"not DICOM").unwrap();
        let bucket = SeriesBucket {
            key: SeriesKey::new(Some("1.2.3.4.5.6.7.8"), Some("T2 AX")),
            files: vec![
                write_slice(input.path(), "a.dcm", 1, &[0, 10, 20, 30]),
                broken.clone(),
                write_slice(input.path(), "c.dcm", 3, &[5, 5, 5, 5]),
            ],
        };

        let report = SeriesMaterializer::new(output.path())
            .materialize(&bucket)
            .unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.images.len(), 2);
        assert_eq!(report.failures(), 1);
        assert_eq!(report.skipped[0].path, broken);

        let indices: Vec<_> = report.images.iter().map(|image| image.index).collect();
        assert_eq!(indices, [0, 2]);
        assert!(report.directory.join("slice_0000.png").is_file());
        assert!(report.directory.join("slice_0002_metadata.txt").is_file());
        assert!(!report.directory.join("slice_0001.png").exists());

        let summary = SidecarRecord::read_from(&report.directory.join(SERIES_INFO_FILE)).unwrap();
        assert_eq!(summary.get("Number of Images"), Some("3"));
        assert_eq!(summary.get("Image Dimensions"), Some("2x2"));

        let anonymized = output.path().join(ANONYMIZED_DIR).join("a.dcm");
        let copy = ElementSetReader::read(&anonymized, false).unwrap();
        assert_eq!(copy.text(tags::PATIENT_NAME).as_deref(), Some("ANONYMOUS"));
    }

    #[test]
    fn constant_image_is_written_black() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let bucket = SeriesBucket {
            key: SeriesKey::new(Some("1.2.3.4.5.6.7.8"), Some("T2 AX")),
            files: vec![write_slice(input.path(), "flat.dcm", 1, &[900, 900, 900, 900])],
        };

        let report = SeriesMaterializer::new(output.path())
            .with_anonymized_copies(false)
            .materialize(&bucket)
            .unwrap();

        let png = image::open(&report.images[0].image_path).unwrap().into_luma8();
        assert!(png.pixels().all(|pixel| pixel.0 == [0]));
        assert!(!output.path().join(ANONYMIZED_DIR).exists());
    }

    #[test]
    fn preview_is_sampled_from_materialized_images() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let files = (0..5)
            .map(|i| write_slice(input.path(), &format!("{i}.dcm"), i, &[0, 1, 2, 3]))
            .collect();
        let bucket = SeriesBucket {
            key: SeriesKey::new(Some("1.2.3.4.5.6.7.8"), Some("T2 AX")),
            files,
        };

        let report = SeriesMaterializer::new(output.path())
            .with_preview_count(3)
            .materialize(&bucket)
            .unwrap();

        assert_eq!(report.preview, [0, 2, 4]);
    }

    fn gray_levels(path: &Path) -> Vec<u8> {
        image::open(path).unwrap().into_luma8().into_raw()
    }

    #[test]
    fn applies_each_files_own_window_only_when_complete() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let windowed = input.path().join("windowed.dcm");
        let elements = ElementSetBuilder::new("1.2.3.1")
            .element(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.4.5.6.7.8")
            .decimal(tags::WINDOW_CENTER, "100")
            .decimal(tags::WINDOW_WIDTH, "50")
            .pixels(2, 2, &[0, 100, 200, 150])
            .build();
        write_file(&elements, &windowed);

        let center_only = input.path().join("center_only.dcm");
        let elements = ElementSetBuilder::new("1.2.3.2")
            .element(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.4.5.6.7.8")
            .decimal(tags::WINDOW_CENTER, "100")
            .pixels(2, 2, &[0, 100, 200, 150])
            .build();
        write_file(&elements, &center_only);

        let bucket = SeriesBucket {
            key: SeriesKey::new(Some("1.2.3.4.5.6.7.8"), None),
            files: vec![windowed, center_only],
        };
        let report = SeriesMaterializer::new(output.path())
            .with_anonymized_copies(false)
            .materialize(&bucket)
            .unwrap();

        // 0 -> 75 and 200, 150 -> 125 before scaling
        assert_eq!(gray_levels(&report.images[0].image_path), [0, 128, 255, 255]);
        // full observed range 0..=200
        assert_eq!(gray_levels(&report.images[1].image_path), [0, 128, 255, 191]);
    }

    #[test]
    fn summary_keeps_first_dimensions_when_series_disagrees() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let wide = input.path().join("wide.dcm");
        let elements = ElementSetBuilder::new("1.2.3.9")
            .element(tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.4.5.6.7.8")
            .pixels(1, 4, &[0, 1, 2, 3])
            .build();
        write_file(&elements, &wide);

        let bucket = SeriesBucket {
            key: SeriesKey::new(Some("1.2.3.4.5.6.7.8"), Some("T2 AX")),
            files: vec![write_slice(input.path(), "a.dcm", 1, &[0, 1, 2, 3]), wide],
        };
        let report = SeriesMaterializer::new(output.path())
            .with_anonymized_copies(false)
            .materialize(&bucket)
            .unwrap();

        assert_eq!(report.images.len(), 2);
        assert_eq!(report.images[0].dimensions, Some((2, 2)));
        assert_eq!(report.images[1].dimensions, Some((1, 4)));
        assert_eq!(report.summary.unwrap().dimensions, Some((2, 2)));
    }
}
