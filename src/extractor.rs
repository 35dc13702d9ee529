use crate::{
    classifier::{SeriesBucket, SeriesClassifier, SeriesKey, SkippedFile},
    enums::SortBy,
    materializer::{SeriesMaterializer, SeriesReport},
};

use rayon::prelude::*;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("input directory {0} does not exist")]
    InputNotFound(PathBuf),

    #[error("failed to list {path}: {source}")]
    ListInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create output directory {path}: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub output_dir: PathBuf,
    pub sort_by: SortBy,
    /// Materialize series on the rayon pool instead of one after another.
    pub parallel: bool,
    pub anonymized_copies: bool,
    pub preview_count: usize,
    /// Input file extension, compared ASCII case-insensitively.
    pub extension: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("extracted"),
            sort_by: SortBy::None,
            parallel: false,
            anonymized_copies: true,
            preview_count: 9,
            extension: "dcm".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailedSeries {
    pub key: SeriesKey,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub series: Vec<SeriesReport>,
    /// Files whose metadata could not be read during classification.
    pub unreadable: Vec<SkippedFile>,
    pub failed_series: Vec<FailedSeries>,
}

impl RunReport {
    pub fn image_count(&self) -> usize {
        self.series.iter().map(|series| series.images.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.unreadable.len()
            + self.failed_series.len()
            + self
                .series
                .iter()
                .map(SeriesReport::failures)
                .sum::<usize>()
    }
}

pub struct SeriesExtractor;

impl SeriesExtractor {
    /// Files directly inside `dir` with the given extension. Subdirectories
    /// are not searched.
    pub fn collect_input_files(
        dir: &Path,
        extension: &str,
        sort_by: SortBy,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        if !dir.is_dir() {
            return Err(ExtractError::InputNotFound(dir.to_path_buf()));
        }

        let list_error = |source| ExtractError::ListInput {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(list_error)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .collect();

        if matches!(sort_by, SortBy::FileName) {
            paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        }

        Ok(paths)
    }

    /// Group the files of `input` into series and materialize every series.
    ///
    /// Only a missing or unlistable input directory, or an output directory
    /// that cannot be created, fails the run. Everything else is recorded in
    /// the returned [`RunReport`].
    pub fn extract(input: &Path, options: &ExtractOptions) -> Result<RunReport, ExtractError> {
        let files = Self::collect_input_files(input, &options.extension, options.sort_by)?;
        fs::create_dir_all(&options.output_dir).map_err(|source| ExtractError::CreateOutput {
            path: options.output_dir.clone(),
            source,
        })?;

        log::info!("Organizing {} files by series...", files.len());
        let (buckets, unreadable) = Self::classify(&files);
        log::info!("Found {} unique series", buckets.len());

        let materializer = SeriesMaterializer::new(&options.output_dir)
            .with_anonymized_copies(options.anonymized_copies)
            .with_preview_count(options.preview_count);

        let outcomes: Vec<_> = if options.parallel {
            buckets
                .par_iter()
                .map(|bucket| (bucket, materializer.materialize(bucket)))
                .collect()
        } else {
            buckets
                .iter()
                .map(|bucket| (bucket, materializer.materialize(bucket)))
                .collect()
        };

        let mut report = RunReport {
            unreadable,
            ..Default::default()
        };
        for (bucket, outcome) in outcomes {
            match outcome {
                Ok(series) => report.series.push(series),
                Err(err) => {
                    log::error!("Series {} failed: {err}", bucket.key);
                    report.failed_series.push(FailedSeries {
                        key: bucket.key.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Processing complete: {} series, {} images, {} failures",
            report.series.len(),
            report.image_count(),
            report.failure_count()
        );

        Ok(report)
    }

    fn classify(files: &[PathBuf]) -> (Vec<SeriesBucket>, Vec<SkippedFile>) {
        let mut classifier = SeriesClassifier::new();
        for path in files {
            classifier.classify(path);
        }
        classifier.into_parts()
    }
}
