use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dicom_series::{
    DatasetPackager, DirectoryInspector, ExtractOptions, HtmlReport, InspectOptions,
    PackageOptions, ReportOptions, SeriesExtractor, SortBy,
};

#[derive(Parser)]
#[command(name = "dicom-series")]
#[command(about = "Group DICOM files by series and export normalized PNG images")]
#[command(version)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract every series of a directory into PNG images with sidecars
    Extract {
        /// Directory holding the DICOM files (not searched recursively)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "extracted")]
        output: PathBuf,

        /// Order in which files enter their series
        #[arg(long, value_enum, default_value_t = SortBy::None)]
        sort_by: SortBy,

        /// Process series in parallel
        #[arg(long)]
        parallel: bool,

        /// Do not write anonymized copies of the source files
        #[arg(long)]
        no_anonymized_copies: bool,

        /// Number of evenly spaced preview images listed per series
        #[arg(long, default_value_t = 9)]
        preview: usize,

        /// Extension of the input files
        #[arg(long, default_value = "dcm")]
        extension: String,
    },

    /// Package an extraction output with JSON metadata
    Package {
        /// Extraction output directory
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Package directory
        #[arg(short, long, default_value = "vlm_ready")]
        output: PathBuf,

        /// Keep only series whose name contains one of these (case-insensitive)
        #[arg(long, num_args = 1..)]
        series: Vec<String>,

        /// Maximum images per series (0 keeps all)
        #[arg(long)]
        max: Option<usize>,
    },

    /// Show a sample file and the studies and series of a directory
    Inspect {
        /// Directory holding the DICOM files
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Extension of the input files
        #[arg(long, default_value = "dcm")]
        extension: String,

        /// Header elements listed from the sample file
        #[arg(long, default_value_t = 20)]
        header_elements: usize,

        /// Files read for the study and series overview
        #[arg(long, default_value_t = 10)]
        overview_files: usize,
    },

    /// Render an HTML overview of an extraction output
    Report {
        /// Extraction output directory
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// HTML file to write
        #[arg(short, long, default_value = "report.html")]
        output: PathBuf,

        /// Thumbnails per series
        #[arg(long, default_value_t = 9)]
        samples: usize,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp_secs();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Extract {
            input,
            output,
            sort_by,
            parallel,
            no_anonymized_copies,
            preview,
            extension,
        } => {
            let options = ExtractOptions {
                output_dir: output,
                sort_by,
                parallel,
                anonymized_copies: !no_anonymized_copies,
                preview_count: preview,
                extension,
            };
            let report = SeriesExtractor::extract(&input, &options)
                .with_context(|| format!("Failed to extract {}", input.display()))?;

            println!(
                "Extracted {} series with {} images to {}",
                report.series.len(),
                report.image_count(),
                options.output_dir.display()
            );
            if report.failure_count() > 0 {
                println!("{} files or series could not be processed", report.failure_count());
            }
        }
        Command::Package {
            input,
            output,
            series,
            max,
        } => {
            let options = PackageOptions {
                series_filter: series,
                max_images: max,
            };
            let summary = DatasetPackager::package(&input, &output, &options)
                .with_context(|| format!("Failed to package {}", input.display()))?;

            println!(
                "Prepared {} series with {} images in {}",
                summary.dataset_info.total_series,
                summary.image_count(),
                output.display()
            );
        }
        Command::Inspect {
            input,
            extension,
            header_elements,
            overview_files,
        } => {
            let options = InspectOptions {
                extension,
                header_elements,
                overview_files,
            };
            let inspection = DirectoryInspector::inspect(&input, &options)
                .with_context(|| format!("Failed to inspect {}", input.display()))?;

            print!("{inspection}");
        }
        Command::Report {
            input,
            output,
            samples,
        } => {
            let reported = HtmlReport::write(&input, &output, &ReportOptions { samples })
                .with_context(|| format!("Failed to write report {}", output.display()))?;

            println!(
                "HTML report with {} series created: {}",
                reported.len(),
                output.display()
            );
        }
    }

    Ok(())
}
