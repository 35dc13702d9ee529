//! Static HTML overview of an extraction output.

use crate::{
    materializer::SERIES_INFO_FILE,
    packager::{file_name, image_sidecar, series_directories, series_images},
    sampler::Sampler,
    sidecar::SidecarRecord,
};

use std::{
    fmt::{self, Write as _},
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Directory next to the HTML file that receives the thumbnails.
pub const REPORT_FILES_DIR: &str = "report_files";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("input directory {0} does not exist")]
    InputNotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render HTML: {0}")]
    Format(#[from] fmt::Error),
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> ReportError + '_ {
    move |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// Thumbnails per series.
    pub samples: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { samples: 9 }
    }
}

/// Series that made it into a report.
#[derive(Debug, Clone)]
pub struct ReportedSeries {
    pub name: String,
    pub thumbnails: Vec<PathBuf>,
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub struct HtmlReport;

impl HtmlReport {
    pub fn write(
        input: &Path,
        output_file: &Path,
        options: &ReportOptions,
    ) -> Result<Vec<ReportedSeries>, ReportError> {
        if !input.is_dir() {
            return Err(ReportError::InputNotFound(input.to_path_buf()));
        }

        let report_dir = output_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(REPORT_FILES_DIR);
        fs::create_dir_all(&report_dir).map_err(io_at(&report_dir))?;

        let mut html = String::from(HEADER);
        let mut reported = Vec::new();
        for series_dir in series_directories(input).map_err(io_at(input))? {
            if let Some(series) = Self::write_series(&mut html, &series_dir, &report_dir, options)? {
                reported.push(series);
            }
        }
        html.push_str(FOOTER);

        fs::write(output_file, html).map_err(io_at(output_file))?;
        log::info!(
            "HTML report created: {} ({} series)",
            output_file.display(),
            reported.len()
        );

        Ok(reported)
    }

    fn write_series(
        html: &mut String,
        series_dir: &Path,
        report_dir: &Path,
        options: &ReportOptions,
    ) -> Result<Option<ReportedSeries>, ReportError> {
        let name = file_name(series_dir);
        let images = series_images(series_dir).map_err(io_at(series_dir))?;
        if images.is_empty() {
            log::debug!("Leaving {name} out of the report, it has no images");
            return Ok(None);
        }

        let info = SidecarRecord::read_from(&series_dir.join(SERIES_INFO_FILE)).unwrap_or_default();

        writeln!(html, "<div class=\"series\">")?;
        writeln!(html, "<h2>{}</h2>", escape_html(&name))?;
        writeln!(html, "<div class=\"series-info\">")?;
        for (key, value) in info.entries() {
            writeln!(
                html,
                "<p><strong>{}:</strong> {}</p>",
                escape_html(key),
                escape_html(value)
            )?;
        }
        writeln!(html, "</div>")?;
        writeln!(html, "<h3>Sample Images</h3>")?;
        writeln!(html, "<div class=\"thumbnail-container\">")?;

        let mut thumbnails = Vec::new();
        for image in Sampler::select(&images, options.samples) {
            let image_name = file_name(image);
            let copy_name = format!("{name}_{image_name}");
            let destination = report_dir.join(&copy_name);
            fs::copy(image, &destination).map_err(io_at(image))?;

            let metadata = image_sidecar(image);
            writeln!(html, "<div class=\"thumbnail\">")?;
            writeln!(
                html,
                "<img src=\"{REPORT_FILES_DIR}/{}\" alt=\"{}\">",
                escape_html(&copy_name),
                escape_html(&image_name)
            )?;
            writeln!(html, "<p>{}</p>", escape_html(&image_name))?;
            if let Some(location) = metadata.get("Slice Location") {
                writeln!(html, "<p>Location: {}</p>", escape_html(location))?;
            }
            if let Some(instance) = metadata.get("Instance Number") {
                writeln!(html, "<p>Instance: {}</p>", escape_html(instance))?;
            }
            writeln!(html, "</div>")?;

            thumbnails.push(destination);
        }

        writeln!(html, "</div>")?;
        writeln!(html, "</div>")?;

        Ok(Some(ReportedSeries { name, thumbnails }))
    }
}

const HEADER: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>MRI Series Report</title>
<style>
body { font-family: Arial, sans-serif; line-height: 1.6; margin: 0; padding: 20px; background-color: #f4f4f4; }
.container { max-width: 1200px; margin: 0 auto; background: white; padding: 20px; box-shadow: 0 0 10px rgba(0, 0, 0, 0.1); }
h1, h2, h3 { color: #333; }
.series { margin-bottom: 30px; border-bottom: 1px solid #ddd; padding-bottom: 20px; }
.series-info { background-color: #f9f9f9; padding: 10px; border-radius: 5px; margin-bottom: 10px; }
.thumbnail-container { display: flex; flex-wrap: wrap; gap: 10px; }
.thumbnail { width: 150px; text-align: center; }
.thumbnail img { max-width: 150px; max-height: 150px; border: 1px solid #ddd; }
.thumbnail p { margin: 5px 0; font-size: 12px; }
</style>
</head>
<body>
<div class="container">
<h1>MRI Series Report</h1>
<p>This report shows the extracted MRI series and sample images from each series.</p>
"#;

const FOOTER: &str = "</div>\n</body>\n</html>\n";
