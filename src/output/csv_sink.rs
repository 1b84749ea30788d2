//! CSV report writers
//!
//! Four files, each with a header row. Column order is fixed; downstream
//! tooling parses these by position.

use crate::config::OutputConfig;
use crate::crawler::CrawlReport;
use crate::output::traits::ReportSink;
use crate::CrawlError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const VISITED_PAGES_HEADER: [&str; 4] =
    ["URL", "Anchor Links", "Image Links", "Load Time (seconds)"];
pub const VISITED_IMAGES_HEADER: [&str; 2] = ["URL", "Load Time (seconds)"];
pub const BROKEN_HEADER: [&str; 3] = ["Parent page", "Broken link", "Load time (seconds)"];
pub const SKIPPED_HEADER: [&str; 3] = ["Parent page", "Skipped link", "Skipped Reason"];

/// Writes the crawl report as CSV files into one directory
#[derive(Debug, Clone)]
pub struct CsvReportSink {
    directory: PathBuf,
    visited_pages: String,
    visited_images: String,
    broken: String,
    skipped: String,
}

impl CsvReportSink {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            visited_pages: config.visited_pages.clone(),
            visited_images: config.visited_images.clone(),
            broken: config.broken.clone(),
            skipped: config.skipped.clone(),
        }
    }

    /// Same file names, different directory
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    fn path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }
}

impl ReportSink for CsvReportSink {
    fn write_report(&self, report: &CrawlReport) -> Result<Vec<PathBuf>, CrawlError> {
        std::fs::create_dir_all(&self.directory)?;

        let pages = self.path(&self.visited_pages);
        write_visited_pages(create(&pages)?, report)?;

        let images = self.path(&self.visited_images);
        write_visited_images(create(&images)?, report)?;

        let broken = self.path(&self.broken);
        write_broken(create(&broken)?, report)?;

        let skipped = self.path(&self.skipped);
        write_skipped(create(&skipped)?, report)?;

        for path in [&pages, &images, &broken, &skipped] {
            tracing::info!("Wrote {}", path.display());
        }

        Ok(vec![pages, images, broken, skipped])
    }
}

fn create(path: &Path) -> Result<std::fs::File, CrawlError> {
    Ok(std::fs::File::create(path)?)
}

/// Seconds with two decimals
pub fn format_load_time(load_time: Duration) -> String {
    format!("{:.2}", load_time.as_secs_f64())
}

fn parent_cell(parent: &Option<Url>) -> String {
    parent.as_ref().map(Url::to_string).unwrap_or_default()
}

/// `URL, Anchor Links, Image Links, Load Time (seconds)`
pub fn write_visited_pages<W: Write>(writer: W, report: &CrawlReport) -> Result<(), CrawlError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(VISITED_PAGES_HEADER)?;
    for record in report.pages() {
        csv.write_record([
            record.url.to_string(),
            record.anchor_links.to_string(),
            record.image_links.to_string(),
            format_load_time(record.load_time),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// `URL, Load Time (seconds)`
pub fn write_visited_images<W: Write>(writer: W, report: &CrawlReport) -> Result<(), CrawlError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(VISITED_IMAGES_HEADER)?;
    for record in report.images() {
        csv.write_record([record.url.to_string(), format_load_time(record.load_time)])?;
    }
    csv.flush()?;
    Ok(())
}

/// `Parent page, Broken link, Load time (seconds)`
pub fn write_broken<W: Write>(writer: W, report: &CrawlReport) -> Result<(), CrawlError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(BROKEN_HEADER)?;
    for entry in &report.broken {
        csv.write_record([
            parent_cell(&entry.parent),
            entry.url.to_string(),
            format_load_time(entry.load_time),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// `Parent page, Skipped link, Skipped Reason`
pub fn write_skipped<W: Write>(writer: W, report: &CrawlReport) -> Result<(), CrawlError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(SKIPPED_HEADER)?;
    for entry in &report.skipped {
        csv.write_record([
            parent_cell(&entry.parent),
            entry.url.to_string(),
            entry.reason.as_str().to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}
