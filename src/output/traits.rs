//! Report sink trait
//!
//! The crawl core hands its final [`CrawlReport`] to a sink and does not
//! care how it is rendered.

use crate::crawler::CrawlReport;
use crate::CrawlError;
use std::path::PathBuf;

/// Consumes a finished crawl
pub trait ReportSink {
    /// Renders the report, returning the artifacts written
    fn write_report(&self, report: &CrawlReport) -> Result<Vec<PathBuf>, CrawlError>;
}
