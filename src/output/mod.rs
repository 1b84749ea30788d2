//! Output module for crawl reports
//!
//! This module handles:
//! - Writing the four CSV reports (visited pages, visited images, broken,
//!   skipped)
//! - Summarizing a crawl for the console

mod csv_sink;
pub mod stats;
mod traits;

pub use csv_sink::{
    format_load_time, write_broken, write_skipped, write_visited_images, write_visited_pages,
    CsvReportSink, BROKEN_HEADER, SKIPPED_HEADER, VISITED_IMAGES_HEADER, VISITED_PAGES_HEADER,
};
pub use stats::{format_findings, print_findings, print_statistics, CrawlStatistics};
pub use traits::ReportSink;
