//! Statistics generation from a finished crawl
//!
//! This module summarizes a [`CrawlReport`] for the console and the log.

use crate::crawler::{CrawlReport, VisitStatus};
use crate::output::csv_sink::format_load_time;
use crate::url::{LinkKind, SkipReason};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Distinct URLs claimed, skipped ones included
    pub urls_claimed: u64,

    pub pages_ok: u64,
    pub pages_broken: u64,
    pub images_ok: u64,
    pub images_broken: u64,

    pub skipped_external: u64,
    pub skipped_excluded: u64,

    /// Broken rows, one per (parent, url) pair
    pub broken_entries: u64,

    /// Sum of load times over every loaded page and image
    pub total_load_time: Duration,
}

impl CrawlStatistics {
    pub fn from_report(report: &CrawlReport) -> Self {
        let count = |kind: LinkKind, status: VisitStatus| {
            report
                .records
                .iter()
                .filter(|r| r.kind == kind && r.status == status)
                .count() as u64
        };
        let skipped = |reason: SkipReason| {
            report
                .skipped
                .iter()
                .filter(|s| s.reason == reason)
                .count() as u64
        };

        Self {
            started_at: report.started_at,
            finished_at: report.finished_at,
            urls_claimed: report.records.len() as u64,
            pages_ok: count(LinkKind::Anchor, VisitStatus::Ok),
            pages_broken: count(LinkKind::Anchor, VisitStatus::Broken),
            images_ok: count(LinkKind::Image, VisitStatus::Ok),
            images_broken: count(LinkKind::Image, VisitStatus::Broken),
            skipped_external: skipped(SkipReason::ExternalDomain),
            skipped_excluded: skipped(SkipReason::ExcludedPattern),
            broken_entries: report.broken.len() as u64,
            total_load_time: report
                .records
                .iter()
                .filter(|r| r.status.was_visited())
                .map(|r| r.load_time)
                .sum(),
        }
    }

    /// Wall-clock duration of the run in whole seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");
    println!("Started:  {}", stats.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Finished: {}", stats.finished_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Duration: {}s", stats.duration_seconds());
    println!();
    println!("URLs claimed: {}", stats.urls_claimed);
    println!("Pages:   {} ok, {} broken", stats.pages_ok, stats.pages_broken);
    println!("Images:  {} ok, {} broken", stats.images_ok, stats.images_broken);
    println!(
        "Skipped: {} external, {} excluded",
        stats.skipped_external, stats.skipped_excluded
    );
    println!("Broken links (by referring page): {}", stats.broken_entries);
    println!(
        "Total load time: {}s",
        format_load_time(stats.total_load_time)
    );
}

/// Prints every visited, broken and skipped reference to stdout
pub fn print_findings(report: &CrawlReport) {
    print!("{}", format_findings(report));
}

fn parent_label(parent: &Option<url::Url>) -> String {
    parent
        .as_ref()
        .map_or_else(|| "<start>".to_string(), |p| p.to_string())
}

/// Console listing of a finished crawl, one reference per line
pub fn format_findings(report: &CrawlReport) -> String {
    let mut out = String::new();

    let pages = report.pages();
    if !pages.is_empty() {
        out.push_str("\nVisited pages:\n");
        for record in pages {
            out.push_str(&format!(
                "  Visited: {} - Links: {} - Images: {} - Load Time: {}s\n",
                record.url,
                record.anchor_links,
                record.image_links,
                format_load_time(record.load_time)
            ));
        }
    }

    let images = report.images();
    if !images.is_empty() {
        out.push_str("\nVisited images:\n");
        for record in images {
            out.push_str(&format!(
                "  Visited: {} - Load Time: {}s\n",
                record.url,
                format_load_time(record.load_time)
            ));
        }
    }

    if !report.broken.is_empty() {
        out.push_str("\nBroken links:\n");
        for entry in &report.broken {
            out.push_str(&format!(
                "  {} (from {}) load time {}s\n",
                entry.url,
                parent_label(&entry.parent),
                format_load_time(entry.load_time)
            ));
        }
    }

    if !report.skipped.is_empty() {
        out.push_str("\nSkipped links:\n");
        for entry in &report.skipped {
            out.push_str(&format!(
                "  {} (from {}): {}\n",
                entry.url,
                parent_label(&entry.parent),
                entry.reason
            ));
        }
    }

    out
}
