//! Crawler module for authenticated site inventory
//!
//! This module contains the core crawling logic, including:
//! - The shared frontier and visit ledger
//! - The worker pool and per-task algorithm
//! - The renderer boundary and its HTTP implementation
//! - HTML target extraction and timed fetch adapters
//! - Form login

mod auth;
mod fetcher;
mod frontier;
mod ledger;
mod orchestrator;
mod parser;
mod renderer;
mod report;

pub use auth::{login, Authenticator, FormLogin};
pub use fetcher::{fetch_anchor_page, validate_image, FetchOutcome, FetchResult};
pub use frontier::{Frontier, Lease, Task};
pub use ledger::{
    BrokenEntry, CrawlState, LedgerError, SkippedEntry, VisitLedger, VisitOutcome, VisitRecord,
    VisitStatus,
};
pub use orchestrator::{Orchestrator, DEFAULT_PAGE_TIMEOUT, DEFAULT_WORKERS};
pub use parser::{extract_anchors, extract_images, parse_html, ParsedPage};
pub use renderer::{build_http_client, HttpRenderer, RenderedPage, Renderer, TransportError};
pub use report::CrawlReport;

use crate::config::Config;
use crate::CrawlError;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for a crawl. It will:
/// 1. Build the shared HTTP client
/// 2. Log in, if the configuration has an `[auth]` section
/// 3. Run the worker pool from the start URL until the frontier is exhausted
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed; broken links are findings inside
/// * `Err(CrawlError)` - Login failed or a crawl invariant was violated
pub async fn crawl(config: &Config) -> Result<CrawlReport, CrawlError> {
    let client = build_http_client(&config.user_agent, config.page_timeout())?;

    if let Some(auth) = &config.auth {
        FormLogin::new(client.clone(), auth.clone())
            .authenticate()
            .await?;
    } else {
        tracing::info!("No [auth] section configured, crawling anonymously");
    }

    let renderer = Arc::new(HttpRenderer::new(client, config.crawler.workers as usize));
    Orchestrator::from_config(config, renderer)?.run().await
}
