//! Timed fetch adapters over a [`Renderer`]
//!
//! This module turns raw renderer calls into crawl outcomes:
//! - bounding every call with a timeout
//! - measuring load time up to completion or failure
//! - classifying 404 / non-2xx / transport failures as broken
//! - extracting child targets from successful anchor pages

use crate::crawler::parser::parse_html;
use crate::crawler::renderer::{Renderer, TransportError};
use crate::crawler::ledger::{VisitOutcome, VisitStatus};
use std::time::{Duration, Instant};
use url::Url;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Loaded with a 2xx status
    Success {
        status_code: u16,
        /// Anchor targets; always empty for images
        anchors: Vec<Url>,
        /// Image targets; always empty for images
        images: Vec<Url>,
    },

    /// Loaded, but with a 404 or other non-2xx status
    HttpError { status_code: u16 },

    /// No response (timeout, DNS, connection reset, ...)
    TransportError { error: TransportError },
}

/// A fetch result together with its measured load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub result: FetchResult,
    pub load_time: Duration,
}

impl FetchOutcome {
    pub fn is_broken(&self) -> bool {
        !matches!(self.result, FetchResult::Success { .. })
    }

    /// Ledger outcome; link counts are the raw extracted counts
    pub fn visit_outcome(&self) -> VisitOutcome {
        match &self.result {
            FetchResult::Success {
                anchors, images, ..
            } => VisitOutcome {
                status: VisitStatus::Ok,
                anchor_links: anchors.len(),
                image_links: images.len(),
                load_time: self.load_time,
            },
            FetchResult::HttpError { .. } | FetchResult::TransportError { .. } => VisitOutcome {
                status: VisitStatus::Broken,
                anchor_links: 0,
                image_links: 0,
                load_time: self.load_time,
            },
        }
    }

    /// Short human description for logs
    pub fn describe(&self) -> String {
        match &self.result {
            FetchResult::Success { status_code, .. } => format!("HTTP {}", status_code),
            FetchResult::HttpError { status_code } => format!("HTTP {}", status_code),
            FetchResult::TransportError { error } => error.to_string(),
        }
    }
}

fn timed_out(timeout: Duration) -> TransportError {
    TransportError::Timeout(format!("no response within {:?}", timeout))
}

/// Renders an anchor target and extracts its children
///
/// # Outcome Rules
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | Success with anchor and image targets |
/// | 404 or any other non-2xx | HttpError, no targets |
/// | Transport failure or timeout | TransportError, no targets |
///
/// Load time runs from navigation start to completion or failure.
pub async fn fetch_anchor_page(
    renderer: &dyn Renderer,
    url: &Url,
    timeout: Duration,
) -> FetchOutcome {
    let started = Instant::now();
    let rendered = tokio::time::timeout(timeout, renderer.render(url)).await;
    let load_time = started.elapsed();

    let result = match rendered {
        Ok(Ok(page)) if page.ok() => {
            let parsed = parse_html(&page.html, &page.final_url);
            FetchResult::Success {
                status_code: page.status,
                anchors: parsed.anchors,
                images: parsed.images,
            }
        }
        Ok(Ok(page)) => FetchResult::HttpError {
            status_code: page.status,
        },
        Ok(Err(error)) => FetchResult::TransportError { error },
        Err(_) => FetchResult::TransportError {
            error: timed_out(timeout),
        },
    };

    FetchOutcome { result, load_time }
}

/// Validates an image target
///
/// Same status, timing and timeout rules as [`fetch_anchor_page`], but
/// images are leaves: nothing is extracted.
pub async fn validate_image(renderer: &dyn Renderer, url: &Url, timeout: Duration) -> FetchOutcome {
    let started = Instant::now();
    let probed = tokio::time::timeout(timeout, renderer.probe(url)).await;
    let load_time = started.elapsed();

    let result = match probed {
        Ok(Ok(status_code)) if (200..300).contains(&status_code) => FetchResult::Success {
            status_code,
            anchors: Vec::new(),
            images: Vec::new(),
        },
        Ok(Ok(status_code)) => FetchResult::HttpError { status_code },
        Ok(Err(error)) => FetchResult::TransportError { error },
        Err(_) => FetchResult::TransportError {
            error: timed_out(timeout),
        },
    };

    FetchOutcome { result, load_time }
}
