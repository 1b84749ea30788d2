//! Renderer boundary and its HTTP implementation
//!
//! The crawl core only talks to a [`Renderer`]. [`HttpRenderer`] is the
//! implementation the binary uses: a cookie-carrying `reqwest` client, so the
//! session established by login applies to every navigation, with a cap on
//! how many pages are open at once.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Failure to get any response at all
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// A page as it stood once loading finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// HTTP status of the final response
    pub status: u16,

    /// Document URL after redirects; relative links resolve against it
    pub final_url: Url,

    /// Document markup; empty for non-HTML or failed responses
    pub html: String,
}

impl RenderedPage {
    /// True for 2xx responses
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can load pages and images on behalf of the crawl
///
/// Implementations must be shareable across workers. Errors are transport
/// failures only; HTTP error statuses are successful renders with a bad
/// status.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigates to `url` and returns the loaded document
    async fn render(&self, url: &Url) -> Result<RenderedPage, TransportError>;

    /// Loads `url` as a resource and returns its HTTP status
    async fn probe(&self, url: &Url) -> Result<u16, TransportError>;
}

/// Builds the HTTP client shared by login and crawl
///
/// The cookie store is what carries the authenticated session from
/// [`crate::crawler::login`] into every later request.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    page_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", user_agent.crawler_name, user_agent.crawler_version);

    Client::builder()
        .user_agent(user_agent)
        .cookie_store(true)
        .timeout(page_timeout)
        .connect_timeout(page_timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Renderer`] over plain HTTP
///
/// "Network idle" here means the full response body has arrived.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
    pages: Arc<Semaphore>,
}

impl HttpRenderer {
    /// Creates a renderer allowing at most `max_open_pages` loads at once
    pub fn new(client: Client, max_open_pages: usize) -> Self {
        Self {
            client,
            pages: Arc::new(Semaphore::new(max_open_pages.max(1))),
        }
    }

    /// Acquires a page slot, released when the returned permit drops
    async fn open_page(&self) -> Result<OwnedSemaphorePermit, TransportError> {
        self.pages
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TransportError::Request("renderer shut down".to_string()))
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, TransportError> {
        let _page = self.open_page().await?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let final_url = response.url().clone();

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |ct| ct.contains("text/html"));

        let html = if status.is_success() && is_html {
            response.text().await?
        } else {
            // Drain so the timing covers the whole load.
            response.bytes().await?;
            String::new()
        };

        tracing::trace!("Rendered {} -> {} ({})", url, final_url, status);

        Ok(RenderedPage {
            status: status.as_u16(),
            final_url,
            html,
        })
    }

    async fn probe(&self, url: &Url) -> Result<u16, TransportError> {
        let _page = self.open_page().await?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        response.bytes().await?;

        Ok(status)
    }
}
