use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure for link-ledger
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Domain every crawled URL's host must contain, taken from the start URL
    ///
    /// Returns an empty string when the start URL has no host; validation
    /// rejects such configurations before a crawl can start.
    pub fn domain(&self) -> String {
        Url::parse(&self.crawler.start_url)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_default()
    }

    /// Upper bound on a single page render or image validation
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.page_timeout_secs)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// First page of the crawl; also exempt from exclude patterns
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Number of concurrent workers draining the frontier
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Timeout for each render or image check (seconds)
    #[serde(rename = "page-timeout-secs", default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Regular expressions searched against the full URL
    #[serde(rename = "exclude-patterns", default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Log a progress line every this many finished tasks
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "link-ledger".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Form login performed once before the crawl
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "login-url")]
    pub login_url: String,

    #[serde(rename = "username-field", default = "default_username_field")]
    pub username_field: String,

    #[serde(rename = "password-field", default = "default_password_field")]
    pub password_field: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Additional form fields posted alongside the credentials
    #[serde(rename = "extra-fields", default)]
    pub extra_fields: BTreeMap<String, String>,

    /// Text whose presence in the post-login page means the login failed
    #[serde(rename = "failure-marker", default)]
    pub failure_marker: Option<String>,
}

/// Report output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    #[serde(rename = "visited-pages", default = "default_visited_pages")]
    pub visited_pages: String,

    #[serde(rename = "visited-images", default = "default_visited_images")]
    pub visited_images: String,

    #[serde(default = "default_broken")]
    pub broken: String,

    #[serde(default = "default_skipped")]
    pub skipped: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            visited_pages: default_visited_pages(),
            visited_images: default_visited_images(),
            broken: default_broken(),
            skipped: default_skipped(),
        }
    }
}

fn default_workers() -> u32 {
    5
}

fn default_page_timeout_secs() -> u64 {
    30
}

fn default_progress_interval() -> u64 {
    25
}

pub(crate) fn default_exclude_patterns() -> Vec<String> {
    vec![r"^.*?/login".to_string(), r"^.*?/logout".to_string()]
}

fn default_username_field() -> String {
    "username".to_string()
}

fn default_password_field() -> String {
    "password".to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_visited_pages() -> String {
    "visited_links.csv".to_string()
}

fn default_visited_images() -> String {
    "visited_images.csv".to_string()
}

fn default_broken() -> String {
    "broken_links.csv".to_string()
}

fn default_skipped() -> String {
    "skipped_links.csv".to_string()
}
