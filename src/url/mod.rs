//! URL handling module for link-ledger
//!
//! This module provides URL normalization, link resolution, domain
//! containment, exclude-pattern matching and the classification that gates
//! every task before it reaches the renderer.

mod domain;
mod matcher;
mod normalize;

use crate::config::Config;
use crate::CrawlError;
use std::fmt;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, host_contains};
pub use matcher::ExcludeMatcher;
pub use normalize::{normalize_parsed, normalize_url, resolve_link};

/// What a discovered reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// `<a href>` target; rendered and mined for further links
    Anchor,
    /// `<img src>` target; validated, never mined
    Image,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anchor => write!(f, "anchor"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Why a URL was recorded as skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    ExternalDomain,
    ExcludedPattern,
}

impl SkipReason {
    /// Text written to the skipped report
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExternalDomain => "External URL",
            Self::ExcludedPattern => "URL matches exclude pattern",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a candidate URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Should be rendered or validated
    Eligible,
    /// Host does not contain the crawl domain
    External,
    /// Matches an exclude pattern
    Excluded,
    /// Another task already claimed this URL
    Duplicate,
}

impl Classification {
    /// Returns the skip reason for outcomes that are reported as skipped
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::External => Some(SkipReason::ExternalDomain),
            Self::Excluded => Some(SkipReason::ExcludedPattern),
            Self::Eligible | Self::Duplicate => None,
        }
    }
}

/// Immutable per-run inputs to [`classify`]
#[derive(Debug, Clone)]
pub struct CrawlRules {
    start_url: Url,
    domain: String,
    exclude: ExcludeMatcher,
}

impl CrawlRules {
    /// Builds rules for a crawl starting at `start_url`
    ///
    /// The domain is the start URL's host.
    pub fn new<S: AsRef<str>>(start_url: &str, exclude_patterns: &[S]) -> Result<Self, CrawlError> {
        let start_url = normalize_url(start_url)?;
        let domain = extract_domain(&start_url).ok_or(crate::UrlError::MissingDomain)?;
        let exclude = ExcludeMatcher::new(exclude_patterns)?;

        Ok(Self {
            start_url,
            domain,
            exclude,
        })
    }

    /// Builds rules from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        Self::new(&config.crawler.start_url, &config.crawler.exclude_patterns)
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// Classifies a candidate URL
///
/// Rules are applied in order, first match wins:
///
/// 1. `already_claimed` → [`Classification::Duplicate`]
/// 2. host does not contain the crawl domain → [`Classification::External`]
/// 3. not the start URL and an exclude pattern matches → [`Classification::Excluded`]
/// 4. otherwise → [`Classification::Eligible`]
///
/// The declared kind does not change the outcome; anchors and images are
/// gated alike. The function is pure: the caller performs the atomic
/// claim and passes its result in.
///
/// # Examples
///
/// ```
/// use link_ledger::url::{classify, normalize_url, Classification, CrawlRules, LinkKind};
///
/// let rules = CrawlRules::new("https://site.test/", &["^.*/login"]).unwrap();
/// let login = normalize_url("https://site.test/app/login").unwrap();
/// assert_eq!(classify(&login, LinkKind::Anchor, &rules, false), Classification::Excluded);
/// ```
pub fn classify(
    url: &Url,
    kind: LinkKind,
    rules: &CrawlRules,
    already_claimed: bool,
) -> Classification {
    let outcome = if already_claimed {
        Classification::Duplicate
    } else if !host_contains(url, &rules.domain) {
        Classification::External
    } else if url != &rules.start_url && rules.exclude.is_excluded(url.as_str()) {
        Classification::Excluded
    } else {
        Classification::Eligible
    };

    tracing::trace!("Classified {} {} as {:?}", kind, url, outcome);
    outcome
}
