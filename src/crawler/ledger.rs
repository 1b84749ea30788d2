//! Visit ledger and per-run crawl state
//!
//! The ledger is the single authority on which URLs have been claimed. A URL
//! is claimed by inserting its placeholder record; check and insert happen
//! under one lock so two workers can never both win the same URL.

use crate::url::{LinkKind, SkipReason};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::frontier::Frontier;

/// Ledger contract violations
///
/// These indicate a bug in the worker loop, not a problem with the site,
/// and abort the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("finalizing {url} which was never claimed")]
    NotClaimed { url: String },

    #[error("finalizing {url} which is already {status}")]
    AlreadyFinalized { url: String, status: VisitStatus },
}

/// Lifecycle of a ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitStatus {
    /// Claimed; the claiming worker has not finished with it yet
    Pending,
    /// Rendered or validated successfully
    Ok,
    /// Bad status or transport failure
    Broken,
    /// Rejected by classification; never dispatched
    Skipped,
}

impl VisitStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// True for records that represent an actual fetch
    pub fn was_visited(&self) -> bool {
        matches!(self, Self::Ok | Self::Broken)
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Ok => "ok",
            Self::Broken => "broken",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Outcome of processing one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitOutcome {
    pub status: VisitStatus,
    pub anchor_links: usize,
    pub image_links: usize,
    pub load_time: Duration,
}

impl VisitOutcome {
    pub fn skipped() -> Self {
        Self {
            status: VisitStatus::Skipped,
            anchor_links: 0,
            image_links: 0,
            load_time: Duration::ZERO,
        }
    }
}

/// Everything known about one claimed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    pub url: Url,
    pub kind: LinkKind,
    pub anchor_links: usize,
    pub image_links: usize,
    pub load_time: Duration,
    pub status: VisitStatus,
    /// Claim order, used to report records in the order they were reached
    pub sequence: u64,
}

/// A reference that failed to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenEntry {
    pub parent: Option<Url>,
    pub url: Url,
    pub load_time: Duration,
}

/// A reference that was deliberately not followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub parent: Option<Url>,
    pub url: Url,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
struct LedgerInner {
    records: HashMap<String, VisitRecord>,
    next_sequence: u64,
}

/// Authoritative record of claimed URLs and their outcomes
#[derive(Debug, Default)]
pub struct VisitLedger {
    inner: Mutex<LedgerInner>,
}

impl VisitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `url` for the calling worker
    ///
    /// Inserts a Pending record and returns true if the URL was unclaimed.
    /// Returns false, leaving the ledger untouched, if any record exists.
    pub fn claim(&self, url: &Url, kind: LinkKind) -> bool {
        let mut inner = self.lock();
        if inner.records.contains_key(url.as_str()) {
            return false;
        }

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.records.insert(
            url.as_str().to_string(),
            VisitRecord {
                url: url.clone(),
                kind,
                anchor_links: 0,
                image_links: 0,
                load_time: Duration::ZERO,
                status: VisitStatus::Pending,
                sequence,
            },
        );
        true
    }

    pub fn is_claimed(&self, url: &Url) -> bool {
        self.lock().records.contains_key(url.as_str())
    }

    /// Moves a claimed record from Pending to its final outcome
    pub fn finalize(&self, url: &Url, outcome: VisitOutcome) -> Result<(), LedgerError> {
        let mut inner = self.lock();
        let record = inner
            .records
            .get_mut(url.as_str())
            .ok_or_else(|| LedgerError::NotClaimed {
                url: url.to_string(),
            })?;

        if record.status.is_terminal() {
            return Err(LedgerError::AlreadyFinalized {
                url: url.to_string(),
                status: record.status,
            });
        }

        record.status = outcome.status;
        record.anchor_links = outcome.anchor_links;
        record.image_links = outcome.image_links;
        record.load_time = outcome.load_time;
        Ok(())
    }

    pub fn get(&self, url: &Url) -> Option<VisitRecord> {
        self.lock().records.get(url.as_str()).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// All records in claim order
    pub fn snapshot(&self) -> Vec<VisitRecord> {
        let mut records: Vec<VisitRecord> = self.lock().records.values().cloned().collect();
        records.sort_by_key(|r| r.sequence);
        records
    }
}

/// Append-only list that drops exact repeats of a key
#[derive(Debug)]
struct DedupList<K, V> {
    seen: HashSet<K>,
    items: Vec<V>,
}

impl<K, V> Default for DedupList<K, V> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }
}

/// Per-run shared state: frontier, ledger, broken and skipped sets
///
/// One instance per crawl, shared by reference with every worker.
#[derive(Debug, Default)]
pub struct CrawlState {
    pub frontier: Frontier,
    pub ledger: VisitLedger,
    broken: Mutex<DedupList<(Option<String>, String), BrokenEntry>>,
    skipped: Mutex<DedupList<(Option<String>, String), SkippedEntry>>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a broken reference; repeats of the same (parent, url) are ignored
    ///
    /// Returns true if the entry was new.
    pub fn record_broken(&self, entry: BrokenEntry) -> bool {
        let key = (
            entry.parent.as_ref().map(|p| p.to_string()),
            entry.url.to_string(),
        );
        let mut broken = self.broken.lock().unwrap_or_else(PoisonError::into_inner);
        if broken.seen.insert(key) {
            broken.items.push(entry);
            true
        } else {
            false
        }
    }

    /// Records a skipped reference; repeats of the same (parent, url) are ignored
    pub fn record_skipped(&self, entry: SkippedEntry) -> bool {
        let key = (
            entry.parent.as_ref().map(|p| p.to_string()),
            entry.url.to_string(),
        );
        let mut skipped = self.skipped.lock().unwrap_or_else(PoisonError::into_inner);
        if skipped.seen.insert(key) {
            skipped.items.push(entry);
            true
        } else {
            false
        }
    }

    pub fn broken(&self) -> Vec<BrokenEntry> {
        self.broken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .clone()
    }

    pub fn skipped(&self) -> Vec<SkippedEntry> {
        self.skipped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .clone()
    }
}
