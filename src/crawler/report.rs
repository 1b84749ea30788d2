use crate::crawler::ledger::{BrokenEntry, CrawlState, SkippedEntry, VisitRecord};
use crate::url::LinkKind;
use chrono::{DateTime, Utc};

/// Final state of a crawl, handed to the report sink
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Every claimed URL in claim order, skipped ones included
    pub records: Vec<VisitRecord>,
    pub broken: Vec<BrokenEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn from_state(
        state: &CrawlState,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            records: state.ledger.snapshot(),
            broken: state.broken(),
            skipped: state.skipped(),
            started_at,
            finished_at,
        }
    }

    /// Anchor targets that were actually loaded (ok or broken)
    pub fn pages(&self) -> Vec<&VisitRecord> {
        self.visited(LinkKind::Anchor)
    }

    /// Image targets that were actually loaded (ok or broken)
    pub fn images(&self) -> Vec<&VisitRecord> {
        self.visited(LinkKind::Image)
    }

    fn visited(&self, kind: LinkKind) -> Vec<&VisitRecord> {
        self.records
            .iter()
            .filter(|r| r.kind == kind && r.status.was_visited())
            .collect()
    }

    /// Looks up the record for a URL string
    pub fn record(&self, url: &str) -> Option<&VisitRecord> {
        self.records.iter().find(|r| r.url.as_str() == url)
    }
}
