//! Crawl orchestrator - worker pool and per-task algorithm
//!
//! This module contains the crawl loop that coordinates:
//! - Seeding the frontier with the start URL
//! - Running a fixed pool of workers until the frontier is exhausted
//! - Claiming, classifying and dispatching each task
//! - Recording outcomes and enqueueing discovered links
//! - Aborting the run on invariant violations

use crate::config::Config;
use crate::crawler::fetcher::{fetch_anchor_page, validate_image, FetchResult};
use crate::crawler::frontier::Task;
use crate::crawler::ledger::{BrokenEntry, CrawlState, SkippedEntry, VisitOutcome};
use crate::crawler::renderer::Renderer;
use crate::crawler::report::CrawlReport;
use crate::url::{classify, Classification, CrawlRules, LinkKind};
use crate::CrawlError;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Default number of concurrent workers
pub const DEFAULT_WORKERS: usize = 5;

/// Default bound on a single render or image check
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs a crawl over a [`Renderer`]
///
/// Each call to [`Orchestrator::run`] builds a fresh [`CrawlState`], so one
/// orchestrator can run several independent crawls.
///
/// # Example
///
/// ```no_run
/// use link_ledger::crawler::{HttpRenderer, Orchestrator, build_http_client};
/// use link_ledger::config::UserAgentConfig;
/// use link_ledger::url::CrawlRules;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), link_ledger::CrawlError> {
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30))?;
/// let rules = CrawlRules::new("https://app.example.com/", &["/logout"])?;
/// let report = Orchestrator::new(rules, Arc::new(HttpRenderer::new(client, 5)))
///     .with_workers(5)
///     .run()
///     .await?;
/// println!("{} pages, {} broken", report.pages().len(), report.broken.len());
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    rules: Arc<CrawlRules>,
    renderer: Arc<dyn Renderer>,
    workers: usize,
    page_timeout: Duration,
    progress_interval: u64,
}

impl Orchestrator {
    pub fn new(rules: CrawlRules, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            rules: Arc::new(rules),
            renderer,
            workers: DEFAULT_WORKERS,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            progress_interval: 25,
        }
    }

    /// Builds an orchestrator from a validated configuration
    pub fn from_config(config: &Config, renderer: Arc<dyn Renderer>) -> Result<Self, CrawlError> {
        let rules = CrawlRules::from_config(config)?;
        Ok(Self::new(rules, renderer)
            .with_workers(config.crawler.workers as usize)
            .with_page_timeout(config.page_timeout())
            .with_progress_interval(config.crawler.progress_interval))
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Crawls from the start URL until the frontier is exhausted
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl ran to completion; broken pages are
    ///   part of the report, not errors
    /// * `Err(CrawlError)` - A worker hit an invariant violation or died;
    ///   the remaining workers are cancelled
    pub async fn run(&self) -> Result<CrawlReport, CrawlError> {
        let state = Arc::new(CrawlState::new());
        let started_at = Utc::now();
        let started = Instant::now();

        tracing::info!(
            "Starting crawl of {} (domain '{}') with {} workers",
            self.rules.start_url(),
            self.rules.domain(),
            self.workers
        );

        state
            .frontier
            .push(Task::seed(self.rules.start_url().clone()));

        let mut pool = JoinSet::new();
        for id in 0..self.workers {
            let worker = Worker {
                id,
                state: state.clone(),
                rules: self.rules.clone(),
                renderer: self.renderer.clone(),
                page_timeout: self.page_timeout,
                progress_interval: self.progress_interval,
                started,
            };
            pool.spawn(worker.run());
        }

        let mut failure: Option<CrawlError> = None;
        while let Some(joined) = pool.join_next().await {
            let err = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => CrawlError::WorkerPanicked(e.to_string()),
            };

            if failure.is_none() {
                tracing::error!("Aborting crawl: {}", err);
                pool.abort_all();
                failure = Some(err);
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }

        let report = CrawlReport::from_state(&state, started_at, Utc::now());
        tracing::info!(
            "Crawl completed: {} URLs claimed in {:.2?}",
            report.records.len(),
            started.elapsed()
        );
        Ok(report)
    }
}

/// One member of the worker pool
struct Worker {
    id: usize,
    state: Arc<CrawlState>,
    rules: Arc<CrawlRules>,
    renderer: Arc<dyn Renderer>,
    page_timeout: Duration,
    progress_interval: u64,
    started: Instant,
}

impl Worker {
    async fn run(self) -> Result<(), CrawlError> {
        tracing::debug!("Worker {} started", self.id);

        while let Some(lease) = self.state.frontier.pop().await {
            self.process(lease.task()).await?;
            let handled = lease.number();
            // Children are pushed before the lease is released.
            drop(lease);
            self.report_progress(handled);
        }

        tracing::debug!("Worker {} finished", self.id);
        Ok(())
    }

    /// Runs the per-task algorithm for one task
    async fn process(&self, task: &Task) -> Result<(), CrawlError> {
        let url = &task.target;

        let claimed = self.state.ledger.claim(url, task.kind);
        let classification = classify(url, task.kind, &self.rules, !claimed);

        match classification {
            Classification::Duplicate => {
                tracing::trace!("Worker {}: {} already claimed", self.id, url);
                return Ok(());
            }
            Classification::External | Classification::Excluded => {
                if let Some(reason) = classification.skip_reason() {
                    tracing::debug!("Skipping {}: {}", url, reason);
                    self.state.record_skipped(SkippedEntry {
                        parent: task.parent.clone(),
                        url: url.clone(),
                        reason,
                    });
                }
                self.state.ledger.finalize(url, VisitOutcome::skipped())?;
                return Ok(());
            }
            Classification::Eligible => {}
        }

        tracing::debug!("Worker {}: visiting {} {}", self.id, task.kind, url);
        let fetched = match task.kind {
            LinkKind::Anchor => {
                fetch_anchor_page(self.renderer.as_ref(), url, self.page_timeout).await
            }
            LinkKind::Image => validate_image(self.renderer.as_ref(), url, self.page_timeout).await,
        };

        self.state.ledger.finalize(url, fetched.visit_outcome())?;

        match fetched.result {
            FetchResult::Success {
                anchors, images, ..
            } => {
                tracing::debug!(
                    "Loaded {} in {:.2?} ({} anchors, {} images)",
                    url,
                    fetched.load_time,
                    anchors.len(),
                    images.len()
                );
                if task.kind == LinkKind::Anchor {
                    self.enqueue_children(url, anchors, images);
                }
            }
            FetchResult::HttpError { .. } | FetchResult::TransportError { .. } => {
                tracing::warn!(
                    "Broken {} {} ({}) linked from {}",
                    task.kind,
                    url,
                    fetched.describe(),
                    task.parent
                        .as_ref()
                        .map_or_else(|| "<start>".to_string(), |p| p.to_string())
                );
                self.state.record_broken(BrokenEntry {
                    parent: task.parent.clone(),
                    url: url.clone(),
                    load_time: fetched.load_time,
                });
            }
        }

        Ok(())
    }

    /// Pushes a task for every discovered target not yet in the ledger
    fn enqueue_children(&self, parent: &url::Url, anchors: Vec<url::Url>, images: Vec<url::Url>) {
        let ledger = &self.state.ledger;
        // Collected first so the ledger lock is never taken under the frontier lock.
        let children: Vec<Task> = anchors
            .into_iter()
            .map(|target| (target, LinkKind::Anchor))
            .chain(images.into_iter().map(|target| (target, LinkKind::Image)))
            .filter(|(target, _)| !ledger.is_claimed(target))
            .map(|(target, kind)| Task::child(parent, target, kind))
            .collect();

        tracing::trace!("Enqueueing {} children of {}", children.len(), parent);
        self.state.frontier.extend(children);
    }

    /// Logs when `handled`, the task's hand-out number, hits the interval
    fn report_progress(&self, handled: u64) {
        if handled % self.progress_interval != 0 {
            return;
        }

        let elapsed = self.started.elapsed();
        let rate = handled as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        tracing::info!(
            "Progress: {} tasks handled, {} URLs claimed, {} in frontier, {:.2} tasks/sec",
            handled,
            self.state.ledger.len(),
            self.state.frontier.len(),
            rate
        );
    }
}
