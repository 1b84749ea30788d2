//! Shared crawl frontier
//!
//! This module handles:
//! - FIFO storage of pending tasks shared by all workers
//! - Tracking how many tasks are currently in flight
//! - Pool-wide quiescence: `pop` only reports exhaustion once the queue is
//!   empty and no worker can still push new tasks

use crate::url::LinkKind;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use url::Url;

/// One unit of discovery work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Page the target was found on; `None` for the seed
    pub parent: Option<Url>,

    /// Normalized absolute URL to process
    pub target: Url,

    /// How the target was referenced
    pub kind: LinkKind,
}

impl Task {
    /// The initial task of a crawl
    pub fn seed(target: Url) -> Self {
        Self {
            parent: None,
            target,
            kind: LinkKind::Anchor,
        }
    }

    /// A task discovered on `parent`
    pub fn child(parent: &Url, target: Url, kind: LinkKind) -> Self {
        Self {
            parent: Some(parent.clone()),
            target,
            kind,
        }
    }
}

#[derive(Debug, Default)]
struct FrontierInner {
    queue: VecDeque<Task>,
    in_flight: usize,
    popped: u64,
}

/// FIFO work queue with pool-wide termination detection
///
/// Every successful [`Frontier::pop`] hands out a [`Lease`]. While any lease
/// is alive the frontier is not considered exhausted, because its holder may
/// still push children. Dropping the lease, on any exit path, marks the task
/// finished.
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a task and wakes idle workers
    pub fn push(&self, task: Task) {
        self.lock().queue.push_back(task);
        self.notify.notify_waiters();
    }

    /// Appends several tasks, preserving their order
    pub fn extend<I: IntoIterator<Item = Task>>(&self, tasks: I) {
        let pushed = {
            let mut inner = self.lock();
            let before = inner.queue.len();
            inner.queue.extend(tasks);
            inner.queue.len() - before
        };
        if pushed > 0 {
            self.notify.notify_waiters();
        }
    }

    /// Takes the next task, waiting while other workers are still busy
    ///
    /// # Returns
    ///
    /// * `Some(Lease)` - A task to process; drop the lease when done with it
    /// * `None` - The queue is empty and no task is in flight, so the crawl
    ///   is finished
    pub async fn pop(&self) -> Option<Lease<'_>> {
        loop {
            // Registered before the check so a push or release between the
            // check and the await still wakes us.
            let notified = self.notify.notified();

            {
                let mut inner = self.lock();
                if let Some(task) = inner.queue.pop_front() {
                    inner.in_flight += 1;
                    inner.popped += 1;
                    return Some(Lease {
                        frontier: self,
                        task,
                        number: inner.popped,
                    });
                }

                if inner.in_flight == 0 {
                    drop(inner);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    fn release(&self) {
        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    /// Number of tasks waiting in the queue
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Number of tasks handed out and not yet released
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Total number of tasks handed out so far
    pub fn popped(&self) -> u64 {
        self.lock().popped
    }
}

/// A task checked out of the frontier
///
/// Holds the frontier open until dropped.
#[derive(Debug)]
pub struct Lease<'a> {
    frontier: &'a Frontier,
    task: Task,
    number: u64,
}

impl Lease<'_> {
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// 1-based position of this task in hand-out order
    pub fn number(&self) -> u64 {
        self.number
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        self.frontier.release();
    }
}
