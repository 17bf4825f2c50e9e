//! Shared work frontier for the crawl worker pool
//!
//! The frontier is a FIFO queue paired with a seen-set. A URL enters the
//! queue at most once per crawl, no matter how many pages link to it.
//! Completion is tracked by an unfinished-work counter: every dequeued
//! [`Job::Visit`] must be acknowledged with [`Frontier::task_done`], and the
//! crawl is drained when the counter reaches zero.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use url::Url;

/// A unit of work handed to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Fetch and process this URL
    Visit(Url),
    /// Exit the worker loop
    Stop,
}

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<Job>,
    seen: HashSet<String>,
    unfinished: usize,
}

/// FIFO work queue with deduplication and drain detection
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<State>,
    available: Notify,
    drained: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a URL as seen without enqueueing it
    ///
    /// Returns true if the URL was not seen before.
    pub fn mark_seen(&self, url: &Url) -> bool {
        self.lock().seen.insert(url.as_str().to_string())
    }

    /// Enqueues a URL unless it was seen before
    ///
    /// The seen check and the insert happen under one lock, so two workers
    /// discovering the same link concurrently enqueue it once.
    ///
    /// # Returns
    ///
    /// * `true` - The URL was new and has been enqueued
    /// * `false` - The URL was already seen
    pub fn push(&self, url: Url) -> bool {
        {
            let mut state = self.lock();
            if !state.seen.insert(url.as_str().to_string()) {
                return false;
            }
            state.unfinished += 1;
            state.queue.push_back(Job::Visit(url));
        }
        self.available.notify_one();
        true
    }

    /// Enqueues every URL, returning how many were new
    pub fn extend<I>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = Url>,
    {
        urls.into_iter().filter(|url| self.push(url.clone())).count()
    }

    /// Enqueues one stop sentinel per worker
    pub fn stop(&self, workers: usize) {
        {
            let mut state = self.lock();
            for _ in 0..workers {
                state.queue.push_back(Job::Stop);
            }
        }
        self.available.notify_waiters();
        for _ in 0..workers {
            self.available.notify_one();
        }
    }

    /// Takes the next job without waiting
    pub fn try_next(&self) -> Option<Job> {
        self.lock().queue.pop_front()
    }

    /// Waits for the next job
    pub async fn next(&self) -> Job {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(job) = self.try_next() {
                return job;
            }

            notified.await;
        }
    }

    /// Acknowledges a finished [`Job::Visit`]
    pub fn task_done(&self) {
        let finished = {
            let mut state = self.lock();
            state.unfinished = state.unfinished.saturating_sub(1);
            state.unfinished == 0
        };
        if finished {
            self.drained.notify_waiters();
        }
    }

    /// Number of enqueued visits not yet acknowledged
    pub fn unfinished(&self) -> usize {
        self.lock().unfinished
    }

    /// Returns true when no visit is queued or in progress
    pub fn is_drained(&self) -> bool {
        self.unfinished() == 0
    }

    /// Number of distinct URLs seen so far
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    /// Waits until every enqueued visit has been acknowledged
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_drained() {
                return;
            }

            notified.await;
        }
    }
}
