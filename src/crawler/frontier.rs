//! Crawl frontier and visited set
//!
//! This module handles:
//! - FIFO queueing of discovered targets (breadth-first order)
//! - Deduplication against queued and already-visited targets
//! - The optional same-origin restriction
//! - The per-session page bound

use crate::url::{same_origin, CrawlTarget};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// What happened to a target offered to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the tail of the queue
    Enqueued,
    /// Already queued or already visited
    Duplicate,
    /// Rejected by the same-origin policy
    OffOrigin,
}

/// FIFO queue of pending targets plus the set of visited ones
///
/// A target is marked visited when it is dequeued, not when it is queued.
/// Duplicates offered while the target is still pending are absorbed by the
/// queued set.
#[derive(Debug)]
pub struct Frontier {
    /// Pending targets in discovery order
    queue: VecDeque<CrawlTarget>,

    /// Mirror of `queue` for O(1) membership checks
    queued: HashSet<CrawlTarget>,

    /// Targets already handed out by `dequeue`
    visited: HashSet<CrawlTarget>,

    /// Origin every target must share, if restricted
    origin: Option<Url>,

    /// Maximum number of targets handed out
    max_pages: usize,

    /// Number of targets handed out so far
    dequeued: usize,
}

impl Frontier {
    /// Creates a frontier holding only the seed
    ///
    /// # Arguments
    ///
    /// * `seed` - The first target; always accepted
    /// * `max_pages` - Maximum number of targets `dequeue` will hand out
    /// * `same_origin_only` - Restrict later targets to the seed's host and port
    pub fn new(seed: CrawlTarget, max_pages: usize, same_origin_only: bool) -> Self {
        let origin = same_origin_only.then(|| seed.as_url().clone());

        let mut frontier = Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            origin,
            max_pages,
            dequeued: 0,
        };
        frontier.push(seed);
        frontier
    }

    /// Offers a discovered target to the frontier
    pub fn enqueue(&mut self, target: CrawlTarget) -> EnqueueOutcome {
        if let Some(origin) = &self.origin {
            if !same_origin(origin, target.as_url()) {
                return EnqueueOutcome::OffOrigin;
            }
        }

        if self.visited.contains(&target) || self.queued.contains(&target) {
            return EnqueueOutcome::Duplicate;
        }

        self.push(target);
        EnqueueOutcome::Enqueued
    }

    fn push(&mut self, target: CrawlTarget) {
        self.queued.insert(target.clone());
        self.queue.push_back(target);
    }

    /// Pops the next target and marks it visited
    ///
    /// # Returns
    ///
    /// * `Some(CrawlTarget)` - The oldest pending target
    /// * `None` - The queue is empty or the page bound has been reached
    pub fn dequeue(&mut self) -> Option<CrawlTarget> {
        if self.bound_reached() {
            return None;
        }

        let target = self.queue.pop_front()?;
        self.queued.remove(&target);
        self.visited.insert(target.clone());
        self.dequeued += 1;

        Some(target)
    }

    /// Returns true once the page bound has been reached
    pub fn bound_reached(&self) -> bool {
        self.dequeued >= self.max_pages
    }

    /// Returns true if `dequeue` will hand out nothing more
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty() || self.bound_reached()
    }

    /// Number of pending targets
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of targets handed out so far
    pub fn dequeued(&self) -> usize {
        self.dequeued
    }

    /// Returns true if the target has already been handed out
    pub fn is_visited(&self, target: &CrawlTarget) -> bool {
        self.visited.contains(target)
    }
}
