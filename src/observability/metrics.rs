//! Metrics registry.
//!
//! - Counters only
//! - Monotonic increase, reset on process start
//! - Thread-safe but lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for the query service.
///
/// All counters use atomic operations with Relaxed ordering; eventual
/// consistency is fine for metrics.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Requests that reached the handler
    queries_received: AtomicU64,
    /// Requests that passed admission
    queries_admitted: AtomicU64,
    /// Requests rejected as concurrent duplicates
    duplicates_rejected: AtomicU64,
    /// Requests whose query text failed to parse
    parse_failures: AtomicU64,
    /// Requests that streamed to completion
    queries_completed: AtomicU64,
    /// Requests that failed during execution or streaming
    queries_failed: AtomicU64,
    /// Entities written across all responses
    entities_streamed: AtomicU64,
}

/// Snapshot of all counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_received: u64,
    pub queries_admitted: u64,
    pub duplicates_rejected: u64,
    pub parse_failures: u64,
    pub queries_completed: u64,
    pub queries_failed: u64,
    pub entities_streamed: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_received(&self) {
        self.queries_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_admitted(&self) {
        self.queries_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_duplicates_rejected(&self) {
        self.duplicates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_parse_failures(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_completed(&self) {
        self.queries_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_entities_streamed(&self, count: u64) {
        self.entities_streamed.fetch_add(count, Ordering::Relaxed);
    }

    /// Reads every counter at once.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_received: self.queries_received.load(Ordering::Relaxed),
            queries_admitted: self.queries_admitted.load(Ordering::Relaxed),
            duplicates_rejected: self.duplicates_rejected.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            queries_completed: self.queries_completed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            entities_streamed: self.entities_streamed.load(Ordering::Relaxed),
        }
    }
}
