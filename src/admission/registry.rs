//! In-flight request registry.
//!
//! The registry is the only mutable state shared across requests. All
//! mutation happens under one mutex: the duplicate check and the insert
//! are a single atomic step, and removal is guaranteed exactly once by
//! the ticket's drop guard.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::{AdmissionError, AdmissionResult};

type QueryKey = (String, String);
type SharedSet = Arc<Mutex<HashSet<QueryKey>>>;

/// Process-wide set of currently executing `(query, origin)` pairs.
#[derive(Debug, Clone, Default)]
pub struct AdmissionRegistry {
    in_flight: SharedSet,
}

fn lock(set: &SharedSet) -> MutexGuard<'_, HashSet<QueryKey>> {
    // A panic while holding this lock leaves only a plain set behind, so
    // a poisoned guard is still safe to reuse.
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AdmissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a request, or rejects it as a duplicate.
    ///
    /// Check-and-insert is atomic with respect to the registry; two
    /// concurrent identical submissions can never both succeed. The
    /// returned ticket removes the pair exactly once, on drop or on an
    /// explicit [`AdmissionTicket::release`].
    pub fn admit(&self, query: &str, origin: &str) -> AdmissionResult<AdmissionTicket> {
        let key = (query.to_string(), origin.to_string());
        let mut guard = lock(&self.in_flight);
        if !guard.insert(key.clone()) {
            return Err(AdmissionError::Duplicate {
                query: key.0,
                origin: key.1,
            });
        }
        drop(guard);
        Ok(AdmissionTicket {
            registry: Arc::clone(&self.in_flight),
            key: Some(key),
        })
    }

    /// Whether the pair is currently executing.
    pub fn is_running(&self, query: &str, origin: &str) -> bool {
        lock(&self.in_flight).contains(&(query.to_string(), origin.to_string()))
    }

    /// Number of in-flight requests.
    pub fn active_count(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

/// Proof of admission for one request.
///
/// Dropping the ticket (on any exit path, including panics in the owning
/// request) removes the pair from the registry. Releasing twice is a
/// no-op.
#[derive(Debug)]
pub struct AdmissionTicket {
    registry: SharedSet,
    key: Option<QueryKey>,
}

impl AdmissionTicket {
    /// Explicitly releases the pair. Equivalent to dropping the ticket.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(key) = self.key.take() {
            lock(&self.registry).remove(&key);
        }
    }
}

impl Drop for AdmissionTicket {
    fn drop(&mut self) {
        self.remove();
    }
}
