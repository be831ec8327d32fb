//! Per-request timing and outcome statistics.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Terminal status of a tracked request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    InFlight,
    Complete,
    Error(String),
}

/// Phase timestamps and counters for one request.
///
/// Created at admission, mutated by the orchestration flow as phases
/// transition, finalized exactly once at completion or on the first
/// error. Owned by the request; never shared.
#[derive(Debug, Clone)]
pub struct QueryStats {
    request_id: Uuid,
    query: Option<String>,
    origin: Option<String>,
    received_at: DateTime<Utc>,
    db_started_at: Option<DateTime<Utc>>,
    serialization_started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    entity_count: u64,
    outcome: Outcome,
}

impl QueryStats {
    /// Starts tracking a request that has just arrived.
    pub fn begin() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            query: None,
            origin: None,
            received_at: Utc::now(),
            db_started_at: None,
            serialization_started_at: None,
            completed_at: None,
            entity_count: 0,
            outcome: Outcome::InFlight,
        }
    }

    /// Records the raw query text and its origin.
    pub fn received_query(&mut self, query: &str, origin: &str) {
        self.query = Some(query.to_string());
        self.origin = Some(origin.to_string());
    }

    /// Marks the start of datastore iteration.
    pub fn start_db_query(&mut self) {
        self.db_started_at = Some(Utc::now());
    }

    /// Marks the start of result serialization.
    pub fn start_serialization(&mut self) {
        self.serialization_started_at = Some(Utc::now());
    }

    /// Records how many entities were streamed.
    pub fn entities_serialized(&mut self, count: u64) {
        self.entity_count = count;
    }

    /// Finalizes the request as successful.
    pub fn complete(&mut self) {
        if self.outcome == Outcome::InFlight {
            self.outcome = Outcome::Complete;
            self.completed_at = Some(Utc::now());
        }
    }

    /// Finalizes the request as failed. The first recorded error wins.
    pub fn error(&mut self, cause: impl Into<String>) {
        if self.outcome == Outcome::InFlight {
            self.outcome = Outcome::Error(cause.into());
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn entity_count(&self) -> u64 {
        self.entity_count
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }

    pub fn error_cause(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Error(cause) => Some(cause),
            _ => None,
        }
    }

    /// Milliseconds spent in datastore iteration, once serialization began.
    pub fn db_millis(&self) -> Option<i64> {
        let start = self.db_started_at?;
        let end = self.serialization_started_at.or(self.completed_at)?;
        Some((end - start).num_milliseconds())
    }

    /// Milliseconds spent serializing, once the request finished.
    pub fn serialization_millis(&self) -> Option<i64> {
        let start = self.serialization_started_at?;
        let end = self.completed_at?;
        Some((end - start).num_milliseconds())
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        let mut stats = QueryStats::begin();
        stats.received_query("node[tag]", "10.0.0.1");
        stats.start_db_query();
        stats.start_serialization();
        stats.entities_serialized(12);
        stats.complete();

        assert_eq!(stats.query(), Some("node[tag]"));
        assert_eq!(stats.origin(), Some("10.0.0.1"));
        assert_eq!(stats.entity_count(), 12);
        assert!(!stats.is_error());
        assert!(stats.db_millis().is_some());
        assert!(stats.serialization_millis().is_some());
    }

    #[test]
    fn test_first_terminal_state_wins() {
        let mut stats = QueryStats::begin();
        stats.error("boom");
        stats.complete();
        stats.error("later");
        assert!(stats.is_error());
        assert_eq!(stats.error_cause(), Some("boom"));
    }

    #[test]
    fn test_durations_absent_until_phases_run() {
        let stats = QueryStats::begin();
        assert!(stats.db_millis().is_none());
        assert!(stats.serialization_millis().is_none());
    }
}
