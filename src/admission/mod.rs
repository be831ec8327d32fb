//! # Admission Control
//!
//! Process-wide registry of in-flight `(query text, origin)` pairs plus
//! per-request phase statistics.
//!
//! A client hammering the same URL must not pile up redundant expensive
//! datastore scans: a duplicate concurrent submission is failed
//! immediately, never queued or retried.

mod errors;
mod registry;
mod stats;

pub use errors::{AdmissionError, AdmissionResult};
pub use registry::{AdmissionRegistry, AdmissionTicket};
pub use stats::QueryStats;
