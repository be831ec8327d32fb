//! # Observability
//!
//! Structured JSON logging and an atomic counter registry for the
//! query service's operational events.

mod logger;
mod metrics;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
