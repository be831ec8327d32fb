//! # Execution Orchestration
//!
//! Turns a parsed descriptor into a live entity stream: cross-cutting
//! policy checks first, then dispatch to the matching datastore
//! iteration capability.

mod errors;
mod orchestrator;

pub use errors::{ExecError, ExecResult};
pub use orchestrator::{execute, open_stream, validate, ExecPolicy};
