//! geoserve - a read-only spatial entity query server
//!
//! Parses a selector-algebra query language, admits one identical
//! request per origin at a time, dispatches to an abstract datastore
//! and streams the result set in XML or JSON, optionally gzipped.

pub mod admission;
pub mod cli;
pub mod datastore;
pub mod exec;
pub mod observability;
pub mod output;
pub mod query;
pub mod server;
