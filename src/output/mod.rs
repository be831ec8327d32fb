//! # Output Pipeline
//!
//! Streams entities through a format-specific encoder into a byte sink,
//! with optional gzip compression wrapped in before the first byte flows.

mod errors;
mod formats;
mod json;
mod pipeline;
mod xml;

pub use errors::{OutputError, OutputResult};
pub use formats::{DefaultFormatRegistry, EmptyFormatRegistry, EntitySink, FormatRegistry};
pub use json::JsonSink;
pub use pipeline::{stream_entities, Compression};
pub use xml::XmlSink;
