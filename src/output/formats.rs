//! # Format Registry
//!
//! Maps an output format to an encoder over an arbitrary byte sink.
//! The registry is consulted before execution starts so that an
//! unsupported format is rejected before any datastore work happens.

use std::io::Write;

use crate::datastore::Entity;
use crate::output::errors::{OutputError, OutputResult};
use crate::output::json::JsonSink;
use crate::output::xml::XmlSink;
use crate::query::OutputFormat;

/// Receives entities one at a time and renders them to the underlying
/// byte sink. `complete` must be called exactly once after the last
/// entity; dropping a sink without completing it leaves the output
/// document unterminated, which is the desired signal for a stream
/// that failed partway.
pub trait EntitySink {
    /// Renders a single entity.
    fn process(&mut self, entity: &Entity) -> OutputResult<()>;

    /// Finishes the document and flushes buffered bytes.
    fn complete(&mut self) -> OutputResult<()>;
}

/// Creates encoders for output formats.
pub trait FormatRegistry: Send + Sync {
    /// Whether an encoder exists for `format`.
    fn has_encoder(&self, format: OutputFormat) -> bool;

    /// Builds an encoder writing to `sink`, or fails if the format is
    /// not registered.
    fn encoder_for<'a>(
        &self,
        format: OutputFormat,
        sink: Box<dyn Write + 'a>,
    ) -> OutputResult<Box<dyn EntitySink + 'a>>;
}

/// Registry wiring the built-in XML and JSON encoders.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFormatRegistry;

impl FormatRegistry for DefaultFormatRegistry {
    fn has_encoder(&self, format: OutputFormat) -> bool {
        matches!(format, OutputFormat::Xml | OutputFormat::Json)
    }

    fn encoder_for<'a>(
        &self,
        format: OutputFormat,
        sink: Box<dyn Write + 'a>,
    ) -> OutputResult<Box<dyn EntitySink + 'a>> {
        match format {
            OutputFormat::Xml => Ok(Box::new(XmlSink::new(sink))),
            OutputFormat::Json => Ok(Box::new(JsonSink::new(sink))),
        }
    }
}

/// Registry with no encoders at all, for exercising rejection paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyFormatRegistry;

impl FormatRegistry for EmptyFormatRegistry {
    fn has_encoder(&self, _format: OutputFormat) -> bool {
        false
    }

    fn encoder_for<'a>(
        &self,
        format: OutputFormat,
        _sink: Box<dyn Write + 'a>,
    ) -> OutputResult<Box<dyn EntitySink + 'a>> {
        Err(OutputError::NoEncoder(format))
    }
}
