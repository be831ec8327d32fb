//! # JSON Encoder
//!
//! Renders entities as an OSM-style JSON document with a single
//! `elements` array, one object per entity, serialized with serde.

use std::io::Write;

use crate::datastore::Entity;
use crate::output::errors::OutputResult;
use crate::output::formats::EntitySink;

/// Streaming JSON writer.
pub struct JsonSink<W: Write> {
    writer: W,
    header_written: bool,
    element_count: u64,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
            element_count: 0,
        }
    }

    fn ensure_header(&mut self) -> OutputResult<()> {
        if !self.header_written {
            write!(
                self.writer,
                "{{\"version\":0.6,\"generator\":\"geoserve {}\",\"elements\":[",
                env!("CARGO_PKG_VERSION")
            )?;
            self.header_written = true;
        }
        Ok(())
    }
}

impl<W: Write> EntitySink for JsonSink<W> {
    fn process(&mut self, entity: &Entity) -> OutputResult<()> {
        self.ensure_header()?;
        if self.element_count > 0 {
            self.writer.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.writer, entity)?;
        self.element_count += 1;
        Ok(())
    }

    fn complete(&mut self) -> OutputResult<()> {
        self.ensure_header()?;
        self.writer.write_all(b"]}")?;
        self.writer.flush()?;
        Ok(())
    }
}
