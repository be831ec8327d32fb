//! # OSM XML Encoder
//!
//! Renders entities as an OSM 0.6 XML document. The document header
//! is written lazily so that a stream which fails before producing
//! any entity does not emit a well-formed empty document.

use std::io::Write;

use crate::datastore::{Entity, EntityInfo, Node, Relation, Way};
use crate::output::errors::OutputResult;
use crate::output::formats::EntitySink;

const GENERATOR: &str = concat!("geoserve ", env!("CARGO_PKG_VERSION"));

/// Streaming OSM XML writer.
pub struct XmlSink<W: Write> {
    writer: W,
    header_written: bool,
}

impl<W: Write> XmlSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
        }
    }

    fn ensure_header(&mut self) -> OutputResult<()> {
        if !self.header_written {
            writeln!(self.writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
            writeln!(
                self.writer,
                "<osm version=\"0.6\" generator=\"{}\">",
                escape(GENERATOR)
            )?;
            self.header_written = true;
        }
        Ok(())
    }

    fn write_info(&mut self, info: &EntityInfo) -> OutputResult<()> {
        if info.uid != 0 {
            write!(self.writer, " uid=\"{}\"", info.uid)?;
        }
        if !info.user.is_empty() {
            write!(self.writer, " user=\"{}\"", escape(&info.user))?;
        }
        if info.changeset != 0 {
            write!(self.writer, " changeset=\"{}\"", info.changeset)?;
        }
        if let Some(timestamp) = &info.timestamp {
            write!(
                self.writer,
                " timestamp=\"{}\"",
                timestamp.format("%Y-%m-%dT%H:%M:%SZ")
            )?;
        }
        Ok(())
    }

    fn write_tags(
        &mut self,
        tags: &std::collections::BTreeMap<String, String>,
    ) -> OutputResult<()> {
        for (key, value) in tags {
            writeln!(
                self.writer,
                "  <tag k=\"{}\" v=\"{}\"/>",
                escape(key),
                escape(value)
            )?;
        }
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> OutputResult<()> {
        write!(
            self.writer,
            "<node id=\"{}\" lat=\"{}\" lon=\"{}\"",
            node.id, node.lat, node.lon
        )?;
        self.write_info(&node.info)?;
        if node.tags.is_empty() {
            writeln!(self.writer, "/>")?;
        } else {
            writeln!(self.writer, ">")?;
            self.write_tags(&node.tags)?;
            writeln!(self.writer, "</node>")?;
        }
        Ok(())
    }

    fn write_way(&mut self, way: &Way) -> OutputResult<()> {
        write!(self.writer, "<way id=\"{}\"", way.id)?;
        self.write_info(&way.info)?;
        writeln!(self.writer, ">")?;
        for node_ref in &way.nodes {
            writeln!(self.writer, "  <nd ref=\"{node_ref}\"/>")?;
        }
        self.write_tags(&way.tags)?;
        writeln!(self.writer, "</way>")?;
        Ok(())
    }

    fn write_relation(&mut self, relation: &Relation) -> OutputResult<()> {
        write!(self.writer, "<relation id=\"{}\"", relation.id)?;
        self.write_info(&relation.info)?;
        writeln!(self.writer, ">")?;
        for member in &relation.members {
            writeln!(
                self.writer,
                "  <member type=\"{}\" ref=\"{}\" role=\"{}\"/>",
                member.member_type.as_str(),
                member.member_ref,
                escape(&member.role)
            )?;
        }
        self.write_tags(&relation.tags)?;
        writeln!(self.writer, "</relation>")?;
        Ok(())
    }
}

impl<W: Write> EntitySink for XmlSink<W> {
    fn process(&mut self, entity: &Entity) -> OutputResult<()> {
        self.ensure_header()?;
        match entity {
            Entity::Node(node) => self.write_node(node),
            Entity::Way(way) => self.write_way(way),
            Entity::Relation(relation) => self.write_relation(relation),
        }
    }

    fn complete(&mut self) -> OutputResult<()> {
        self.ensure_header()?;
        writeln!(self.writer, "</osm>")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Escapes XML attribute content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
