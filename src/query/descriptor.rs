//! The parsed, validated representation of one request.

use std::fmt;

use serde::Serialize;

use super::bbox::{BboxSelector, BoundingBox, Polygon};
use super::selector::{ChildKind, Selector};

/// Which entity population a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    Node,
    Way,
    Relation,
    /// Every primitive kind (`*`).
    AnyPrimitive,
    /// Raw contents of a bounding box (`map`), not filtered by predicates.
    MapExtract,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
            Self::AnyPrimitive => "*",
            Self::MapExtract => "map",
        }
    }

    /// Whether a child predicate kind is legal under this entity kind.
    pub fn supports_child(&self, child: ChildKind) -> bool {
        match child {
            ChildKind::WayNode => matches!(self, Self::Way),
            ChildKind::RelationMember => matches!(self, Self::Relation),
            ChildKind::HasTag => true,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested result serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OutputFormat {
    #[default]
    Xml,
    Json,
}

impl OutputFormat {
    /// Parses a format suffix token (`node.json[...]`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "xml" => Some(Self::Xml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xml => "text/xml; charset=utf-8",
            Self::Json => "application/json; charset=utf-8",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed query: entity kind, bounding regions, predicates, format.
///
/// Entries in `other_selectors` are AND-combined; members inside a
/// [`super::SelectorGroup`] are OR-combined. Built once by the parser,
/// immutable thereafter, consumed exactly once by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescriptor {
    kind: EntityKind,
    bbox_selectors: Vec<BboxSelector>,
    other_selectors: Vec<Selector>,
    output_format: OutputFormat,
}

impl QueryDescriptor {
    /// Assembles a descriptor from parsed clauses.
    ///
    /// When bbox clauses coexist with non-bbox predicates, each box is
    /// carried as its polygon form so the datastore can combine region and
    /// predicate filters in one scan.
    pub fn new(
        kind: EntityKind,
        bboxes: Vec<BoundingBox>,
        other_selectors: Vec<Selector>,
        output_format: OutputFormat,
    ) -> Self {
        let bbox_selectors = if other_selectors.is_empty() {
            bboxes.into_iter().map(BboxSelector::Box).collect()
        } else {
            bboxes
                .into_iter()
                .map(|b| BboxSelector::Polygon(Polygon::from_bbox(b)))
                .collect()
        };
        Self {
            kind,
            bbox_selectors,
            other_selectors,
            output_format,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn bbox_selectors(&self) -> &[BboxSelector] {
        &self.bbox_selectors
    }

    pub fn other_selectors(&self) -> &[Selector] {
        &self.other_selectors
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Total number of selectors of either kind.
    pub fn selector_count(&self) -> usize {
        self.bbox_selectors.len() + self.other_selectors.len()
    }

    /// Summed area of all bounding regions, in square degrees.
    pub fn total_bbox_area(&self) -> f64 {
        self.bbox_selectors.iter().map(BboxSelector::area).sum()
    }
}
