//! # Query Language
//!
//! The textual query grammar and its parsed representation.
//!
//! A query names an entity kind followed by zero or more bracket clauses,
//! each contributing a bounding box or a (possibly OR-grouped) predicate:
//!
//! ```text
//! node[amenity=pub|restaurant][bbox=-91.5,44.7,-91.3,44.8]
//! way[not(nd)]
//! map?bbox=-91.5,44.7,-91.3,44.8
//! ```
//!
//! Parsing is pure and deterministic: identical input always yields a
//! structurally identical [`QueryDescriptor`].

mod bbox;
mod descriptor;
mod errors;
mod parser;
mod selector;

pub use bbox::{BboxSelector, BoundingBox, Polygon};
pub use descriptor::{EntityKind, OutputFormat, QueryDescriptor};
pub use errors::{ParseError, ParseResult};
pub use parser::parse;
pub use selector::{ChildKind, ChildPredicate, Selector, SelectorGroup, WhereParam};
