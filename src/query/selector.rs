//! Selector model: the predicate tree a parsed query is built from.
//!
//! The variant set is closed by the grammar, so selectors are a tagged sum
//! type and every translation boundary matches on it exhaustively. Each
//! selector exposes its ordered "where parameters" for introspection and
//! for datastore filter construction.

use serde::Serialize;

/// One ordered parameter of a selector, as handed to a datastore filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WhereParam {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for WhereParam {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<i64> for WhereParam {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for WhereParam {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl WhereParam {
    /// Returns the string payload, if this parameter is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if this parameter is numeric.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// Structural child predicate kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChildKind {
    /// The way has at least one node member (`nd`). Ways only.
    WayNode,
    /// The relation has at least one relation member (`relation`). Relations only.
    RelationMember,
    /// The entity has at least one tag (`tag`). Any kind.
    HasTag,
}

impl ChildKind {
    /// The grammar keyword for this predicate.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::WayNode => "nd",
            Self::RelationMember => "relation",
            Self::HasTag => "tag",
        }
    }
}

/// A structural predicate, optionally negated (`not(nd)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChildPredicate {
    pub kind: ChildKind,
    pub negated: bool,
}

impl ChildPredicate {
    pub fn new(kind: ChildKind, negated: bool) -> Self {
        Self { kind, negated }
    }
}

/// A single predicate over entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Selector {
    /// Exact key/value tag match.
    Tag { key: String, value: String },
    /// Key present with any value (`key=*`).
    TagWildcard { key: String },
    /// Author user id (`@uid`).
    Uid(i64),
    /// Author user name (`@user`).
    User(String),
    /// Owning changeset id (`@changeset`).
    Changeset(i64),
    /// Structural child predicate.
    Child(ChildPredicate),
    /// OR-combined cluster from one bracket's `|`-separated lists.
    Group(SelectorGroup),
}

impl Selector {
    pub fn tag(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Tag {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn wildcard(key: impl Into<String>) -> Self {
        Self::TagWildcard { key: key.into() }
    }

    /// The ordered where-parameter sequence for this selector.
    ///
    /// Groups concatenate their members' parameters in member order.
    pub fn where_params(&self) -> Vec<WhereParam> {
        match self {
            Self::Tag { key, value } => {
                vec![key.as_str().into(), value.as_str().into()]
            }
            Self::TagWildcard { key } => vec![key.as_str().into()],
            Self::Uid(id) => vec![(*id).into()],
            Self::User(name) => vec![name.as_str().into()],
            Self::Changeset(id) => vec![(*id).into()],
            Self::Child(_) => Vec::new(),
            Self::Group(group) => group.where_params(),
        }
    }

    /// Returns the group payload if this selector is a group.
    pub fn as_group(&self) -> Option<&SelectorGroup> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }
}

/// An ordered sequence of selectors that are OR-combined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorGroup {
    selectors: Vec<Selector>,
}

impl SelectorGroup {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Concatenated where parameters of all members, in member order.
    pub fn where_params(&self) -> Vec<WhereParam> {
        self.selectors
            .iter()
            .flat_map(Selector::where_params)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_where_params() {
        let sel = Selector::tag("amenity", "pub");
        assert_eq!(
            sel.where_params(),
            vec![WhereParam::from("amenity"), WhereParam::from("pub")]
        );
    }

    #[test]
    fn test_wildcard_where_params() {
        let sel = Selector::wildcard("amenity");
        assert_eq!(sel.where_params(), vec![WhereParam::from("amenity")]);
    }

    #[test]
    fn test_child_has_no_where_params() {
        let sel = Selector::Child(ChildPredicate::new(ChildKind::WayNode, true));
        assert!(sel.where_params().is_empty());
    }

    #[test]
    fn test_group_concatenates_member_params() {
        let group = SelectorGroup::new(vec![
            Selector::tag("amenity", "pub"),
            Selector::tag("amenity", "restaurant"),
        ]);
        let params = Selector::Group(group).where_params();
        assert_eq!(params.len(), 4);
        assert_eq!(params[0].as_str(), Some("amenity"));
        assert_eq!(params[3].as_str(), Some("restaurant"));
    }

    #[test]
    fn test_numeric_params() {
        assert_eq!(Selector::Uid(42).where_params(), vec![WhereParam::Int(42)]);
        assert_eq!(
            Selector::Changeset(7).where_params(),
            vec![WhereParam::Int(7)]
        );
    }
}
