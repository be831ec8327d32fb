//! Parse errors for the query grammar.

use thiserror::Error;

/// Result type for query parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// A grammar or escaping violation in the query text.
///
/// Every variant carries a human-readable reason; most carry the byte
/// offset of the offending token in the original text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unknown entity kind {word:?} at offset {offset}")]
    UnknownKind { word: String, offset: usize },

    #[error("unknown output format {token:?} at offset {offset}")]
    UnknownFormat { token: String, offset: usize },

    #[error("unterminated bracket clause starting at offset {offset}")]
    UnterminatedBracket { offset: usize },

    #[error("empty bracket clause at offset {offset}")]
    EmptyBracket { offset: usize },

    #[error("unexpected {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("expected '=' in selector at offset {offset}")]
    ExpectedEquals { offset: usize },

    #[error("empty key in selector at offset {offset}")]
    EmptyKey { offset: usize },

    #[error("empty value in selector at offset {offset}")]
    EmptyValue { offset: usize },

    #[error("wildcard is not a valid token at offset {offset}")]
    MisplacedWildcard { offset: usize },

    #[error("unknown predicate {text:?} at offset {offset}")]
    UnknownPredicate { text: String, offset: usize },

    #[error("attribute selector {attr:?} takes exactly one key and one plain value (offset {offset})")]
    MalformedAttribute { attr: String, offset: usize },

    #[error("attribute value {text:?} at offset {offset} is not an integer")]
    NonNumericAttribute { text: String, offset: usize },

    #[error("invalid bounding box at offset {offset}: {reason}")]
    InvalidBbox { reason: String, offset: usize },

    #[error("invalid number {text:?} at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("child predicate {keyword:?} is not valid for kind {kind:?} (offset {offset})")]
    ChildKindMismatch {
        keyword: String,
        kind: String,
        offset: usize,
    },

    #[error("map queries take exactly one bbox selector")]
    MapRequiresBbox,

    #[error("trailing input at offset {offset}")]
    TrailingInput { offset: usize },
}

impl ParseError {
    /// Byte offset of the offending token, when one applies.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::UnknownKind { offset, .. }
            | Self::UnknownFormat { offset, .. }
            | Self::UnterminatedBracket { offset }
            | Self::EmptyBracket { offset }
            | Self::UnexpectedChar { offset, .. }
            | Self::ExpectedEquals { offset }
            | Self::EmptyKey { offset }
            | Self::EmptyValue { offset }
            | Self::MisplacedWildcard { offset }
            | Self::UnknownPredicate { offset, .. }
            | Self::MalformedAttribute { offset, .. }
            | Self::NonNumericAttribute { offset, .. }
            | Self::InvalidBbox { offset, .. }
            | Self::InvalidNumber { offset, .. }
            | Self::ChildKindMismatch { offset, .. }
            | Self::TrailingInput { offset } => Some(*offset),
            Self::MapRequiresBbox => None,
        }
    }
}
