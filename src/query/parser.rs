//! Single-pass parser for the textual query grammar.
//!
//! The scanner walks the input character by character with an explicit
//! backslash-escape state, so structural `| = [ ] *` occurrences are never
//! confused with escaped literal ones. Parsing performs no I/O and carries
//! no state between calls.

use super::bbox::BoundingBox;
use super::descriptor::{EntityKind, OutputFormat, QueryDescriptor};
use super::errors::{ParseError, ParseResult};
use super::selector::{ChildKind, ChildPredicate, Selector, SelectorGroup};

/// Parses query text into a validated descriptor.
///
/// Grammar violations, escaping violations, malformed bounding boxes and
/// illegal child-predicate/kind combinations all fail here; the
/// zero-selector rule is descriptor-level validation left to the
/// orchestrator, because multiple brackets accumulate.
pub fn parse(text: &str) -> ParseResult<QueryDescriptor> {
    Parser::new(text).parse_query()
}

/// One `|`/`=`-delimited token of a bracket body, escapes resolved.
#[derive(Debug)]
struct Piece {
    text: String,
    offset: usize,
    /// Count of unescaped `*` characters.
    stars: usize,
    had_escape: bool,
    /// First character was an unescaped `@`.
    leading_at: bool,
    /// First unescaped parenthesis, if any.
    paren: Option<(usize, char)>,
}

impl Piece {
    fn new(offset: usize) -> Self {
        Self {
            text: String::new(),
            offset,
            stars: 0,
            had_escape: false,
            leading_at: false,
            paren: None,
        }
    }

    /// A lone unescaped `*`.
    fn is_wildcard(&self) -> bool {
        self.stars == 1 && self.text == "*"
    }
}

/// A bracket-body separator: `|` or `=`, with its byte offset.
#[derive(Debug, Clone, Copy)]
struct Sep {
    ch: char,
    offset: usize,
}

/// What one bracket clause contributed.
enum Clause {
    Bbox(BoundingBox),
    Selector(Selector),
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.src.len(), |&(off, _)| off)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let item = self.chars.get(self.pos).copied();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    /// Reads a bare word: characters up to `[`, `.`, `?` or end of input.
    fn read_word(&mut self) -> (usize, String) {
        let start = self.offset();
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, '[' | '.' | '?') {
                break;
            }
            word.push(c);
            self.pos += 1;
        }
        (start, word)
    }

    fn parse_query(mut self) -> ParseResult<QueryDescriptor> {
        let (kind_offset, kind_word) = self.read_word();
        let kind = match kind_word.as_str() {
            "node" => EntityKind::Node,
            "way" => EntityKind::Way,
            "relation" => EntityKind::Relation,
            "*" => EntityKind::AnyPrimitive,
            "map" => EntityKind::MapExtract,
            _ => {
                return Err(ParseError::UnknownKind {
                    word: kind_word,
                    offset: kind_offset,
                })
            }
        };

        let format = self.parse_format_suffix()?;

        let mut bboxes: Vec<BoundingBox> = Vec::new();
        let mut others: Vec<Selector> = Vec::new();

        if self.peek() == Some('?') {
            // The original URL form: map?bbox=l,b,r,t
            let q_offset = self.offset();
            if kind != EntityKind::MapExtract {
                return Err(ParseError::UnexpectedChar {
                    ch: '?',
                    offset: q_offset,
                });
            }
            self.bump();
            bboxes.push(self.parse_query_string_bbox()?);
        } else {
            while self.peek() == Some('[') {
                match self.parse_bracket(kind)? {
                    Clause::Bbox(bbox) => bboxes.push(bbox),
                    Clause::Selector(sel) => others.push(sel),
                }
            }
        }

        if self.peek().is_some() {
            return Err(ParseError::TrailingInput {
                offset: self.offset(),
            });
        }

        if kind == EntityKind::MapExtract && bboxes.len() != 1 {
            return Err(ParseError::MapRequiresBbox);
        }

        Ok(QueryDescriptor::new(kind, bboxes, others, format))
    }

    /// Optional `.xml` / `.json` suffix on the kind clause.
    fn parse_format_suffix(&mut self) -> ParseResult<OutputFormat> {
        if self.peek() != Some('.') {
            return Ok(OutputFormat::default());
        }
        self.bump();
        let (offset, token) = self.read_word();
        OutputFormat::from_token(&token).ok_or(ParseError::UnknownFormat { token, offset })
    }

    /// The `bbox=l,b,r,t` remainder after `map?`.
    fn parse_query_string_bbox(&mut self) -> ParseResult<BoundingBox> {
        let offset = self.offset();
        let rest: String = self.chars[self.pos..].iter().map(|&(_, c)| c).collect();
        self.pos = self.chars.len();
        let numbers = rest.strip_prefix("bbox=").ok_or_else(|| {
            ParseError::UnknownPredicate {
                text: rest.clone(),
                offset,
            }
        })?;
        parse_bbox_numbers(numbers, offset + "bbox=".len())
    }

    /// One `[...]` clause. The opening bracket has not been consumed yet.
    fn parse_bracket(&mut self, kind: EntityKind) -> ParseResult<Clause> {
        let open_offset = self.offset();
        self.bump(); // '['
        let (pieces, seps) = self.scan_bracket_body(open_offset)?;

        let eq_index = seps.iter().position(|s| s.ch == '=');
        if let Some(second) = seps
            .iter()
            .enumerate()
            .find(|(i, s)| s.ch == '=' && Some(*i) != eq_index)
        {
            return Err(ParseError::UnexpectedChar {
                ch: '=',
                offset: second.1.offset,
            });
        }

        match eq_index {
            None => {
                if pieces.len() > 1 {
                    return Err(ParseError::ExpectedEquals {
                        offset: seps[0].offset,
                    });
                }
                let piece = &pieces[0];
                if piece.text.is_empty() {
                    return Err(ParseError::EmptyBracket {
                        offset: open_offset,
                    });
                }
                self.parse_child_clause(kind, piece).map(Clause::Selector)
            }
            Some(eq) => {
                let keys = &pieces[..=eq];
                let values = &pieces[eq + 1..];
                if keys.len() == 1
                    && keys[0].text == "bbox"
                    && !keys[0].had_escape
                    && !keys[0].leading_at
                {
                    return self.parse_bbox_clause(values).map(Clause::Bbox);
                }
                self.parse_attr_clause(kind, keys, values)
                    .map(Clause::Selector)
            }
        }
    }

    /// Scans a bracket body into pieces and separators, resolving escapes,
    /// until the unescaped closing bracket.
    fn scan_bracket_body(&mut self, open_offset: usize) -> ParseResult<(Vec<Piece>, Vec<Sep>)> {
        let mut pieces = vec![Piece::new(self.offset())];
        let mut seps: Vec<Sep> = Vec::new();

        loop {
            let Some((offset, c)) = self.bump() else {
                return Err(ParseError::UnterminatedBracket {
                    offset: open_offset,
                });
            };
            let piece = pieces.last_mut().expect("piece list is never empty");
            match c {
                ']' => break,
                '\\' => {
                    let Some((_, escaped)) = self.bump() else {
                        return Err(ParseError::UnterminatedBracket {
                            offset: open_offset,
                        });
                    };
                    piece.had_escape = true;
                    piece.text.push(escaped);
                }
                '|' | '=' => {
                    seps.push(Sep { ch: c, offset });
                    pieces.push(Piece::new(self.offset()));
                }
                '*' => {
                    piece.stars += 1;
                    piece.text.push('*');
                }
                '[' => {
                    return Err(ParseError::UnexpectedChar { ch: '[', offset });
                }
                '(' | ')' => {
                    if piece.paren.is_none() {
                        piece.paren = Some((offset, c));
                    }
                    piece.text.push(c);
                }
                _ => {
                    if piece.text.is_empty() && c == '@' {
                        piece.leading_at = true;
                    }
                    piece.text.push(c);
                }
            }
        }
        Ok((pieces, seps))
    }

    /// A bare bracket body with no `=`: a structural child predicate.
    fn parse_child_clause(&self, kind: EntityKind, piece: &Piece) -> ParseResult<Selector> {
        let unknown = || ParseError::UnknownPredicate {
            text: piece.text.clone(),
            offset: piece.offset,
        };
        if piece.had_escape || piece.stars > 0 || piece.leading_at {
            return Err(unknown());
        }

        let (keyword, negated) = match piece
            .text
            .strip_prefix("not(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) => (inner, true),
            None => (piece.text.as_str(), false),
        };

        let child = match keyword {
            "nd" => ChildKind::WayNode,
            "relation" => ChildKind::RelationMember,
            "tag" => ChildKind::HasTag,
            _ => return Err(unknown()),
        };

        if !kind.supports_child(child) {
            return Err(ParseError::ChildKindMismatch {
                keyword: keyword.to_string(),
                kind: kind.as_str().to_string(),
                offset: piece.offset,
            });
        }
        Ok(Selector::Child(ChildPredicate::new(child, negated)))
    }

    /// A `bbox=l,b,r,t` bracket clause.
    fn parse_bbox_clause(&self, values: &[Piece]) -> ParseResult<BoundingBox> {
        if values.len() != 1 {
            return Err(ParseError::InvalidBbox {
                reason: "expected four comma-separated numbers".to_string(),
                offset: values[0].offset,
            });
        }
        let value = &values[0];
        if value.stars > 0 || value.had_escape {
            return Err(ParseError::InvalidBbox {
                reason: "expected four comma-separated numbers".to_string(),
                offset: value.offset,
            });
        }
        parse_bbox_numbers(&value.text, value.offset)
    }

    /// A `key-list = value-list` bracket clause.
    fn parse_attr_clause(
        &self,
        kind: EntityKind,
        keys: &[Piece],
        values: &[Piece],
    ) -> ParseResult<Selector> {
        debug_assert!(!keys.is_empty() && !values.is_empty());
        let _ = kind;

        for key in keys {
            if key.text.is_empty() {
                return Err(ParseError::EmptyKey { offset: key.offset });
            }
            if key.stars > 0 {
                return Err(ParseError::MisplacedWildcard { offset: key.offset });
            }
            if let Some((offset, ch)) = key.paren {
                return Err(ParseError::UnexpectedChar { ch, offset });
            }
        }

        if keys.iter().any(|k| k.leading_at) {
            return self.parse_attribute_selector(keys, values);
        }

        // Wildcard value: legal only as the sole value.
        if let Some(star) = values.iter().find(|v| v.is_wildcard()) {
            if values.len() != 1 {
                return Err(ParseError::MisplacedWildcard {
                    offset: star.offset,
                });
            }
            let group = keys
                .iter()
                .map(|k| Selector::wildcard(k.text.clone()))
                .collect();
            return Ok(Selector::Group(SelectorGroup::new(group)));
        }

        let mut members = Vec::with_capacity(keys.len() * values.len());
        for key in keys {
            for value in values {
                if value.text.is_empty() {
                    return Err(ParseError::EmptyValue {
                        offset: value.offset,
                    });
                }
                if value.stars > 0 {
                    return Err(ParseError::MisplacedWildcard {
                        offset: value.offset,
                    });
                }
                if let Some((offset, ch)) = value.paren {
                    return Err(ParseError::UnexpectedChar { ch, offset });
                }
                members.push(Selector::tag(key.text.clone(), value.text.clone()));
            }
        }
        Ok(Selector::Group(SelectorGroup::new(members)))
    }

    /// `@uid`, `@user` and `@changeset` selectors: one key, one plain value.
    fn parse_attribute_selector(
        &self,
        keys: &[Piece],
        values: &[Piece],
    ) -> ParseResult<Selector> {
        let key = &keys[0];
        let malformed = || ParseError::MalformedAttribute {
            attr: key.text.clone(),
            offset: key.offset,
        };
        if keys.len() > 1 || values.len() > 1 {
            return Err(malformed());
        }
        let value = &values[0];
        if value.text.is_empty() {
            return Err(ParseError::EmptyValue {
                offset: value.offset,
            });
        }
        if value.stars > 0 {
            return Err(malformed());
        }

        match key.text.as_str() {
            "@uid" => {
                let id = parse_attr_int(value)?;
                Ok(Selector::Uid(id))
            }
            "@changeset" => {
                let id = parse_attr_int(value)?;
                Ok(Selector::Changeset(id))
            }
            "@user" => Ok(Selector::User(value.text.clone())),
            _ => Err(ParseError::UnknownPredicate {
                text: key.text.clone(),
                offset: key.offset,
            }),
        }
    }
}

fn parse_attr_int(value: &Piece) -> ParseResult<i64> {
    value
        .text
        .parse::<i64>()
        .map_err(|_| ParseError::NonNumericAttribute {
            text: value.text.clone(),
            offset: value.offset,
        })
}

/// Parses `l,b,r,t` and validates the box. Accepts decimal and scientific
/// notation.
fn parse_bbox_numbers(text: &str, offset: usize) -> ParseResult<BoundingBox> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 4 {
        return Err(ParseError::InvalidBbox {
            reason: "expected four comma-separated numbers".to_string(),
            offset,
        });
    }
    let mut numbers = [0.0_f64; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber {
                text: (*part).to_string(),
                offset,
            })?;
    }
    let [left, bottom, right, top] = numbers;
    BoundingBox::new(left, bottom, right, top)
        .map_err(|reason| ParseError::InvalidBbox { reason, offset })
}
