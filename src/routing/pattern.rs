//! Route pattern parsing and matching.
//!
//! # Responsibilities
//! - Compile `/literal/<name:type>` patterns once, at registration time
//! - Match a request path segment by segment, collecting typed parameters
//!
//! # Design Decisions
//! - Malformed patterns are configuration errors (`PatternError`)
//! - Unknown type tags compile fine and simply never match
//! - Prefix tolerant: path segments beyond the pattern length are ignored
//! - All-or-nothing: a failed match never leaks partially parsed params

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::routing::value::{parse_segment, ParseError, TypeTag, TypedValue};

/// Parameters extracted by a successful match, keyed by name.
pub type PathParams = HashMap<String, TypedValue>;

/// A rejected route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern `{0}` must start with '/'")]
    MissingLeadingSlash(String),

    #[error("pattern `{0}` must be ASCII")]
    NotAscii(String),

    #[error("malformed segment `{segment}` in pattern `{pattern}`")]
    MalformedSegment { pattern: String, segment: String },

    #[error("parameter `{name}` appears more than once in pattern `{pattern}`")]
    DuplicateParam { pattern: String, name: String },
}

/// One `/`-separated component of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Parses the path segment into a named typed value.
    Typed { name: String, tag: TypeTag },
    /// Declared with a tag the parser does not recognize.
    Unrecognized { name: String, tag: String },
}

/// Why a path did not match a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// The path has fewer segments than the pattern.
    TooShort,
    /// A literal segment differs.
    Literal { index: usize },
    /// A typed segment failed to parse, or its tag is unknown.
    Parse { name: String, error: ParseError },
}

impl Mismatch {
    /// The unknown tag behind this mismatch, if that was the cause.
    pub fn unknown_type(&self) -> Option<&str> {
        match self {
            Mismatch::Parse {
                error: ParseError::UnknownType(tag),
                ..
            } => Some(tag),
            _ => None,
        }
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a pattern, rejecting malformed ones.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.is_ascii() {
            return Err(PatternError::NotAscii(raw.to_string()));
        }
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(raw.to_string()));
        }

        let mut segments = Vec::new();
        for part in raw.split('/') {
            let segment = parse_pattern_segment(part).ok_or_else(|| {
                PatternError::MalformedSegment {
                    pattern: raw.to_string(),
                    segment: part.to_string(),
                }
            })?;

            if let Some(name) = segment_name(&segment) {
                if segments
                    .iter()
                    .any(|s: &Segment| segment_name(s) == Some(name))
                {
                    return Err(PatternError::DuplicateParam {
                        pattern: raw.to_string(),
                        name: name.to_string(),
                    });
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match `path` against this pattern.
    ///
    /// Both sides are split on `/`. The path must have at least as many
    /// segments as the pattern; extra trailing path segments are accepted.
    /// Path segments are percent-decoded before comparison.
    pub fn matches(&self, path: &str) -> Result<PathParams, Mismatch> {
        // Split before decoding: an encoded '/' never creates a segment.
        let parts: Vec<&str> = path.split('/').collect();
        if self.segments.len() > parts.len() {
            return Err(Mismatch::TooShort);
        }

        let mut params = PathParams::new();
        for (index, (segment, raw_part)) in self.segments.iter().zip(parts).enumerate() {
            let part = urlencoding::decode(raw_part)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw_part.to_string());

            match segment {
                Segment::Literal(literal) => {
                    if *literal != part {
                        return Err(Mismatch::Literal { index });
                    }
                }
                Segment::Typed { name, tag } => {
                    let value = parse_segment(&part, *tag).map_err(|error| Mismatch::Parse {
                        name: name.clone(),
                        error,
                    })?;
                    params.insert(name.clone(), value);
                }
                Segment::Unrecognized { name, tag } => {
                    return Err(Mismatch::Parse {
                        name: name.clone(),
                        error: ParseError::UnknownType(tag.clone()),
                    });
                }
            }
        }

        Ok(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn segment_name(segment: &Segment) -> Option<&str> {
    match segment {
        Segment::Literal(_) => None,
        Segment::Typed { name, .. } | Segment::Unrecognized { name, .. } => Some(name),
    }
}

fn parse_pattern_segment(part: &str) -> Option<Segment> {
    let inner = match part.strip_prefix('<') {
        Some(rest) => rest.strip_suffix('>')?,
        None if part.contains('<') || part.contains('>') => return None,
        None => return Some(Segment::Literal(part.to_string())),
    };

    let (name, tag) = inner.split_once(':')?;
    if !is_identifier(name) || !is_identifier(tag) {
        return None;
    }

    Some(match tag.parse::<TypeTag>() {
        Ok(tag) => Segment::Typed {
            name: name.to_string(),
            tag,
        },
        Err(_) => Segment::Unrecognized {
            name: name.to_string(),
            tag: tag.to_string(),
        },
    })
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
