//! Typed path segment values.
//!
//! # Responsibilities
//! - Recognize the type tags allowed in `<name:type>` pattern segments
//! - Parse a raw path segment into a strongly typed value
//!
//! # Design Decisions
//! - Closed sum type: consumers match exhaustively, no downcasting
//! - Parse failures are plain values; the matcher turns them into "no match"

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Type tags accepted inside `<name:type>` segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    String,
    Int,
    Float,
    Bool,
    Uuid4,
    DateTime,
    Hex,
}

impl TypeTag {
    /// The tag as written in a route pattern.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::Uuid4 => "uuid4",
            TypeTag::DateTime => "datetime",
            TypeTag::Hex => "hex",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = ParseError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "string" => Ok(TypeTag::String),
            "int" => Ok(TypeTag::Int),
            "float" => Ok(TypeTag::Float),
            "bool" => Ok(TypeTag::Bool),
            "uuid4" => Ok(TypeTag::Uuid4),
            "datetime" => Ok(TypeTag::DateTime),
            "hex" => Ok(TypeTag::Hex),
            other => Err(ParseError::UnknownType(other.to_string())),
        }
    }
}

/// A value extracted from a typed path segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    DateTime(DateTime<FixedOffset>),
    Hex(u64),
}

impl TypedValue {
    /// The tag this value was parsed under.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            TypedValue::Str(_) => TypeTag::String,
            TypedValue::Int(_) => TypeTag::Int,
            TypedValue::Float(_) => TypeTag::Float,
            TypedValue::Bool(_) => TypeTag::Bool,
            TypedValue::Uuid(_) => TypeTag::Uuid4,
            TypedValue::DateTime(_) => TypeTag::DateTime,
            TypedValue::Hex(_) => TypeTag::Hex,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TypedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            TypedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            TypedValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            TypedValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_hex(&self) -> Option<u64> {
        match self {
            TypedValue::Hex(h) => Some(*h),
            _ => None,
        }
    }
}

/// Why a segment could not be turned into a [`TypedValue`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The pattern named a type tag this parser does not know.
    #[error("unknown type tag `{0}`")]
    UnknownType(String),

    /// The segment is not a valid literal for its tag.
    #[error("`{value}` is not a valid {tag}")]
    Invalid { tag: TypeTag, value: String },
}

/// Parse `segment` according to a textual type tag.
pub fn parse(segment: &str, tag: &str) -> Result<TypedValue, ParseError> {
    let tag = tag.parse::<TypeTag>()?;
    parse_segment(segment, tag)
}

/// Parse `segment` according to an already recognized tag.
pub fn parse_segment(segment: &str, tag: TypeTag) -> Result<TypedValue, ParseError> {
    let invalid = || ParseError::Invalid {
        tag,
        value: segment.to_string(),
    };

    match tag {
        TypeTag::String => Ok(TypedValue::Str(segment.to_string())),
        TypeTag::Int => segment
            .parse::<i64>()
            .map(TypedValue::Int)
            .map_err(|_| invalid()),
        TypeTag::Float => parse_float(segment).map(TypedValue::Float).ok_or_else(invalid),
        TypeTag::Bool => parse_bool(segment).map(TypedValue::Bool).ok_or_else(invalid),
        TypeTag::Uuid4 => Uuid::parse_str(segment)
            .map(TypedValue::Uuid)
            .map_err(|_| invalid()),
        TypeTag::DateTime => {
            if !is_strict_rfc3339_shape(segment) {
                return Err(invalid());
            }
            DateTime::parse_from_rfc3339(segment)
                .map(TypedValue::DateTime)
                .map_err(|_| invalid())
        }
        TypeTag::Hex => {
            // from_str_radix tolerates a leading '+', an unsigned hex literal does not
            if segment.starts_with('+') {
                return Err(invalid());
            }
            u64::from_str_radix(segment, 16)
                .map(TypedValue::Hex)
                .map_err(|_| invalid())
        }
    }
}

/// Finite literals that overflow to infinity are out of range, not infinite.
fn parse_float(segment: &str) -> Option<f64> {
    let value = segment.parse::<f64>().ok()?;
    if value.is_infinite() {
        let literal = segment.trim_start_matches(['+', '-']).to_ascii_lowercase();
        if literal != "inf" && literal != "infinity" {
            return None;
        }
    }
    Some(value)
}

/// chrono also takes a space or lowercase `t`/`z`; only `T` and `Z` are RFC 3339 here.
fn is_strict_rfc3339_shape(segment: &str) -> bool {
    segment.as_bytes().get(10) == Some(&b'T') && !segment.ends_with('z')
}

fn parse_bool(segment: &str) -> Option<bool> {
    match segment {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
