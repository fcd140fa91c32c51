//! Typed field values.
//!
//! Form controls only ever yield strings and checked flags. Before a value is
//! sent it is tagged with the kind the server should decode it as, using the
//! wire form `kind|value` (`bool|1`, `int|42`, `float|1.5`). Plain strings are
//! sent bare.
//!
//! The kind always comes from declared metadata or the control type, never
//! from the content of the value.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Declared decoding format of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatHint {
    Bool,
    Int,
    Float,
    #[default]
    #[serde(other)]
    Str,
}

impl FormatHint {
    /// Coerce a raw control reading into a typed value.
    ///
    /// `Bool` reads the checked flag and ignores `value`. `Int` and `Float`
    /// parse a numeric prefix the way browsers do; input with no numeric
    /// prefix yields a NaN-tagged value which the receiver must treat as
    /// invalid. An `Int` prefix outside the `i64` range is NaN-tagged too,
    /// rather than rounded to the nearest float. `Str` maps an absent value to
    /// the empty string.
    pub fn coerce(self, value: Option<&str>, checked: bool) -> TypedValue {
        match self {
            Self::Bool => TypedValue::Bool(checked),
            Self::Int => TypedValue::Int(value.and_then(parse_int_prefix)),
            Self::Float => {
                TypedValue::Float(value.and_then(parse_float_prefix).unwrap_or(f64::NAN))
            }
            Self::Str => TypedValue::Str(value.unwrap_or_default().to_string()),
        }
    }
}

/// A value tagged with its decoding kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    /// `None` is the NaN produced by non-numeric input.
    Int(Option<i64>),
    /// May be NaN for non-numeric input.
    Float(f64),
    Str(String),
}

impl TypedValue {
    /// The kind this value was tagged with.
    pub fn hint(&self) -> FormatHint {
        match self {
            Self::Bool(_) => FormatHint::Bool,
            Self::Int(_) => FormatHint::Int,
            Self::Float(_) => FormatHint::Float,
            Self::Str(_) => FormatHint::Str,
        }
    }

    /// Whether the value is a NaN produced by numeric coercion.
    pub fn is_nan(&self) -> bool {
        match self {
            Self::Int(v) => v.is_none(),
            Self::Float(v) => v.is_nan(),
            Self::Bool(_) | Self::Str(_) => false,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "bool|{}", u8::from(*v)),
            Self::Int(Some(v)) => write!(f, "int|{v}"),
            Self::Int(None) => f.write_str("int|NaN"),
            Self::Float(v) if v.is_infinite() => {
                let sign = if v.is_sign_negative() { "-" } else { "" };
                write!(f, "float|{sign}Infinity")
            }
            Self::Float(v) => write!(f, "float|{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for TypedValue {
    type Err = FieldParseError;

    /// Parse the wire form. Text without a known `kind|` prefix is a string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((kind, raw)) = s.split_once('|') else {
            return Ok(Self::Str(s.to_string()));
        };

        match kind {
            "bool" => match raw {
                "1" => Ok(Self::Bool(true)),
                "0" => Ok(Self::Bool(false)),
                other => Err(FieldParseError::InvalidBool(other.to_string())),
            },
            "int" if raw == "NaN" => Ok(Self::Int(None)),
            "int" => raw
                .parse()
                .map(|v| Self::Int(Some(v)))
                .map_err(|_| FieldParseError::InvalidNumber(s.to_string())),
            "float" => parse_float_literal(raw)
                .map(Self::Float)
                .ok_or_else(|| FieldParseError::InvalidNumber(s.to_string())),
            _ => Ok(Self::Str(s.to_string())),
        }
    }
}

/// Error parsing a tagged value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldParseError {
    #[error("bool flag must be 0 or 1, got: {0}")]
    InvalidBool(String),
    #[error("invalid numeric value: {0}")]
    InvalidNumber(String),
}

/// Compare a coerced value against its stored baseline.
///
/// Partial updates send only fields for which this returns true, so fields the
/// user never touched are not overwritten on the server.
pub fn detect_changed(new: &TypedValue, previous: &str) -> bool {
    new.to_string() != previous
}

pub(crate) fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let digits_from = usize::from(s.starts_with(['+', '-']));
    let end = s[digits_from..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |i| i + digits_from);
    if end == digits_from {
        return None;
    }
    s[..end].parse().ok()
}

fn parse_float_prefix(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(s.starts_with(['+', '-']));

    if s[end..].starts_with("Infinity") {
        return s[..end + "Infinity".len()].parse().ok();
    }

    let mut seen_digit = false;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
        seen_digit = true;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

fn parse_float_literal(raw: &str) -> Option<f64> {
    match raw {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}
