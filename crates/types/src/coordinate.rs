//! Segment-field-component coordinates.
//!
//! Canonical form: `SEG[(rep)]-field[-component]`
//!
//! - `SEG` is exactly three upper-case ASCII letters or digits (`PID`, `NK1`, `ZOA`)
//! - `rep` is the 0-based segment repetition, omitted for the first occurrence
//! - `field` and `component` are 1-based
//!
//! Examples: `PID-5-1`, `MSH-4`, `NK1(1)-2-1`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Errors returned when a coordinate string is not well formed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("invalid segment name '{0}' (expected three upper-case letters or digits)")]
    InvalidSegment(String),

    #[error("invalid repetition in '{0}'")]
    InvalidRepetition(String),

    #[error("invalid field index in '{0}' (expected a positive integer)")]
    InvalidField(String),

    #[error("invalid component index in '{0}' (expected a positive integer)")]
    InvalidComponent(String),

    #[error("unexpected trailing parts in '{0}'")]
    TrailingParts(String),
}

/// Address of a single scalar value within a segmented message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldCoordinate {
    segment: String,
    repetition: Option<usize>,
    field: usize,
    component: Option<usize>,
}

impl FieldCoordinate {
    /// Parses the canonical textual form.
    pub fn parse(input: &str) -> Result<Self, CoordinateError> {
        let input = input.trim();
        let mut parts = input.split('-');

        let head = parts.next().unwrap_or_default();
        let (segment, repetition) = match head.split_once('(') {
            Some((segment, rest)) => {
                let rep = rest
                    .strip_suffix(')')
                    .and_then(|r| r.parse::<usize>().ok())
                    .ok_or_else(|| CoordinateError::InvalidRepetition(input.to_string()))?;
                (segment, Some(rep))
            }
            None => (head, None),
        };
        if !is_segment_name(segment) {
            return Err(CoordinateError::InvalidSegment(input.to_string()));
        }

        let field = parts
            .next()
            .and_then(parse_index)
            .ok_or_else(|| CoordinateError::InvalidField(input.to_string()))?;

        let component = match parts.next() {
            Some(raw) => Some(
                parse_index(raw)
                    .ok_or_else(|| CoordinateError::InvalidComponent(input.to_string()))?,
            ),
            None => None,
        };

        if parts.next().is_some() {
            return Err(CoordinateError::TrailingParts(input.to_string()));
        }

        Ok(Self {
            segment: segment.to_string(),
            // `SEG(0)` and `SEG` address the same occurrence.
            repetition: repetition.filter(|rep| *rep > 0),
            field,
            component,
        })
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// 0-based segment repetition (0 when unspecified).
    pub fn repetition(&self) -> usize {
        self.repetition.unwrap_or(0)
    }

    /// 1-based field index.
    pub fn field(&self) -> usize {
        self.field
    }

    /// 1-based component index (1 when unspecified).
    pub fn component(&self) -> usize {
        self.component.unwrap_or(1)
    }

    /// The same coordinate within another occurrence of its segment.
    pub fn with_repetition(&self, repetition: usize) -> Self {
        Self {
            repetition: Some(repetition).filter(|rep| *rep > 0),
            ..self.clone()
        }
    }

    /// The same field, addressed at `component`.
    pub fn with_component(&self, component: usize) -> Self {
        Self {
            component: Some(component.max(1)),
            ..self.clone()
        }
    }
}

fn is_segment_name(name: &str) -> bool {
    name.len() == 3
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

fn parse_index(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok().filter(|idx| *idx > 0)
}

impl fmt::Display for FieldCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment)?;
        if let Some(rep) = self.repetition {
            write!(f, "({rep})")?;
        }
        write!(f, "-{}", self.field)?;
        if let Some(component) = self.component {
            write!(f, "-{component}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldCoordinate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldCoordinate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FieldCoordinate::parse(&s).map_err(serde::de::Error::custom)
    }
}
