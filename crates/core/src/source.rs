//! Value sources: a field coordinate plus an optional token split.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use v2fhir_types::FieldCoordinate;

/// How a composite value is cut into tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Delimiter {
    /// Runs of whitespace; empty tokens never occur.
    #[default]
    Whitespace,
    /// A single character; tokens are trimmed and empty tokens are absent.
    Char(char),
}

impl Delimiter {
    /// Returns token `index` of `value`, or `None` when the value has fewer
    /// tokens than that.
    pub fn token<'a>(&self, value: &'a str, index: usize) -> Option<&'a str> {
        let token = match self {
            Delimiter::Whitespace => value.split_whitespace().nth(index),
            Delimiter::Char(c) => value.split(*c).nth(index).map(str::trim),
        };
        token.filter(|t| !t.is_empty())
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Whitespace => f.write_str("whitespace"),
            Delimiter::Char(c) => write!(f, "{c}"),
        }
    }
}

impl Serialize for Delimiter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Delimiter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        if text == "whitespace" {
            return Ok(Delimiter::Whitespace);
        }
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Delimiter::Char(c)),
            _ => Err(serde::de::Error::custom(format!(
                "delimiter must be 'whitespace' or a single character, got '{text}'"
            ))),
        }
    }
}

/// Selects one token of a field value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Split {
    pub delimiter: Delimiter,
    pub index: usize,
}

/// Where a rule reads one of its values from.
///
/// In a profile document a source is either a bare coordinate (`PID-5-1`) or
/// a map selecting a token (`{ field: PV1-41, token: 1 }`, optionally with a
/// `delimiter`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SourceRepr", into = "SourceRepr")]
pub struct SourceRef {
    pub field: FieldCoordinate,
    pub split: Option<Split>,
}

impl SourceRef {
    pub fn field(field: FieldCoordinate) -> Self {
        Self { field, split: None }
    }

    pub fn token(field: FieldCoordinate, delimiter: Delimiter, index: usize) -> Self {
        Self {
            field,
            split: Some(Split { delimiter, index }),
        }
    }

    /// The same source, read from segment repetition `repetition`.
    pub fn at_repetition(&self, repetition: usize) -> Self {
        Self {
            field: self.field.with_repetition(repetition),
            split: self.split,
        }
    }

    /// Apply the split (if any) to an already resolved field value.
    pub fn select<'a>(&self, value: &'a str) -> Option<&'a str> {
        match self.split {
            Some(split) => split.delimiter.token(value, split.index),
            None => Some(value),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.split {
            Some(split) => write!(f, "{}[{}#{}]", self.field, split.delimiter, split.index),
            None => write!(f, "{}", self.field),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SourceRepr {
    Field(FieldCoordinate),
    Token {
        field: FieldCoordinate,
        #[serde(default)]
        delimiter: Delimiter,
        token: usize,
    },
}

impl From<SourceRepr> for SourceRef {
    fn from(repr: SourceRepr) -> Self {
        match repr {
            SourceRepr::Field(field) => SourceRef::field(field),
            SourceRepr::Token {
                field,
                delimiter,
                token,
            } => SourceRef::token(field, delimiter, token),
        }
    }
}

impl From<SourceRef> for SourceRepr {
    fn from(source: SourceRef) -> Self {
        match source.split {
            None => SourceRepr::Field(source.field),
            Some(split) => SourceRepr::Token {
                field: source.field,
                delimiter: split.delimiter,
                token: split.index,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate(text: &str) -> FieldCoordinate {
        FieldCoordinate::parse(text).expect("valid coordinate")
    }

    #[test]
    fn short_split_is_absent_not_a_fault() {
        let status = SourceRef::token(coordinate("PV1-41"), Delimiter::Whitespace, 1);
        assert_eq!(status.select("ADM IN"), Some("IN"));
        assert_eq!(status.select("ADM"), None);
        assert_eq!(status.select(""), None);
    }

    #[test]
    fn char_split_trims_and_drops_empty_tokens() {
        let given = SourceRef::token(coordinate("NK1-2-1"), Delimiter::Char(','), 1);
        assert_eq!(given.select("DOE, JANE"), Some("JANE"));
        assert_eq!(given.select("DOE,"), None);
        assert_eq!(given.select("DOE"), None);

        let family = SourceRef::token(coordinate("NK1-2-1"), Delimiter::Char(','), 0);
        assert_eq!(family.select("DOE"), Some("DOE"));
    }

    #[test]
    fn plain_source_passes_value_through() {
        let source = SourceRef::field(coordinate("PID-8"));
        assert_eq!(source.select("M"), Some("M"));
    }

    #[test]
    fn deserializes_both_forms() {
        let plain: SourceRef = serde_yaml::from_str("PID-5-1").expect("plain form");
        assert_eq!(plain, SourceRef::field(coordinate("PID-5-1")));

        let token: SourceRef =
            serde_yaml::from_str("{ field: PV1-41, token: 1 }").expect("token form");
        assert_eq!(
            token,
            SourceRef::token(coordinate("PV1-41"), Delimiter::Whitespace, 1)
        );

        let comma: SourceRef = serde_yaml::from_str("{ field: NK1-2-1, delimiter: ',', token: 0 }")
            .expect("delimiter form");
        assert_eq!(comma.split.map(|s| s.delimiter), Some(Delimiter::Char(',')));

        serde_yaml::from_str::<SourceRef>("{ field: NK1-2-1, delimiter: ',,', token: 0 }")
            .expect_err("multi-char delimiter rejected");
    }

    #[test]
    fn repetition_rewrites_only_the_coordinate() {
        let source = SourceRef::token(coordinate("NK1-2-1"), Delimiter::Char(','), 1);
        let second = source.at_repetition(1);
        assert_eq!(second.field.repetition(), 1);
        assert_eq!(second.split, source.split);
    }
}
