//! Shared primitives for the HL7v2 to FHIR mapping workspace.
//!
//! - [`NonEmptyText`]: the only shape in which a field value leaves an accessor
//! - [`FieldCoordinate`]: the `SEG[(rep)]-field[-component]` address of one scalar value
//! - [`FieldAccessor`]: the read-only contract every parsed message satisfies

mod accessor;
mod coordinate;

pub use accessor::FieldAccessor;
pub use coordinate::{CoordinateError, FieldCoordinate};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// Accessors hand out field values as `NonEmptyText` so that an empty or blank
/// field can never be written into a target resource. The input is trimmed of
/// leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Like [`NonEmptyText::new`], but maps blank input to `None`.
    pub fn from_field(input: impl AsRef<str>) -> Option<Self> {
        Self::new(input).ok()
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let text = NonEmptyText::new("  DOE ").expect("non-empty");
        assert_eq!(text.as_str(), "DOE");
    }

    #[test]
    fn blank_field_is_absent() {
        assert!(NonEmptyText::from_field("").is_none());
        assert!(NonEmptyText::from_field("   ").is_none());
        assert!(NonEmptyText::from_field("M").is_some());
    }

    #[test]
    fn rejects_blank_text_when_deserializing() {
        let err = serde_json::from_str::<NonEmptyText>("\"  \"").expect_err("blank text");
        assert!(err.to_string().contains("empty"));
    }
}
