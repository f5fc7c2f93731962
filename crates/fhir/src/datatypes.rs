//! FHIR R4 general-purpose data types.
//!
//! Only the elements populated by the message mapper are modelled. Every element
//! is optional and omitted from the rendered output when absent or empty.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Business identifier: a `{system, value}` pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub system: String,
    pub value: String,
}

impl Identifier {
    pub fn new(system: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            value: value.into(),
        }
    }
}

/// A reference to a code defined by a terminology system.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

/// A concept expressed as one or more codings and/or text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CodeableConcept {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            coding: Vec::new(),
            text: Some(text.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.coding.is_empty() && self.text.is_none()
    }
}

/// A time range; either bound may be open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<FixedOffset>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<FixedOffset>>,
}

/// Purpose of a human name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameUse {
    /// Official name.
    Official,
    /// Usual/preferred name.
    Usual,
    /// Temporary name.
    Temp,
    /// Nickname or informal name.
    Nickname,
    /// Anonymous name.
    Anonymous,
    /// Old name (no longer in use).
    Old,
    /// Maiden name.
    Maiden,
}

/// A person's name split into its parts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<NameUse>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
}

impl HumanName {
    pub fn is_empty(&self) -> bool {
        self.family.is_none() && self.given.is_empty()
    }
}

/// Purpose of an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressUse {
    Home,
    Work,
    Temp,
    Old,
    Billing,
}

/// A postal address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<AddressUse>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.line.is_empty() && self.city.is_none() && self.state.is_none() && self.postal_code.is_none()
    }
}

/// Telecommunications form of a contact point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPointSystem {
    Phone,
    Fax,
    Email,
    Pager,
    Url,
    Sms,
    Other,
}

/// Purpose of a contact point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPointUse {
    Home,
    Work,
    Temp,
    Old,
    Mobile,
}

/// Phone number, email address and the like.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContactPoint {
    pub system: ContactPointSystem,

    pub value: String,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<ContactPointUse>,
}

impl ContactPoint {
    pub fn home_phone(value: impl Into<String>) -> Self {
        Self {
            system: ContactPointSystem::Phone,
            value: value.into(),
            use_type: Some(ContactPointUse::Home),
        }
    }
}

/// A string-valued extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    pub value_string: String,
}

/// A reference from one resource to another.
///
/// The mapper links resources by logical id (`reference`) or by business
/// identifier (`identifier`), never by embedding.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
}

impl Reference {
    /// Literal reference, e.g. `Location/COCNV`.
    pub fn to_id(resource_type: &str, id: &str) -> Self {
        Self {
            reference: Some(format!("{resource_type}/{id}")),
            resource_type: Some(resource_type.to_string()),
            identifier: None,
        }
    }

    /// Logical reference by business identifier.
    pub fn to_identifier(resource_type: &str, identifier: Identifier) -> Self {
        Self {
            reference: None,
            resource_type: Some(resource_type.to_string()),
            identifier: Some(identifier),
        }
    }
}

/// Returns `true` when `id` is usable as a FHIR logical id (`[A-Za-z0-9\-\.]{1,64}`).
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_elements_are_omitted() {
        let json = serde_json::to_value(HumanName {
            use_type: Some(NameUse::Official),
            family: None,
            given: vec![],
        })
        .expect("serialize name");
        assert_eq!(json, serde_json::json!({ "use": "official" }));
    }

    #[test]
    fn address_uses_fhir_element_names() {
        let json = serde_json::to_value(Address {
            use_type: Some(AddressUse::Home),
            line: vec!["1 MAIN ST".into()],
            city: None,
            state: Some("MA".into()),
            postal_code: Some("02110".into()),
        })
        .expect("serialize address");
        assert_eq!(
            json,
            serde_json::json!({
                "use": "home",
                "line": ["1 MAIN ST"],
                "state": "MA",
                "postalCode": "02110"
            })
        );
    }

    #[test]
    fn references_render_by_id_or_identifier() {
        let by_id = serde_json::to_value(Reference::to_id("Location", "COCNV")).expect("serialize");
        assert_eq!(
            by_id,
            serde_json::json!({ "reference": "Location/COCNV", "type": "Location" })
        );

        let by_identifier = serde_json::to_value(Reference::to_identifier(
            "Patient",
            Identifier::new("https://example.org/mrn", "G1"),
        ))
        .expect("serialize");
        assert_eq!(by_identifier["identifier"]["value"], "G1");
        assert!(by_identifier.get("reference").is_none());
    }

    #[test]
    fn validates_logical_ids() {
        assert!(is_valid_id("COCNV-G000000852"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("has space"));
        assert!(!is_valid_id(&"x".repeat(65)));
    }
}
