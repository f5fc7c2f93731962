//! FHIR-aligned encounter model.

use crate::datatypes::{CodeableConcept, Coding, Identifier, Period, Reference};
use serde::Serialize;

/// Encounter lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncounterStatus {
    Planned,
    Arrived,
    Triaged,
    InProgress,
    Onleave,
    Finished,
    Cancelled,
    EnteredInError,
    Unknown,
}

impl EncounterStatus {
    /// Parse from the FHIR code (`in-progress`, `finished`, ...).
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "planned" => Some(Self::Planned),
            "arrived" => Some(Self::Arrived),
            "triaged" => Some(Self::Triaged),
            "in-progress" => Some(Self::InProgress),
            "onleave" => Some(Self::Onleave),
            "finished" => Some(Self::Finished),
            "cancelled" => Some(Self::Cancelled),
            "entered-in-error" => Some(Self::EnteredInError),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A party involved in the encounter (attending physician, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EncounterParticipant {
    #[serde(rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<CodeableConcept>,

    pub individual: Reference,
}

/// A location where the encounter takes place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EncounterLocation {
    pub location: Reference,
}

/// An interaction between a patient and healthcare providers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EncounterStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<Coding>,

    #[serde(rename = "type", skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub participant: Vec<EncounterParticipant>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reason_code: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<EncounterLocation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn status_renders_as_kebab_case() {
        let json = serde_json::to_value(EncounterStatus::InProgress).expect("serialize status");
        assert_eq!(json, "in-progress");
        assert_eq!(
            EncounterStatus::from_code("entered-in-error"),
            Some(EncounterStatus::EnteredInError)
        );
        assert_eq!(EncounterStatus::from_code("IN-PROGRESS"), None);
    }

    #[test]
    fn renders_type_and_period_elements() {
        let start = DateTime::parse_from_rfc3339("2019-08-28T14:38:00-05:00").expect("valid");
        let encounter = Encounter {
            types: vec![CodeableConcept {
                coding: vec![
                    Coding::new("https://example.org/account-status", "ADM"),
                    Coding::new("https://example.org/patient-type", "IN"),
                ],
                text: None,
            }],
            period: Some(Period {
                start: Some(start),
                end: None,
            }),
            ..Encounter::default()
        };

        let json = serde_json::to_value(&encounter).expect("serialize encounter");
        assert_eq!(json["type"][0]["coding"][1]["code"], "IN");
        assert_eq!(json["period"]["start"], "2019-08-28T14:38:00-05:00");
        assert!(json["period"].get("end").is_none());
        assert!(json.get("status").is_none());
    }
}
