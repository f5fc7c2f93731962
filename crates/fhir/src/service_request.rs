//! FHIR-aligned service request (order) model.

use crate::datatypes::{CodeableConcept, Extension, Identifier, Period, Reference};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Whether the request is a proposal, plan or order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceRequestIntent {
    Proposal,
    Plan,
    Directive,
    Order,
    OriginalOrder,
    ReflexOrder,
    FillerOrder,
    InstanceOrder,
    #[serde(rename = "option")]
    OptionalOrder,
}

/// Workflow status of the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceRequestStatus {
    Draft,
    Active,
    OnHold,
    Revoked,
    Completed,
    EnteredInError,
    Unknown,
}

/// A request for a procedure, diagnostic test or other service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    pub status: ServiceRequestStatus,

    pub intent: ServiceRequestIntent,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence_period: Option<Period>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authored_on: Option<DateTime<FixedOffset>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<Reference>,
}

impl ServiceRequest {
    /// A request with the mandatory elements set and nothing else.
    pub fn new(status: ServiceRequestStatus, intent: ServiceRequestIntent) -> Self {
        Self {
            id: None,
            extension: Vec::new(),
            identifier: Vec::new(),
            status,
            intent,
            code: None,
            subject: None,
            encounter: None,
            occurrence_period: None,
            authored_on: None,
            requester: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_mandatory_elements_only() {
        let request = ServiceRequest::new(ServiceRequestStatus::Unknown, ServiceRequestIntent::Order);
        let json = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(json, serde_json::json!({ "status": "unknown", "intent": "order" }));
    }

    #[test]
    fn renders_extension_and_authored_on() {
        let mut request =
            ServiceRequest::new(ServiceRequestStatus::Unknown, ServiceRequestIntent::Order);
        request.extension.push(Extension {
            url: "https://example.org/order-status/COCNV".into(),
            value_string: "IP".into(),
        });
        request.authored_on =
            Some(DateTime::parse_from_rfc3339("2019-08-28T14:38:00-04:00").expect("valid"));

        let json = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(json["extension"][0]["valueString"], "IP");
        assert_eq!(json["authoredOn"], "2019-08-28T14:38:00-04:00");
    }
}
