//! FHIR wire/boundary support for the HL7v2 mapping engine.
//!
//! This crate provides the **target entity model** that the mapper populates and
//! the **rendering helpers** that hand finished resources to the outside world:
//! - FHIR R4 resources: Patient, Encounter, Practitioner, Location, ServiceRequest
//! - the general-purpose data types they are built from
//! - pretty JSON and YAML rendering
//!
//! This crate focuses on:
//! - FHIR semantic alignment (element names, code values)
//! - omission of absent elements on output
//!
//! It does not validate resources against FHIR profiles, build bundles or talk
//! to FHIR servers.

pub mod datatypes;
pub mod encounter;
pub mod patient;
pub mod practitioner;
pub mod service_request;

use serde::Serialize;

// Re-export resource types
pub use encounter::{Encounter, EncounterLocation, EncounterParticipant, EncounterStatus};
pub use patient::{AdministrativeGender, Patient, PatientContact};
pub use practitioner::{Location, Practitioner};
pub use service_request::{ServiceRequest, ServiceRequestIntent, ServiceRequestStatus};

// Re-export data types
pub use datatypes::{
    Address, AddressUse, CodeableConcept, Coding, ContactPoint, ContactPointSystem,
    ContactPointUse, Extension, HumanName, Identifier, NameUse, Period, Reference,
};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Any resource the mapper can produce, tagged with its `resourceType`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Location(Location),
    Patient(Patient),
    Encounter(Encounter),
    Practitioner(Practitioner),
    ServiceRequest(ServiceRequest),
}

impl Resource {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Resource::Location(_) => "Location",
            Resource::Patient(_) => "Patient",
            Resource::Encounter(_) => "Encounter",
            Resource::Practitioner(_) => "Practitioner",
            Resource::ServiceRequest(_) => "ServiceRequest",
        }
    }
}

/// Render a resource as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`FhirError::InvalidJson`] if serialisation fails.
pub fn render_json(resource: &Resource) -> FhirResult<String> {
    Ok(serde_json::to_string_pretty(resource)?)
}

/// Render a resource as YAML text.
///
/// # Errors
///
/// Returns [`FhirError::InvalidYaml`] if serialisation fails.
pub fn render_yaml(resource: &Resource) -> FhirResult<String> {
    Ok(serde_yaml::to_string(resource)?)
}
