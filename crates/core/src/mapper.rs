//! Message mapping orchestration.
//!
//! Responsibilities:
//! - choose the [`MappingProfile`] for a message (named, or routed on MSH-9-1)
//! - resolve and vet the facility code before anything is templated with it
//! - run the builders in a fixed order: location, patient, encounter,
//!   practitioner, order
//! - link the built entities with references
//!
//! Notes:
//! - A [`MessageMapper`] is immutable once built and can be shared between
//!   threads; each call maps its own message against its own accessor.
//! - Only a message that cannot be parsed (or routed) is an error. Everything
//!   else degrades to an absent attribute or entity plus a [`MappingEvent`].

use crate::builders::{encounter, location, order, patient, practitioner};
use crate::config::{MapperConfig, ProfileSelection};
use crate::constants::{ATTENDING_PARTICIPANT_CODE, MESSAGE_TYPE_FIELD, PARTICIPANT_TYPE_SYSTEM};
use crate::observe::{MappingEvent, MappingObserver, TracingObserver};
use crate::profile::MappingProfile;
use crate::rules::RuleContext;
use crate::validation;
use crate::{MappingError, MappingResult};
use fhir::datatypes::is_valid_id;
use fhir::{
    CodeableConcept, Coding, Encounter, EncounterLocation, EncounterParticipant, Location,
    Patient, Practitioner, Reference, Resource, ServiceRequest,
};
use std::sync::Arc;
use v2fhir_types::{FieldAccessor, FieldCoordinate};

/// Everything built from one message. Each entity is absent when its builder
/// was skipped or is not part of the profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MappedResources {
    /// Name of the profile the message was mapped with.
    pub profile: String,
    pub location: Option<Location>,
    pub patient: Option<Patient>,
    pub encounter: Option<Encounter>,
    pub practitioner: Option<Practitioner>,
    pub service_request: Option<ServiceRequest>,
}

impl MappedResources {
    /// The built entities, in build order.
    pub fn resources(&self) -> Vec<Resource> {
        let mut resources = Vec::new();
        if let Some(location) = &self.location {
            resources.push(Resource::Location(location.clone()));
        }
        if let Some(patient) = &self.patient {
            resources.push(Resource::Patient(patient.clone()));
        }
        if let Some(encounter) = &self.encounter {
            resources.push(Resource::Encounter(encounter.clone()));
        }
        if let Some(practitioner) = &self.practitioner {
            resources.push(Resource::Practitioner(practitioner.clone()));
        }
        if let Some(request) = &self.service_request {
            resources.push(Resource::ServiceRequest(request.clone()));
        }
        resources
    }
}

/// Maps parsed messages to FHIR entities.
pub struct MessageMapper {
    config: MapperConfig,
    observer: Arc<dyn MappingObserver>,
}

impl MessageMapper {
    pub fn new(config: MapperConfig, observer: Arc<dyn MappingObserver>) -> Self {
        Self { config, observer }
    }

    /// A mapper reporting through [`TracingObserver`].
    pub fn with_tracing(config: MapperConfig) -> Self {
        Self::new(config, Arc::new(TracingObserver))
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Parse `text` and map it.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MalformedMessage`] if the text cannot be
    /// parsed, or any error from [`MessageMapper::map`].
    pub fn map_text(&self, text: &str) -> MappingResult<MappedResources> {
        let message = hl7v2::Message::parse(text)?;
        self.map(&message)
    }

    /// Select the profile for the message and map it.
    ///
    /// # Errors
    ///
    /// - [`MappingError::UnknownProfile`] if the selected profile is not loaded
    /// - [`MappingError::MissingMessageType`] / [`MappingError::UnroutableMessage`]
    ///   when routing on the message type fails
    pub fn map(&self, accessor: &dyn FieldAccessor) -> MappingResult<MappedResources> {
        let profile = self.select_profile(accessor)?;
        self.observer.record(MappingEvent::ProfileSelected {
            profile: profile.name.clone(),
        });
        Ok(self.map_with_profile(accessor, profile))
    }

    /// Map with an explicit profile, bypassing selection.
    pub fn map_with_profile(
        &self,
        accessor: &dyn FieldAccessor,
        profile: &MappingProfile,
    ) -> MappedResources {
        let facility = self.resolve_facility(accessor, profile);
        let ctx = RuleContext::new(
            accessor,
            &*self.observer,
            facility,
            self.config.system_base_url(),
            self.config.default_offset(),
        );
        let codes = &profile.codes;
        let datetime_format = profile.datetime_format.as_str();

        let mut mapped = MappedResources {
            profile: profile.name.clone(),
            location: location::build(profile, &ctx),
            patient: profile
                .patient
                .as_ref()
                .and_then(|section| patient::build(section, codes, &ctx)),
            encounter: profile
                .encounter
                .as_ref()
                .and_then(|section| encounter::build(section, codes, datetime_format, &ctx)),
            practitioner: profile
                .practitioner
                .as_ref()
                .and_then(|section| practitioner::build(section, &ctx)),
            service_request: profile
                .order
                .as_ref()
                .map(|section| order::build(section, datetime_format, &ctx)),
        };

        link(&mut mapped, &ctx);
        mapped
    }

    fn select_profile(&self, accessor: &dyn FieldAccessor) -> MappingResult<&MappingProfile> {
        match self.config.selection() {
            ProfileSelection::Named(name) => self
                .config
                .profile(name)
                .ok_or_else(|| MappingError::UnknownProfile(name.clone())),
            ProfileSelection::ByMessageType => {
                let message_type = FieldCoordinate::parse(MESSAGE_TYPE_FIELD)
                    .ok()
                    .and_then(|coordinate| accessor.get(&coordinate))
                    .ok_or(MappingError::MissingMessageType)?;
                self.config
                    .profile_for_message_type(message_type.as_str())
                    .ok_or_else(|| MappingError::UnroutableMessage(message_type.into_string()))
            }
        }
    }

    /// The facility code, or `None` when it is absent or unusable in a URI.
    fn resolve_facility(
        &self,
        accessor: &dyn FieldAccessor,
        profile: &MappingProfile,
    ) -> Option<String> {
        let value = accessor.get(&profile.facility)?.into_string();
        if validation::is_uri_segment_safe(&value) {
            Some(value)
        } else {
            self.observer.record(MappingEvent::FacilityRejected { value });
            None
        }
    }
}

// ============================================================================
// Linking
// ============================================================================

fn link(mapped: &mut MappedResources, ctx: &RuleContext<'_>) {
    let patient_ref = mapped.patient.as_ref().map(patient_reference);
    let practitioner_ref = mapped.practitioner.as_ref().map(practitioner_reference);
    let location_ref = mapped.location.as_ref().map(location_reference);
    let encounter_ref = mapped.encounter.as_ref().map(encounter_reference);

    // With an order section the practitioner is the order's requester, not the
    // attending of the visit.
    let has_order = mapped.service_request.is_some();

    if let Some(encounter) = mapped.encounter.as_mut() {
        encounter.subject = resolved(ctx, "Encounter", "Patient", patient_ref.clone());
        if !has_order {
            if let Some(individual) =
                resolved(ctx, "Encounter", "Practitioner", practitioner_ref.clone())
            {
                encounter.participant.push(EncounterParticipant {
                    types: vec![CodeableConcept::from_coding(Coding::new(
                        PARTICIPANT_TYPE_SYSTEM,
                        ATTENDING_PARTICIPANT_CODE,
                    ))],
                    individual,
                });
            }
        }
        if let Some(location) = resolved(ctx, "Encounter", "Location", location_ref) {
            encounter.location.push(EncounterLocation { location });
        }
    }

    if let Some(request) = mapped.service_request.as_mut() {
        request.subject = resolved(ctx, "ServiceRequest", "Patient", patient_ref);
        request.encounter = resolved(ctx, "ServiceRequest", "Encounter", encounter_ref);
        request.requester = resolved(ctx, "ServiceRequest", "Practitioner", practitioner_ref);
    }
}

/// `None` when the target entity was not built; `Some(Err)` when it was but
/// cannot be referenced.
type Link = Option<Result<Reference, &'static str>>;

fn resolved(
    ctx: &RuleContext<'_>,
    from: &'static str,
    to: &'static str,
    link: Link,
) -> Option<Reference> {
    match link? {
        Ok(reference) => Some(reference),
        Err(reason) => {
            ctx.report(MappingEvent::ReferenceSkipped {
                from,
                to,
                reason: reason.to_owned(),
            });
            None
        }
    }
}

fn patient_reference(patient: &Patient) -> Result<Reference, &'static str> {
    patient
        .identifier
        .first()
        .map(|identifier| Reference::to_identifier("Patient", identifier.clone()))
        .ok_or("patient has no identifier")
}

fn encounter_reference(encounter: &Encounter) -> Result<Reference, &'static str> {
    encounter
        .identifier
        .first()
        .map(|identifier| Reference::to_identifier("Encounter", identifier.clone()))
        .ok_or("encounter has no identifier")
}

fn practitioner_reference(practitioner: &Practitioner) -> Result<Reference, &'static str> {
    if let Some(id) = practitioner.id.as_deref().filter(|id| is_valid_id(id)) {
        return Ok(Reference::to_id("Practitioner", id));
    }
    practitioner
        .identifier
        .first()
        .map(|identifier| Reference::to_identifier("Practitioner", identifier.clone()))
        .ok_or("practitioner id is not a valid logical id and it has no identifier")
}

fn location_reference(location: &Location) -> Result<Reference, &'static str> {
    location
        .id
        .as_deref()
        .filter(|id| is_valid_id(id))
        .map(|id| Reference::to_id("Location", id))
        .ok_or("location id is not a valid logical id")
}
