//! Patient builder, including next-of-kin contacts.

use super::skipped;
use crate::codes::CodeTables;
use crate::constants::{
    BIRTH_DATE_FORMAT, BIRTH_DATE_WIDTH, CONTACT_ROLE_SYSTEM, MARITAL_STATUS_SYSTEM,
    NEXT_OF_KIN_CODE, ROLE_CODE_SYSTEM,
};
use crate::observe::MappingEvent;
use crate::profile::{GenderMapping, NextOfKinProfile, PatientProfile};
use crate::rules::{apply_all, Extracted, ExtractionRule, Presence, RuleContext, Transform};
use crate::source::SourceRef;
use fhir::{
    AddressUse, AdministrativeGender, CodeableConcept, Coding, ContactPoint, NameUse, Patient,
    PatientContact,
};

/// An optional part of the message that is missing entirely.
#[derive(Debug)]
enum SectionError {
    Absent(String),
}

pub(crate) fn build(
    section: &PatientProfile,
    codes: &CodeTables,
    ctx: &RuleContext<'_>,
) -> Option<Patient> {
    if let Some(anchor) = &section.anchor {
        if ctx.get(anchor).is_none() {
            skipped(ctx, "Patient", anchor);
            return None;
        }
    }

    let mut patient = Patient::default();
    apply_all(&rules(section, codes), ctx, &mut patient);

    if let Some(next_of_kin) = &section.next_of_kin {
        match contacts(next_of_kin, codes, ctx) {
            Ok(contacts) => patient.contact = contacts,
            Err(SectionError::Absent(reason)) => ctx.report(MappingEvent::SectionAbsent {
                section: "Patient.contact",
                reason,
            }),
        }
    }

    Some(patient)
}

fn rules<'p>(section: &'p PatientProfile, codes: &'p CodeTables) -> Vec<ExtractionRule<'p, Patient>> {
    let mut rules = Vec::new();

    for identifier in &section.identifiers {
        rules.push(ExtractionRule::new(
            "Patient.identifier",
            vec![identifier.source.clone()],
            Presence::FirstPresent,
            Transform::Identifier {
                system: &identifier.system,
            },
            |patient: &mut Patient, value| {
                if let Extracted::Identifier(identifier) = value {
                    patient.identifier.push(identifier);
                }
            },
        ));
    }

    if let Some(name) = &section.name {
        rules.push(ExtractionRule::new(
            "Patient.name",
            name.sources(),
            Presence::AnyPresent,
            Transform::Parts,
            |patient: &mut Patient, value| {
                patient.name.extend(value.into_name(Some(NameUse::Official)));
            },
        ));
    }

    if let Some(maiden) = &section.maiden_name {
        rules.push(ExtractionRule::new(
            "Patient.name",
            maiden.sources(),
            Presence::AnyPresent,
            Transform::Parts,
            |patient: &mut Patient, value| {
                patient.name.extend(value.into_name(Some(NameUse::Maiden)));
            },
        ));
    }

    if let Some(gender) = &section.gender {
        let transform = match section.gender_mapping {
            GenderMapping::Fixed => Transform::FixedGender,
            GenderMapping::Table => Transform::Code(&codes.gender),
        };
        rules.push(ExtractionRule::new(
            "Patient.gender",
            vec![gender.clone()],
            Presence::FirstPresent,
            transform,
            |patient: &mut Patient, value| {
                patient.gender = value
                    .into_text()
                    .and_then(|code| AdministrativeGender::from_code(&code));
            },
        ));
    }

    if let Some(birth_date) = &section.birth_date {
        rules.push(ExtractionRule::new(
            "Patient.birthDate",
            vec![birth_date.clone()],
            Presence::FirstPresent,
            Transform::Date {
                format: BIRTH_DATE_FORMAT,
                width: BIRTH_DATE_WIDTH,
            },
            |patient: &mut Patient, value| {
                if let Extracted::Date(date) = value {
                    patient.birth_date = Some(date);
                }
            },
        ));
    }

    if let Some(marital_status) = &section.marital_status {
        rules.push(ExtractionRule::new(
            "Patient.maritalStatus",
            vec![marital_status.clone()],
            Presence::FirstPresent,
            Transform::Code(&codes.marital_status),
            |patient: &mut Patient, value| {
                patient.marital_status = value.into_text().map(|code| {
                    CodeableConcept::from_coding(Coding::new(MARITAL_STATUS_SYSTEM, code))
                });
            },
        ));
    }

    if let Some(phone) = &section.home_phone {
        rules.push(ExtractionRule::new(
            "Patient.telecom",
            vec![phone.clone()],
            Presence::FirstPresent,
            Transform::Text,
            |patient: &mut Patient, value| {
                patient
                    .telecom
                    .extend(value.into_text().map(ContactPoint::home_phone));
            },
        ));
    }

    if let Some(address) = &section.address {
        rules.push(ExtractionRule::new(
            "Patient.address",
            address.sources(),
            Presence::AnyPresent,
            Transform::Parts,
            |patient: &mut Patient, value| {
                patient.address.extend(value.into_address(Some(AddressUse::Home)));
            },
        ));
    }

    rules
}

// ============================================================================
// Next of kin
// ============================================================================

fn contacts(
    section: &NextOfKinProfile,
    codes: &CodeTables,
    ctx: &RuleContext<'_>,
) -> Result<Vec<PatientContact>, SectionError> {
    let segment = section.segment();
    let count = ctx.repetition_count(segment);
    if count == 0 {
        return Err(SectionError::Absent(format!(
            "message has no {segment} segment"
        )));
    }

    Ok((0..count)
        .filter_map(|repetition| contact(section, codes, repetition, ctx))
        .collect())
}

fn contact(
    section: &NextOfKinProfile,
    codes: &CodeTables,
    repetition: usize,
    ctx: &RuleContext<'_>,
) -> Option<PatientContact> {
    let anchor = section.relationship.at_repetition(repetition);
    if ctx.resolve(&anchor).is_none() {
        tracing::debug!(repetition, anchor = %anchor, "next-of-kin without relationship skipped");
        return None;
    }

    let mut contact = PatientContact {
        relationship: vec![CodeableConcept::from_coding(Coding::new(
            CONTACT_ROLE_SYSTEM,
            NEXT_OF_KIN_CODE,
        ))],
        ..PatientContact::default()
    };
    apply_all(&contact_rules(section, codes, repetition), ctx, &mut contact);
    Some(contact)
}

fn contact_rules<'p>(
    section: &'p NextOfKinProfile,
    codes: &'p CodeTables,
    repetition: usize,
) -> Vec<ExtractionRule<'p, PatientContact>> {
    let at = |sources: &[SourceRef]| -> Vec<SourceRef> {
        sources
            .iter()
            .map(|source| source.at_repetition(repetition))
            .collect()
    };
    let mut rules = Vec::new();

    if !section.role.is_empty() {
        rules.push(ExtractionRule::new(
            "Patient.contact.relationship",
            at(&section.role),
            Presence::FirstPresent,
            Transform::Code(&codes.contact_role),
            |contact: &mut PatientContact, value| {
                if let Some(code) = value.into_text() {
                    contact
                        .relationship
                        .push(CodeableConcept::from_coding(Coding::new(ROLE_CODE_SYSTEM, code)));
                }
            },
        ));
    }

    if let Some(name) = &section.name {
        rules.push(ExtractionRule::new(
            "Patient.contact.name",
            at(&name.sources()),
            Presence::AnyPresent,
            Transform::Parts,
            |contact: &mut PatientContact, value| {
                contact.name = value.into_name(None);
            },
        ));
    }

    if let Some(address) = &section.address {
        rules.push(ExtractionRule::new(
            "Patient.contact.address",
            at(&address.sources()),
            Presence::AnyPresent,
            Transform::Parts,
            |contact: &mut PatientContact, value| {
                contact.address = value.into_address(Some(AddressUse::Home));
            },
        ));
    }

    if let Some(phone) = &section.phone {
        rules.push(ExtractionRule::new(
            "Patient.contact.telecom",
            at(std::slice::from_ref(phone)),
            Presence::FirstPresent,
            Transform::Text,
            |contact: &mut PatientContact, value| {
                contact
                    .telecom
                    .extend(value.into_text().map(ContactPoint::home_phone));
            },
        ));
    }

    rules
}
