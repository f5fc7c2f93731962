//! Encounter builder.
//!
//! Anchored on the visit number. References to the patient, the attending
//! practitioner and the facility are linked by the mapper once every builder
//! has run.

use super::skipped;
use crate::codes::CodeTables;
use crate::constants::ACT_CODE_SYSTEM;
use crate::profile::EncounterProfile;
use crate::rules::{apply_all, Extracted, ExtractionRule, Presence, RuleContext, Transform};
use fhir::{CodeableConcept, Coding, Encounter, EncounterStatus, Period};

pub(crate) fn build(
    section: &EncounterProfile,
    codes: &CodeTables,
    datetime_format: &str,
    ctx: &RuleContext<'_>,
) -> Option<Encounter> {
    if ctx.resolve(&section.visit_number.source).is_none() {
        skipped(ctx, "Encounter", &section.visit_number.source);
        return None;
    }

    let mut encounter = Encounter::default();
    apply_all(&rules(section, codes, datetime_format), ctx, &mut encounter);
    Some(encounter)
}

fn rules<'p>(
    section: &'p EncounterProfile,
    codes: &'p CodeTables,
    datetime_format: &'p str,
) -> Vec<ExtractionRule<'p, Encounter>> {
    let mut rules = vec![ExtractionRule::new(
        "Encounter.identifier",
        vec![section.visit_number.source.clone()],
        Presence::FirstPresent,
        Transform::Identifier {
            system: &section.visit_number.system,
        },
        |encounter: &mut Encounter, value| {
            if let Extracted::Identifier(identifier) = value {
                encounter.identifier.push(identifier);
            }
        },
    )];

    if let Some(status) = &section.status {
        rules.push(ExtractionRule::new(
            "Encounter.status",
            vec![status.clone()],
            Presence::FirstPresent,
            Transform::CodeFromTokens(&codes.encounter_status),
            |encounter: &mut Encounter, value| {
                encounter.status = value
                    .into_text()
                    .and_then(|code| EncounterStatus::from_code(&code));
            },
        ));
    }

    if let Some(class) = &section.class {
        rules.push(ExtractionRule::new(
            "Encounter.class",
            vec![class.clone()],
            Presence::FirstPresent,
            Transform::Code(&codes.encounter_class),
            |encounter: &mut Encounter, value| {
                encounter.class = value
                    .into_text()
                    .map(|code| Coding::new(ACT_CODE_SYSTEM, code));
            },
        ));
    }

    // account status + patient type; both must be present when both are configured
    match (&section.account_status, &section.patient_type) {
        (Some(account), Some(patient_type)) => rules.push(ExtractionRule::new(
            "Encounter.type",
            vec![account.source.clone(), patient_type.source.clone()],
            Presence::AllPresent,
            Transform::CodingPair {
                systems: [account.system.as_str(), patient_type.system.as_str()],
            },
            assign_type,
        )),
        (Some(single), None) | (None, Some(single)) => rules.push(ExtractionRule::new(
            "Encounter.type",
            vec![single.source.clone()],
            Presence::LeadPresent,
            Transform::Coding {
                system: &single.system,
            },
            assign_type,
        )),
        (None, None) => {}
    }

    if let Some(service_type) = &section.service_type {
        rules.push(ExtractionRule::new(
            "Encounter.serviceType",
            vec![service_type.source.clone()],
            Presence::LeadPresent,
            Transform::Coding {
                system: &service_type.system,
            },
            |encounter: &mut Encounter, value| {
                if let Extracted::Codings(coding) = value {
                    encounter.service_type = Some(CodeableConcept { coding, text: None });
                }
            },
        ));
    }

    if let Some(reason) = &section.reason {
        rules.push(ExtractionRule::new(
            "Encounter.reasonCode",
            vec![reason.clone()],
            Presence::FirstPresent,
            Transform::Text,
            |encounter: &mut Encounter, value| {
                encounter
                    .reason_code
                    .extend(value.into_text().map(CodeableConcept::from_text));
            },
        ));
    }

    if let Some(period) = &section.period {
        rules.push(ExtractionRule::new(
            "Encounter.period",
            vec![period.start.clone(), period.end.clone()],
            Presence::AnyPresent,
            Transform::Period {
                format: datetime_format,
            },
            |encounter: &mut Encounter, value| {
                if let Extracted::Period { start, end } = value {
                    encounter.period = Some(Period { start, end });
                }
            },
        ));
    }

    rules
}

fn assign_type(encounter: &mut Encounter, value: Extracted) {
    if let Extracted::Codings(coding) = value {
        encounter.types.push(CodeableConcept { coding, text: None });
    }
}
