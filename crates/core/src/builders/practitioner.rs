//! Attending physician / order requester builder.

use super::skipped;
use crate::profile::PractitionerProfile;
use crate::rules::{apply_all, Extracted, ExtractionRule, Presence, RuleContext, Transform};
use fhir::{NameUse, Practitioner};

pub(crate) fn build(section: &PractitionerProfile, ctx: &RuleContext<'_>) -> Option<Practitioner> {
    let Some(id) = ctx.resolve(&section.id.source) else {
        skipped(ctx, "Practitioner", &section.id.source);
        return None;
    };

    let mut practitioner = Practitioner {
        id: Some(id),
        ..Practitioner::default()
    };
    apply_all(&rules(section), ctx, &mut practitioner);
    Some(practitioner)
}

fn rules(section: &PractitionerProfile) -> Vec<ExtractionRule<'_, Practitioner>> {
    let mut rules = vec![ExtractionRule::new(
        "Practitioner.identifier",
        vec![section.id.source.clone()],
        Presence::FirstPresent,
        Transform::Identifier {
            system: &section.id.system,
        },
        |practitioner: &mut Practitioner, value| {
            if let Extracted::Identifier(identifier) = value {
                practitioner.identifier.push(identifier);
            }
        },
    )];

    if let Some(name) = &section.name {
        rules.push(ExtractionRule::new(
            "Practitioner.name",
            name.sources(),
            Presence::AnyPresent,
            Transform::Parts,
            |practitioner: &mut Practitioner, value| {
                practitioner
                    .name
                    .extend(value.into_name(Some(NameUse::Official)));
            },
        ));
    }

    rules
}
