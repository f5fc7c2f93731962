//! Order (ServiceRequest) builder.
//!
//! Not anchored: an order profile always yields one ServiceRequest per
//! message, with intent `order` and status `unknown`. Every other element is
//! independently optional.

use crate::profile::OrderProfile;
use crate::rules::{apply_all, Extracted, ExtractionRule, Presence, RuleContext, Transform};
use fhir::{
    CodeableConcept, Extension, Period, ServiceRequest, ServiceRequestIntent,
    ServiceRequestStatus,
};

pub(crate) fn build(
    section: &OrderProfile,
    datetime_format: &str,
    ctx: &RuleContext<'_>,
) -> ServiceRequest {
    let mut request = ServiceRequest::new(ServiceRequestStatus::Unknown, ServiceRequestIntent::Order);
    apply_all(&rules(section, datetime_format), ctx, &mut request);
    request
}

fn rules<'p>(
    section: &'p OrderProfile,
    datetime_format: &'p str,
) -> Vec<ExtractionRule<'p, ServiceRequest>> {
    let mut rules = Vec::new();

    for identifier in &section.identifiers {
        rules.push(ExtractionRule::new(
            "ServiceRequest.identifier",
            vec![identifier.source.clone()],
            Presence::FirstPresent,
            Transform::Identifier {
                system: &identifier.system,
            },
            |request: &mut ServiceRequest, value| {
                if let Extracted::Identifier(identifier) = value {
                    request.identifier.push(identifier);
                }
            },
        ));
    }

    if let Some(status) = &section.status {
        rules.push(ExtractionRule::new(
            "ServiceRequest.extension",
            vec![status.source.clone()],
            Presence::FirstPresent,
            Transform::FacilityUri {
                name: &status.system,
            },
            |request: &mut ServiceRequest, value| {
                if let Extracted::Uri { uri, value } = value {
                    request.extension.push(Extension {
                        url: uri,
                        value_string: value,
                    });
                }
            },
        ));
    }

    if !section.occurrence.is_empty() {
        rules.push(ExtractionRule::new(
            "ServiceRequest.occurrencePeriod",
            section.occurrence.clone(),
            Presence::FirstPresent,
            Transform::DateTime {
                format: datetime_format,
            },
            |request: &mut ServiceRequest, value| {
                if let Extracted::DateTime(start) = value {
                    request.occurrence_period = Some(Period {
                        start: Some(start),
                        end: None,
                    });
                }
            },
        ));
    }

    if !section.authored_on.is_empty() {
        rules.push(ExtractionRule::new(
            "ServiceRequest.authoredOn",
            section.authored_on.clone(),
            Presence::FirstPresent,
            Transform::DateTime {
                format: datetime_format,
            },
            |request: &mut ServiceRequest, value| {
                if let Extracted::DateTime(authored_on) = value {
                    request.authored_on = Some(authored_on);
                }
            },
        ));
    }

    for coding in &section.codings {
        let mut sources = vec![coding.code.clone()];
        sources.extend(coding.display.iter().cloned());
        rules.push(ExtractionRule::new(
            "ServiceRequest.code",
            sources,
            Presence::LeadPresent,
            Transform::Coding {
                system: &coding.system,
            },
            |request: &mut ServiceRequest, value| {
                if let Extracted::Codings(codings) = value {
                    request
                        .code
                        .get_or_insert_with(CodeableConcept::default)
                        .coding
                        .extend(codings);
                }
            },
        ));
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::fixtures;
    use crate::observe::{MappingEvent, RecordingObserver};
    use crate::profile;
    use fhir::{Coding, Identifier};

    fn run(text: &str, facility: Option<&str>) -> (ServiceRequest, Vec<MappingEvent>) {
        let profile = profile::builtin("orm").expect("profile");
        let message = fixtures::message(text);
        let observer = RecordingObserver::new();
        let ctx = fixtures::context(&message, &observer, facility);
        let section = profile.order.as_ref().expect("order section");
        let request = build(section, &profile.datetime_format, &ctx);
        (request, observer.events())
    }

    #[test]
    fn order_from_orm() {
        let (request, events) = run(fixtures::ORM_O01, Some("COCNV"));

        assert_eq!(request.intent, ServiceRequestIntent::Order);
        assert_eq!(request.status, ServiceRequestStatus::Unknown);
        assert_eq!(
            request.identifier,
            vec![
                Identifier::new(
                    "https://fhir.experiments.com/System/MeditechOrderFillNumber/COCNV",
                    "FILL200"
                ),
                Identifier::new(
                    "https://fhir.experiments.com/System/MeditechOrderNumber/COCNV",
                    "ON300"
                ),
            ]
        );
        assert_eq!(
            request.extension,
            vec![Extension {
                url: "https://fhir.experiments.com/System/MeditechOrderStatus/COCNV".into(),
                value_string: "IP".into(),
            }]
        );

        let start = request
            .occurrence_period
            .and_then(|p| p.start)
            .expect("occurrence start");
        assert_eq!(start.to_rfc3339(), "2019-08-28T15:00:00-05:00");
        assert_eq!(
            request.authored_on.map(|d| d.to_rfc3339()).as_deref(),
            Some("2019-08-28T14:45:00-05:00")
        );

        let code = request.code.expect("order code");
        assert_eq!(
            code.coding,
            vec![
                Coding::new("https://fhir.experiments.com/System/MeditechOrderType", "LAB")
                    .with_display("Laboratory"),
                Coding::new("https://fhir.experiments.com/System/MeditechOrderCategory", "CHEM")
                    .with_display("Chemistry"),
            ]
        );
        assert!(events.is_empty(), "unexpected events: {events:?}");
    }

    #[test]
    fn occurrence_falls_back_to_orc_quantity_timing() {
        let text = fixtures::ORM_O01.replace("|||201908281500\r", "\r");
        let (request, _) = run(&text, Some("COCNV"));
        let start = request
            .occurrence_period
            .and_then(|p| p.start)
            .expect("occurrence start");
        assert_eq!(start.to_rfc3339(), "2019-08-28T15:00:00-05:00");
    }

    #[test]
    fn unparsable_occurrence_is_absent_and_reported() {
        let text = fixtures::ORM_O01.replace("|||201908281500\r", "|||28/08/2019 15:00\r");
        let (request, events) = run(&text, Some("COCNV"));

        assert_eq!(request.occurrence_period, None);
        assert!(request.authored_on.is_some());
        assert_eq!(request.identifier.len(), 2);
        assert!(events.iter().any(|e| matches!(
            e,
            MappingEvent::ValueParseFailed { attribute: "ServiceRequest.occurrencePeriod", .. }
        )));
    }

    #[test]
    fn empty_order_keeps_mandatory_elements() {
        let (request, events) = run("MSH|^~\\&|MEDITECH|COCNV\rPID|1\r", Some("COCNV"));
        assert_eq!(
            request,
            ServiceRequest::new(ServiceRequestStatus::Unknown, ServiceRequestIntent::Order)
        );
        assert!(events.is_empty());
    }

    #[test]
    fn no_facility_means_no_identifiers_or_extension() {
        let (request, events) = run(fixtures::ORM_O01, None);
        assert!(request.identifier.is_empty());
        assert!(request.extension.is_empty());
        // code systems are per table, not per facility
        assert_eq!(request.code.map(|c| c.coding.len()), Some(2));
        let skipped = events
            .iter()
            .filter(|e| matches!(e, MappingEvent::IdentifierSkipped { .. }))
            .count();
        assert_eq!(skipped, 3);
    }

    #[test]
    fn display_is_optional() {
        let text = fixtures::ORM_O01.replace("LAB^Laboratory^^CHEM^Chemistry", "LAB");
        let (request, _) = run(&text, Some("COCNV"));
        let code = request.code.expect("order code");
        assert_eq!(code.coding.len(), 1);
        assert_eq!(code.coding[0].display, None);
    }
}
