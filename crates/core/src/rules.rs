//! Field extraction rules.
//!
//! Every attribute a builder populates is described by one [`ExtractionRule`]
//! and evaluated the same way:
//!
//! 1. resolve each source through the [`FieldAccessor`]
//! 2. gate on presence ([`Presence`])
//! 3. transform the gated values ([`Transform`]); a failure is reported and
//!    ends the rule
//! 4. assign the [`Extracted`] value to the target entity
//!
//! A rule whose gate is not satisfied, or whose transform fails, never touches
//! the target.

use crate::codes::CodeTable;
use crate::observe::{MappingEvent, MappingObserver};
use crate::source::SourceRef;
use crate::timestamp;
use crate::validation;
use chrono::{DateTime, FixedOffset, NaiveDate};
use fhir::{Address, AddressUse, Coding, HumanName, Identifier, NameUse};
use v2fhir_types::{FieldAccessor, FieldCoordinate, NonEmptyText};

// ============================================================================
// Rule context
// ============================================================================

/// Everything a rule may consult while it is evaluated.
pub struct RuleContext<'a> {
    accessor: &'a dyn FieldAccessor,
    observer: &'a dyn MappingObserver,
    facility: Option<String>,
    system_base_url: &'a str,
    default_offset: FixedOffset,
}

impl<'a> RuleContext<'a> {
    /// `facility` must already be checked with
    /// [`validation::is_uri_segment_safe`]; it is templated into URIs as is.
    pub fn new(
        accessor: &'a dyn FieldAccessor,
        observer: &'a dyn MappingObserver,
        facility: Option<String>,
        system_base_url: &'a str,
        default_offset: FixedOffset,
    ) -> Self {
        Self {
            accessor,
            observer,
            facility,
            system_base_url,
            default_offset,
        }
    }

    pub fn get(&self, coordinate: &FieldCoordinate) -> Option<NonEmptyText> {
        self.accessor.get(coordinate)
    }

    pub fn repetition_count(&self, segment: &str) -> usize {
        self.accessor.repetition_count(segment)
    }

    /// Resolve a source, applying its split.
    pub fn resolve(&self, source: &SourceRef) -> Option<String> {
        let value = self.accessor.get(&source.field)?;
        source.select(value.as_str()).map(str::to_owned)
    }

    pub fn facility(&self) -> Option<&str> {
        self.facility.as_deref()
    }

    pub fn default_offset(&self) -> FixedOffset {
        self.default_offset
    }

    /// `<base><name>/<facility>`, or `None` when the facility is unknown.
    pub fn identifier_system(&self, name: &str) -> Option<String> {
        let facility = self.facility.as_deref()?;
        Some(format!("{}/{facility}", self.code_system(name)))
    }

    /// An absolute system is used as is; a name is appended to the base URL.
    pub fn code_system(&self, system: &str) -> String {
        if validation::is_absolute_system(system) {
            system.to_owned()
        } else {
            format!("{}{system}", self.system_base_url)
        }
    }

    pub fn report(&self, event: MappingEvent) {
        self.observer.record(event);
    }
}

// ============================================================================
// Presence gates
// ============================================================================

/// When a rule's sources are considered present enough to run it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    /// Use the first source that resolves; the others are fallbacks.
    FirstPresent,
    /// Run if at least one source resolves; all positions are kept.
    AnyPresent,
    /// Run only if every source resolves.
    AllPresent,
    /// Run if the first source resolves; the rest are optional extras.
    LeadPresent,
}

impl Presence {
    fn gate(self, values: Vec<Option<String>>) -> Option<Vec<Option<String>>> {
        match self {
            Presence::FirstPresent => values.into_iter().flatten().next().map(|v| vec![Some(v)]),
            Presence::AnyPresent => values.iter().any(Option::is_some).then_some(values),
            Presence::AllPresent => {
                (!values.is_empty() && values.iter().all(Option::is_some)).then_some(values)
            }
            Presence::LeadPresent => matches!(values.first(), Some(Some(_))).then_some(values),
        }
    }
}

// ============================================================================
// Transforms
// ============================================================================

/// Converts gated source values into one typed value.
#[derive(Clone, Copy, Debug)]
pub enum Transform<'p> {
    /// The first value, verbatim.
    Text,
    /// All positions, absent ones kept as `None`.
    Parts,
    Date { format: &'p str, width: usize },
    DateTime { format: &'p str },
    /// Two positions (start, end); fails as a whole if either present bound fails.
    Period { format: &'p str },
    /// Translate the first value through a table.
    Code(&'p CodeTable),
    /// Translate through a table, matching any whitespace token of the value.
    CodeFromTokens(&'p CodeTable),
    /// `F` -> female, `M` -> male, anything else -> unknown.
    FixedGender,
    /// Value plus a facility-templated system.
    Identifier { system: &'p str },
    /// One coding: code from the first position, optional display from the second.
    Coding { system: &'p str },
    /// Two codings, one per position, paired with `systems`.
    CodingPair { systems: [&'p str; 2] },
    /// Value plus a facility-templated URI.
    FacilityUri { name: &'p str },
}

/// The typed result of a transform, handed to a rule's assign function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extracted {
    Text(String),
    Parts(Vec<Option<String>>),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Period {
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
    },
    Code(String),
    Identifier(Identifier),
    Codings(Vec<Coding>),
    Uri { uri: String, value: String },
}

impl Extracted {
    pub fn into_text(self) -> Option<String> {
        match self {
            Extracted::Text(text) | Extracted::Code(text) => Some(text),
            _ => None,
        }
    }

    /// Parts laid out as `[family, given...]`.
    pub fn into_name(self, use_type: Option<NameUse>) -> Option<HumanName> {
        let Extracted::Parts(parts) = self else {
            return None;
        };
        let mut parts = parts.into_iter();
        let name = HumanName {
            use_type,
            family: parts.next().flatten(),
            given: parts.flatten().collect(),
        };
        (!name.is_empty()).then_some(name)
    }

    /// Parts laid out as `[line1, line2, city, state, postal code]`.
    pub fn into_address(self, use_type: Option<AddressUse>) -> Option<Address> {
        let Extracted::Parts(parts) = self else {
            return None;
        };
        let mut parts = parts.into_iter();
        let line = [parts.next().flatten(), parts.next().flatten()]
            .into_iter()
            .flatten()
            .collect();
        let address = Address {
            use_type,
            line,
            city: parts.next().flatten(),
            state: parts.next().flatten(),
            postal_code: parts.next().flatten(),
        };
        (!address.is_empty()).then_some(address)
    }
}

impl Transform<'_> {
    fn apply(
        &self,
        attribute: &'static str,
        values: Vec<Option<String>>,
        ctx: &RuleContext<'_>,
    ) -> Option<Extracted> {
        let first = || values.iter().flatten().next().cloned();

        match *self {
            Transform::Text => first().map(Extracted::Text),
            Transform::Parts => Some(Extracted::Parts(values)),
            Transform::Date { format, width } => {
                let value = first()?;
                match timestamp::parse_date(&value, format, width) {
                    Ok(date) => Some(Extracted::Date(date)),
                    Err(reason) => {
                        report_parse_failure(ctx, attribute, value, format, reason);
                        None
                    }
                }
            }
            Transform::DateTime { format } => {
                let value = first()?;
                parse_datetime(ctx, attribute, value, format).map(Extracted::DateTime)
            }
            Transform::Period { format } => {
                let mut bounds = values.into_iter();
                let start = bounds.next().flatten();
                let end = bounds.next().flatten();

                let start = start.map(|value| parse_datetime(ctx, attribute, value, format));
                let end = end.map(|value| parse_datetime(ctx, attribute, value, format));
                if matches!(start, Some(None)) || matches!(end, Some(None)) {
                    return None;
                }
                Some(Extracted::Period {
                    start: start.flatten(),
                    end: end.flatten(),
                })
            }
            Transform::Code(table) => {
                let value = first()?;
                lookup(ctx, attribute, value, |v| table.lookup(v))
            }
            Transform::CodeFromTokens(table) => {
                let value = first()?;
                lookup(ctx, attribute, value, |v| table.lookup_tokens(v))
            }
            Transform::FixedGender => {
                let value = first()?;
                let code = match value.trim() {
                    v if v.eq_ignore_ascii_case("F") => "female",
                    v if v.eq_ignore_ascii_case("M") => "male",
                    _ => "unknown",
                };
                Some(Extracted::Code(code.to_owned()))
            }
            Transform::Identifier { system } => {
                let value = first()?;
                match ctx.identifier_system(system) {
                    Some(system) => Some(Extracted::Identifier(Identifier::new(system, value))),
                    None => {
                        ctx.report(MappingEvent::IdentifierSkipped {
                            attribute,
                            reason: "facility code is absent".into(),
                        });
                        None
                    }
                }
            }
            Transform::Coding { system } => {
                let mut parts = values.into_iter();
                let code = parts.next().flatten()?;
                let coding = Coding::new(ctx.code_system(system), code);
                let coding = match parts.next().flatten() {
                    Some(display) => coding.with_display(display),
                    None => coding,
                };
                Some(Extracted::Codings(vec![coding]))
            }
            Transform::CodingPair { systems } => {
                let codings: Vec<Coding> = systems
                    .iter()
                    .zip(values)
                    .filter_map(|(system, code)| {
                        code.map(|code| Coding::new(ctx.code_system(system), code))
                    })
                    .collect();
                (!codings.is_empty()).then_some(Extracted::Codings(codings))
            }
            Transform::FacilityUri { name } => {
                let value = first()?;
                match ctx.identifier_system(name) {
                    Some(uri) => Some(Extracted::Uri { uri, value }),
                    None => {
                        ctx.report(MappingEvent::IdentifierSkipped {
                            attribute,
                            reason: "facility code is absent".into(),
                        });
                        None
                    }
                }
            }
        }
    }
}

fn parse_datetime(
    ctx: &RuleContext<'_>,
    attribute: &'static str,
    value: String,
    format: &str,
) -> Option<DateTime<FixedOffset>> {
    match timestamp::parse_datetime(&value, format, ctx.default_offset()) {
        Ok(parsed) => Some(parsed),
        Err(reason) => {
            report_parse_failure(ctx, attribute, value, format, reason);
            None
        }
    }
}

fn report_parse_failure(
    ctx: &RuleContext<'_>,
    attribute: &'static str,
    value: String,
    format: &str,
    reason: String,
) {
    ctx.report(MappingEvent::ValueParseFailed {
        attribute,
        value,
        format: format.to_owned(),
        reason,
    });
}

fn lookup<'t>(
    ctx: &RuleContext<'_>,
    attribute: &'static str,
    value: String,
    find: impl FnOnce(&str) -> Option<&'t str>,
) -> Option<Extracted> {
    match find(&value) {
        Some(code) => Some(Extracted::Code(code.to_owned())),
        None => {
            ctx.report(MappingEvent::UnmappedCode { attribute, value });
            None
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

/// How one attribute of `T` is populated.
pub struct ExtractionRule<'p, T> {
    pub attribute: &'static str,
    pub sources: Vec<SourceRef>,
    pub presence: Presence,
    pub transform: Transform<'p>,
    pub assign: fn(&mut T, Extracted),
}

impl<'p, T> ExtractionRule<'p, T> {
    pub fn new(
        attribute: &'static str,
        sources: Vec<SourceRef>,
        presence: Presence,
        transform: Transform<'p>,
        assign: fn(&mut T, Extracted),
    ) -> Self {
        Self {
            attribute,
            sources,
            presence,
            transform,
            assign,
        }
    }

    /// Evaluate the rule against `target`. Returns whether it assigned.
    pub fn apply(&self, ctx: &RuleContext<'_>, target: &mut T) -> bool {
        let values = self.sources.iter().map(|s| ctx.resolve(s)).collect();
        let Some(values) = self.presence.gate(values) else {
            return false;
        };
        match self.transform.apply(self.attribute, values, ctx) {
            Some(extracted) => {
                (self.assign)(target, extracted);
                true
            }
            None => false,
        }
    }
}

/// Evaluate every rule in order.
pub fn apply_all<T>(rules: &[ExtractionRule<'_, T>], ctx: &RuleContext<'_>, target: &mut T) {
    for rule in rules {
        rule.apply(ctx, target);
    }
}
