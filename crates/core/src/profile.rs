//! Mapping profiles.
//!
//! A [`MappingProfile`] is the whole parameterization of one message variant:
//! which coordinates feed which attribute, the date-time format, the identifier
//! and code systems, and the code tables. Builders read nothing else, so a new
//! variant is a new profile document, not new code.
//!
//! Responsibilities:
//! - the serde model of a profile document
//! - the built-in profiles (`adt-classic`, `adt-extended`, `orm`), embedded as YAML
//! - load-time validation, so a bad profile fails at startup and never mid-run

use crate::codes::{CodeTable, CodeTables, MARITAL_STATUS_CODES};
use crate::source::SourceRef;
use crate::validation;
use crate::{ConfigError, ConfigResult};
use chrono::format::{Item, StrftimeItems};
use fhir::{AdministrativeGender, EncounterStatus};
use serde::{Deserialize, Serialize};
use v2fhir_types::FieldCoordinate;

const BUILTIN_PROFILES: &[(&str, &str)] = &[
    ("adt-classic", include_str!("../profiles/adt-classic.yaml")),
    ("adt-extended", include_str!("../profiles/adt-extended.yaml")),
    ("orm", include_str!("../profiles/orm.yaml")),
];

/// Names of the profiles that ship with the engine.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_PROFILES.iter().map(|(name, _)| *name)
}

/// Load one built-in profile by name.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownProfile`] for a name that is not built in.
pub fn builtin(name: &str) -> ConfigResult<MappingProfile> {
    let (_, text) = BUILTIN_PROFILES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_owned()))?;
    MappingProfile::from_yaml(text)
}

/// Load every built-in profile.
pub fn builtin_profiles() -> ConfigResult<Vec<MappingProfile>> {
    builtin_names().map(builtin).collect()
}

// ============================================================================
// Profile document model
// ============================================================================

/// A value source paired with the system its value belongs to.
///
/// `system` is either an absolute URI or a name appended to the configured
/// system base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemField {
    pub source: SourceRef,
    pub system: String,
}

/// Sources of a person name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameParts {
    pub family: SourceRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<SourceRef>,
}

impl NameParts {
    pub(crate) fn sources(&self) -> Vec<SourceRef> {
        std::iter::once(&self.family)
            .chain(&self.given)
            .cloned()
            .collect()
    }
}

/// Sources of a postal address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressParts {
    pub line1: SourceRef,
    pub line2: SourceRef,
    pub city: SourceRef,
    pub state: SourceRef,
    pub postal_code: SourceRef,
}

impl AddressParts {
    pub(crate) fn sources(&self) -> Vec<SourceRef> {
        vec![
            self.line1.clone(),
            self.line2.clone(),
            self.city.clone(),
            self.state.clone(),
            self.postal_code.clone(),
        ]
    }
}

/// How the administrative sex field becomes a FHIR gender.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderMapping {
    /// `F` and `M` map; everything else is `unknown`.
    #[default]
    Fixed,
    /// Look the value up in the profile's gender table.
    Table,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatientProfile {
    /// When set, no Patient is built unless this field is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<FieldCoordinate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<SystemField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<NameParts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maiden_name: Option<NameParts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<SourceRef>,
    pub gender_mapping: GenderMapping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_phone: Option<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressParts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_of_kin: Option<NextOfKinProfile>,
}

/// Next-of-kin contacts, one per occurrence of the relationship's segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NextOfKinProfile {
    /// Anchor of each contact; its segment is the repeating segment.
    pub relationship: SourceRef,
    /// Relationship text looked up in the contact role table, first present wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role: Vec<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<NameParts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressParts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<SourceRef>,
}

impl NextOfKinProfile {
    pub fn segment(&self) -> &str {
        self.relationship.field.segment()
    }

    fn sources(&self) -> Vec<SourceRef> {
        let mut sources = vec![self.relationship.clone()];
        sources.extend(self.role.iter().cloned());
        sources.extend(self.name.iter().flat_map(NameParts::sources));
        sources.extend(self.address.iter().flat_map(AddressParts::sources));
        sources.extend(self.phone.iter().cloned());
        sources
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncounterProfile {
    /// Anchor: no Encounter is built without a visit number.
    pub visit_number: SystemField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_status: Option<SystemField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_type: Option<SystemField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<SystemField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<PeriodParts>,
}

/// Start and end of a period, parsed with the profile's date-time format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodParts {
    pub start: SourceRef,
    pub end: SourceRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PractitionerProfile {
    /// Anchor; the value becomes the practitioner id and identifier.
    pub id: SystemField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<NameParts>,
}

/// One coding of the order code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderCoding {
    pub code: SourceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<SourceRef>,
    pub system: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderProfile {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<SystemField>,
    /// Raw order status, carried as an extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SystemField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub occurrence: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authored_on: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub codings: Vec<OrderCoding>,
}

fn default_location() -> bool {
    true
}

/// The full parameterization of one message variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Header coordinate holding the facility code.
    pub facility: FieldCoordinate,
    /// `chrono` format for every date-time except birth date.
    pub datetime_format: String,
    /// Whether a facility Location is built.
    #[serde(default = "default_location")]
    pub location: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter: Option<EncounterProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practitioner: Option<PractitionerProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderProfile>,
    #[serde(default)]
    pub codes: CodeTables,
}

impl MappingProfile {
    /// Parse and validate a profile document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidYaml`] (with the path of the offending
    /// key) or any validation error from [`MappingProfile::validate`].
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(text);
        let profile: MappingProfile =
            serde_path_to_error::deserialize(deserializer).map_err(ConfigError::from_yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(ConfigError::Serialization)
    }

    /// Check everything that would otherwise surface mid-run.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |reason: String| ConfigError::InvalidProfile {
            profile: self.name.clone(),
            reason,
        };

        if !validation::is_uri_segment_safe(&self.name) {
            return Err(invalid(format!(
                "name '{}' must be non-empty and use only alphanumeric, '.', '-', '_'",
                self.name
            )));
        }

        if self.datetime_format.trim().is_empty()
            || StrftimeItems::new(&self.datetime_format).any(|item| matches!(item, Item::Error))
        {
            return Err(invalid(format!(
                "invalid datetime_format '{}'",
                self.datetime_format
            )));
        }

        for system in self.systems() {
            validation::validate_system_name(&self.name, system)?;
        }

        if let Some(next_of_kin) = self.patient.as_ref().and_then(|p| p.next_of_kin.as_ref()) {
            let segment = next_of_kin.segment();
            if let Some(stray) = next_of_kin
                .sources()
                .into_iter()
                .find(|source| source.field.segment() != segment)
            {
                return Err(invalid(format!(
                    "next_of_kin source {stray} is not in segment {segment}"
                )));
            }
        }

        self.validate_tables()
    }

    fn systems(&self) -> Vec<&str> {
        let mut systems = Vec::new();
        if let Some(patient) = &self.patient {
            systems.extend(patient.identifiers.iter().map(|i| i.system.as_str()));
        }
        if let Some(encounter) = &self.encounter {
            systems.push(encounter.visit_number.system.as_str());
            systems.extend(
                [
                    &encounter.account_status,
                    &encounter.patient_type,
                    &encounter.service_type,
                ]
                .into_iter()
                .flatten()
                .map(|f| f.system.as_str()),
            );
        }
        if let Some(practitioner) = &self.practitioner {
            systems.push(practitioner.id.system.as_str());
        }
        if let Some(order) = &self.order {
            systems.extend(order.identifiers.iter().map(|i| i.system.as_str()));
            systems.extend(order.status.iter().map(|s| s.system.as_str()));
            systems.extend(order.codings.iter().map(|c| c.system.as_str()));
        }
        systems
    }

    fn validate_tables(&self) -> ConfigResult<()> {
        let codes = &self.codes;
        self.check_table("encounter_status", &codes.encounter_status, |target| {
            EncounterStatus::from_code(target).is_some()
        })?;
        self.check_table("gender", &codes.gender, |target| {
            AdministrativeGender::from_code(target).is_some()
        })?;
        self.check_table("marital_status", &codes.marital_status, |target| {
            MARITAL_STATUS_CODES.contains(&target)
        })?;
        self.check_table("encounter_class", &codes.encounter_class, is_plain_code)?;
        self.check_table("contact_role", &codes.contact_role, is_plain_code)
    }

    fn check_table(
        &self,
        table_name: &'static str,
        table: &CodeTable,
        accepts: impl Fn(&str) -> bool,
    ) -> ConfigResult<()> {
        match table.entries().iter().find(|entry| !accepts(&entry.target)) {
            Some(entry) => Err(ConfigError::InvalidCodeTarget {
                profile: self.name.clone(),
                table: table_name,
                source_code: entry.source.clone(),
                target: entry.target.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn is_plain_code(code: &str) -> bool {
    !code.is_empty() && !code.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "name: minimal\nfacility: MSH-4\ndatetime_format: \"%Y%m%d%H%M\"\n";

    #[test]
    fn builtins_load_and_validate() {
        let profiles = builtin_profiles().expect("built-in profiles are valid");
        let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["adt-classic", "adt-extended", "orm"]);
    }

    #[test]
    fn adt_variants_differ_only_in_data() {
        let classic = builtin("adt-classic").expect("classic");
        let extended = builtin("adt-extended").expect("extended");

        assert_eq!(classic.facility.to_string(), "MSH-4");
        assert_eq!(extended.facility.to_string(), "MSH-4-3");
        assert_eq!(classic.datetime_format, "%Y%m%d%H%M");
        assert_eq!(extended.datetime_format, "%Y%m%d%H%M%S");
        assert!(classic.order.is_none() && extended.order.is_none());

        let extended_patient = extended.patient.expect("patient section");
        assert_eq!(extended_patient.gender_mapping, GenderMapping::Table);
        assert!(extended_patient.maiden_name.is_some());
    }

    #[test]
    fn orm_anchors_the_patient_and_skips_location() {
        let orm = builtin("orm").expect("orm");
        assert!(!orm.location);
        let patient = orm.patient.expect("patient section");
        assert_eq!(patient.anchor.map(|a| a.to_string()).as_deref(), Some("PID-3"));
        let order = orm.order.expect("order section");
        assert_eq!(order.occurrence.len(), 2);
        assert_eq!(order.codings.len(), 2);
    }

    #[test]
    fn unknown_builtin_is_rejected() {
        let err = builtin("adt-v3").expect_err("not built in");
        match err {
            ConfigError::UnknownProfile(name) => assert_eq!(name, "adt-v3"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn minimal_profile_defaults() {
        let profile = MappingProfile::from_yaml(MINIMAL).expect("minimal profile");
        assert!(profile.location);
        assert!(profile.patient.is_none());
        assert_eq!(profile.codes, CodeTables::default());
    }

    #[test]
    fn yaml_errors_carry_the_key_path() {
        let text = format!("{MINIMAL}patient:\n  name:\n    family: PID-X\n");
        let err = MappingProfile::from_yaml(&text).expect_err("bad coordinate");
        match err {
            ConfigError::InvalidYaml { path, .. } => assert_eq!(path, "patient.name.family"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = format!("{MINIMAL}encounter_typo: {{}}\n");
        MappingProfile::from_yaml(&text).expect_err("unknown top-level key");
    }

    #[test]
    fn invalid_status_target_is_rejected() {
        let text = format!(
            "{MINIMAL}codes:\n  encounter_status:\n    - {{ source: ADM, target: admitted }}\n"
        );
        let err = MappingProfile::from_yaml(&text).expect_err("bad status target");
        match err {
            ConfigError::InvalidCodeTarget {
                table,
                source_code,
                target,
                ..
            } => {
                assert_eq!(table, "encounter_status");
                assert_eq!(source_code, "ADM");
                assert_eq!(target, "admitted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_datetime_format_is_rejected() {
        let text = MINIMAL.replace("%Y%m%d%H%M", "%Y%Q");
        let err = MappingProfile::from_yaml(&text).expect_err("bad format");
        assert!(matches!(err, ConfigError::InvalidProfile { .. }));
    }

    #[test]
    fn next_of_kin_sources_share_one_segment() {
        let text = format!(
            "{MINIMAL}patient:\n  next_of_kin:\n    relationship: NK1-3\n    phone: PID-13\n"
        );
        let err = MappingProfile::from_yaml(&text).expect_err("mixed segments");
        match err {
            ConfigError::InvalidProfile { reason, .. } => assert!(reason.contains("PID-13")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unsafe_system_name_is_rejected() {
        let text = format!(
            "{MINIMAL}encounter:\n  visit_number: {{ source: PID-18, system: \"Visit Number\" }}\n"
        );
        MappingProfile::from_yaml(&text).expect_err("space in system name");
    }

    #[test]
    fn profiles_round_trip_through_yaml() {
        let orm = builtin("orm").expect("orm");
        let text = orm.to_yaml().expect("render");
        let reparsed = MappingProfile::from_yaml(&text).expect("reparse");
        assert_eq!(reparsed, orm);
    }
}
