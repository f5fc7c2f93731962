//! Code lookup tables.
//!
//! A [`CodeTable`] translates source codes found in a message into target
//! codes of a FHIR value set. Tables are ordered: when two entries share a
//! source the first declared one wins, and [`CodeTable::lookup_tokens`] uses
//! declaration order as branch precedence.
//!
//! Notes:
//! - matching is case-insensitive and ignores surrounding whitespace
//! - an unmatched code yields `None`, never a default target

use serde::{Deserialize, Serialize};

/// One `source -> target` translation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeEntry {
    pub source: String,
    pub target: String,
}

/// An ordered, case-insensitive code translation table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeTable {
    entries: Vec<CodeEntry>,
}

impl CodeTable {
    pub fn new(entries: Vec<CodeEntry>) -> Self {
        Self { entries }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(source, target)| CodeEntry {
                    source: (*source).to_owned(),
                    target: (*target).to_owned(),
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> &[CodeEntry] {
        &self.entries
    }

    /// Translate a single source code.
    pub fn lookup(&self, source: &str) -> Option<&str> {
        let source = source.trim();
        self.entries
            .iter()
            .find(|entry| entry.source.eq_ignore_ascii_case(source))
            .map(|entry| entry.target.as_str())
    }

    /// Translate a value that may hold several whitespace-separated tokens.
    ///
    /// Entries are tried in declaration order and the first entry matching
    /// any token wins, so `"ADM CAN"` resolves through whichever of the two
    /// is declared first.
    pub fn lookup_tokens(&self, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| {
                value
                    .split_whitespace()
                    .any(|token| token.eq_ignore_ascii_case(&entry.source))
            })
            .map(|entry| entry.target.as_str())
    }
}

// ============================================================================
// Built-in tables
// ============================================================================

/// HL7 v2 patient class (PV1-2) to v3 ActCode encounter class.
pub const ENCOUNTER_CLASS: &[(&str, &str)] = &[("I", "IMP"), ("O", "AMB"), ("E", "EMER")];

/// Visit status to FHIR encounter status; order is branch precedence.
pub const ENCOUNTER_STATUS: &[(&str, &str)] = &[
    ("ADM", "in-progress"),
    ("REG", "in-progress"),
    ("DIS", "finished"),
    ("DEP", "finished"),
    ("CAN", "cancelled"),
];

/// HL7 v2 table 0001 to FHIR administrative gender.
pub const ADMINISTRATIVE_GENDER: &[(&str, &str)] = &[
    ("F", "female"),
    ("M", "male"),
    ("O", "other"),
    ("A", "other"),
    ("U", "unknown"),
    ("N", "unknown"),
];

/// HL7 v2 table 0002 to v3 MaritalStatus.
pub const MARITAL_STATUS: &[(&str, &str)] = &[
    ("A", "L"),
    ("B", "U"),
    ("D", "D"),
    ("E", "L"),
    ("I", "I"),
    ("M", "M"),
    ("N", "A"),
    ("P", "T"),
    ("R", "T"),
    ("S", "S"),
    ("W", "W"),
];

/// Free-text next-of-kin relationship to v3 RoleCode.
pub const CONTACT_ROLE: &[(&str, &str)] = &[
    ("MOTHER", "MTH"),
    ("FATHER", "FTH"),
    ("SPOUSE", "SPS"),
    ("WIFE", "WIFE"),
    ("HUSBAND", "HUSB"),
    ("SON", "SONC"),
    ("DAUGHTER", "DAUC"),
    ("BROTHER", "BRO"),
    ("SISTER", "SIS"),
    ("CHILD", "CHILD"),
    ("FRIEND", "FRND"),
    ("GUARDIAN", "GUARD"),
];

/// v3 MaritalStatus codes a marital status table may target.
pub(crate) const MARITAL_STATUS_CODES: &[&str] = &["A", "D", "I", "L", "M", "P", "S", "T", "U", "W"];

/// The code tables a profile maps through.
///
/// Every table defaults to its built-in content, so a profile document only
/// spells out the tables it overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodeTables {
    pub encounter_class: CodeTable,
    pub encounter_status: CodeTable,
    pub gender: CodeTable,
    pub marital_status: CodeTable,
    pub contact_role: CodeTable,
}

impl Default for CodeTables {
    fn default() -> Self {
        Self {
            encounter_class: CodeTable::from_pairs(ENCOUNTER_CLASS),
            encounter_status: CodeTable::from_pairs(ENCOUNTER_STATUS),
            gender: CodeTable::from_pairs(ADMINISTRATIVE_GENDER),
            marital_status: CodeTable::from_pairs(MARITAL_STATUS),
            contact_role: CodeTable::from_pairs(CONTACT_ROLE),
        }
    }
}
