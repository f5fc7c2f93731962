//! Constants used throughout the mapping engine.
//!
//! Terminology URIs are fixed by FHIR R4; the system base URL is only a
//! default and is normally taken from [`MapperConfig`](crate::MapperConfig).

/// Default base for identifier and local code-system URIs.
pub const DEFAULT_SYSTEM_BASE_URL: &str = "https://fhir.experiments.com/System/";

/// Profile used when nothing else is configured.
pub const DEFAULT_PROFILE: &str = "adt-classic";

/// Profile selector that routes on the message type instead of naming a profile.
pub const AUTO_PROFILE: &str = "auto";

/// Environment variable the CLI reads the config file path from.
pub const CONFIG_ENV_VAR: &str = "V2FHIR_CONFIG";

/// Message type coordinate used by automatic profile selection.
pub const MESSAGE_TYPE_FIELD: &str = "MSH-9-1";

pub const ACT_CODE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";

pub const LOCATION_PHYSICAL_TYPE_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/location-physical-type";

/// Physical type assigned to every facility location (building).
pub const BUILDING_PHYSICAL_TYPE: &str = "bu";

pub const CONTACT_ROLE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0131";

/// Contact role category assigned to every next-of-kin contact.
pub const NEXT_OF_KIN_CODE: &str = "N";

pub const ROLE_CODE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-RoleCode";

pub const MARITAL_STATUS_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-MaritalStatus";

pub const PARTICIPANT_TYPE_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/v3-ParticipationType";

pub const ATTENDING_PARTICIPANT_CODE: &str = "ATND";

/// Birth dates are always read as `yyyyMMdd` from the first eight characters.
pub const BIRTH_DATE_FORMAT: &str = "%Y%m%d";
pub const BIRTH_DATE_WIDTH: usize = 8;
