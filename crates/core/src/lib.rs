//! # v2fhir Core
//!
//! The HL7v2 to FHIR mapping engine.
//!
//! This crate turns one parsed ADT or ORM message into a small graph of FHIR
//! entities (Location, Patient, Encounter, Practitioner, ServiceRequest):
//! - code lookup tables and field extraction rules
//! - data-driven mapping profiles (built-in and YAML)
//! - one builder per entity, run in a fixed order by [`MessageMapper`]
//! - an injected [`MappingObserver`] for everything that did not map cleanly
//!
//! **No transport concerns**: reading files, rendering output and installing a
//! log subscriber belong to the caller (see the `v2fhir-cli` crate).

mod builders;
pub mod codes;
pub mod config;
pub mod constants;
pub mod error;
pub mod mapper;
pub mod observe;
pub mod profile;
pub mod rules;
pub mod source;
pub mod timestamp;
pub mod validation;

pub use codes::{CodeTable, CodeTables};
pub use config::{resolve_config_path, MapperConfig, ProfileSelection};
pub use error::{ConfigError, ConfigResult, MappingError, MappingResult};
pub use mapper::{MappedResources, MessageMapper};
pub use observe::{MappingEvent, MappingObserver, RecordingObserver, TracingObserver};
pub use profile::MappingProfile;
pub use source::SourceRef;
