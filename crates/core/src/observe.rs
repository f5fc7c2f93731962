//! Mapping observability.
//!
//! The mapper never logs directly. Everything worth knowing about a run
//! (values that failed to parse, sections that were absent, builders that were
//! skipped) is reported as a [`MappingEvent`] to the [`MappingObserver`]
//! injected at construction.
//!
//! Two observers ship with the crate:
//! - [`TracingObserver`] forwards events to `tracing` (the default)
//! - [`RecordingObserver`] keeps events in memory for inspection

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Something noteworthy that happened while mapping one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MappingEvent {
    /// The profile chosen for this run.
    ProfileSelected { profile: String },
    /// A builder's anchor field was absent, so the entity was not built.
    BuilderSkipped {
        resource: &'static str,
        anchor: String,
    },
    /// A present value could not be parsed; the attribute is left absent.
    ValueParseFailed {
        attribute: &'static str,
        value: String,
        format: String,
        reason: String,
    },
    /// A present code had no entry in its lookup table.
    UnmappedCode {
        attribute: &'static str,
        value: String,
    },
    /// An identifier value was present but its system could not be templated.
    IdentifierSkipped {
        attribute: &'static str,
        reason: String,
    },
    /// The facility code was present but unusable in a URI.
    FacilityRejected { value: String },
    /// An optional section was missing from the message.
    SectionAbsent {
        section: &'static str,
        reason: String,
    },
    /// A reference between two built entities could not be formed.
    ReferenceSkipped {
        from: &'static str,
        to: &'static str,
        reason: String,
    },
}

impl fmt::Display for MappingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingEvent::ProfileSelected { profile } => write!(f, "using profile {profile}"),
            MappingEvent::BuilderSkipped { resource, anchor } => {
                write!(f, "{resource} not built: anchor {anchor} is absent")
            }
            MappingEvent::ValueParseFailed {
                attribute,
                value,
                format,
                reason,
            } => write!(
                f,
                "{attribute}: could not parse '{value}' with format '{format}': {reason}"
            ),
            MappingEvent::UnmappedCode { attribute, value } => {
                write!(f, "{attribute}: no mapping for code '{value}'")
            }
            MappingEvent::IdentifierSkipped { attribute, reason } => {
                write!(f, "{attribute}: identifier skipped: {reason}")
            }
            MappingEvent::FacilityRejected { value } => {
                write!(f, "facility code '{value}' is not usable in a URI")
            }
            MappingEvent::SectionAbsent { section, reason } => {
                write!(f, "{section} absent: {reason}")
            }
            MappingEvent::ReferenceSkipped { from, to, reason } => {
                write!(f, "{from} -> {to} reference skipped: {reason}")
            }
        }
    }
}

/// Receives the events of mapping runs.
///
/// Implementations must be shareable across threads since one mapper may be
/// used concurrently.
pub trait MappingObserver: Send + Sync {
    fn record(&self, event: MappingEvent);
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl MappingObserver for TracingObserver {
    fn record(&self, event: MappingEvent) {
        match &event {
            MappingEvent::ValueParseFailed { attribute, .. }
            | MappingEvent::IdentifierSkipped { attribute, .. } => {
                tracing::warn!(attribute, "{event}");
            }
            MappingEvent::FacilityRejected { .. } | MappingEvent::ReferenceSkipped { .. } => {
                tracing::warn!("{event}");
            }
            MappingEvent::SectionAbsent { section, .. } => {
                tracing::info!(section, "{event}");
            }
            MappingEvent::BuilderSkipped { resource, .. } => {
                tracing::info!(resource, "{event}");
            }
            MappingEvent::ProfileSelected { .. } | MappingEvent::UnmappedCode { .. } => {
                tracing::debug!("{event}");
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<MappingEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<MappingEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MappingObserver for RecordingObserver {
    fn record(&self, event: MappingEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
