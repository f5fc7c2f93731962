//! HL7v2 message access.
//!
//! This crate turns raw pipe-and-hat delimited message text into an addressable
//! [`Message`] and answers coordinate lookups (`PID-5-1`, `NK1(1)-3`) through the
//! [`FieldAccessor`](v2fhir_types::FieldAccessor) contract.
//!
//! It is deliberately small: no grammar, no message structure definitions, no
//! validation beyond what is needed to address fields. Lookup follows terser
//! conventions (first repetition, first sub-component, component 1 when none
//! is given).

mod message;
mod terser;

pub use message::{Delimiters, Message, Segment};

/// Errors returned when message text cannot be addressed at all.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Hl7Error {
    #[error("message is empty")]
    Empty,

    #[error("message must start with an MSH segment, found '{0}'")]
    MissingHeader(String),

    #[error("invalid MSH encoding characters: {0}")]
    InvalidEncoding(String),

    #[error("invalid segment name '{name}' on line {line}")]
    InvalidSegment { line: usize, name: String },
}

/// Type alias for Results that can fail with an [`Hl7Error`].
pub type Hl7Result<T> = Result<T, Hl7Error>;
