use std::path::PathBuf;

/// Errors that abort a mapping run before any entity is built.
///
/// Field absence and value parse failures are not errors; they leave the
/// affected attribute absent and are reported through a
/// [`MappingObserver`](crate::MappingObserver).
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] hl7v2::Hl7Error),
    #[error("unknown mapping profile '{0}'")]
    UnknownProfile(String),
    #[error("no mapping profile configured for message type '{0}'")]
    UnroutableMessage(String),
    #[error("message has no MSH-9 message type to route on")]
    MissingMessageType,
}

pub type MappingResult<T> = std::result::Result<T, MappingError>;

/// Errors raised while resolving configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML at {path}: {message}")]
    InvalidYaml { path: String, message: String },
    #[error("invalid system base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("invalid UTC offset '{0}' (expected Z, +hh:mm or -hh:mm)")]
    InvalidOffset(String),
    #[error("unknown mapping profile '{0}'")]
    UnknownProfile(String),
    #[error("failed to serialize YAML: {0}")]
    Serialization(serde_yaml::Error),
    #[error("profile '{profile}' is invalid: {reason}")]
    InvalidProfile { profile: String, reason: String },
    #[error("profile '{profile}': table '{table}' maps '{source_code}' to unsupported code '{target}'")]
    InvalidCodeTarget {
        profile: String,
        table: &'static str,
        source_code: String,
        target: String,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Wrap a `serde_path_to_error` failure, keeping the path to the offending key.
    pub(crate) fn from_yaml(err: serde_path_to_error::Error<serde_yaml::Error>) -> Self {
        let path = err.path().to_string();
        ConfigError::InvalidYaml {
            path,
            message: err.into_inner().to_string(),
        }
    }
}
