//! Input validation utilities.
//!
//! These checks run when configuration and profiles are resolved, and when a
//! facility code is read from a message, so that nothing unsafe is ever
//! templated into an identifier system URI.

use crate::{ConfigError, ConfigResult};

const MAX_SEGMENT_LEN: usize = 64;
const MAX_URL_LEN: usize = 2_048;

/// Returns `true` if `segment` can be embedded as one path segment of a URI
/// without escaping.
///
/// Used for facility codes read from messages and for system names declared
/// in profiles. Only ASCII alphanumerics, `.`, `-` and `_` are accepted.
pub fn is_uri_segment_safe(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= MAX_SEGMENT_LEN
        && segment
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'))
}

/// Returns `true` if `system` is written as an absolute http(s) URI rather
/// than a name relative to the system base URL.
pub fn is_absolute_system(system: &str) -> bool {
    system.starts_with("http://") || system.starts_with("https://")
}

/// Validates the base URL that identifier and local code systems hang off.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] if the URL is empty, not http(s),
/// contains whitespace or non-ASCII characters, or does not end with `/`.
pub fn validate_system_base_url(url: &str) -> ConfigResult<()> {
    let fail = |reason: &str| -> ConfigResult<()> {
        Err(ConfigError::InvalidBaseUrl {
            url: url.to_owned(),
            reason: reason.to_owned(),
        })
    };

    if url.trim().is_empty() {
        return fail("cannot be empty");
    }
    if url.len() > MAX_URL_LEN {
        return fail("exceeds maximum length");
    }
    if !url.is_ascii() || url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return fail("must be ASCII without whitespace");
    }
    if !is_absolute_system(url) {
        return fail("must start with http:// or https://");
    }
    if !url.ends_with('/') {
        return fail("must end with '/'");
    }

    Ok(())
}

/// Validates a system declared in a profile: either an absolute URI or a name
/// that is safe to append to the base URL.
pub fn validate_system_name(profile: &str, system: &str) -> ConfigResult<()> {
    if is_absolute_system(system) {
        if system.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidProfile {
                profile: profile.to_owned(),
                reason: format!("system '{system}' contains whitespace"),
            });
        }
        return Ok(());
    }

    if !is_uri_segment_safe(system) {
        return Err(ConfigError::InvalidProfile {
            profile: profile.to_owned(),
            reason: format!(
                "system name '{system}' contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facility_codes_must_be_plain_segments() {
        assert!(is_uri_segment_safe("COCNV"));
        assert!(is_uri_segment_safe("north-wing_2.a"));
        assert!(!is_uri_segment_safe(""));
        assert!(!is_uri_segment_safe("A B"));
        assert!(!is_uri_segment_safe("../etc"));
        assert!(!is_uri_segment_safe("FAC?x=1"));
        assert!(!is_uri_segment_safe(&"A".repeat(65)));
    }

    #[test]
    fn base_url_rules() {
        validate_system_base_url("https://fhir.experiments.com/System/").expect("valid base");

        for bad in ["", "ftp://x/", "https://x", "https://x y/", "https://exämple/"] {
            let err = validate_system_base_url(bad).expect_err("should reject");
            match err {
                ConfigError::InvalidBaseUrl { url, .. } => assert_eq!(url, bad),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn system_names_are_relative_or_absolute() {
        validate_system_name("p", "MeditechMrn").expect("relative name");
        validate_system_name("p", "https://fhir.experiments.com/MedicalServiceType")
            .expect("absolute uri");

        let err = validate_system_name("p", "Meditech Mrn").expect_err("space rejected");
        match err {
            ConfigError::InvalidProfile { profile, .. } => assert_eq!(profile, "p"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
