//! Mapper configuration.
//!
//! [`MapperConfig`] is resolved once at process startup and then passed into
//! [`MessageMapper`](crate::MessageMapper). Nothing in the engine reads the
//! environment or the filesystem while a message is being mapped.
//!
//! A config file is optional YAML:
//!
//! ```yaml
//! system_base_url: https://fhir.experiments.com/System/
//! default_offset: "-05:00"
//! profile: auto            # a profile name, or `auto` to route on MSH-9-1
//! message_types:
//!   ADT: adt-extended
//!   ORM: orm
//! profile_files: [site-adt.yaml]   # relative to the config file
//! profiles: []                     # inline profile documents
//! ```

use crate::constants::{AUTO_PROFILE, DEFAULT_PROFILE, DEFAULT_SYSTEM_BASE_URL};
use crate::profile::{self, MappingProfile};
use crate::timestamp::parse_utc_offset;
use crate::validation::validate_system_base_url;
use crate::{ConfigError, ConfigResult};
use chrono::FixedOffset;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How the profile for a run is chosen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileSelection {
    /// Always use the named profile.
    Named(String),
    /// Look the message type (MSH-9-1) up in the `message_types` table.
    ByMessageType,
}

impl ProfileSelection {
    /// `auto` (any case) selects by message type; anything else names a profile.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case(AUTO_PROFILE) {
            ProfileSelection::ByMessageType
        } else {
            ProfileSelection::Named(text.to_owned())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    system_base_url: Option<String>,
    default_offset: Option<String>,
    profile: Option<String>,
    message_types: Option<BTreeMap<String, String>>,
    profile_files: Vec<PathBuf>,
    profiles: Vec<MappingProfile>,
}

/// Configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct MapperConfig {
    system_base_url: String,
    default_offset: FixedOffset,
    selection: ProfileSelection,
    message_types: BTreeMap<String, String>,
    profiles: Vec<MappingProfile>,
}

impl MapperConfig {
    /// Create a config with the built-in profiles and message-type routes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] for a malformed base URL and
    /// [`ConfigError::UnknownProfile`] if `selection` names no known profile.
    pub fn new(
        system_base_url: impl Into<String>,
        default_offset: FixedOffset,
        selection: ProfileSelection,
    ) -> ConfigResult<Self> {
        let system_base_url = system_base_url.into();
        validate_system_base_url(&system_base_url)?;

        let message_types = [("ADT", "adt-classic"), ("ORM", "orm")]
            .into_iter()
            .map(|(message_type, name)| (message_type.to_owned(), name.to_owned()))
            .collect();

        let config = Self {
            system_base_url,
            default_offset,
            selection,
            message_types,
            profiles: profile::builtin_profiles()?,
        };
        config.check_names()?;
        Ok(config)
    }

    /// Built-in profiles, the default base URL, UTC and `adt-classic`.
    pub fn with_defaults() -> ConfigResult<Self> {
        let utc = FixedOffset::east_opt(0)
            .ok_or_else(|| ConfigError::InvalidOffset("+00:00".into()))?;
        Self::new(
            DEFAULT_SYSTEM_BASE_URL,
            utc,
            ProfileSelection::Named(DEFAULT_PROFILE.to_owned()),
        )
    }

    /// Add a custom profile, replacing any profile of the same name.
    pub fn with_profile(mut self, profile: MappingProfile) -> ConfigResult<Self> {
        profile.validate()?;
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => {
                tracing::debug!(profile = %profile.name, "overriding built-in profile");
                *existing = profile;
            }
            None => self.profiles.push(profile),
        }
        Ok(self)
    }

    pub fn with_selection(mut self, selection: ProfileSelection) -> ConfigResult<Self> {
        self.selection = selection;
        self.check_names()?;
        Ok(self)
    }

    /// Route `message_type` (MSH-9-1) to `profile` under automatic selection.
    pub fn with_message_type(
        mut self,
        message_type: impl Into<String>,
        profile: impl Into<String>,
    ) -> ConfigResult<Self> {
        self.message_types
            .insert(message_type.into().to_ascii_uppercase(), profile.into());
        self.check_names()?;
        Ok(self)
    }

    /// Parse a config document. Relative `profile_files` resolve against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidYaml`] with the path of the offending key,
    /// or any error raised while building the config.
    pub fn from_yaml(text: &str, base_dir: &Path) -> ConfigResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(text);
        let file: ConfigFile =
            serde_path_to_error::deserialize(deserializer).map_err(ConfigError::from_yaml)?;

        let offset = match file.default_offset.as_deref() {
            Some(text) => {
                parse_utc_offset(text).ok_or_else(|| ConfigError::InvalidOffset(text.to_owned()))?
            }
            None => FixedOffset::east_opt(0)
                .ok_or_else(|| ConfigError::InvalidOffset("+00:00".into()))?,
        };

        let mut config = Self::new(
            file.system_base_url
                .unwrap_or_else(|| DEFAULT_SYSTEM_BASE_URL.to_owned()),
            offset,
            ProfileSelection::Named(DEFAULT_PROFILE.to_owned()),
        )?;

        for path in &file.profile_files {
            let path = base_dir.join(path);
            let text = read_file(&path)?;
            config = config.with_profile(MappingProfile::from_yaml(&text)?)?;
        }
        for profile in file.profiles {
            config = config.with_profile(profile)?;
        }

        if let Some(message_types) = file.message_types {
            config.message_types = message_types
                .into_iter()
                .map(|(message_type, name)| (message_type.to_ascii_uppercase(), name))
                .collect();
        }
        if let Some(selection) = file.profile.as_deref() {
            config.selection = ProfileSelection::parse(selection);
        }

        config.check_names()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = read_file(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&text, base_dir)
    }

    pub fn system_base_url(&self) -> &str {
        &self.system_base_url
    }

    pub fn default_offset(&self) -> FixedOffset {
        self.default_offset
    }

    pub fn selection(&self) -> &ProfileSelection {
        &self.selection
    }

    pub fn message_types(&self) -> &BTreeMap<String, String> {
        &self.message_types
    }

    pub fn profiles(&self) -> &[MappingProfile] {
        &self.profiles
    }

    pub fn profile(&self, name: &str) -> Option<&MappingProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// The profile routed to `message_type` (case-insensitive).
    pub fn profile_for_message_type(&self, message_type: &str) -> Option<&MappingProfile> {
        self.message_types
            .get(&message_type.trim().to_ascii_uppercase())
            .and_then(|name| self.profile(name))
    }

    fn check_names(&self) -> ConfigResult<()> {
        if let ProfileSelection::Named(name) = &self.selection {
            if self.profile(name).is_none() {
                return Err(ConfigError::UnknownProfile(name.clone()));
            }
        }
        match self.message_types.values().find(|name| self.profile(name).is_none()) {
            Some(name) => Err(ConfigError::UnknownProfile(name.clone())),
            None => Ok(()),
        }
    }
}

/// Pick the config file path without reading environment variables.
///
/// An explicit path (command-line flag) wins over the value of the
/// environment variable; blank values count as unset.
pub fn resolve_config_path(explicit: Option<PathBuf>, env_value: Option<String>) -> Option<PathBuf> {
    explicit.or_else(|| {
        env_value
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

fn read_file(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_use_builtin_profiles() {
        let config = MapperConfig::with_defaults().expect("defaults are valid");
        assert_eq!(config.system_base_url(), DEFAULT_SYSTEM_BASE_URL);
        assert_eq!(
            config.selection(),
            &ProfileSelection::Named("adt-classic".into())
        );
        assert_eq!(config.profiles().len(), 3);
        assert_eq!(
            config.profile_for_message_type("adt").map(|p| p.name.as_str()),
            Some("adt-classic")
        );
        assert!(config.profile_for_message_type("ORU").is_none());
    }

    #[test]
    fn selection_parses_auto() {
        assert_eq!(ProfileSelection::parse("AUTO"), ProfileSelection::ByMessageType);
        assert_eq!(
            ProfileSelection::parse(" orm "),
            ProfileSelection::Named("orm".into())
        );
    }

    #[test]
    fn unknown_selection_is_rejected_at_startup() {
        let err = MapperConfig::with_defaults()
            .expect("defaults")
            .with_selection(ProfileSelection::Named("adt-v3".into()))
            .expect_err("unknown profile");
        match err {
            ConfigError::UnknownProfile(name) => assert_eq!(name, "adt-v3"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let utc = FixedOffset::east_opt(0).expect("utc");
        let err = MapperConfig::new("fhir.experiments.com", utc, ProfileSelection::ByMessageType)
            .expect_err("not http");
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn loads_config_file_with_profile_files() {
        let dir = TempDir::new().expect("temp dir");
        let site_profile = profile::builtin("adt-extended")
            .expect("extended")
            .to_yaml()
            .expect("render")
            .replace("name: adt-extended", "name: site-adt");
        fs::write(dir.path().join("site-adt.yaml"), site_profile).expect("write profile");

        let config_path = dir.path().join("v2fhir.yaml");
        fs::write(
            &config_path,
            "system_base_url: https://example.org/System/\n\
             default_offset: \"-05:00\"\n\
             profile: auto\n\
             message_types:\n  adt: site-adt\n  ORM: orm\n\
             profile_files: [site-adt.yaml]\n",
        )
        .expect("write config");

        let config = MapperConfig::load(&config_path).expect("load config");
        assert_eq!(config.system_base_url(), "https://example.org/System/");
        assert_eq!(config.default_offset().local_minus_utc(), -5 * 3_600);
        assert_eq!(config.selection(), &ProfileSelection::ByMessageType);
        assert_eq!(
            config.profile_for_message_type("ADT").map(|p| p.name.as_str()),
            Some("site-adt")
        );
        assert_eq!(config.profiles().len(), 4);
    }

    #[test]
    fn inline_profile_overrides_builtin() {
        let text = "profiles:\n  - name: orm\n    facility: MSH-4-2\n    datetime_format: \"%Y%m%d\"\n";
        let config = MapperConfig::from_yaml(text, Path::new(".")).expect("config");
        let orm = config.profile("orm").expect("orm present");
        assert_eq!(orm.facility.to_string(), "MSH-4-2");
        assert_eq!(config.profiles().len(), 3);
    }

    #[test]
    fn route_to_unknown_profile_is_rejected() {
        let err = MapperConfig::from_yaml("message_types:\n  ADT: nope\n", Path::new("."))
            .expect_err("unknown route target");
        assert!(matches!(err, ConfigError::UnknownProfile(name) if name == "nope"));
    }

    #[test]
    fn config_yaml_errors_carry_the_key_path() {
        let err = MapperConfig::from_yaml("profiles:\n  - name: x\n    facility: PID5\n", Path::new("."))
            .expect_err("bad facility");
        match err {
            ConfigError::InvalidYaml { path, .. } => assert_eq!(path, "profiles[0].facility"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_offset_is_rejected() {
        let err = MapperConfig::from_yaml("default_offset: EST\n", Path::new("."))
            .expect_err("not an offset");
        assert!(matches!(err, ConfigError::InvalidOffset(text) if text == "EST"));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.yaml");
        let err = MapperConfig::load(&path).expect_err("missing file");
        match err {
            ConfigError::FileRead { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn config_path_resolution() {
        assert_eq!(
            resolve_config_path(Some("a.yaml".into()), Some("b.yaml".into())),
            Some(PathBuf::from("a.yaml"))
        );
        assert_eq!(
            resolve_config_path(None, Some(" b.yaml ".into())),
            Some(PathBuf::from("b.yaml"))
        );
        assert_eq!(resolve_config_path(None, Some("  ".into())), None);
        assert_eq!(resolve_config_path(None, None), None);
    }
}
