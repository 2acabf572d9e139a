//! Shared configuration loader for the soulprint toolchain.
//!
//! `defaults/soulprint.default.toml` is embedded into every binary so that the documented
//! defaults and runtime behavior stay in sync. Applications layer a user file and explicit
//! overrides on top of those defaults via [`Loader`] before deserializing into
//! [`SoulprintConfig`], then turn it into the parser's [`ParseOptions`] and [`Registry`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::Deserialize;
use soulprint_parser::soul::formats::ReportFormat;
use soulprint_parser::soul::registry::RegistryError;
use soulprint_parser::{Mode, ParseOptions, Registry};
use std::path::Path;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/soulprint.default.toml");

/// File name looked up in the working directory by applications
pub const USER_CONFIG_FILE: &str = "soulprint.toml";

/// Top-level configuration consumed by soulprint applications.
#[derive(Debug, Clone, Deserialize)]
pub struct SoulprintConfig {
    pub parse: ParseConfig,
    pub registry: RegistryConfig,
    pub output: OutputConfig,
}

/// Per-parse switches.
#[derive(Debug, Clone, Deserialize)]
pub struct ParseConfig {
    pub mode: Mode,
    pub strict: bool,
    pub allow_expired_consent: bool,
    pub migrate_legacy: bool,
}

/// Contents of the shared registry. Credentials are SHA-256 hex digests, never plaintext.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub denylist: Vec<String>,
    #[serde(default)]
    pub auth_token_digests: Vec<String>,
    #[serde(default)]
    pub creator_keys: Vec<CreatorKey>,
}

/// A creator and the digest of their key
#[derive(Debug, Clone, Deserialize)]
pub struct CreatorKey {
    pub creator: String,
    pub digest: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Report format as spelled in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Jsonl,
    Yaml,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Jsonl => ReportFormat::JsonLines,
            OutputFormat::Yaml => ReportFormat::Yaml,
        }
    }
}

impl SoulprintConfig {
    /// Parse options carrying the `[parse]` switches. Credentials are per-invocation and are
    /// added by the caller.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::new()
            .with_mode(self.parse.mode)
            .strict(self.parse.strict)
            .allow_expired_consent(self.parse.allow_expired_consent)
            .migrate_legacy(self.parse.migrate_legacy)
    }

    /// Build the registry described by `[registry]`.
    pub fn registry(&self) -> Result<Registry, RegistryError> {
        let mut builder = Registry::builder().deny_terms(self.registry.denylist.iter().cloned());
        for digest in &self.registry.auth_token_digests {
            builder = builder.auth_token_digest(digest.clone());
        }
        for key in &self.registry.creator_keys {
            builder = builder.creator_key_digest(key.creator.clone(), key.digest.clone());
        }
        builder.build()
    }

    pub fn report_format(&self) -> ReportFormat {
        self.output.format.into()
    }
}

/// Layers user files and overrides over the embedded defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// A loader holding only the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a TOML file that must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a TOML file if it exists.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (used for command-line switches).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge every layer and deserialize the result.
    pub fn build(self) -> Result<SoulprintConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded defaults, with nothing layered on top.
pub fn load_defaults() -> Result<SoulprintConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use soulprint_parser::soul::integrity::sha256_hex;
    use std::fs;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.parse.mode, Mode::Standard);
        assert!(!config.parse.strict);
        assert!(config.registry.denylist.is_empty());
        assert!(config.registry.creator_keys.is_empty());
        assert_eq!(config.report_format(), ReportFormat::Text);
    }

    #[test]
    fn default_options_match_parser_defaults() {
        let options = load_defaults().unwrap().parse_options();
        let plain = ParseOptions::default();
        assert_eq!(options.mode, plain.mode);
        assert_eq!(options.strict, plain.strict);
        assert_eq!(options.allow_expired_consent, plain.allow_expired_consent);
        assert_eq!(options.migrate_legacy, plain.migrate_legacy);
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("parse.mode", "jumbo")
            .expect("override to apply")
            .set_override("parse.strict", true)
            .expect("override to apply")
            .set_override("output.format", "jsonl")
            .expect("override to apply")
            .build()
            .expect("config to build");
        let options = config.parse_options();
        assert_eq!(options.mode, Mode::Jumbo);
        assert!(options.strict);
        assert_eq!(config.report_format(), ReportFormat::JsonLines);
    }

    fn load_user_file(name: &str, contents: &str) -> Result<SoulprintConfig, ConfigError> {
        let path = std::env::temp_dir().join(format!(
            "soulprint-config-{}-{name}.toml",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        let config = Loader::new().with_file(&path).build();
        fs::remove_file(&path).unwrap();
        config
    }

    #[test]
    fn user_file_builds_registry() {
        let digest = sha256_hex("k3y");
        let config = load_user_file(
            "registry",
            &format!(
                "[registry]\ndenylist = [\"Nightjar\"]\n\n[[registry.creator_keys]]\ncreator = \"Ada\"\ndigest = \"{digest}\"\n"
            ),
        );
        let registry = config.expect("config to build").registry().expect("registry to build");

        assert_eq!(registry.denylist(), ["nightjar".to_string()]);
        assert!(registry.verifies_creator_key("Ada", "k3y"));
        assert!(!registry.verifies_creator_key("Ada", "other"));
    }

    #[test]
    fn malformed_digest_is_rejected() {
        let config = load_user_file(
            "digest",
            "[registry]\nauth_token_digests = [\"not-a-digest\"]\n",
        )
        .unwrap();
        assert!(matches!(config.registry(), Err(RegistryError::InvalidDigest(_))));
    }

    #[test]
    fn missing_required_file_is_an_error() {
        assert!(Loader::new().with_file("does/not/exist.toml").build().is_err());
        assert!(Loader::new()
            .with_optional_file("does/not/exist.toml")
            .build()
            .is_ok());
    }
}
