//! Shared read-only resources
//!
//!     The registry bundles everything a parse consults but never changes: the compiled schema
//!     catalog, the deprecated/obsoleted key tables, the legacy rename table, the global
//!     redaction denylist and the credential digests used by the privacy gate.
//!
//!     A registry is immutable once built. Parses share it through an `Arc`, so any number of
//!     concurrent parses can read the same instance without locking.
//!
//! Process-wide Slot
//!
//!     [`install`] places a registry in a process-wide slot, [`current`] returns it (or the
//!     built-in standard registry when nothing is installed) and [`reset`] clears the slot.
//!     Tests and embedders that need determinism skip the slot entirely and pass a registry
//!     to [`parse_with_registry`](crate::soul::parsing::parse_with_registry).
//!
//! Credentials
//!
//!     Only SHA-256 digests of auth tokens and creator keys are stored. A caller-supplied
//!     credential is hashed and compared against them.

pub mod schema;

use crate::soul::integrity::{is_digest, sha256_hex};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use schema::Schema;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

pub use schema::{EntryRange, FieldSpec, SectionKind, SectionSpec, Strictness};

/// Deprecated keys: parsed as usual, reported with a warning.
/// Bare names are metadata keys, dotted names are `Section.Key`.
pub const DEPRECATED_KEYS: &[&str] = &["Version", "Voice.Summary", "Echoes.Intensity"];

/// Obsoleted keys: reported as errors and dropped
pub const OBSOLETED_KEYS: &[&str] = &["Signature", "Identity.Age", "Heartbeat.Mood"];

/// Metadata key renames applied when migrating a major-0 document
pub const LEGACY_METADATA_RENAMES: &[(&str, &str)] =
    &[("Author", "Creator"), ("PrivacyMode", "PrivacyLevel")];

/// Section renames applied when migrating a major-0 document
pub const LEGACY_SECTION_RENAMES: &[(&str, &str)] = &[("Memories", "Echoes")];

/// Major version this parser reads natively
pub const SUPPORTED_MAJOR: u32 = 1;

/// Major version that can be migrated
pub const LEGACY_MAJOR: u32 = 0;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("schema pattern does not compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("'{0}' is not a 64-character lowercase hex SHA-256 digest")]
    InvalidDigest(String),

    #[error("denylist terms must not be empty")]
    EmptyTerm,
}

/// Immutable lookup tables shared by every parse
#[derive(Debug, Clone)]
pub struct Registry {
    schema: Schema,
    deprecated: HashSet<String>,
    obsoleted: HashSet<String>,
    denylist: Vec<String>,
    auth_tokens: HashSet<String>,
    creator_keys: HashMap<String, String>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The process-wide standard registry: catalog and tables only, no credentials
    pub fn standard() -> Arc<Registry> {
        Arc::clone(&STANDARD)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// `path` is a metadata key or `Section.Key`
    pub fn is_deprecated(&self, path: &str) -> bool {
        self.deprecated.contains(path)
    }

    pub fn is_obsoleted(&self, path: &str) -> bool {
        self.obsoleted.contains(path)
    }

    /// Lowercased global denylist terms
    pub fn denylist(&self) -> &[String] {
        &self.denylist
    }

    /// True when token digests are registered and the gate must check membership
    pub fn restricts_tokens(&self) -> bool {
        !self.auth_tokens.is_empty()
    }

    pub fn accepts_token(&self, token: &str) -> bool {
        self.auth_tokens.contains(&sha256_hex(token))
    }

    pub fn has_creator(&self, creator: &str) -> bool {
        self.creator_keys.contains_key(creator)
    }

    /// True when `key` hashes to the digest registered for `creator`
    pub fn verifies_creator_key(&self, creator: &str, key: &str) -> bool {
        self.creator_keys
            .get(creator)
            .is_some_and(|digest| *digest == sha256_hex(key))
    }
}

/// Collects registry contents; [`RegistryBuilder::build`] validates and compiles them.
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    denylist: Vec<String>,
    auth_tokens: Vec<String>,
    creator_keys: Vec<(String, String)>,
}

impl RegistryBuilder {
    pub fn deny_term(mut self, term: impl Into<String>) -> Self {
        self.denylist.push(term.into());
        self
    }

    pub fn deny_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist.extend(terms.into_iter().map(Into::into));
        self
    }

    /// Accept a plaintext token (stored as its digest)
    pub fn auth_token(mut self, token: &str) -> Self {
        self.auth_tokens.push(sha256_hex(token));
        self
    }

    /// Accept a token by its hex digest
    pub fn auth_token_digest(mut self, digest: impl Into<String>) -> Self {
        self.auth_tokens.push(digest.into());
        self
    }

    /// Register a creator key in plaintext (stored as its digest)
    pub fn creator_key(mut self, creator: impl Into<String>, key: &str) -> Self {
        self.creator_keys.push((creator.into(), sha256_hex(key)));
        self
    }

    /// Register a creator key by its hex digest
    pub fn creator_key_digest(
        mut self,
        creator: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        self.creator_keys.push((creator.into(), digest.into()));
        self
    }

    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut denylist = Vec::with_capacity(self.denylist.len());
        for term in self.denylist {
            let term = term.trim().to_lowercase();
            if term.is_empty() {
                return Err(RegistryError::EmptyTerm);
            }
            if !denylist.contains(&term) {
                denylist.push(term);
            }
        }

        let digests = self
            .auth_tokens
            .iter()
            .chain(self.creator_keys.iter().map(|(_, digest)| digest));
        for digest in digests {
            if !is_digest(digest) {
                return Err(RegistryError::InvalidDigest(digest.clone()));
            }
        }

        Ok(Registry {
            schema: Schema::catalog()?,
            deprecated: DEPRECATED_KEYS.iter().map(|k| k.to_string()).collect(),
            obsoleted: OBSOLETED_KEYS.iter().map(|k| k.to_string()).collect(),
            denylist,
            auth_tokens: self.auth_tokens.into_iter().collect(),
            creator_keys: self.creator_keys.into_iter().collect(),
        })
    }
}

static STANDARD: Lazy<Arc<Registry>> = Lazy::new(|| {
    Arc::new(
        Registry::builder()
            .build()
            .expect("built-in schema patterns compile"),
    )
});

static INSTALLED: Lazy<RwLock<Option<Arc<Registry>>>> = Lazy::new(|| RwLock::new(None));

/// Make `registry` the process-wide default for [`parse`](crate::soul::parsing::parse).
pub fn install(registry: Registry) -> Arc<Registry> {
    let registry = Arc::new(registry);
    *INSTALLED.write() = Some(Arc::clone(&registry));
    tracing::debug!("registry installed");
    registry
}

/// The installed registry, or the standard one
pub fn current() -> Arc<Registry> {
    INSTALLED.read().clone().unwrap_or_else(Registry::standard)
}

/// Clear the process-wide slot
pub fn reset() {
    *INSTALLED.write() = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_normalizes_denylist() {
        let registry = Registry::builder()
            .deny_term("  Secret ")
            .deny_terms(["secret", "Codename"])
            .build()
            .unwrap();
        assert_eq!(registry.denylist(), &["secret", "codename"]);
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(matches!(
            Registry::builder().deny_term("  ").build(),
            Err(RegistryError::EmptyTerm)
        ));
        assert!(matches!(
            Registry::builder().auth_token_digest("abc").build(),
            Err(RegistryError::InvalidDigest(_))
        ));
    }

    #[test]
    fn test_credentials_are_compared_by_digest() {
        let registry = Registry::builder()
            .auth_token("open-sesame")
            .creator_key("Ada", "ada-key")
            .build()
            .unwrap();
        assert!(registry.restricts_tokens());
        assert!(registry.accepts_token("open-sesame"));
        assert!(!registry.accepts_token("guess"));
        assert!(registry.verifies_creator_key("Ada", "ada-key"));
        assert!(!registry.verifies_creator_key("Ada", "other"));
        assert!(!registry.verifies_creator_key("Grace", "ada-key"));
    }

    #[test]
    fn test_key_tables() {
        let registry = Registry::standard();
        assert!(registry.is_deprecated("Voice.Summary"));
        assert!(registry.is_obsoleted("Heartbeat.Mood"));
        assert!(!registry.is_deprecated("Voice.Description"));
        assert!(!registry.restricts_tokens());
    }
}
