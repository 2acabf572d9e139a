//! Document loading utilities
//!
//! `DocumentLoader` reads a soulprint source from a file or memory and runs the parse on it.
//! It is used by the CLI and by tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use soulprint_parser::soul::loader::DocumentLoader;
//! use soulprint_parser::ParseOptions;
//!
//! let loader = DocumentLoader::from_path("profile.soul")?;
//! let (document, report) = loader.parse(&ParseOptions::default())?;
//! let canonical = loader.canonical(&ParseOptions::default())?;
//! ```

use crate::soul::ast::{Document, FatalError, Report};
use crate::soul::formats::canonical;
use crate::soul::integrity::seal;
use crate::soul::options::ParseOptions;
use crate::soul::parsing::{parse, parse_with_registry};
use crate::soul::registry::Registry;
use std::fs;
use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl LoaderError {
    /// The parse report, when the failure was a rejected parse
    pub fn report(&self) -> Option<&Report> {
        match self {
            LoaderError::Fatal(err) => Some(&err.report),
            _ => None,
        }
    }
}

/// Source bytes plus shortcuts for the common operations on them
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    source: Vec<u8>,
}

impl DocumentLoader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let source = fs::read(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = source.len(), "source loaded");
        Ok(DocumentLoader { source })
    }

    pub fn from_bytes<B: Into<Vec<u8>>>(source: B) -> Self {
        DocumentLoader {
            source: source.into(),
        }
    }

    pub fn from_string<S: Into<String>>(source: S) -> Self {
        Self::from_bytes(source.into().into_bytes())
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Parse against the current process-wide registry
    pub fn parse(&self, options: &ParseOptions) -> Result<(Document, Report), LoaderError> {
        Ok(parse(&self.source, options)?)
    }

    pub fn parse_with_registry(
        &self,
        options: &ParseOptions,
        registry: Arc<Registry>,
    ) -> Result<(Document, Report), LoaderError> {
        Ok(parse_with_registry(&self.source, options, registry)?)
    }

    /// Parse, then render the Document in canonical layout
    pub fn canonical(&self, options: &ParseOptions) -> Result<String, LoaderError> {
        let (document, _) = self.parse(options)?;
        Ok(canonical::render(&document))
    }

    /// The source with its Hash line written or refreshed
    pub fn sealed(&self) -> Result<String, LoaderError> {
        let text = String::from_utf8(self.source.clone())?;
        Ok(seal(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soul::ast::FatalKind;
    use crate::soul::testing::fixtures;

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = DocumentLoader::from_path("does/not/exist.soul").unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
        assert!(err.report().is_none());
    }

    #[test]
    fn test_parse_from_string() {
        let loader = DocumentLoader::from_string(fixtures::MINIMAL);
        let (document, _) = loader
            .parse_with_registry(&ParseOptions::default(), Registry::standard())
            .unwrap();
        assert_eq!(document.field("Identity", "Name"), Some("Sovl"));
    }

    #[test]
    fn test_rejection_carries_the_report() {
        let loader = DocumentLoader::from_string("%SOULPRINT\n%VERSION: v9.0.0\n");
        let err = loader
            .parse_with_registry(&ParseOptions::default(), Registry::standard())
            .unwrap_err();
        match &err {
            LoaderError::Fatal(fatal) => {
                assert!(matches!(fatal.kind, FatalKind::UnsupportedVersion { found: 9, .. }))
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.report().is_some_and(|r| r.has_fatal()));
    }

    #[test]
    fn test_sealed_source_parses() {
        let sealed = DocumentLoader::from_string(fixtures::MINIMAL).sealed().unwrap();
        let (document, _) = DocumentLoader::from_string(sealed)
            .parse_with_registry(&ParseOptions::default(), Registry::standard())
            .unwrap();
        assert!(document.metadata().hash().is_some());
    }

    #[test]
    fn test_invalid_utf8_cannot_be_sealed() {
        let loader = DocumentLoader::from_bytes(vec![0xff, 0xfe]);
        assert!(matches!(loader.sealed(), Err(LoaderError::Utf8(_))));
    }
}
