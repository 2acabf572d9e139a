//! Error types for fatal parse outcomes
//!
//!     A fatal outcome aborts the whole parse: no Document is produced. Stages signal one by
//!     returning an [`Abort`], which carries the kind plus the source line and field path it
//!     relates to. The [`Collector`](super::diagnostics::Collector) turns the abort into the
//!     caller-facing [`FatalError`], whose report already ends with the fatal diagnostic.

use super::diagnostics::{Code, Report};
use thiserror::Error;

/// Every reason a parse can be rejected as a whole
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalKind {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("line {line}: line terminator other than a single line feed")]
    LineEnding { line: usize },

    #[error("input is {size} bytes, above the {limit}-byte ceiling")]
    Oversize { size: usize, limit: usize },

    #[error("missing or malformed %SOULPRINT signature")]
    Signature,

    #[error("missing or malformed %VERSION line: {0}")]
    Version(String),

    #[error("unsupported major version {found} (this parser reads major {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("section [{name}] appears more than once")]
    DuplicateSection { name: String },

    #[error("metadata key '{key}' appears more than once")]
    DuplicateMetadataKey { key: String },

    #[error("required metadata field '{field}' is missing")]
    MissingRequiredField { field: String },

    #[error("{path}: {message}")]
    ConstraintViolation { path: String, message: String },

    #[error("consent is not granted (Consent must be true)")]
    Consent,

    #[error("consent expired at {expiry}")]
    ExpiredConsent { expiry: String },

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("content hash mismatch: document declares {declared}, content digests to {computed}")]
    Tampering { declared: String, computed: String },

    #[error("parse cancelled")]
    Cancelled,

    #[error("strict mode: {code} is not tolerated ({message})")]
    Escalated { code: Code, message: String },
}

impl FatalKind {
    /// Diagnostic code recorded for this abort
    pub fn code(&self) -> Code {
        match self {
            FatalKind::Encoding(_) => Code::EncodingError,
            FatalKind::LineEnding { .. } => Code::LineEndingError,
            FatalKind::Oversize { .. } => Code::Oversize,
            FatalKind::Signature => Code::MissingSignature,
            FatalKind::Version(_) => Code::MalformedVersion,
            FatalKind::UnsupportedVersion { .. } => Code::UnsupportedVersion,
            FatalKind::DuplicateSection { .. } => Code::DuplicateSection,
            FatalKind::DuplicateMetadataKey { .. } => Code::DuplicateMetadataKey,
            FatalKind::MissingRequiredField { .. } => Code::MissingRequiredField,
            FatalKind::ConstraintViolation { .. } => Code::ConstraintViolation,
            FatalKind::Consent => Code::ConsentError,
            FatalKind::ExpiredConsent { .. } => Code::ExpiredConsentError,
            FatalKind::Auth(_) => Code::AuthError,
            FatalKind::Tampering { .. } => Code::TamperingError,
            FatalKind::Cancelled => Code::Cancelled,
            FatalKind::Escalated { .. } => Code::StrictEscalation,
        }
    }
}

/// Internal signal that a stage cannot continue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    pub kind: FatalKind,
    pub line: Option<usize>,
    pub field_path: Option<String>,
}

impl Abort {
    pub fn new(kind: FatalKind) -> Self {
        Self {
            kind,
            line: None,
            field_path: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }
}

impl From<FatalKind> for Abort {
    fn from(kind: FatalKind) -> Self {
        Abort::new(kind)
    }
}

/// A rejected parse: the reason plus the full report collected up to the abort
#[derive(Error, Debug, Clone)]
#[error("{kind}")]
pub struct FatalError {
    pub kind: FatalKind,
    pub report: Report,
}

impl FatalError {
    pub fn code(&self) -> Code {
        self.kind.code()
    }
}

/// Result of a parse attempt
pub type ParseResult<T> = Result<T, FatalError>;
