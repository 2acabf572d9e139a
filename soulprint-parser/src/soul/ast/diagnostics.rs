//! Diagnostic collection and reporting
//!
//!     Every parse attempt, successful or not, produces a [`Report`]: an ordered list of
//!     [`Diagnostic`] records. Stages never print or log findings on their own; they push them
//!     into a [`Collector`], which owns the report while the pipeline runs and decides whether a
//!     finding escalates to an abort.
//!
//! Severity and Recoverability
//!
//!     Severity describes how bad a finding is (info, warning, error, fatal). Recoverability is a
//!     separate axis: a recoverable finding is one the parser corrected or skipped over (a
//!     malformed line, a truncated value, an unknown key). Informational findings such as an
//!     applied default are not recoverable problems and never escalate.
//!
//!     In strict mode the collector turns the first recoverable finding into an abort, giving
//!     callers an all-or-nothing contract.
//!
//! Audit Records
//!
//!     The report serializes directly (via serde) to a list of
//!     `{code, severity, line, field_path, message}` records. See
//!     [formats::report](crate::soul::formats::report) for the JSON and JSON Lines renderers.

use super::error::{Abort, FatalError, FatalKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// Stable diagnostic codes. These are part of the audit format and must not be renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Code {
    // Decoder
    EncodingError,
    LineEndingError,
    LineTooLong,
    Oversize,
    // Grammar
    SyntaxError,
    MissingSignature,
    MalformedVersion,
    DuplicateSection,
    DuplicateMetadataKey,
    // Versioning
    UnsupportedVersion,
    Migrated,
    UnknownField,
    DeprecatedFieldUsed,
    ObsoletedFieldPresent,
    // Semantic
    MissingRequiredField,
    ConstraintViolation,
    ValueTruncated,
    DefaultApplied,
    DuplicateField,
    PlaceholderInserted,
    EntriesTruncated,
    MissingSection,
    InconsistentField,
    // Security
    ConsentError,
    ExpiredConsentError,
    ConsentOverride,
    AuthError,
    TamperingError,
    UnredactedTermFound,
    // Pipeline
    Cancelled,
    StrictEscalation,
}

impl Code {
    /// Codes that only describe what the parser did, never a problem with the input.
    pub fn is_informational(self) -> bool {
        matches!(
            self,
            Code::DefaultApplied | Code::Migrated | Code::ConsentOverride
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Code::EncodingError => "EncodingError",
            Code::LineEndingError => "LineEndingError",
            Code::LineTooLong => "LineTooLong",
            Code::Oversize => "Oversize",
            Code::SyntaxError => "SyntaxError",
            Code::MissingSignature => "MissingSignature",
            Code::MalformedVersion => "MalformedVersion",
            Code::DuplicateSection => "DuplicateSection",
            Code::DuplicateMetadataKey => "DuplicateMetadataKey",
            Code::UnsupportedVersion => "UnsupportedVersion",
            Code::Migrated => "Migrated",
            Code::UnknownField => "UnknownField",
            Code::DeprecatedFieldUsed => "DeprecatedFieldUsed",
            Code::ObsoletedFieldPresent => "ObsoletedFieldPresent",
            Code::MissingRequiredField => "MissingRequiredField",
            Code::ConstraintViolation => "ConstraintViolation",
            Code::ValueTruncated => "ValueTruncated",
            Code::DefaultApplied => "DefaultApplied",
            Code::DuplicateField => "DuplicateField",
            Code::PlaceholderInserted => "PlaceholderInserted",
            Code::EntriesTruncated => "EntriesTruncated",
            Code::MissingSection => "MissingSection",
            Code::InconsistentField => "InconsistentField",
            Code::ConsentError => "ConsentError",
            Code::ExpiredConsentError => "ExpiredConsentError",
            Code::ConsentOverride => "ConsentOverride",
            Code::AuthError => "AuthError",
            Code::TamperingError => "TamperingError",
            Code::UnredactedTermFound => "UnredactedTermFound",
            Code::Cancelled => "Cancelled",
            Code::StrictEscalation => "StrictEscalation",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding produced while parsing or validating a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    /// 1-based source line, when the finding maps to one
    pub line: Option<usize>,
    /// Dotted path such as `Identity.Name` or `Echoes[2].Scene`
    pub field_path: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: Code, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            line: None,
            field_path: None,
            message: message.into(),
        }
    }

    pub fn info(code: Code, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, message)
    }

    pub fn warning(code: Code, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, message)
    }

    pub fn error(code: Code, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn at_line_opt(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    /// A recoverable finding was corrected or skipped; strict mode refuses those.
    pub fn is_recoverable(&self) -> bool {
        self.severity != Severity::Fatal && !self.code.is_informational()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.code)?;
        if let Some(line) = self.line {
            write!(f, " line {line}")?;
        }
        if let Some(path) = &self.field_path {
            write!(f, " at {path}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered list of every diagnostic produced by one parse attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostics carrying the given code, in report order
    pub fn with_code(&self, code: Code) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    pub fn count(&self, code: Code) -> usize {
        self.with_code(code).count()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal().is_some()
    }

    /// The fatal diagnostic that ended the parse, if any
    pub fn fatal(&self) -> Option<&Diagnostic> {
        self.diagnostics
            .iter()
            .rev()
            .find(|d| d.severity == Severity::Fatal)
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

/// Aggregates diagnostics across all stages of a single parse.
///
/// The collector is the only place where strict mode is applied: [`Collector::record`] returns
/// an [`Abort`] the moment a recoverable diagnostic arrives while strict mode is on. Stages
/// propagate it with `?` and never need to know which mode they run in.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    report: Report,
    strict: bool,
}

impl Collector {
    pub fn new(strict: bool) -> Self {
        Self {
            report: Report::new(),
            strict,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Record a finding. In strict mode a recoverable finding aborts the parse.
    pub fn record(&mut self, diagnostic: Diagnostic) -> Result<(), Abort> {
        let escalate = self.strict && diagnostic.is_recoverable();
        let abort = escalate.then(|| Abort {
            kind: FatalKind::Escalated {
                code: diagnostic.code,
                message: diagnostic.message.clone(),
            },
            line: diagnostic.line,
            field_path: diagnostic.field_path.clone(),
        });
        self.report.push(diagnostic);
        match abort {
            Some(abort) => Err(abort),
            None => Ok(()),
        }
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }

    /// Close the report with the fatal diagnostic and produce the caller-facing error.
    pub fn fail(mut self, abort: Abort) -> FatalError {
        let code = abort.kind.code();
        let mut diagnostic = Diagnostic::new(code, Severity::Fatal, abort.kind.to_string())
            .at_line_opt(abort.line);
        if let Some(path) = abort.field_path {
            diagnostic = diagnostic.at_path(path);
        }
        self.report.push(diagnostic);
        FatalError {
            kind: abort.kind,
            report: self.report,
        }
    }
}
