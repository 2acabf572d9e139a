//! AST for the soulprint format
//!
//!     The validated [`Document`] plus the reporting types that accompany every parse:
//!     [`Report`] and [`Diagnostic`] for findings, [`FatalError`] for rejected parses.

pub mod diagnostics;
pub mod document;
pub mod error;

pub use diagnostics::{Code, Collector, Diagnostic, Report, Severity};
pub use document::{
    Document, Entry, EntryKind, Field, FieldStyle, Header, ListItem, Metadata, PrivacyLevel,
    Section, CUSTOM_PREFIX, PLACEHOLDER, SIGNATURE,
};
pub use error::{Abort, FatalError, FatalKind, ParseResult};
