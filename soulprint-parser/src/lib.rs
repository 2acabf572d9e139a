//! # soulprint
//!
//! A parser and validator for the soulprint format: a human-authored, line-based text file
//! that serializes an entity's identity, memory and behavior profile.
//!
//! File Layout
//!
//!     Everything lives under [soul]. The layout follows the data flow, which is strictly one
//!     directional:
//!
//!         bytes → lexing (decoder + line classification)
//!               → parsing (grammar state machine → parse tree)
//!               → validation (integrity, versioning, semantic, security)
//!               → (Document, Report)
//!
//!     The [formats](soul::formats) module renders a Document back to canonical source and a
//!     Report to audit records.
//!
//! For testing guidelines and fixture documents, see the [testing module](soul::testing).

pub mod soul;

pub use soul::ast::{Code, Diagnostic, Document, FatalError, FatalKind, Report, Severity};
pub use soul::options::{CancelToken, Mode, ParseOptions};
pub use soul::parsing::{parse, parse_with_registry};
pub use soul::registry::Registry;
