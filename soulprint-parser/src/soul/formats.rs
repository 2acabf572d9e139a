//! Output formats
//!
//!     Two things leave the parser as text: the [`Document`] and the [`Report`].
//!
//!         - [canonical]: the Document back to soulprint source, in the canonical layout.
//!           Parsing the output yields an equal Document.
//!         - [report]: the Report as human-readable text or as an audit artifact (a JSON
//!           array, JSON Lines or YAML list of `{code, severity, line, field_path, message}`
//!           records).
//!
//!     The Document can also be dumped as JSON with [`document_json`] for inspection.
//!
//! [`Report`]: crate::soul::ast::Report

pub mod canonical;
pub mod report;

use crate::soul::ast::Document;
use thiserror::Error;

pub use canonical::render;
pub use report::{render_report, ReportFormat};

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown format '{0}'")]
    UnknownFormat(String),
}

/// Pretty-printed JSON of the whole Document
pub fn document_json(document: &Document) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(document)?)
}
