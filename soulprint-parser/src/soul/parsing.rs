//! Parsing module for the soulprint format
//!
//!     This module provides the complete processing pipeline from raw bytes to a validated
//!     Document:
//!         1. Decoding: size ceiling, encoding and line-ending checks, line classification.
//!            See [lexing](crate::soul::lexing) module.
//!         2. Analysis: the grammar state machine builds the parse tree and digests the
//!            content. See [engine](engine) module.
//!         3. Validation: integrity, versioning, semantic and security layers, run as
//!            transform stages. See [validation](crate::soul::validation) and
//!            [standard](crate::soul::transforms::standard).
//!
//! Parsing End To End
//!
//!     [`parse`] and [`parse_with_registry`] are the entry points. Both return the Document
//!     with the report of everything that was corrected or flagged, or a
//!     [`FatalError`](crate::soul::ast::FatalError) whose report ends with the fatal
//!     diagnostic.
//!
//!     A parse holds no global state other than reading the registry. Any number of parses
//!     may run concurrently over the same registry.
//!
//! Terminology
//!
//!     - parse: the entire process (decoding + analysis + validation)
//!     - analyze/analysis: the grammar pass specifically
//!     - validate: the three validation layers
//!
//! Testing
//!
//!     See the [testing module](crate::soul::testing) for fixture documents and assertions.

pub mod engine;
pub mod ir;

use crate::soul::ast::{Abort, Document, ParseResult, Report};
use crate::soul::lexing::decode;
use crate::soul::options::ParseOptions;
use crate::soul::registry::{self, Registry};
use crate::soul::transforms::stages::{Context, Staged};
use crate::soul::transforms::standard::VALIDATION;
use ir::ParseTree;
use std::sync::Arc;

/// Parse and validate a soulprint document against the current registry.
///
/// The registry is the one placed by [`registry::install`], or the standard one.
#[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
pub fn parse(bytes: &[u8], options: &ParseOptions) -> ParseResult<(Document, Report)> {
    parse_with_registry(bytes, options, registry::current())
}

/// Parse and validate a soulprint document against an explicit registry.
pub fn parse_with_registry(
    bytes: &[u8],
    options: &ParseOptions,
    registry: Arc<Registry>,
) -> ParseResult<(Document, Report)> {
    let mut ctx = Context::new(options.clone(), registry);
    let tree = match analyze_bytes(bytes, &mut ctx) {
        Ok(tree) => tree,
        Err(abort) => return Err(ctx.fail(abort)),
    };
    tracing::debug!(
        sections = tree.sections.len(),
        metadata = tree.metadata.len(),
        "grammar pass complete"
    );

    let Staged { ctx, value } = VALIDATION.run(Staged::new(ctx, tree))?;
    let report = ctx.collector.into_report();
    tracing::info!(diagnostics = report.len(), "document accepted");
    Ok((value, report))
}

fn analyze_bytes(bytes: &[u8], ctx: &mut Context) -> Result<ParseTree, Abort> {
    ctx.checkpoint()?;
    let lines = decode(bytes, ctx.options.mode)?;
    engine::analyze(lines, &ctx.options, &mut ctx.collector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soul::ast::{Code, FatalKind};
    use crate::soul::options::CancelToken;
    use crate::soul::testing::fixtures;

    fn standard(source: &str, options: &ParseOptions) -> ParseResult<(Document, Report)> {
        parse_with_registry(source.as_bytes(), options, Registry::standard())
    }

    #[test]
    fn test_parse_minimal_fixture() {
        let (document, report) = standard(fixtures::MINIMAL, &ParseOptions::default()).unwrap();
        assert_eq!(document.field("Identity", "Name"), Some("Sovl"));
        assert!(!report.has_fatal());
    }

    #[test]
    fn test_fatal_report_ends_with_the_fatal_diagnostic() {
        let source = fixtures::MINIMAL.replace("Consent: true", "Consent: false");
        let err = standard(&source, &ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, FatalKind::Consent);
        let last = err.report.diagnostics().last().unwrap();
        assert_eq!(last.code, Code::ConsentError);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let options = ParseOptions::new().with_cancel_token(token);
        let err = standard(fixtures::MINIMAL, &options).unwrap_err();
        assert_eq!(err.kind, FatalKind::Cancelled);
        assert_eq!(err.report.len(), 1);
    }

    #[test]
    fn test_decoder_failures_are_reported() {
        let err = standard("%SOULPRINT\r\n", &ParseOptions::default()).unwrap_err();
        assert_eq!(err.code(), Code::LineEndingError);
        assert!(err.report.has_fatal());
    }
}
