//! Verified soulprint documents
//!
//!     Each fixture parses cleanly in non-strict mode against the standard registry.
//!
//!         MINIMAL     required metadata and sections only, already in canonical layout
//!         CANONICAL   every catalog section, blocks, custom keys and a redaction log
//!         SHUFFLED    CANONICAL with its sections in a different order
//!         LEGACY      a major-0 document; needs `migrate_legacy`

use crate::soul::ast::{Document, ParseResult, Report};
use crate::soul::options::ParseOptions;
use crate::soul::parsing::parse_with_registry;
use crate::soul::registry::Registry;

pub const MINIMAL: &str = include_str!("../../../fixtures/minimal.soul");
pub const CANONICAL: &str = include_str!("../../../fixtures/canonical.soul");
pub const SHUFFLED: &str = include_str!("../../../fixtures/shuffled.soul");
pub const LEGACY: &str = include_str!("../../../fixtures/legacy.soul");

/// Every fixture that parses with default options, by name
pub fn all() -> [(&'static str, &'static str); 3] {
    [
        ("minimal", MINIMAL),
        ("canonical", CANONICAL),
        ("shuffled", SHUFFLED),
    ]
}

/// Parse with default options against the standard registry
pub fn parse(source: &str) -> ParseResult<(Document, Report)> {
    parse_with(source, &ParseOptions::default())
}

/// Parse with the given options against the standard registry
pub fn parse_with(source: &str, options: &ParseOptions) -> ParseResult<(Document, Report)> {
    parse_with_registry(source.as_bytes(), options, Registry::standard())
}
