//! Testing utilities
//!
//!     Soulprint sources are easy to get slightly wrong: an unescaped colon in a timestamp, a
//!     block body indented one space short, a Resonance of `.9`. A test written against such a
//!     source tunes the parser to the wrong thing. Two rules keep tests honest:
//!
//!         1. Use the verified documents in [fixtures] instead of ad-hoc source strings. When
//!            a test needs a variation, derive it from a fixture with a targeted `replace`.
//!         2. Check results with the fluent assertions ([`assert_document`],
//!            [`assert_report`]) rather than walking the Document by hand, so a change in the
//!            model only touches the assertion code.
//!
//! Usage Example
//!
//!     ```rust,ignore
//!     use soulprint_parser::soul::testing::{assert_document, assert_report, fixtures};
//!
//!     let (doc, report) = fixtures::parse(fixtures::CANONICAL).unwrap();
//!     assert_document(&doc)
//!         .field("Identity", "Name", "Sovl")
//!         .section("Echoes", |echoes| {
//!             echoes.entry_count(2).item(0, |item| item.field("Resonance", "0.9"));
//!         });
//!     assert_report(&report).no_fatal().none(Code::SyntaxError);
//!     ```

pub mod assertions;
pub mod fixtures;

pub use assertions::{
    assert_document, assert_report, DocumentAssertion, ItemAssertion, ReportAssertion,
    SectionAssertion,
};
