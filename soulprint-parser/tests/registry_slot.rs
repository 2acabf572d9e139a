//! The process-wide registry slot.
//!
//! Kept in its own test binary: installing a registry changes what every `parse` call in the
//! process sees.

use soulprint_parser::soul::ast::Code;
use soulprint_parser::soul::registry;
use soulprint_parser::soul::testing::fixtures;
use soulprint_parser::{parse, ParseOptions, Registry};

#[test]
fn test_install_current_and_reset() {
    let before = registry::current();
    assert!(before.denylist().is_empty());

    let installed = registry::install(Registry::builder().deny_term("steady").build().unwrap());
    assert_eq!(registry::current().denylist(), installed.denylist());

    let (_, report) = parse(fixtures::MINIMAL.as_bytes(), &ParseOptions::default()).unwrap();
    assert_eq!(report.count(Code::UnredactedTermFound), 1);

    registry::reset();
    assert!(registry::current().denylist().is_empty());
    let (_, report) = parse(fixtures::MINIMAL.as_bytes(), &ParseOptions::default()).unwrap();
    assert_eq!(report.count(Code::UnredactedTermFound), 0);
}
