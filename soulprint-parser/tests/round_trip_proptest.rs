//! Property-based tests for canonical rendering
//!
//! Any document the parser accepts renders to text that parses back to an equal Document,
//! and rendering that Document again yields the same text. That includes documents whose
//! values were cut to their field's maximum length.

use proptest::prelude::*;
use soulprint_parser::soul::formats::canonical::render;
use soulprint_parser::soul::lexing::escape;
use soulprint_parser::soul::testing::fixtures;

/// Inline values with reserved characters and inner spaces, never padded at the ends
fn inline_value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9][a-zA-Z0-9 ]{0,30}[a-zA-Z0-9]",
        "[!-~]([ -~]{0,40}[!-~])?",
        "[a-z]{1,8}[:|\"\\\\][a-z ]{0,8}[a-z]",
    ]
}

/// Raw block bodies: one to four lines, some indented past the body margin
fn block_body_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            "[!-~]([ -~]{0,30}[!-~])?",
            "  [!-~]([ -~]{0,20}[!-~])?",
        ],
        1..4,
    )
}

/// A run of text, a gap, then more text. Cut at 500 characters the value can end inside
/// the gap.
fn overlong_parts_strategy() -> impl Strategy<Value = (usize, usize, String)> {
    (480usize..=505, 0usize..6, "[a-z][a-z ]{0,20}[a-z]")
}

fn document_with(origin: &str, memory: &str, body: &[String]) -> String {
    let essence: String = body.iter().map(|line| format!("    {line}\n")).collect();
    fixtures::MINIMAL
        .replace(
            "  Name: Sovl\n",
            &format!(
                "  Name: Sovl\n  Origin: {}\n  Essence: > |\n{essence}",
                escape(origin)
            ),
        )
        .replace(
            "  - Memory: first light\n",
            &format!("  - Memory: {}\n", escape(memory)),
        )
}

proptest! {
    #[test]
    fn test_rendered_documents_reparse_equal(
        origin in inline_value_strategy(),
        memory in inline_value_strategy(),
        body in block_body_strategy(),
    ) {
        let source = document_with(&origin, &memory, &body);
        let (first, _) = fixtures::parse(&source).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(first.field("Identity", "Origin"), Some(origin.as_str()));
        let joined_body = body.join("\n");
        prop_assert_eq!(first.field("Identity", "Essence"), Some(joined_body.as_str()));

        let rendered = render(&first);
        let (second, _) = fixtures::parse(&rendered).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(render(&second), rendered);
    }
}

proptest! {
    #[test]
    fn test_truncated_values_reparse_equal(
        (run, gap, tail) in overlong_parts_strategy(),
        gap_is_blank_lines in any::<bool>(),
    ) {
        let origin = format!("{}{}{tail}", "o".repeat(run), " ".repeat(gap));
        let body = if gap_is_blank_lines {
            let mut lines = vec!["e".repeat(run)];
            lines.extend(std::iter::repeat(String::new()).take(gap));
            lines.push(tail.clone());
            lines
        } else {
            vec![format!("{}{}{tail}", "e".repeat(run), " ".repeat(gap))]
        };

        let source = document_with(&origin, "first light", &body);
        let (first, _) = fixtures::parse(&source).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let origin = first.field("Identity", "Origin").unwrap_or_default();
        prop_assert!(origin.chars().count() <= 500);
        prop_assert!(!origin.ends_with(' '));

        let rendered = render(&first);
        let (second, _) = fixtures::parse(&rendered).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(render(&second), rendered);
    }
}

#[test]
fn test_value_cut_at_a_space_renders_stably() {
    let changes = format!("{} tail", "x".repeat(2499));
    let source = fixtures::MINIMAL.replace("Changes: born", &format!("Changes: {changes}"));
    let (first, _) = fixtures::parse(&source).unwrap();
    let (second, _) = fixtures::parse(&render(&first)).unwrap();
    assert_eq!(first, second);
    let chronicle = first.section("Chronicle").unwrap();
    let changes = chronicle.items().next().unwrap().get("Changes");
    assert_eq!(changes.map(str::len), Some(2499));
}
