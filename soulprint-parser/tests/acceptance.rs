//! End-to-end behavior of `parse` on the verified fixtures and targeted variations of them

use rstest::rstest;
use soulprint_parser::soul::ast::{Code, FatalKind, PrivacyLevel, Severity};
use soulprint_parser::soul::integrity::seal;
use soulprint_parser::soul::options::{Mode, ParseOptions, JUMBO_CEILING};
use soulprint_parser::soul::testing::{assert_document, assert_report, fixtures};
use soulprint_parser::{parse_with_registry, Registry};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn with_name(name: &str) -> String {
    fixtures::MINIMAL.replace("Name: Sovl\n", &format!("Name: {name}\n"))
}

/// MINIMAL padded with comment lines up to `size` bytes
fn padded(size: usize) -> Vec<u8> {
    let filler = format!("# {}\n", "~".repeat(4000));
    let mut bytes = fixtures::MINIMAL.as_bytes().to_vec();
    while bytes.len() + filler.len() <= size {
        bytes.extend_from_slice(filler.as_bytes());
    }
    bytes.resize(size, b'\n');
    bytes
}

#[test]
fn test_name_pattern_is_enforced() {
    let (doc, _) = fixtures::parse(&with_name("Sovl-1")).unwrap();
    assert_document(&doc).field("Identity", "Name", "Sovl-1");

    let err = fixtures::parse(&with_name("Sovl!")).unwrap_err();
    assert_eq!(err.code(), Code::ConstraintViolation);
    assert_report(&err.report).ends_with_fatal(Code::ConstraintViolation);
}

#[test]
fn test_empty_required_section_is_padded() {
    let source = fixtures::MINIMAL.replace("  - Memory: first light\n    Emotion: wonder\n", "");
    let (doc, report) = fixtures::parse(&source).unwrap();

    assert_document(&doc).section("Echoes", |echoes| {
        echoes
            .entry_count(1)
            .placeholder_count(1)
            .item(0, |item| {
                item.field("Memory", "[VOID]").is_placeholder();
            });
    });
    assert_report(&report)
        .count(Code::PlaceholderInserted, 1)
        .at_path(Code::PlaceholderInserted, "Echoes");
}

#[test]
fn test_overlong_chronicle_entry_is_truncated_once() {
    let changes = "a".repeat(3000);
    let source = fixtures::MINIMAL.replace("Changes: born", &format!("Changes: {changes}"));
    let (doc, report) = fixtures::parse(&source).unwrap();

    assert_document(&doc).section("Chronicle", |chronicle| {
        chronicle.item(0, |item| {
            item.field("Changes", &"a".repeat(2500));
        });
    });
    assert_report(&report)
        .count(Code::ValueTruncated, 1)
        .at_path(Code::ValueTruncated, "Chronicle[0].Changes");
}

#[test]
fn test_flipped_byte_after_sealing_is_tampering() {
    let sealed = seal(fixtures::MINIMAL);
    assert!(fixtures::parse(&sealed).is_ok());

    let mut bytes = sealed.into_bytes();
    let at = bytes.len() - 3;
    bytes[at] ^= 0x01;
    let err = parse_with_registry(&bytes, &ParseOptions::default(), Registry::standard())
        .unwrap_err();
    assert!(matches!(err.kind, FatalKind::Tampering { .. }));
    assert_report(&err.report).ends_with_fatal(Code::TamperingError);
}

#[rstest]
#[case::broken_name("Name: Sovl", "Name: Sov!")]
#[case::impossible_month("Created: 2024-03", "Created: 2024-13")]
#[case::refused_consent("Consent: true", "Consent: nope")]
fn test_edit_after_sealing_is_tampering_even_when_invalid(#[case] from: &str, #[case] to: &str) {
    let edited = seal(fixtures::MINIMAL).replacen(from, to, 1);
    let err = fixtures::parse(&edited).unwrap_err();
    assert!(matches!(err.kind, FatalKind::Tampering { .. }), "{:?}", err.kind);
    assert_report(&err.report)
        .count(Code::ConstraintViolation, 0)
        .ends_with_fatal(Code::TamperingError);
}

#[test]
fn test_withdrawn_consent_is_a_consent_error() {
    let source = fixtures::MINIMAL.replace("Consent: true", "Consent: withdrawn");
    let err = fixtures::parse(&source).unwrap_err();
    assert_eq!(err.kind, FatalKind::Consent);
    assert_report(&err.report).ends_with_fatal(Code::ConsentError);
}

#[test]
fn test_consent_false_rejects_an_otherwise_valid_document() {
    let source = fixtures::CANONICAL.replace("Consent: true", "Consent: false");
    let err = fixtures::parse(&source).unwrap_err();
    assert_eq!(err.kind, FatalKind::Consent);
}

#[rstest]
#[case::standard_over_ceiling(Mode::Standard, 6 * 1024 * 1024, false)]
#[case::jumbo_within_ceiling(Mode::Jumbo, 6 * 1024 * 1024, true)]
#[case::jumbo_over_ceiling(Mode::Jumbo, 11 * 1024 * 1024, false)]
fn test_size_ceilings(#[case] mode: Mode, #[case] size: usize, #[case] accepted: bool) {
    let bytes = padded(size);
    let options = ParseOptions::new().with_mode(mode);
    let result = parse_with_registry(&bytes, &options, Registry::standard());
    match result {
        Ok(_) => assert!(accepted, "{size} bytes accepted in {mode:?} mode"),
        Err(err) => {
            assert!(!accepted, "{size} bytes rejected in {mode:?} mode: {err}");
            assert!(matches!(err.kind, FatalKind::Oversize { .. }));
        }
    }
}

#[test]
fn test_eleven_megabytes_in_jumbo_mode_is_oversize() {
    let bytes = vec![b'\n'; 11 * 1024 * 1024];
    let err = parse_with_registry(&bytes, &ParseOptions::new().jumbo(), Registry::standard())
        .unwrap_err();
    assert_eq!(
        err.kind,
        FatalKind::Oversize {
            size: 11 * 1024 * 1024,
            limit: JUMBO_CEILING
        }
    );
}

#[test]
fn test_private_document_needs_the_creator_key() {
    let source = fixtures::MINIMAL.replace("PrivacyLevel: public", "PrivacyLevel: private");
    let registry = Arc::new(
        Registry::builder()
            .creator_key("Ada", "lantern-key")
            .build()
            .unwrap(),
    );

    let err = parse_with_registry(source.as_bytes(), &ParseOptions::new(), Arc::clone(&registry))
        .unwrap_err();
    assert_eq!(err.code(), Code::AuthError);

    let options = ParseOptions::new().with_creator_key("lantern-key");
    let (doc, _) = parse_with_registry(source.as_bytes(), &options, registry).unwrap();
    assert_document(&doc).privacy(PrivacyLevel::Private);
}

#[test]
fn test_restricted_document_needs_an_accepted_token() {
    let source = fixtures::MINIMAL.replace("PrivacyLevel: public", "PrivacyLevel: restricted");
    let registry = Arc::new(Registry::builder().auth_token("reader").build().unwrap());

    let denied = ParseOptions::new().with_auth_token("stranger");
    let err = parse_with_registry(source.as_bytes(), &denied, Arc::clone(&registry)).unwrap_err();
    assert_eq!(err.code(), Code::AuthError);

    let allowed = ParseOptions::new().with_auth_token("reader");
    assert!(parse_with_registry(source.as_bytes(), &allowed, registry).is_ok());
}

#[test]
fn test_strict_mode_refuses_silent_corrections() {
    let source = fixtures::MINIMAL.replace("  Pulse: steady\n", "  Pulse: steady\n  Colour: red\n");

    let (_, report) = fixtures::parse(&source).unwrap();
    assert_report(&report)
        .count(Code::UnknownField, 1)
        .at_path(Code::UnknownField, "Heartbeat.Colour");

    let err = fixtures::parse_with(&source, &ParseOptions::new().strict(true)).unwrap_err();
    assert!(matches!(
        err.kind,
        FatalKind::Escalated {
            code: Code::UnknownField,
            ..
        }
    ));
    assert_report(&err.report).ends_with_fatal(Code::StrictEscalation);
}

#[test]
fn test_strict_mode_accepts_a_clean_document() {
    let options = ParseOptions::new().strict(true);
    let (doc, report) = fixtures::parse_with(fixtures::CANONICAL, &options).unwrap();
    assert_document(&doc).field("Identity", "Name", "Sovl");
    assert_report(&report).severity_count(Severity::Warning, 0);
}

#[test]
fn test_expired_deadline_cancels() {
    let options = ParseOptions::new().with_deadline(Instant::now() - Duration::from_millis(1));
    let err = fixtures::parse_with(fixtures::CANONICAL, &options).unwrap_err();
    assert_eq!(err.kind, FatalKind::Cancelled);
    assert_eq!(err.report.len(), 1);
}

#[test]
fn test_duplicate_section_aborts() {
    let source = format!("{}\n[Identity]\n  Name: Again\n", fixtures::MINIMAL);
    let err = fixtures::parse(&source).unwrap_err();
    assert_eq!(
        err.kind,
        FatalKind::DuplicateSection {
            name: "Identity".to_string()
        }
    );
}

#[test]
fn test_concurrent_parses_share_one_registry() {
    let registry = Registry::standard();
    let expected = fixtures::parse(fixtures::CANONICAL).unwrap().0;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    parse_with_registry(
                        fixtures::CANONICAL.as_bytes(),
                        &ParseOptions::default(),
                        registry,
                    )
                    .map(|(doc, _)| doc)
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), expected);
        }
    });
}
