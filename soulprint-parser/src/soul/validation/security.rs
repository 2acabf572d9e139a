//! Security gates
//!
//!     Gates run in a fixed order and the first failing one aborts the parse:
//!
//!         1. Integrity   a declared Hash must equal the digest of the content
//!         2. Consent     `Consent` must be `true`
//!         3. Expiry      a past `ConsentExpiry` is fatal unless the caller allows it
//!         4. Privacy     restricted documents need an accepted auth token, private documents
//!                        need the creator's key
//!         5. Redaction   values containing a redacted or denylisted term are reported
//!
//!     Integrity runs over the parse tree, ahead of versioning and the semantic layer: any
//!     edit to a sealed file is reported as Tampering even when it also breaks a field.
//!     The other gates run over the finished Document.
//!
//!     Redaction never aborts on its own. The term list is the union of every `Term` in the
//!     RedactionLog section and the registry's global denylist, matched case-insensitively as
//!     substrings. Messages never echo the matched term.

use super::{field_path, item_path};
use crate::soul::ast::{Abort, Code, Collector, Diagnostic, Document, Entry, FatalKind, PrivacyLevel};
use crate::soul::integrity::{is_digest, HASH_KEY};
use crate::soul::options::ParseOptions;
use crate::soul::parsing::ir::ParseTree;
use crate::soul::registry::schema::TIMESTAMP_FORMAT;
use crate::soul::registry::Registry;

/// Section holding the redaction log
pub const REDACTION_LOG: &str = "RedactionLog";

/// Compare the declared Hash with the digest computed during the grammar pass.
///
/// A declared value that is not a digest is left to the Hash field's own pattern.
pub fn verify_integrity(tree: &ParseTree) -> Result<(), Abort> {
    let Some(node) = tree.metadata_field(HASH_KEY) else {
        return Ok(());
    };
    if !is_digest(&node.value) {
        return Ok(());
    }
    if node.value != tree.digest {
        return Err(Abort::new(FatalKind::Tampering {
            declared: node.value.clone(),
            computed: tree.digest.clone(),
        })
        .at_line(node.line)
        .at_path(HASH_KEY));
    }
    tracing::debug!("content hash verified");
    Ok(())
}

/// Run the consent, privacy and redaction gates over a validated document.
pub fn enforce(
    document: &Document,
    registry: &Registry,
    options: &ParseOptions,
    collector: &mut Collector,
) -> Result<(), Abort> {
    check_consent(document, options, collector)?;
    check_privacy(document, registry, options)?;
    scan_redactions(document, registry, collector)
}

fn check_consent(
    document: &Document,
    options: &ParseOptions,
    collector: &mut Collector,
) -> Result<(), Abort> {
    let metadata = document.metadata();
    if !metadata.consent() {
        return Err(Abort::new(FatalKind::Consent).at_path("Consent"));
    }

    let Some(expiry) = metadata.consent_expiry() else {
        return Ok(());
    };
    if expiry >= options.now() {
        return Ok(());
    }
    let expiry = expiry.format(TIMESTAMP_FORMAT).to_string();
    if !options.allow_expired_consent {
        return Err(Abort::new(FatalKind::ExpiredConsent { expiry }).at_path("ConsentExpiry"));
    }
    collector.record(
        Diagnostic::info(
            Code::ConsentOverride,
            format!("consent expired at {expiry}; accepted by caller override"),
        )
        .at_path("ConsentExpiry"),
    )
}

fn check_privacy(
    document: &Document,
    registry: &Registry,
    options: &ParseOptions,
) -> Result<(), Abort> {
    let denied = |reason: &str| {
        Abort::new(FatalKind::Auth(reason.to_string())).at_path("PrivacyLevel")
    };

    match document.metadata().privacy_level() {
        PrivacyLevel::Public => Ok(()),
        PrivacyLevel::Restricted => {
            let token = options
                .auth_token
                .as_deref()
                .filter(|token| !token.is_empty())
                .ok_or_else(|| denied("restricted document requires an auth token"))?;
            if registry.restricts_tokens() && !registry.accepts_token(token) {
                return Err(denied("auth token is not accepted"));
            }
            Ok(())
        }
        PrivacyLevel::Private => {
            let creator = document.metadata().creator();
            let key = options
                .creator_key
                .as_deref()
                .ok_or_else(|| denied("private document requires the creator key"))?;
            if !registry.has_creator(creator) {
                return Err(denied("no key is registered for the document's creator"));
            }
            if !registry.verifies_creator_key(creator, key) {
                return Err(denied("creator key does not match"));
            }
            Ok(())
        }
    }
}

fn scan_redactions(
    document: &Document,
    registry: &Registry,
    collector: &mut Collector,
) -> Result<(), Abort> {
    let mut terms: Vec<String> = registry.denylist().to_vec();
    if let Some(log) = document.section(REDACTION_LOG) {
        for item in log.items().filter(|item| !item.is_placeholder()) {
            let Some(term) = item.get("Term") else {
                continue;
            };
            let term = term.trim().to_lowercase();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
    }
    if terms.is_empty() {
        return Ok(());
    }

    let leaks = |value: &str| {
        let value = value.to_lowercase();
        terms.iter().any(|term| value.contains(term.as_str()))
    };

    for section in document.sections() {
        if section.is_custom() || section.name() == REDACTION_LOG {
            continue;
        }
        let mut items = 0;
        for entry in section.entries() {
            let fields = match entry {
                Entry::Field(field) => vec![(field_path(section.name(), field.key()), field)],
                Entry::ListItem(item) => {
                    let index = items;
                    items += 1;
                    item.fields()
                        .iter()
                        .map(|field| (item_path(section.name(), index, field.key()), field))
                        .collect()
                }
            };
            for (path, field) in fields {
                if field.is_placeholder() || !leaks(field.value()) {
                    continue;
                }
                collector.record(
                    Diagnostic::warning(
                        Code::UnredactedTermFound,
                        "value contains a redacted term",
                    )
                    .at_path(path),
                )?;
            }
        }
    }
    Ok(())
}
