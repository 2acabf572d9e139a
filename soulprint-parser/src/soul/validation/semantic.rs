//! Semantic validation
//!
//!     Turns the routed parse tree into a [`Document`]. Every check is driven by the schema
//!     catalog in the registry:
//!
//!         - Required metadata must be present; a missing key is fatal.
//!         - Optional metadata that is absent gets its default, reported as DefaultApplied.
//!         - Each value is checked against its field's maximum length and pattern. Strict
//!           fields abort on any violation. Lenient fields are truncated when too long
//!           (ValueTruncated) and kept with a warning when the pattern does not match. A cut
//!           value also loses what a re-parse would drop at its new end: trailing spaces of
//!           an inline value, trailing blank lines of a block.
//!         - A key repeated within one section (or one list item) keeps its first occurrence.
//!         - Entry counts are brought into the section's range for the current mode: missing
//!           entries are padded with placeholders, excess entries are cut.
//!         - Required sections that never appeared are synthesized from placeholders.
//!         - Cross-field rules (a Chronicle version entry must be a semantic version no newer
//!           than the document) are reported as warnings.
//!
//!     Placeholders are only ever inserted after the constraints ran. A `[VOID]` written by the
//!     author is an ordinary value and meets the same constraints as any other.

use super::versioning::{classify_key, KeyClass};
use super::{field_path, item_path};
use crate::soul::ast::{
    Abort, Code, Collector, Diagnostic, Document, Entry, FatalKind, Field, FieldStyle, Header,
    ListItem, Metadata, PrivacyLevel, Section, CUSTOM_PREFIX,
};
use crate::soul::options::ParseOptions;
use crate::soul::parsing::ir::{EntryNode, FieldNode, ItemNode, ParseTree, SectionNode};
use crate::soul::registry::schema::TIMESTAMP_FORMAT;
use crate::soul::registry::{FieldSpec, Registry, SectionSpec};
use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static SEMVER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)$").unwrap());

/// List-item fields that must hold a version no newer than the document
const VERSIONED_FIELDS: &[(&str, &str)] = &[("Chronicle", "VersionEntry")];

/// Build the Document from a routed parse tree.
pub fn validate(
    tree: ParseTree,
    registry: &Registry,
    options: &ParseOptions,
    collector: &mut Collector,
) -> Result<Document, Abort> {
    let ParseTree {
        header,
        metadata,
        sections,
        ..
    } = tree;

    let metadata = build_metadata(metadata, registry, collector)?;
    let mut document = Document {
        header,
        metadata,
        sections: Vec::with_capacity(sections.len()),
        extensions: Vec::new(),
    };

    for node in sections {
        if node.name.starts_with(CUSTOM_PREFIX) {
            document.sections.push(verbatim_section(node));
            continue;
        }
        match registry.schema().section(&node.name) {
            Some(spec) => {
                let section = build_section(node, spec, header, options, collector)?;
                document.sections.push(section);
            }
            None => document.extensions.push(verbatim_section(node)),
        }
    }

    synthesize_missing(&mut document, registry, options, collector)?;

    tracing::debug!(
        sections = document.sections.len(),
        extensions = document.extensions.len(),
        "semantic validation complete"
    );
    Ok(document)
}

fn build_metadata(
    fields: Vec<FieldNode>,
    registry: &Registry,
    collector: &mut Collector,
) -> Result<Metadata, Abort> {
    let mut known = HashMap::new();
    let mut deprecated = Vec::new();
    let mut custom = Vec::new();
    let mut extensions = Vec::new();

    for node in fields {
        match classify_key(registry, None, &node.key, false) {
            KeyClass::Known => {
                known.insert(node.key.clone(), node);
            }
            KeyClass::Custom => custom.push(into_field(node)),
            KeyClass::Deprecated => deprecated.push(into_field(node)),
            KeyClass::Unknown | KeyClass::Obsoleted => extensions.push(into_field(node)),
        }
    }

    let mut resolved: HashMap<&'static str, FieldNode> = HashMap::new();
    for spec in registry.schema().metadata() {
        match known.remove(spec.key) {
            Some(mut node) => {
                constrain(spec, &mut node, spec.key, collector)?;
                resolved.insert(spec.key, node);
            }
            None if spec.required => {
                return Err(Abort::new(FatalKind::MissingRequiredField {
                    field: spec.key.to_string(),
                })
                .at_path(spec.key));
            }
            None => collector.record(
                Diagnostic::info(
                    Code::DefaultApplied,
                    format!("defaulted {} to {}", spec.key, default_text(spec.key)),
                )
                .at_path(spec.key),
            )?,
        }
    }

    let text = |key: &str| resolved.get(key).map(|node| node.value.clone());
    let created = match resolved.get("Created") {
        Some(node) => timestamp(node)?,
        None => return Err(missing("Created")),
    };
    let consent_expiry = resolved.get("ConsentExpiry").map(timestamp).transpose()?;
    let privacy_level = match resolved.get("PrivacyLevel") {
        Some(node) => node.value.parse::<PrivacyLevel>().map_err(|message| {
            Abort::new(FatalKind::ConstraintViolation {
                path: node.key.clone(),
                message,
            })
            .at_line(node.line)
            .at_path(node.key.clone())
        })?,
        None => PrivacyLevel::default(),
    };

    Ok(Metadata {
        creator: text("Creator").ok_or_else(|| missing("Creator"))?,
        created,
        language: text("Language").ok_or_else(|| missing("Language"))?,
        consent: text("Consent").ok_or_else(|| missing("Consent"))? == "true",
        consent_expiry,
        privacy_level,
        hash: text("Hash"),
        deprecated,
        custom,
        extensions,
    })
}

fn default_text(key: &str) -> &'static str {
    match key {
        "PrivacyLevel" => PrivacyLevel::default().as_str(),
        _ => "none",
    }
}

fn missing(key: &str) -> Abort {
    Abort::new(FatalKind::MissingRequiredField {
        field: key.to_string(),
    })
    .at_path(key)
}

fn timestamp(node: &FieldNode) -> Result<DateTime<Utc>, Abort> {
    NaiveDateTime::parse_from_str(&node.value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|err| {
            Abort::new(FatalKind::ConstraintViolation {
                path: node.key.clone(),
                message: format!("'{}' is not a valid timestamp: {err}", node.value),
            })
            .at_line(node.line)
            .at_path(node.key.clone())
        })
}

/// Apply a field's length and pattern constraints, leaving the value to keep in `node`.
fn constrain(
    spec: &FieldSpec,
    node: &mut FieldNode,
    path: &str,
    collector: &mut Collector,
) -> Result<(), Abort> {
    let line = node.line;
    let violation = |message: String| {
        Abort::new(FatalKind::ConstraintViolation {
            path: path.to_string(),
            message,
        })
        .at_line(line)
        .at_path(path)
    };

    if spec.exceeds(&node.value) {
        let length = node.value.chars().count();
        if spec.is_strict() {
            return Err(violation(format!(
                "{length} characters, the maximum is {}",
                spec.max_len
            )));
        }
        truncate(node, spec.max_len);
        collector.record(
            Diagnostic::info(
                Code::ValueTruncated,
                format!(
                    "truncated from {length} to {} characters",
                    node.value.chars().count()
                ),
            )
            .at_line(line)
            .at_path(path),
        )?;
    }

    if !spec.matches(&node.value) {
        let message = format!(
            "'{}' does not match {}",
            node.value,
            spec.pattern_source().unwrap_or_default()
        );
        if spec.is_strict() {
            return Err(violation(message));
        }
        collector.record(
            Diagnostic::warning(Code::ConstraintViolation, message)
                .at_line(line)
                .at_path(path),
        )?;
    }
    Ok(())
}

/// Cut the value to `max` characters, then drop what the grammar would drop at the new end.
///
/// Inline values lose trailing spaces. Blocks lose trailing whitespace-only lines, and a
/// block left with no text becomes an empty inline value.
fn truncate(node: &mut FieldNode, max: usize) {
    let mut value: String = node.value.chars().take(max).collect();
    match node.style {
        FieldStyle::Inline => {
            let end = value.trim_end_matches(' ').len();
            value.truncate(end);
        }
        FieldStyle::Block => {
            loop {
                let start = value.rfind('\n').map_or(0, |newline| newline + 1);
                if !value[start..].trim().is_empty() {
                    break;
                }
                value.truncate(start.saturating_sub(1));
                if start == 0 {
                    break;
                }
            }
            if value.is_empty() {
                node.style = FieldStyle::Inline;
            }
        }
    }
    node.value = value;
}

fn build_section(
    node: SectionNode,
    spec: &SectionSpec,
    header: Header,
    options: &ParseOptions,
    collector: &mut Collector,
) -> Result<Section, Abort> {
    let SectionNode {
        name,
        line,
        entries,
    } = node;
    let mut section = Section::new(name, Vec::with_capacity(entries.len()));
    let mut scalar_keys = HashSet::new();
    let mut items = 0;

    for entry in entries {
        match entry {
            EntryNode::Field(mut field) => match spec.field(&field.key) {
                Some(field_spec) => {
                    let path = field_path(spec.name, &field.key);
                    if !scalar_keys.insert(field.key.clone()) {
                        duplicate(&field, path, collector)?;
                        continue;
                    }
                    constrain(field_spec, &mut field, &path, collector)?;
                    section.entries.push(Entry::Field(into_field(field)));
                }
                None => section.extensions.push(Entry::Field(into_field(field))),
            },
            EntryNode::Item(item) if spec.accepts_items() => {
                let item = build_item(item, spec, items, header, collector)?;
                items += 1;
                section.entries.push(Entry::ListItem(item));
            }
            EntryNode::Item(item) => section.extensions.push(Entry::ListItem(into_item(item))),
        }
    }

    let range = spec.range(options.mode);
    let count = section.entries.len();
    if count > range.max {
        section.entries.truncate(range.max);
        collector.record(
            Diagnostic::warning(
                Code::EntriesTruncated,
                format!(
                    "[{}] has {count} entries, the maximum is {}; {} dropped",
                    spec.name,
                    range.max,
                    count - range.max
                ),
            )
            .at_line(line)
            .at_path(spec.name),
        )?;
    }
    for slot in count..range.min {
        section.entries.push(spec.placeholder_entry());
        collector.record(
            Diagnostic::warning(
                Code::PlaceholderInserted,
                format!(
                    "[{}] needs at least {} entries; placeholder {} inserted",
                    spec.name,
                    range.min,
                    slot + 1
                ),
            )
            .at_line(line)
            .at_path(spec.name),
        )?;
    }

    Ok(section)
}

fn build_item(
    item: ItemNode,
    spec: &SectionSpec,
    index: usize,
    header: Header,
    collector: &mut Collector,
) -> Result<ListItem, Abort> {
    let mut built = ListItem::default();
    let mut keys = HashSet::new();

    for mut field in item.fields {
        let path = item_path(spec.name, index, &field.key);
        let Some(field_spec) = spec.item_field(&field.key) else {
            built.extensions.push(into_field(field));
            continue;
        };
        if !keys.insert(field.key.clone()) {
            duplicate(&field, path, collector)?;
            continue;
        }
        constrain(field_spec, &mut field, &path, collector)?;
        if VERSIONED_FIELDS.contains(&(spec.name, field.key.as_str())) {
            check_version_entry(&field.value, header, &path, field.line, collector)?;
        }
        built.fields.push(into_field(field));
    }
    Ok(built)
}

fn check_version_entry(
    value: &str,
    header: Header,
    path: &str,
    line: usize,
    collector: &mut Collector,
) -> Result<(), Abort> {
    let message = match SEMVER.captures(value) {
        None => format!("'{value}' is not a MAJOR.MINOR.PATCH version"),
        Some(caps) => match caps[1].parse::<u64>() {
            Ok(major) if major <= u64::from(header.major) => return Ok(()),
            _ => format!("version {value} is newer than the document format {header}"),
        },
    };
    collector.record(
        Diagnostic::warning(Code::InconsistentField, message)
            .at_line(line)
            .at_path(path),
    )
}

fn duplicate(field: &FieldNode, path: String, collector: &mut Collector) -> Result<(), Abort> {
    collector.record(
        Diagnostic::warning(
            Code::DuplicateField,
            format!("'{}' repeated; later value dropped", field.key),
        )
        .at_line(field.line)
        .at_path(path),
    )
}

fn synthesize_missing(
    document: &mut Document,
    registry: &Registry,
    options: &ParseOptions,
    collector: &mut Collector,
) -> Result<(), Abort> {
    for spec in registry.schema().sections().iter().filter(|s| s.required) {
        if document.section(spec.name).is_some() {
            continue;
        }
        let min = spec.range(options.mode).min;
        collector.record(
            Diagnostic::error(
                Code::MissingSection,
                format!(
                    "required section [{}] is missing; synthesized with {min} placeholder entries",
                    spec.name
                ),
            )
            .at_path(spec.name),
        )?;
        let entries = (0..min).map(|_| spec.placeholder_entry()).collect();
        document.sections.push(Section::new(spec.name, entries));
    }
    Ok(())
}

fn into_field(node: FieldNode) -> Field {
    Field::new(node.key, node.value, node.style)
}

fn into_item(node: ItemNode) -> ListItem {
    ListItem::new(node.fields.into_iter().map(into_field).collect())
}

/// Custom and unknown sections keep their entries as written
fn verbatim_section(node: SectionNode) -> Section {
    let entries = node
        .entries
        .into_iter()
        .map(|entry| match entry {
            EntryNode::Field(field) => Entry::Field(into_field(field)),
            EntryNode::Item(item) => Entry::ListItem(into_item(item)),
        })
        .collect();
    Section::new(node.name, entries)
}
