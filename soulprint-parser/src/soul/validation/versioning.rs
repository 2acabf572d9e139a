//! Versioning and key routing
//!
//!     The first validation layer. It decides whether the document's major version can be
//!     read at all, and sorts every key into one of five classes:
//!
//!         Known       declared in the schema catalog, validated by the semantic layer
//!         Custom      `X-` prefixed, kept verbatim and never interpreted
//!         Deprecated  still accepted and validated, reported with a warning
//!         Obsoleted   removed from the format, reported as an error and dropped
//!         Unknown     reported with a warning, kept in an extension bag
//!
//!     Only obsoleted keys are removed from the tree here. Routing the remaining classes into
//!     typed fields or extension bags is the semantic layer's job; both layers share
//!     [`classify_key`] so they always agree.
//!
//! Legacy Documents
//!
//!     Major 0 documents are refused unless the caller asks for migration. Migration renames
//!     the legacy metadata keys and sections to their current names and lifts the header to
//!     the supported version.

use super::{field_path, item_path};
use crate::soul::ast::{Abort, Code, Collector, Diagnostic, FatalKind, Header, CUSTOM_PREFIX};
use crate::soul::options::ParseOptions;
use crate::soul::parsing::ir::{EntryNode, FieldNode, ParseTree, SectionNode};
use crate::soul::registry::{
    Registry, SectionSpec, LEGACY_MAJOR, LEGACY_METADATA_RENAMES, LEGACY_SECTION_RENAMES,
    SUPPORTED_MAJOR,
};

/// How a key is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    Known,
    Custom,
    Deprecated,
    Obsoleted,
    Unknown,
}

/// Classify a metadata key (`section: None`), a section field or a list-item field.
pub fn classify_key(
    registry: &Registry,
    section: Option<&SectionSpec>,
    key: &str,
    in_item: bool,
) -> KeyClass {
    if key.starts_with(CUSTOM_PREFIX) {
        return KeyClass::Custom;
    }
    let path = match section {
        Some(spec) => field_path(spec.name, key),
        None => key.to_string(),
    };
    if registry.is_obsoleted(&path) {
        return KeyClass::Obsoleted;
    }
    if registry.is_deprecated(&path) {
        return KeyClass::Deprecated;
    }
    let known = match section {
        None => registry.schema().metadata_field(key).is_some(),
        Some(spec) if in_item => spec.item_field(key).is_some(),
        Some(spec) => spec.field(key).is_some(),
    };
    if known {
        KeyClass::Known
    } else {
        KeyClass::Unknown
    }
}

/// Check the version and route every key of the tree.
pub fn resolve(
    tree: &mut ParseTree,
    registry: &Registry,
    options: &ParseOptions,
    collector: &mut Collector,
) -> Result<(), Abort> {
    check_version(tree, options, collector)?;

    let metadata = std::mem::take(&mut tree.metadata);
    tree.metadata = route_fields(metadata, registry, None, |field| field.key.clone(), collector)?;

    for section in &mut tree.sections {
        route_section(section, registry, collector)?;
    }
    Ok(())
}

fn check_version(
    tree: &mut ParseTree,
    options: &ParseOptions,
    collector: &mut Collector,
) -> Result<(), Abort> {
    let found = tree.header.major;
    if found == SUPPORTED_MAJOR {
        return Ok(());
    }
    if found == LEGACY_MAJOR && options.migrate_legacy {
        return migrate(tree, collector);
    }
    Err(Abort::new(FatalKind::UnsupportedVersion {
        found,
        supported: SUPPORTED_MAJOR,
    })
    .at_line(2))
}

fn migrate(tree: &mut ParseTree, collector: &mut Collector) -> Result<(), Abort> {
    for (from, to) in LEGACY_METADATA_RENAMES {
        let Some(index) = tree.metadata.iter().position(|f| f.key == *from) else {
            continue;
        };
        if let Some(existing) = tree.metadata_field(to) {
            return Err(Abort::new(FatalKind::DuplicateMetadataKey {
                key: to.to_string(),
            })
            .at_line(existing.line)
            .at_path(*to));
        }
        tree.metadata[index].key = to.to_string();
    }

    for (from, to) in LEGACY_SECTION_RENAMES {
        let Some(index) = tree.sections.iter().position(|s| s.name == *from) else {
            continue;
        };
        if let Some(existing) = tree.section(to) {
            return Err(Abort::new(FatalKind::DuplicateSection {
                name: to.to_string(),
            })
            .at_line(existing.line)
            .at_path(*to));
        }
        tree.sections[index].name = to.to_string();
    }

    let legacy = tree.header;
    tree.header = Header::new(SUPPORTED_MAJOR, 0, 0);
    tracing::debug!(from = %legacy, to = %tree.header, "legacy document migrated");
    collector.record(
        Diagnostic::info(
            Code::Migrated,
            format!("migrated legacy document from {legacy} to {}", tree.header),
        )
        .at_line(2),
    )
}

fn route_section(
    section: &mut SectionNode,
    registry: &Registry,
    collector: &mut Collector,
) -> Result<(), Abort> {
    if section.name.starts_with(CUSTOM_PREFIX) {
        return Ok(());
    }
    let Some(spec) = registry.schema().section(&section.name) else {
        return collector.record(
            Diagnostic::warning(
                Code::UnknownField,
                format!("unknown section [{}]; kept as an extension", section.name),
            )
            .at_line(section.line)
            .at_path(section.name.clone()),
        );
    };

    let mut entries = Vec::with_capacity(section.entries.len());
    for (index, entry) in std::mem::take(&mut section.entries).into_iter().enumerate() {
        match entry {
            EntryNode::Field(field) => {
                let kept = route_fields(
                    vec![field],
                    registry,
                    Some((spec, false)),
                    |field| field_path(spec.name, &field.key),
                    collector,
                )?;
                entries.extend(kept.into_iter().map(EntryNode::Field));
            }
            EntryNode::Item(mut item) => {
                if !spec.accepts_items() {
                    collector.record(
                        Diagnostic::warning(
                            Code::UnknownField,
                            format!(
                                "[{}] does not take list items; kept as an extension",
                                spec.name
                            ),
                        )
                        .at_line(item.line)
                        .at_path(format!("{}[{index}]", spec.name)),
                    )?;
                    entries.push(EntryNode::Item(item));
                    continue;
                }
                item.fields = route_fields(
                    std::mem::take(&mut item.fields),
                    registry,
                    Some((spec, true)),
                    |field| item_path(spec.name, index, &field.key),
                    collector,
                )?;
                if !item.fields.is_empty() {
                    entries.push(EntryNode::Item(item));
                }
            }
        }
    }
    section.entries = entries;
    Ok(())
}

/// Report deprecated and unknown keys, drop obsoleted ones.
fn route_fields(
    fields: Vec<FieldNode>,
    registry: &Registry,
    scope: Option<(&SectionSpec, bool)>,
    path: impl Fn(&FieldNode) -> String,
    collector: &mut Collector,
) -> Result<Vec<FieldNode>, Abort> {
    let mut kept = Vec::with_capacity(fields.len());
    for field in fields {
        let (section, in_item) = match scope {
            Some((spec, in_item)) => (Some(spec), in_item),
            None => (None, false),
        };
        let diagnostic = match classify_key(registry, section, &field.key, in_item) {
            KeyClass::Known | KeyClass::Custom => None,
            KeyClass::Deprecated => Some(Diagnostic::warning(
                Code::DeprecatedFieldUsed,
                format!("'{}' is deprecated", field.key),
            )),
            KeyClass::Unknown => Some(Diagnostic::warning(
                Code::UnknownField,
                format!("unknown key '{}'; kept as an extension", field.key),
            )),
            KeyClass::Obsoleted => {
                collector.record(
                    Diagnostic::error(
                        Code::ObsoletedFieldPresent,
                        format!("'{}' is no longer part of the format; value dropped", field.key),
                    )
                    .at_line(field.line)
                    .at_path(path(&field)),
                )?;
                continue;
            }
        };
        if let Some(diagnostic) = diagnostic {
            collector.record(diagnostic.at_line(field.line).at_path(path(&field)))?;
        }
        kept.push(field);
    }
    Ok(kept)
}
