//! Canonical serialization
//!
//!     Writes a [`Document`] back to soulprint source:
//!
//!         %SOULPRINT
//!         %VERSION: v1.0.0
//!         <metadata in schema order, defaults written out>
//!         <deprecated, custom and unknown metadata keys, as parsed>
//!
//!         [Section]
//!           Key: value
//!           - Key: value
//!             Key: > |
//!               block body
//!
//!     Sections follow document order, unknown sections come last. Inline values are escaped,
//!     block values are written with `> |` and indented two spaces past their key. Entries the
//!     validator inserted as placeholders are left out; parsing the output inserts them again.
//!     A document that carries a Hash is re-sealed, so the output verifies against itself.

use crate::soul::ast::{Document, Entry, Field, FieldStyle, ListItem, Section, SIGNATURE};
use crate::soul::integrity::{seal, HASH_KEY};
use crate::soul::lexing::escape;
use crate::soul::parsing::engine::BLOCK_MARKER;
use crate::soul::registry::schema::TIMESTAMP_FORMAT;

/// Indentation of section entries
const ENTRY_INDENT: usize = 2;

/// Render `document` in canonical layout.
pub fn render(document: &Document) -> String {
    let mut writer = CanonicalWriter::new();
    writer.header(document);
    for section in document.sections() {
        writer.section(section);
    }
    for section in document.extensions() {
        writer.section(section);
    }

    if document.metadata().hash().is_some() {
        seal(&writer.output)
    } else {
        writer.output
    }
}

struct CanonicalWriter {
    output: String,
}

impl CanonicalWriter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn line(&mut self, indent: usize, text: &str) {
        if !text.is_empty() {
            self.output.extend(std::iter::repeat(' ').take(indent));
            self.output.push_str(text);
        }
        self.output.push('\n');
    }

    fn header(&mut self, document: &Document) {
        let metadata = document.metadata();
        self.line(0, SIGNATURE);
        self.line(0, &format!("%VERSION: {}", document.header()));

        self.scalar("Creator", metadata.creator());
        self.scalar("Created", &metadata.created().format(TIMESTAMP_FORMAT).to_string());
        self.scalar("Language", metadata.language());
        self.scalar("Consent", if metadata.consent() { "true" } else { "false" });
        if let Some(expiry) = metadata.consent_expiry() {
            self.scalar("ConsentExpiry", &expiry.format(TIMESTAMP_FORMAT).to_string());
        }
        self.scalar("PrivacyLevel", metadata.privacy_level().as_str());
        if let Some(hash) = metadata.hash() {
            // replaced by the real digest when the output is sealed
            self.scalar(HASH_KEY, hash);
        }

        let carried = metadata
            .deprecated()
            .iter()
            .chain(metadata.custom())
            .chain(metadata.extensions());
        for field in carried {
            self.field(0, "", field);
        }
    }

    fn scalar(&mut self, key: &str, value: &str) {
        self.line(0, format!("{key}: {}", escape(value)).trim_end_matches(' '));
    }

    fn section(&mut self, section: &Section) {
        self.line(0, "");
        self.line(0, &format!("[{}]", section.name()));
        let written = section.entries().iter().filter(|entry| !entry.is_placeholder());
        for entry in written.chain(section.extensions()) {
            match entry {
                Entry::Field(field) => self.field(ENTRY_INDENT, "", field),
                Entry::ListItem(item) => self.item(item),
            }
        }
    }

    fn item(&mut self, item: &ListItem) {
        let mut fields = item.fields().iter().chain(item.extensions());
        let Some(first) = fields.next() else {
            return;
        };
        self.field(ENTRY_INDENT, "- ", first);
        for field in fields {
            self.field(ENTRY_INDENT + 2, "", field);
        }
    }

    /// Write one field; `prefix` sits between the indentation and the key
    fn field(&mut self, indent: usize, prefix: &str, field: &Field) {
        match field.style() {
            FieldStyle::Inline => {
                let text = format!("{prefix}{}: {}", field.key(), escape(field.value()));
                self.line(indent, text.trim_end_matches(' '));
            }
            FieldStyle::Block => {
                self.line(indent, &format!("{prefix}{}: {BLOCK_MARKER}", field.key()));
                let body_indent = indent + prefix.len() + 2;
                for body_line in field.value().split('\n') {
                    self.line(body_indent, body_line);
                }
            }
        }
    }
}
