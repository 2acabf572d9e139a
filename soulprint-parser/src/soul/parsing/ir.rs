//! Intermediate Representation for the grammar parser
//!
//! The parse tree is what the grammar engine produces and what the validation stages consume.
//! It mirrors the file literally: keys are not yet checked against the schema, values are
//! already unescaped, and every node remembers the line it came from so later stages can
//! point diagnostics at the source.

use crate::soul::ast::{FieldStyle, Header};

/// A `key: value` pair, inline or block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub key: String,
    pub value: String,
    pub style: FieldStyle,
    pub line: usize,
}

impl FieldNode {
    pub fn inline(key: impl Into<String>, value: impl Into<String>, line: usize) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            style: FieldStyle::Inline,
            line,
        }
    }

    pub fn block(key: impl Into<String>, value: impl Into<String>, line: usize) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            style: FieldStyle::Block,
            line,
        }
    }
}

/// A list item: the `- key: value` line plus its continuation fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemNode {
    pub line: usize,
    pub fields: Vec<FieldNode>,
}

/// One entry in a section body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryNode {
    Field(FieldNode),
    Item(ItemNode),
}

impl EntryNode {
    pub fn line(&self) -> usize {
        match self {
            EntryNode::Field(field) => field.line,
            EntryNode::Item(item) => item.line,
        }
    }
}

/// A `[Name]` header and the entries below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionNode {
    pub name: String,
    pub line: usize,
    pub entries: Vec<EntryNode>,
}

/// Output of the grammar parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    pub header: Header,
    /// Metadata fields in source order
    pub metadata: Vec<FieldNode>,
    /// Sections in source order
    pub sections: Vec<SectionNode>,
    /// SHA-256 of the source with the metadata Hash line blanked
    pub digest: String,
}

impl ParseTree {
    /// First metadata field with this key
    pub fn metadata_field(&self, key: &str) -> Option<&FieldNode> {
        self.metadata.iter().find(|f| f.key == key)
    }

    pub fn section(&self, name: &str) -> Option<&SectionNode> {
        self.sections.iter().find(|s| s.name == name)
    }
}
