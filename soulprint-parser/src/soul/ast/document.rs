//! Document model
//!
//!     The [`Document`] is the validated result of a successful parse. It is built once by the
//!     validation stages and never mutated afterwards: every field is private to the crate and
//!     consumers only get read access (section lookup by name, ordered entry iteration).
//!
//!     Parse-time details such as line numbers live in the parse tree
//!     ([ir](crate::soul::parsing::ir)), not here, so two documents describing the same profile
//!     compare equal regardless of how their source was laid out.
//!
//! Structure
//!
//!     Document
//!       ├── Header           signature + version triple
//!       ├── Metadata         typed required/optional keys + custom and extension bags
//!       ├── Section*         name + ordered entries
//!       │     └── Entry      Field (inline or multiline block) | ListItem (group of fields)
//!       └── extensions       unknown sections, preserved but never validated

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The literal first line of every soulprint file
pub const SIGNATURE: &str = "%SOULPRINT";

/// Sentinel value used by placeholder entries
pub const PLACEHOLDER: &str = "[VOID]";

/// Prefix reserved for custom metadata keys and custom sections
pub const CUSTOM_PREFIX: &str = "X-";

/// Version triple from the `%VERSION` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Header {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Header {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Who may read a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    Public,
    Restricted,
    #[default]
    Private,
}

impl PrivacyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivacyLevel::Public => "public",
            PrivacyLevel::Restricted => "restricted",
            PrivacyLevel::Private => "private",
        }
    }
}

impl FromStr for PrivacyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(PrivacyLevel::Public),
            "restricted" => Ok(PrivacyLevel::Restricted),
            "private" => Ok(PrivacyLevel::Private),
            other => Err(format!("unknown privacy level '{other}'")),
        }
    }
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field value was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStyle {
    /// `key: value` on a single line, escapes resolved
    Inline,
    /// `key: > |` followed by an indented literal block
    Block,
}

/// A key/value pair. Block fields keep their internal line breaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub(crate) key: String,
    pub(crate) value: String,
    pub(crate) style: FieldStyle,
    /// Set only on entries the validator inserted to reach a section's minimum. A `[VOID]`
    /// written by the author is an ordinary value.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) placeholder: bool,
}

impl Field {
    pub(crate) fn new(key: impl Into<String>, value: impl Into<String>, style: FieldStyle) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            style,
            placeholder: false,
        }
    }

    pub(crate) fn placeholder(key: impl Into<String>) -> Self {
        Self {
            placeholder: true,
            ..Self::new(key, PLACEHOLDER, FieldStyle::Inline)
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn style(&self) -> FieldStyle {
        self.style
    }

    pub fn is_multiline(&self) -> bool {
        self.style == FieldStyle::Block
    }

    /// True for entries inserted by the validator, never for author-written values
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

/// One `- key: value` group with its continuation fields
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListItem {
    pub(crate) fields: Vec<Field>,
    /// Unknown sub-keys, preserved but not validated
    pub(crate) extensions: Vec<Field>,
}

impl ListItem {
    pub(crate) fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            extensions: Vec::new(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn extensions(&self) -> &[Field] {
        &self.extensions
    }

    /// Value of the first field with this key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    pub fn is_placeholder(&self) -> bool {
        !self.fields.is_empty() && self.fields.iter().all(Field::is_placeholder)
    }
}

/// The three shapes an entry can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Field,
    ListItem,
    Multiline,
}

/// One entry in a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entry {
    Field(Field),
    ListItem(ListItem),
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Field(field) if field.is_multiline() => EntryKind::Multiline,
            Entry::Field(_) => EntryKind::Field,
            Entry::ListItem(_) => EntryKind::ListItem,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Entry::Field(field) => Some(field),
            Entry::ListItem(_) => None,
        }
    }

    pub fn as_list_item(&self) -> Option<&ListItem> {
        match self {
            Entry::ListItem(item) => Some(item),
            Entry::Field(_) => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        match self {
            Entry::Field(field) => field.is_placeholder(),
            Entry::ListItem(item) => item.is_placeholder(),
        }
    }
}

/// A named top-level group of entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub(crate) name: String,
    pub(crate) entries: Vec<Entry>,
    /// Unknown keys found in this section, preserved but not validated
    pub(crate) extensions: Vec<Entry>,
}

impl Section {
    pub(crate) fn new(name: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            name: name.into(),
            entries,
            extensions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn extensions(&self) -> &[Entry] {
        &self.extensions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Custom (`X-`) sections are carried verbatim and never validated
    pub fn is_custom(&self) -> bool {
        self.name.starts_with(CUSTOM_PREFIX)
    }

    /// Value of the first scalar or block field with this key
    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter_map(Entry::as_field)
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    /// List items in document order
    pub fn items(&self) -> impl Iterator<Item = &ListItem> + '_ {
        self.entries.iter().filter_map(Entry::as_list_item)
    }

    pub fn placeholder_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_placeholder()).count()
    }
}

impl<'a> IntoIterator for &'a Section {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Metadata block between the header and the first section
///
/// Equality ignores `hash`: the digest describes one byte encoding of the document, not its
/// content, so a re-serialized copy compares equal to the original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub(crate) creator: String,
    pub(crate) created: DateTime<Utc>,
    pub(crate) language: String,
    pub(crate) consent: bool,
    pub(crate) consent_expiry: Option<DateTime<Utc>>,
    pub(crate) privacy_level: PrivacyLevel,
    pub(crate) hash: Option<String>,
    /// Deprecated keys, still parsed and carried
    pub(crate) deprecated: Vec<Field>,
    /// `X-` keys, verbatim
    pub(crate) custom: Vec<Field>,
    /// Unknown keys, verbatim
    pub(crate) extensions: Vec<Field>,
}

impl Metadata {
    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn consent(&self) -> bool {
        self.consent
    }

    pub fn consent_expiry(&self) -> Option<DateTime<Utc>> {
        self.consent_expiry
    }

    pub fn privacy_level(&self) -> PrivacyLevel {
        self.privacy_level
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn deprecated(&self) -> &[Field] {
        &self.deprecated
    }

    pub fn custom(&self) -> &[Field] {
        &self.custom
    }

    /// Value of a custom `X-` key
    pub fn custom_value(&self, key: &str) -> Option<&str> {
        self.custom
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    pub fn extensions(&self) -> &[Field] {
        &self.extensions
    }
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.creator == other.creator
            && self.created == other.created
            && self.language == other.language
            && self.consent == other.consent
            && self.consent_expiry == other.consent_expiry
            && self.privacy_level == other.privacy_level
            && self.deprecated == other.deprecated
            && self.custom == other.custom
            && self.extensions == other.extensions
    }
}

impl Eq for Metadata {}

/// A validated soulprint document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub(crate) header: Header,
    pub(crate) metadata: Metadata,
    pub(crate) sections: Vec<Section>,
    /// Unknown sections, preserved but never validated
    pub(crate) extensions: Vec<Section>,
}

impl Document {
    pub fn header(&self) -> Header {
        self.header
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn extensions(&self) -> &[Section] {
        &self.extensions
    }

    /// Look up a section by its exact (case-sensitive) name
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Shortcut for `section(section)?.value(key)`
    pub fn field(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.value(key)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sections.iter().map(|s| s.name.as_str())
    }
}
