//! Schema catalog
//!
//!     One table describes every known metadata key and section: for each field its pattern,
//!     maximum length (in characters) and strictness class; for each section whether it is
//!     required, which entry shapes it takes and how many entries it may hold in standard and
//!     jumbo mode. The semantic validator consults this table uniformly and never special-cases
//!     a field by name.
//!
//!     Patterns are anchored and compiled once, when the registry is built.

use crate::soul::ast::{Entry, Field, ListItem};
use crate::soul::options::Mode;
use regex::Regex;

/// Canonical timestamp shape, `YYYY-MM-DDTHH:MM:SSZ`
pub const TIMESTAMP_PATTERN: &str = r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z";

/// chrono format matching [`TIMESTAMP_PATTERN`]
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// What happens when a value breaks its constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strictness {
    /// Corrected or reported, the parse goes on
    Lenient,
    /// Any violation is fatal
    Strict,
}

/// Entry shapes a section accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Scalar and block fields
    Fields,
    /// List items
    Items,
    /// Both
    Mixed,
}

/// Inclusive bounds on a section's entry count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRange {
    pub min: usize,
    pub max: usize,
}

impl EntryRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Constraints on one key
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: &'static str,
    pub max_len: usize,
    pub strictness: Strictness,
    pub required: bool,
    pattern: Option<(&'static str, Regex)>,
}

impl FieldSpec {
    fn new(key: &'static str, max_len: usize) -> Self {
        Self {
            key,
            max_len,
            strictness: Strictness::Lenient,
            required: false,
            pattern: None,
        }
    }

    fn pattern(mut self, source: &'static str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{source})$"))?;
        self.pattern = Some((source, regex));
        Ok(self)
    }

    fn strict(mut self) -> Self {
        self.strictness = Strictness::Strict;
        self
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strictness == Strictness::Strict
    }

    /// Source of the declared pattern, for messages
    pub fn pattern_source(&self) -> Option<&'static str> {
        self.pattern.as_ref().map(|(source, _)| *source)
    }

    pub fn matches(&self, value: &str) -> bool {
        self.pattern
            .as_ref()
            .map_or(true, |(_, regex)| regex.is_match(value))
    }

    pub fn exceeds(&self, value: &str) -> bool {
        value.chars().count() > self.max_len
    }
}

/// Constraints on one section
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub name: &'static str,
    pub required: bool,
    pub kind: SectionKind,
    pub standard: EntryRange,
    pub jumbo: EntryRange,
    /// Keys of scalar and block fields
    pub fields: Vec<FieldSpec>,
    /// Keys inside list items
    pub item_fields: Vec<FieldSpec>,
}

impl SectionSpec {
    fn new(name: &'static str, kind: SectionKind, standard: EntryRange, jumbo: EntryRange) -> Self {
        Self {
            name,
            required: false,
            kind,
            standard,
            jumbo,
            fields: Vec::new(),
            item_fields: Vec::new(),
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = fields;
        self
    }

    fn items(mut self, fields: Vec<FieldSpec>) -> Self {
        self.item_fields = fields;
        self
    }

    pub fn range(&self, mode: Mode) -> EntryRange {
        match mode {
            Mode::Standard => self.standard,
            Mode::Jumbo => self.jumbo,
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn item_field(&self, key: &str) -> Option<&FieldSpec> {
        self.item_fields.iter().find(|f| f.key == key)
    }

    pub fn accepts_fields(&self) -> bool {
        matches!(self.kind, SectionKind::Fields | SectionKind::Mixed)
    }

    pub fn accepts_items(&self) -> bool {
        matches!(self.kind, SectionKind::Items | SectionKind::Mixed)
    }

    /// Sentinel entry used to pad the section up to its minimum
    pub fn placeholder_entry(&self) -> Entry {
        match (self.kind, self.fields.first(), self.item_fields.first()) {
            (SectionKind::Items, _, Some(first)) | (SectionKind::Mixed, None, Some(first)) => {
                Entry::ListItem(ListItem::new(vec![Field::placeholder(first.key)]))
            }
            (_, Some(first), _) => Entry::Field(Field::placeholder(first.key)),
            _ => Entry::Field(Field::placeholder(self.name)),
        }
    }
}

/// The compiled catalog of metadata keys and sections
#[derive(Debug, Clone)]
pub struct Schema {
    metadata: Vec<FieldSpec>,
    sections: Vec<SectionSpec>,
}

impl Schema {
    pub fn metadata(&self) -> &[FieldSpec] {
        &self.metadata
    }

    pub fn metadata_field(&self, key: &str) -> Option<&FieldSpec> {
        self.metadata.iter().find(|f| f.key == key)
    }

    /// Sections in catalog order
    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Position of a section in the catalog
    pub fn position(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    /// The built-in soulprint v1 catalog
    pub fn catalog() -> Result<Self, regex::Error> {
        use SectionKind::{Fields, Items, Mixed};
        let range = EntryRange::new;
        let f = FieldSpec::new;

        let metadata = vec![
            f("Creator", 100).pattern(r"\S.*")?.required(),
            f("Created", 20).pattern(TIMESTAMP_PATTERN)?.strict().required(),
            f("Language", 3).pattern("[a-z]{2,3}")?.strict().required(),
            // no cap or pattern: any value other than `true` is refused by the consent gate
            f("Consent", usize::MAX).strict().required(),
            f("ConsentExpiry", 20).pattern(TIMESTAMP_PATTERN)?.strict(),
            f("PrivacyLevel", 10)
                .pattern("public|restricted|private")?
                .strict(),
            f("Hash", 64).pattern("[0-9a-f]{64}")?.strict(),
        ];

        let sections = vec![
            SectionSpec::new("Identity", Fields, range(1, 5), range(1, 5))
                .required()
                .fields(vec![
                    f("Name", 50).pattern("[A-Za-z0-9_-]{1,50}")?.strict(),
                    f("Origin", 500),
                    f("Essence", 500),
                ]),
            SectionSpec::new("Environment", Fields, range(0, 10), range(0, 20)).fields(vec![
                f("PreferredSystem", 200),
                f("HistoricalContext", 1000),
            ]),
            SectionSpec::new("Voice", Mixed, range(1, 10), range(1, 40))
                .required()
                .fields(vec![
                    f("Description", 500),
                    f("Metadata", 200),
                    f("Summary", 500),
                ])
                .items(vec![f("Context", 200), f("Response", 500)]),
            SectionSpec::new("Heartbeat", Fields, range(1, 5), range(1, 5))
                .required()
                .fields(vec![
                    f("Tendencies", 500),
                    f("Strengths", 500),
                    f("Shadows", 500),
                    f("Pulse", 200),
                ]),
            SectionSpec::new("Echoes", Items, range(1, 100), range(1, 500))
                .required()
                .items(vec![
                    f("Memory", 100),
                    f("Emotion", 50).pattern("[A-Za-z -]+")?,
                    f("Resonance", 4).pattern(r"0\.\d{1,2}|1\.0")?.strict(),
                    f("Impact", 200),
                    f("Scene", 1000),
                    f("Intensity", 10),
                ]),
            SectionSpec::new("Tides", Items, range(0, 20), range(0, 80)).items(vec![
                f("Cycle", 100),
                f("Trigger", 200),
                f("Flow", 500),
                f("Duration", 100),
            ]),
            SectionSpec::new("Threads", Items, range(0, 15), range(0, 60)).items(vec![
                f("Relation", 100),
                f("Style", 200),
                f("Joys", 200),
                f("Strains", 200),
            ]),
            SectionSpec::new("Horizon", Items, range(0, 10), range(0, 40)).items(vec![
                f("Chapter", 100),
                f("When", 100),
                f("Shift", 500),
                f("Legacy", 200),
            ]),
            SectionSpec::new("Chronicle", Items, range(1, 20), range(1, 100))
                .required()
                .items(vec![
                    f("VersionEntry", 20),
                    f("Timestamp", 20).pattern(TIMESTAMP_PATTERN)?.strict(),
                    f("Changes", 2500),
                ]),
            SectionSpec::new("Reflection", Fields, range(0, 5), range(0, 5)).fields(vec![
                f("Purpose", 500),
                f("Hopes", 500),
                f("Aspirations", 500),
            ]),
            SectionSpec::new("RedactionLog", Items, range(0, 50), range(0, 200))
                .items(vec![f("Term", 100), f("Reason", 200)]),
        ];

        Ok(Self { metadata, sections })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soul::ast::EntryKind;

    fn catalog() -> Schema {
        Schema::catalog().unwrap()
    }

    #[test]
    fn test_name_pattern() {
        let schema = catalog();
        let name = schema.section("Identity").unwrap().field("Name").unwrap();
        assert!(name.is_strict());
        assert!(name.matches("Sovl-1"));
        assert!(!name.matches("Sovl!"));
        assert!(!name.matches(""));
    }

    #[test]
    fn test_patterns_are_anchored() {
        let schema = catalog();
        let language = schema.metadata_field("Language").unwrap();
        assert!(language.matches("en"));
        assert!(!language.matches("english"));
        assert!(!language.matches("EN"));
    }

    #[test]
    fn test_consent_accepts_any_value() {
        let schema = catalog();
        let consent = schema.metadata_field("Consent").unwrap();
        assert!(!consent.exceeds("withdrawn"));
        assert!(consent.matches("withdrawn"));
    }

    #[test]
    fn test_length_counts_characters() {
        let schema = catalog();
        let memory = schema.section("Echoes").unwrap().item_field("Memory").unwrap();
        assert!(!memory.exceeds(&"é".repeat(100)));
        assert!(memory.exceeds(&"é".repeat(101)));
    }

    #[test]
    fn test_ranges_per_mode() {
        let schema = catalog();
        let echoes = schema.section("Echoes").unwrap();
        assert_eq!(echoes.range(Mode::Standard), EntryRange::new(1, 100));
        assert_eq!(echoes.range(Mode::Jumbo), EntryRange::new(1, 500));
    }

    #[test]
    fn test_placeholder_entries_follow_section_kind() {
        let schema = catalog();
        let identity = schema.section("Identity").unwrap().placeholder_entry();
        assert_eq!(identity.kind(), EntryKind::Field);
        assert_eq!(identity.as_field().unwrap().key(), "Name");
        assert!(identity.is_placeholder());

        let echoes = schema.section("Echoes").unwrap().placeholder_entry();
        assert_eq!(echoes.as_list_item().unwrap().get("Memory"), Some("[VOID]"));

        let voice = schema.section("Voice").unwrap().placeholder_entry();
        assert_eq!(voice.as_field().unwrap().key(), "Description");
    }

    #[test]
    fn test_catalog_order_and_required_sections() {
        let schema = catalog();
        let required: Vec<_> = schema
            .sections()
            .iter()
            .filter(|s| s.required)
            .map(|s| s.name)
            .collect();
        assert_eq!(
            required,
            vec!["Identity", "Voice", "Heartbeat", "Echoes", "Chronicle"]
        );
        assert_eq!(schema.position("RedactionLog"), Some(10));
    }
}
