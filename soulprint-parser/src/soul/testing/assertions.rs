//! Fluent assertions for Documents and Reports
//!
//!     Each builder takes a reference, checks one property per call and returns itself, so
//!     checks chain. Failures name the section, entry and key involved.

use crate::soul::ast::{Code, Document, ListItem, PrivacyLevel, Report, Section, Severity};

pub fn assert_document(doc: &Document) -> DocumentAssertion<'_> {
    DocumentAssertion { doc }
}

pub fn assert_report(report: &Report) -> ReportAssertion<'_> {
    ReportAssertion { report }
}

pub struct DocumentAssertion<'a> {
    doc: &'a Document,
}

impl<'a> DocumentAssertion<'a> {
    /// Assert the validated sections, in document order
    pub fn section_names(self, expected: &[&str]) -> Self {
        let actual: Vec<&str> = self.doc.section_names().collect();
        assert_eq!(actual, expected, "section names differ");
        self
    }

    pub fn has_section(self, name: &str) -> Self {
        assert!(
            self.doc.section(name).is_some(),
            "expected section [{name}], found [{}]",
            self.doc.section_names().collect::<Vec<_>>().join(", ")
        );
        self
    }

    pub fn lacks_section(self, name: &str) -> Self {
        assert!(self.doc.section(name).is_none(), "unexpected section [{name}]");
        self
    }

    /// Assert a scalar or block field of a section
    pub fn field(self, section: &str, key: &str, expected: &str) -> Self {
        assert_eq!(
            self.doc.field(section, key),
            Some(expected),
            "{section}.{key}"
        );
        self
    }

    pub fn section<F>(self, name: &str, assertion: F) -> Self
    where
        F: FnOnce(SectionAssertion<'a>),
    {
        let section = self
            .doc
            .section(name)
            .unwrap_or_else(|| panic!("expected section [{name}]"));
        assertion(SectionAssertion { section });
        self
    }

    pub fn creator(self, expected: &str) -> Self {
        assert_eq!(self.doc.metadata().creator(), expected, "Creator");
        self
    }

    pub fn privacy(self, expected: PrivacyLevel) -> Self {
        assert_eq!(self.doc.metadata().privacy_level(), expected, "PrivacyLevel");
        self
    }

    pub fn custom_metadata(self, key: &str, expected: &str) -> Self {
        assert_eq!(self.doc.metadata().custom_value(key), Some(expected), "{key}");
        self
    }

    /// Assert the names of the unknown sections kept aside
    pub fn extension_names(self, expected: &[&str]) -> Self {
        let actual: Vec<&str> = self.doc.extensions().iter().map(Section::name).collect();
        assert_eq!(actual, expected, "extension sections differ");
        self
    }
}

pub struct SectionAssertion<'a> {
    section: &'a Section,
}

impl<'a> SectionAssertion<'a> {
    pub fn entry_count(self, expected: usize) -> Self {
        assert_eq!(
            self.section.len(),
            expected,
            "[{}] entry count",
            self.section.name()
        );
        self
    }

    pub fn placeholder_count(self, expected: usize) -> Self {
        assert_eq!(
            self.section.placeholder_count(),
            expected,
            "[{}] placeholder count",
            self.section.name()
        );
        self
    }

    pub fn value(self, key: &str, expected: &str) -> Self {
        assert_eq!(
            self.section.value(key),
            Some(expected),
            "{}.{key}",
            self.section.name()
        );
        self
    }

    pub fn is_multiline(self, key: &str) -> Self {
        let field = self
            .section
            .entries()
            .iter()
            .filter_map(|e| e.as_field())
            .find(|f| f.key() == key)
            .unwrap_or_else(|| panic!("{}.{key} not found", self.section.name()));
        assert!(field.is_multiline(), "{}.{key} is not a block", self.section.name());
        self
    }

    /// Assert on the `index`-th list item of the section
    pub fn item<F>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(ItemAssertion<'a>),
    {
        let name = self.section.name();
        let item = self
            .section
            .items()
            .nth(index)
            .unwrap_or_else(|| panic!("[{name}] has no item {index}"));
        assertion(ItemAssertion {
            item,
            context: format!("{name}[{index}]"),
        });
        self
    }
}

pub struct ItemAssertion<'a> {
    item: &'a ListItem,
    context: String,
}

impl ItemAssertion<'_> {
    pub fn field(self, key: &str, expected: &str) -> Self {
        assert_eq!(self.item.get(key), Some(expected), "{}.{key}", self.context);
        self
    }

    pub fn field_count(self, expected: usize) -> Self {
        assert_eq!(self.item.fields().len(), expected, "{} field count", self.context);
        self
    }

    pub fn is_placeholder(self) -> Self {
        assert!(self.item.is_placeholder(), "{} is not a placeholder", self.context);
        self
    }
}

pub struct ReportAssertion<'a> {
    report: &'a Report,
}

impl ReportAssertion<'_> {
    pub fn no_fatal(self) -> Self {
        assert!(!self.report.has_fatal(), "unexpected fatal diagnostic:\n{}", self.report);
        self
    }

    pub fn count(self, code: Code, expected: usize) -> Self {
        assert_eq!(
            self.report.count(code),
            expected,
            "{code} count in report:\n{}",
            self.report
        );
        self
    }

    pub fn none(self, code: Code) -> Self {
        self.count(code, 0)
    }

    pub fn severity_count(self, severity: Severity, expected: usize) -> Self {
        assert_eq!(
            self.report.count_severity(severity),
            expected,
            "{severity} count in report:\n{}",
            self.report
        );
        self
    }

    /// Assert some diagnostic with `code` points at `path`
    pub fn at_path(self, code: Code, path: &str) -> Self {
        assert!(
            self.report
                .with_code(code)
                .any(|d| d.field_path.as_deref() == Some(path)),
            "no {code} at {path} in report:\n{}",
            self.report
        );
        self
    }

    /// Assert the last diagnostic is the fatal one with `code`
    pub fn ends_with_fatal(self, code: Code) -> Self {
        let last = self
            .report
            .diagnostics()
            .last()
            .unwrap_or_else(|| panic!("report is empty"));
        assert_eq!(last.severity, Severity::Fatal, "last diagnostic is not fatal");
        assert_eq!(last.code, code, "fatal code");
        self
    }
}
