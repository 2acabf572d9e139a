//! Validation
//!
//!     Everything after the grammar pass. Four layers run in a fixed order over the parse
//!     tree, each reporting into the shared collector:
//!
//!         1. Integrity. See [security](security). A declared Hash must equal the digest of
//!            the raw content. It runs on the tree, before any value is interpreted, so a
//!            modified file fails as Tampering whatever else the modification broke.
//!
//!         2. Versioning. See [versioning](versioning). Checks the major version (running the
//!            legacy migration when asked to) and routes every key: known, custom, deprecated,
//!            obsoleted or unknown.
//!
//!         3. Semantic. See [semantic](semantic). Builds the [`Document`](crate::soul::ast::Document)
//!            from the tree: required metadata, defaults, per-field constraints, duplicate keys,
//!            entry counts, missing sections and cross-field consistency, all driven by the
//!            schema catalog.
//!
//!         4. Security. See [security](security). Consent, expiry, privacy and redaction gates
//!            over the finished Document.
//!
//!     The layers are plain functions over `&mut Collector`; the transform stages in
//!     [stages](crate::soul::transforms::stages) wire them into the pipeline.
//!
//! Field Paths
//!
//!     Diagnostics name the field they concern with a dotted path: `Creator` for metadata,
//!     `Identity.Name` for section fields, `Echoes[2].Scene` for a field of the third list item
//!     of a section. The index counts list items only (zero-based, in source order); plain
//!     fields sharing the section do not advance it.

pub mod security;
pub mod semantic;
pub mod versioning;

pub(crate) fn field_path(section: &str, key: &str) -> String {
    format!("{section}.{key}")
}

pub(crate) fn item_path(section: &str, index: usize, key: &str) -> String {
    format!("{section}[{index}].{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(field_path("Identity", "Name"), "Identity.Name");
        assert_eq!(item_path("Echoes", 2, "Scene"), "Echoes[2].Scene");
    }
}
