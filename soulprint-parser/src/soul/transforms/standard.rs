//! Standard transform definitions
//!
//!     Pre-built pipelines, defined once as `once_cell::sync::Lazy` statics.

use crate::soul::ast::Document;
use crate::soul::parsing::ir::ParseTree;
use crate::soul::transforms::stages::{
    IntegrityCheck, SecurityValidation, SemanticValidation, Staged, Versioning,
};
use crate::soul::transforms::Transform;
use once_cell::sync::Lazy;

/// Version check and key routing: Staged<ParseTree> → Staged<ParseTree>
pub type VersioningTransform = Transform<Staged<ParseTree>, Staged<ParseTree>>;

/// Everything after the grammar pass: Staged<ParseTree> → Staged<Document>
pub type ValidationTransform = Transform<Staged<ParseTree>, Staged<Document>>;

pub static VERSIONING: Lazy<VersioningTransform> =
    Lazy::new(|| Transform::from_fn(Ok).then(Versioning::new()));

/// Integrity, versioning, semantic validation, then the security gates
pub static VALIDATION: Lazy<ValidationTransform> = Lazy::new(|| {
    Transform::from_fn(Ok)
        .then(IntegrityCheck::new())
        .then_transform(&VERSIONING)
        .then(SemanticValidation::new())
        .then(SecurityValidation::new())
});
