//! Security stage: consent, expiry, privacy and redaction gates

use super::Staged;
use crate::soul::ast::{Document, FatalError};
use crate::soul::transforms::Runnable;
use crate::soul::validation::security;

#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityValidation;

impl SecurityValidation {
    pub fn new() -> Self {
        Self
    }
}

impl Runnable<Staged<Document>, Staged<Document>> for SecurityValidation {
    fn run(&self, input: Staged<Document>) -> Result<Staged<Document>, FatalError> {
        input.advance(|document, ctx| {
            security::enforce(&document, &ctx.registry, &ctx.options, &mut ctx.collector)?;
            Ok(document)
        })
    }
}
