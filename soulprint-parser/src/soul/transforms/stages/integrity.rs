//! Integrity stage: checks the declared Hash against the digest of the raw content

use super::Staged;
use crate::soul::ast::FatalError;
use crate::soul::parsing::ir::ParseTree;
use crate::soul::transforms::Runnable;
use crate::soul::validation::security;

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityCheck;

impl IntegrityCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Runnable<Staged<ParseTree>, Staged<ParseTree>> for IntegrityCheck {
    fn run(&self, input: Staged<ParseTree>) -> Result<Staged<ParseTree>, FatalError> {
        input.advance(|tree, _ctx| {
            security::verify_integrity(&tree)?;
            Ok(tree)
        })
    }
}
