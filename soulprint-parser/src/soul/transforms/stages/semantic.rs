//! Semantic stage: builds the Document from the routed parse tree

use super::Staged;
use crate::soul::ast::{Document, FatalError};
use crate::soul::parsing::ir::ParseTree;
use crate::soul::transforms::Runnable;
use crate::soul::validation::semantic;

#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticValidation;

impl SemanticValidation {
    pub fn new() -> Self {
        Self
    }
}

impl Runnable<Staged<ParseTree>, Staged<Document>> for SemanticValidation {
    fn run(&self, input: Staged<ParseTree>) -> Result<Staged<Document>, FatalError> {
        input.advance(|tree, ctx| {
            semantic::validate(tree, &ctx.registry, &ctx.options, &mut ctx.collector)
        })
    }
}
