//! Versioning stage: version check, legacy migration and key routing

use super::Staged;
use crate::soul::ast::FatalError;
use crate::soul::parsing::ir::ParseTree;
use crate::soul::transforms::Runnable;
use crate::soul::validation::versioning::resolve;

#[derive(Debug, Clone, Copy, Default)]
pub struct Versioning;

impl Versioning {
    pub fn new() -> Self {
        Self
    }
}

impl Runnable<Staged<ParseTree>, Staged<ParseTree>> for Versioning {
    fn run(&self, input: Staged<ParseTree>) -> Result<Staged<ParseTree>, FatalError> {
        input.advance(|mut tree, ctx| {
            resolve(&mut tree, &ctx.registry, &ctx.options, &mut ctx.collector)?;
            Ok(tree)
        })
    }
}
