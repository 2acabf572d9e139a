//! Individual transformation stages
//!
//!     Each stage implements [`Runnable`](super::Runnable) over [`Staged`] values and starts
//!     with a cancellation checkpoint, so a cancelled or timed-out parse stops at the next
//!     stage boundary at the latest.

pub mod integrity;
pub mod security;
pub mod semantic;
pub mod versioning;

pub use integrity::IntegrityCheck;
pub use security::SecurityValidation;
pub use semantic::SemanticValidation;
pub use versioning::Versioning;

use crate::soul::ast::{Abort, Collector, FatalError, FatalKind};
use crate::soul::options::ParseOptions;
use crate::soul::registry::Registry;
use std::sync::Arc;

/// Per-parse state threaded through every stage
#[derive(Debug, Clone)]
pub struct Context {
    pub options: ParseOptions,
    pub registry: Arc<Registry>,
    pub collector: Collector,
}

impl Context {
    pub fn new(options: ParseOptions, registry: Arc<Registry>) -> Self {
        let collector = Collector::new(options.strict);
        Self {
            options,
            registry,
            collector,
        }
    }

    /// Abort with `Cancelled` once the token fired or the deadline passed
    pub fn checkpoint(&self) -> Result<(), Abort> {
        if self.options.interrupted() {
            return Err(Abort::new(FatalKind::Cancelled));
        }
        Ok(())
    }

    /// Close the parse with a fatal outcome.
    ///
    /// A cancelled parse reports nothing but the cancellation; partial findings are discarded.
    pub fn fail(self, abort: Abort) -> FatalError {
        tracing::warn!(
            code = %abort.kind.code(),
            line = ?abort.line,
            path = ?abort.field_path,
            "parse rejected: {}",
            abort.kind
        );
        if abort.kind == FatalKind::Cancelled {
            return Collector::new(false).fail(abort);
        }
        self.collector.fail(abort)
    }
}

/// A value on its way through the pipeline, with the context it was produced in
#[derive(Debug, Clone)]
pub struct Staged<T> {
    pub ctx: Context,
    pub value: T,
}

impl<T> Staged<T> {
    pub fn new(ctx: Context, value: T) -> Self {
        Self { ctx, value }
    }

    /// Run one step after a checkpoint; an abort closes the context into a [`FatalError`].
    pub fn advance<U, F>(self, step: F) -> Result<Staged<U>, FatalError>
    where
        F: FnOnce(T, &mut Context) -> Result<U, Abort>,
    {
        let Staged { mut ctx, value } = self;
        let result = ctx.checkpoint().and_then(|()| step(value, &mut ctx));
        match result {
            Ok(value) => Ok(Staged { ctx, value }),
            Err(abort) => Err(ctx.fail(abort)),
        }
    }
}
