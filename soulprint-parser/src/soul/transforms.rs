//! Transform pipeline infrastructure
//!
//!     The validation layers are wired together as composable, type-checked stages. A stage is
//!     anything implementing [`Runnable<I, O>`]; a [`Transform<I, O>`] wraps stages so they can
//!     be chained with `.then()`, and the compiler checks that each stage's output type is the
//!     next one's input type.
//!
//!     Stages never return a bare value: they hand a [`Staged<T>`](stages::Staged) to the
//!     next stage, carrying the parse [`Context`](stages::Context) (options, registry and the
//!     diagnostic collector) along with the value. A stage that cannot continue closes the
//!     context into a [`FatalError`], so the error always holds every diagnostic recorded so
//!     far.
//!
//! Static Pipelines
//!
//!     The standard pipelines are built once as `once_cell::sync::Lazy` statics in
//!     [`standard`]:
//!
//!         VERSIONING   Staged<ParseTree> → Staged<ParseTree>
//!         VALIDATION   Staged<ParseTree> → Staged<Document>
//!
//!     Decoding and the grammar pass borrow the input bytes, so they run before the first
//!     stage; see [`parse`](crate::soul::parsing::parse).
//!
//! Custom Pipelines
//!
//!     ```rust,ignore
//!     let pipeline = Transform::from_fn(Ok)
//!         .then(IntegrityCheck::new())
//!         .then_transform(&VERSIONING)
//!         .then(SemanticValidation::new())
//!         .then(MyAuditStage::new());
//!     ```

pub mod stages;
pub mod standard;

use crate::soul::ast::FatalError;

/// Anything that can turn an input into an output or reject the parse
pub trait Runnable<I, O> {
    fn run(&self, input: I) -> Result<O, FatalError>;
}

/// A composable transformation pipeline from `I` to `O`
pub struct Transform<I, O> {
    run_fn: Box<dyn Fn(I) -> Result<O, FatalError> + Send + Sync>,
}

impl<I, O> Transform<I, O> {
    /// Create a transform from a function
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(I) -> Result<O, FatalError> + Send + Sync + 'static,
    {
        Transform {
            run_fn: Box::new(f),
        }
    }

    /// Chain a stage onto this transform
    pub fn then<O2, S>(self, stage: S) -> Transform<I, O2>
    where
        S: Runnable<O, O2> + Send + Sync + 'static,
        I: 'static,
        O: 'static,
        O2: 'static,
    {
        let prev_run = self.run_fn;
        Transform {
            run_fn: Box::new(move |input| {
                let intermediate = prev_run(input)?;
                stage.run(intermediate)
            }),
        }
    }

    /// Chain a pre-built static transform onto this one
    pub fn then_transform<O2>(self, next: &'static Transform<O, O2>) -> Transform<I, O2>
    where
        I: 'static,
        O: 'static,
        O2: 'static,
    {
        let prev_run = self.run_fn;
        Transform {
            run_fn: Box::new(move |input| {
                let intermediate = prev_run(input)?;
                next.run(intermediate)
            }),
        }
    }

    pub fn run(&self, input: I) -> Result<O, FatalError> {
        (self.run_fn)(input)
    }
}

impl<I, O> Runnable<I, O> for Transform<I, O>
where
    I: 'static,
    O: 'static,
{
    fn run(&self, input: I) -> Result<O, FatalError> {
        Transform::run(self, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soul::ast::{Code, Diagnostic, FatalKind, Report};

    struct CountLines;
    impl Runnable<String, usize> for CountLines {
        fn run(&self, input: String) -> Result<usize, FatalError> {
            Ok(input.lines().count())
        }
    }

    struct RequireLines(usize);
    impl Runnable<usize, usize> for RequireLines {
        fn run(&self, input: usize) -> Result<usize, FatalError> {
            if input >= self.0 {
                return Ok(input);
            }
            let mut report = Report::new();
            report.push(Diagnostic::error(Code::MissingSignature, "too short"));
            Err(FatalError {
                kind: FatalKind::Signature,
                report,
            })
        }
    }

    #[test]
    fn test_stages_chain_across_types() {
        let pipeline = Transform::from_fn(|s: String| Ok(s.trim().to_string()))
            .then(CountLines)
            .then(RequireLines(2));
        assert_eq!(pipeline.run("%SOULPRINT\n%VERSION: v1.0.0\n".to_string()).unwrap(), 2);
    }

    #[test]
    fn test_failure_stops_the_chain() {
        let pipeline = Transform::from_fn(Ok)
            .then(CountLines)
            .then(RequireLines(2))
            .then(RequireLines(100));
        let err = pipeline.run("%SOULPRINT\n".to_string()).unwrap_err();
        assert_eq!(err.kind, FatalKind::Signature);
        assert_eq!(err.report.len(), 1);
    }

    #[test]
    fn test_static_transform_composes() {
        use once_cell::sync::Lazy;
        static COUNT: Lazy<Transform<String, usize>> =
            Lazy::new(|| Transform::from_fn(Ok).then(CountLines));

        let pipeline = Transform::from_fn(|s: String| Ok(s.repeat(3)))
            .then_transform(&COUNT)
            .then(RequireLines(3));
        assert_eq!(pipeline.run("a\n".to_string()).unwrap(), 3);
    }
}
