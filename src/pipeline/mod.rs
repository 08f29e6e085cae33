//! The staged pipeline runtime.
//!
//! A run threads a single [`PipelineValue`] through an ordered list of
//! [`Stage`]s. The runner owns timing and event emission; stages own their
//! domain work and may implement a recovery hook that converts their own
//! failures into a degraded-but-valid value.

use crate::cancellation::CancellationToken;
use crate::config::{Options, OutputFormat};
use crate::core_types::{FileRecord, GitMetadata, PipelineStats};
use crate::errors::{Error, Result};
use crate::events::{EventSink, PipelineEvent};
use crate::profile::Profile;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Instant;

/// The rendered document, populated by a formatting stage.
#[derive(Debug, Clone)]
pub struct RenderedOutput {
    /// The emitted format.
    pub format: OutputFormat,
    /// The assembled document.
    pub text: String,
    /// Size in bytes of `text`.
    pub size: usize,
}

/// The message passed between stages.
///
/// Owned exclusively by the stage currently running; stages mutate it in
/// place and never observe each other mid-flight.
#[derive(Debug, Clone)]
pub struct PipelineValue {
    /// Immutable configuration snapshot.
    pub options: Arc<Options>,
    /// Resolved profile.
    pub profile: Arc<Profile>,
    /// Files in flight.
    pub files: Vec<FileRecord>,
    /// Cumulative per-stage counters.
    pub stats: PipelineStats,
    /// Git context, when a git stage ran.
    pub git: Option<GitMetadata>,
    /// Free-form text prepended to the document.
    pub instructions: Option<String>,
    /// Populated by the formatter.
    pub output: Option<RenderedOutput>,
}

impl PipelineValue {
    /// A fresh value with no files.
    pub fn new(options: Arc<Options>, profile: Arc<Profile>) -> Self {
        let instructions = if options.render.no_instructions {
            None
        } else {
            options.render.instructions.clone()
        };
        Self {
            options,
            profile,
            files: Vec::new(),
            stats: PipelineStats::default(),
            git: None,
            instructions,
            output: None,
        }
    }

    /// Absolute scan root.
    pub fn base_path(&self) -> &std::path::Path {
        &self.options.base_path
    }
}

/// Shared collaborators handed to every stage invocation.
#[derive(Debug, Clone)]
pub struct StageContext {
    /// Event sink for progress publication.
    pub events: EventSink,
    /// Cancellation token checked at every suspension point.
    pub cancel: CancellationToken,
}

impl StageContext {
    pub fn new(events: EventSink, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// A headless context for tests and library embedding.
    pub fn headless() -> Self {
        Self {
            events: EventSink::disabled(),
            cancel: CancellationToken::new(),
        }
    }
}

/// An independent unit of pipeline work.
pub trait Stage: Send + Sync {
    /// Stable stage name used in events and error wrapping.
    fn name(&self) -> &'static str;

    /// Guard; when false the runner skips the stage without emitting an
    /// `after` event.
    fn should_apply(&self, _value: &PipelineValue) -> bool {
        true
    }

    /// Performs the stage's work, mutating the value in place.
    fn process(&self, value: &mut PipelineValue, ctx: &StageContext) -> Result<()>;

    /// Recovery hook: convert `err` into a usable value by repairing
    /// `value`, or return the error to fail the stage.
    fn handle_error(
        &self,
        err: Error,
        _value: &mut PipelineValue,
        _ctx: &StageContext,
    ) -> Result<()> {
        Err(err)
    }
}

/// An ordered stage composition.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    continue_on_error: bool,
}

impl Pipeline {
    /// Builds a pipeline over the given stages.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            continue_on_error: false,
        }
    }

    /// Unrecovered stage errors log and fall through to the next stage
    /// with the value as the failing stage left it.
    pub fn continue_on_error(mut self, yes: bool) -> Self {
        self.continue_on_error = yes;
        self
    }

    /// Stage names in run order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Drives the value through every stage.
    ///
    /// Stages run strictly sequentially. Cancellation is honored before
    /// each stage; a cancelled run aborts with [`Error::Cancelled`]. A
    /// failing stage is given its `handle_error` hook; an unrecovered
    /// error aborts the run wrapped with the stage name, unless the
    /// pipeline was built with `continue_on_error`.
    pub fn run(&self, mut value: PipelineValue, ctx: &StageContext) -> Result<PipelineValue> {
        for stage in &self.stages {
            if ctx.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let name = stage.name();
            if !stage.should_apply(&value) {
                debug!("stage {name}: skipped");
                ctx.events.emit(PipelineEvent::StageSkipped { stage: name });
                continue;
            }

            ctx.events.emit(PipelineEvent::StageStarted { stage: name });
            let started = Instant::now();

            let outcome = stage.process(&mut value, ctx);
            let outcome = match outcome {
                Ok(()) => Ok(()),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(err) => match stage.handle_error(err, &mut value, ctx) {
                    Ok(()) => {
                        ctx.events.emit(PipelineEvent::StageRecovered { stage: name });
                        Ok(())
                    }
                    Err(err) => Err(err),
                },
            };

            match outcome {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    debug!("stage {name}: done in {elapsed:?}");
                    ctx.events.emit(PipelineEvent::StageFinished {
                        stage: name,
                        elapsed,
                    });
                }
                Err(err) if self.continue_on_error && !err.is_user_requested_abort() => {
                    warn!("stage {name} failed, continuing: {err}");
                    ctx.events.emit(PipelineEvent::Warning {
                        stage: name,
                        message: err.to_string(),
                    });
                }
                // User-requested aborts keep their identity so callers can
                // map them to dedicated exit codes.
                Err(err) if err.is_user_requested_abort() => return Err(err),
                Err(err) => {
                    return Err(Error::Stage {
                        stage: name,
                        source: Box::new(err),
                    });
                }
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn value() -> PipelineValue {
        PipelineValue::new(
            Arc::new(Options::default()),
            Arc::new(Profile::everything()),
        )
    }

    struct CountStage;
    impl Stage for CountStage {
        fn name(&self) -> &'static str {
            "count"
        }
        fn process(&self, value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
            value.stats.discovered += 1;
            Ok(())
        }
    }

    struct GuardedStage;
    impl Stage for GuardedStage {
        fn name(&self) -> &'static str {
            "guarded"
        }
        fn should_apply(&self, _value: &PipelineValue) -> bool {
            false
        }
        fn process(&self, _value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
            panic!("guard must prevent this");
        }
    }

    struct FailingStage {
        recoverable: bool,
    }
    impl Stage for FailingStage {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn process(&self, _value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
            Err(Error::Internal("boom".into()))
        }
        fn handle_error(
            &self,
            err: Error,
            value: &mut PipelineValue,
            _ctx: &StageContext,
        ) -> Result<()> {
            if self.recoverable {
                value.stats.transform_errors += 1;
                Ok(())
            } else {
                Err(err)
            }
        }
    }

    #[test]
    fn stages_run_in_order_with_events() {
        let (tx, rx) = unbounded();
        let ctx = StageContext::new(EventSink::new(tx), CancellationToken::new());
        let pipeline = Pipeline::new(vec![Box::new(CountStage), Box::new(GuardedStage)]);
        let result = pipeline.run(value(), &ctx).unwrap();
        assert_eq!(result.stats.discovered, 1);

        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert!(matches!(
            events[0],
            PipelineEvent::StageStarted { stage: "count" }
        ));
        assert!(matches!(
            events[1],
            PipelineEvent::StageFinished { stage: "count", .. }
        ));
        // A skipped stage emits no `finished` event.
        assert!(matches!(
            events[2],
            PipelineEvent::StageSkipped { stage: "guarded" }
        ));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn recovery_hook_converts_error_to_value() {
        let ctx = StageContext::headless();
        let pipeline = Pipeline::new(vec![
            Box::new(FailingStage { recoverable: true }),
            Box::new(CountStage),
        ]);
        let result = pipeline.run(value(), &ctx).unwrap();
        assert_eq!(result.stats.transform_errors, 1);
        assert_eq!(result.stats.discovered, 1);
    }

    #[test]
    fn unrecovered_error_is_wrapped_with_stage_name() {
        let ctx = StageContext::headless();
        let pipeline = Pipeline::new(vec![Box::new(FailingStage { recoverable: false })]);
        let err = pipeline.run(value(), &ctx).unwrap_err();
        match err {
            Error::Stage { stage, .. } => assert_eq!(stage, "failing"),
            other => panic!("expected Stage, got {other:?}"),
        }
    }

    struct SecretsAbort;
    impl Stage for SecretsAbort {
        fn name(&self) -> &'static str {
            "secrets-guard"
        }
        fn process(&self, _value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
            Err(Error::SecretsDetected {
                count: 2,
                summary: "a.txt:1 RULE".into(),
            })
        }
    }

    #[test]
    fn user_requested_aborts_keep_their_identity() {
        let ctx = StageContext::headless();
        let pipeline = Pipeline::new(vec![Box::new(SecretsAbort)]);
        let err = pipeline.run(value(), &ctx).unwrap_err();
        assert!(matches!(err, Error::SecretsDetected { count: 2, .. }));

        // Even a continue-on-error plan must not swallow them.
        let pipeline = Pipeline::new(vec![Box::new(SecretsAbort)]).continue_on_error(true);
        let err = pipeline.run(value(), &ctx).unwrap_err();
        assert!(matches!(err, Error::SecretsDetected { .. }));
    }

    #[test]
    fn continue_on_error_falls_through() {
        let ctx = StageContext::headless();
        let pipeline = Pipeline::new(vec![
            Box::new(FailingStage { recoverable: false }),
            Box::new(CountStage),
        ])
        .continue_on_error(true);
        let result = pipeline.run(value(), &ctx).unwrap();
        assert_eq!(result.stats.discovered, 1);
    }

    #[test]
    fn cancellation_aborts_before_next_stage() {
        let ctx = StageContext::headless();
        ctx.cancel.cancel();
        let pipeline = Pipeline::new(vec![Box::new(CountStage)]);
        let err = pipeline.run(value(), &ctx).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
