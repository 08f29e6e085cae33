//! Typed progress events published by the pipeline runtime.
//!
//! Stages never manipulate the terminal themselves; they publish events and
//! the caller decides what to do with them (progress bar, log lines, or
//! nothing). A sink without a channel drops everything, so the library runs
//! headless by default.

use crossbeam_channel::Sender;
use std::time::Duration;

/// One progress event from the pipeline runtime or a stage.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Emitted by the runtime before a stage runs.
    StageStarted { stage: &'static str },
    /// Emitted by the runtime after a stage completes, with its wall time.
    StageFinished {
        stage: &'static str,
        elapsed: Duration,
    },
    /// Emitted when a stage's guard declined to run it.
    StageSkipped { stage: &'static str },
    /// Emitted when a stage's recovery hook converted an error into a value.
    StageRecovered { stage: &'static str },
    /// A stage began working on one file (transform stage's active view).
    FileStarted { stage: &'static str, path: String },
    /// A stage finished one file.
    FileFinished { stage: &'static str, path: String },
    /// A recoverable problem worth surfacing.
    Warning { stage: &'static str, message: String },
}

/// Cloneable handle stages use to publish events.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<Sender<PipelineEvent>>,
}

impl EventSink {
    /// A sink that forwards events into the given channel.
    pub fn new(tx: Sender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Publishes an event. A full or disconnected channel is not an error;
    /// progress display must never affect correctness.
    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(event);
        }
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::disabled()
    }
}
