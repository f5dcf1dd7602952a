//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while the pipeline runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Pipeline started
    PipelineStarted {
        project_root: String,
        total_steps: usize,
    },

    /// A step is about to run
    StepStarted {
        name: String,
        index: usize,
        total: usize,
    },

    /// A step was skipped, either by the user or by its pre-check
    StepSkipped {
        name: String,
        index: usize,
        total: usize,
        reason: String,
    },

    /// A step finished running
    StepFinished {
        name: String,
        index: usize,
        total: usize,
        duration: Duration,
        success: bool,
    },

    /// The controlling caller chose to stop after a failure
    PipelineAborted { after_step: String },

    /// Pipeline finished, with or without failures
    PipelineCompleted {
        succeeded: usize,
        failed: usize,
        total_time: Duration,
    },
}

/// Trait for handling progress events during a pipeline run
pub trait ProgressHandler {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
