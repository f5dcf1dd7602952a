//! Sequential build pipeline with user-directed continuation after failures

pub mod confirm;
pub mod orchestrator;
pub mod step;
pub mod steps;

pub use confirm::{AutoConfirmer, Confirmer, TerminalConfirmer};
pub use orchestrator::{PipelineOrchestrator, PipelineRun};
pub use step::{
    CommandSpec, PreCheck, Step, StepAction, StepContext, StepDescriptor, StepError, StepRecord,
    StepStatus,
};
pub use steps::{canonical_steps, step_catalog, StepInfo, STEP_NAMES};
