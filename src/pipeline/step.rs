//! Step descriptors and their runtime state

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    Succeeded,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StepError {
    #[error("Step '{name}' already finished as {status}")]
    AlreadyFinished { name: String, status: StepStatus },
    #[error("Step '{0}' cannot be moved back to pending")]
    BackToPending(String),
    #[error("Unknown step: {0}")]
    UnknownStep(String),
}

/// Result of a step's pre-check, evaluated right before the step runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreCheck {
    Run,
    Skip(String),
    Fail(String),
}

/// What a function-based step sees while it runs
pub struct StepContext<'a> {
    pub project_root: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: String,
    /// Relative to the project root; the root itself when `None`
    pub working_dir: Option<PathBuf>,
    /// Commands run first whose failure is logged but does not fail the step
    pub best_effort: Vec<String>,
}

impl CommandSpec {
    pub fn resolve_dir(&self, project_root: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) => project_root.join(dir),
            None => project_root.to_path_buf(),
        }
    }
}

pub type TaskFn = Box<dyn Fn(&StepContext<'_>) -> anyhow::Result<String>>;
pub type PreCheckFn = Box<dyn Fn(&Path) -> PreCheck>;

pub enum StepAction {
    Command(CommandSpec),
    Task(TaskFn),
}

/// A named unit of work, declared once when the pipeline is built.
pub struct StepDescriptor {
    pub name: String,
    pub description: String,
    pub action: StepAction,
    pub pre_check: Option<PreCheckFn>,
}

impl StepDescriptor {
    pub fn command(
        name: impl Into<String>,
        description: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            action: StepAction::Command(CommandSpec {
                command: command.into(),
                working_dir: None,
                best_effort: Vec::new(),
            }),
            pre_check: None,
        }
    }

    pub fn task<F>(name: impl Into<String>, description: impl Into<String>, task: F) -> Self
    where
        F: Fn(&StepContext<'_>) -> anyhow::Result<String> + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            action: StepAction::Task(Box::new(task)),
            pre_check: None,
        }
    }

    /// Runs a command step in `dir` (relative to the project root).
    /// No effect on task steps.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        if let StepAction::Command(spec) = &mut self.action {
            spec.working_dir = Some(dir.into());
        }
        self
    }

    pub fn with_best_effort(mut self, command: impl Into<String>) -> Self {
        if let StepAction::Command(spec) = &mut self.action {
            spec.best_effort.push(command.into());
        }
        self
    }

    pub fn with_pre_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Path) -> PreCheck + 'static,
    {
        self.pre_check = Some(Box::new(check));
        self
    }

    pub fn command_text(&self) -> Option<&str> {
        match &self.action {
            StepAction::Command(spec) => Some(&spec.command),
            StepAction::Task(_) => None,
        }
    }
}

/// Serializable view of a step for reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub description: String,
    pub ordinal: usize,
    pub total: usize,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Reason for skip/failure, or a tail of the captured output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// A descriptor plus its position and status within one pipeline.
pub struct Step {
    descriptor: StepDescriptor,
    ordinal: usize,
    total: usize,
    status: StepStatus,
    detail: Option<String>,
    duration: Option<Duration>,
}

impl Step {
    pub fn new(descriptor: StepDescriptor, ordinal: usize, total: usize) -> Self {
        Self {
            descriptor,
            ordinal,
            total,
            status: StepStatus::Pending,
            detail: None,
            duration: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Moves the step from pending to a terminal status. Each step can
    /// finish exactly once.
    pub fn finish(
        &mut self,
        status: StepStatus,
        detail: Option<String>,
        duration: Option<Duration>,
    ) -> Result<(), StepError> {
        if self.status.is_terminal() {
            return Err(StepError::AlreadyFinished {
                name: self.descriptor.name.clone(),
                status: self.status,
            });
        }
        if !status.is_terminal() {
            return Err(StepError::BackToPending(self.descriptor.name.clone()));
        }
        self.status = status;
        self.detail = detail;
        self.duration = duration;
        Ok(())
    }

    pub fn record(&self) -> StepRecord {
        StepRecord {
            name: self.descriptor.name.clone(),
            description: self.descriptor.description.clone(),
            ordinal: self.ordinal,
            total: self.total,
            status: self.status,
            command: self.descriptor.command_text().map(str::to_string),
            detail: self.detail.clone(),
            duration_ms: self.duration.map(|d| d.as_millis() as u64),
        }
    }
}
