//! Final ledger of a build run plus the artifact check

use crate::pipeline::{PipelineRun, StepRecord, StepStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of looking for the build output on disk. A missing file is a
/// normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ArtifactStatus {
    /// The producing step did not succeed, so nothing was looked up
    NotChecked { path: PathBuf },
    Found { path: PathBuf, size_bytes: u64 },
    NotFound { path: PathBuf },
}

impl ArtifactStatus {
    /// Looks for a regular file at `path`.
    pub fn locate(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => ArtifactStatus::Found {
                path: path.to_path_buf(),
                size_bytes: meta.len(),
            },
            _ => ArtifactStatus::NotFound {
                path: path.to_path_buf(),
            },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ArtifactStatus::NotChecked { path }
            | ArtifactStatus::Found { path, .. }
            | ArtifactStatus::NotFound { path } => path,
        }
    }

    pub fn size_bytes(&self) -> Option<u64> {
        match self {
            ArtifactStatus::Found { size_bytes, .. } => Some(*size_bytes),
            _ => None,
        }
    }

    pub fn size_mb(&self) -> Option<f64> {
        self.size_bytes().map(|b| b as f64 / (1024.0 * 1024.0))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub project_root: PathBuf,
    pub success: bool,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    pub not_run: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_after: Option<String>,
    pub artifact: ArtifactStatus,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BuildSummary {
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// 0 when no step ended failed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Builds the summary for `run`. The artifact at `project_root/artifact` is
/// only looked up when the step named `producing_step` succeeded.
pub fn summarize(
    run: &PipelineRun,
    project_root: &Path,
    artifact: &Path,
    producing_step: &str,
) -> BuildSummary {
    let artifact_path = project_root.join(artifact);
    let artifact = if run.status_of(producing_step) == Some(StepStatus::Succeeded) {
        ArtifactStatus::locate(&artifact_path)
    } else {
        ArtifactStatus::NotChecked {
            path: artifact_path,
        }
    };

    let failed = run.failed();
    BuildSummary {
        project_root: project_root.to_path_buf(),
        success: failed.is_empty(),
        completed: run.completed(),
        failed,
        skipped: run.skipped(),
        not_run: run.not_run(),
        aborted_after: run.aborted_after.clone(),
        artifact,
        steps: run.records.clone(),
        started_at: run.started_at,
        finished_at: run.finished_at,
    }
}
