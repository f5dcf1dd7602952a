//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PipelineStarted {
                project_root,
                total_steps,
            } => {
                info!(root = %project_root, steps = total_steps, "Starting build pipeline");
            }
            ProgressEvent::StepStarted { name, index, total } => {
                info!(
                    step = %name,
                    progress = format!("{}/{}", index, total),
                    "Starting step"
                );
            }
            ProgressEvent::StepSkipped {
                name,
                index,
                total,
                reason,
            } => {
                info!(
                    step = %name,
                    progress = format!("{}/{}", index, total),
                    reason = %reason,
                    "Step skipped"
                );
            }
            ProgressEvent::StepFinished {
                name,
                index,
                total,
                duration,
                success,
            } => {
                if *success {
                    info!(
                        step = %name,
                        progress = format!("{}/{}", index, total),
                        duration_ms = duration.as_millis(),
                        "Step succeeded"
                    );
                } else {
                    warn!(
                        step = %name,
                        progress = format!("{}/{}", index, total),
                        duration_ms = duration.as_millis(),
                        "Step failed"
                    );
                }
            }
            ProgressEvent::PipelineAborted { after_step } => {
                warn!(step = %after_step, "Pipeline stopped by user");
            }
            ProgressEvent::PipelineCompleted {
                succeeded,
                failed,
                total_time,
            } => {
                if *failed > 0 {
                    warn!(
                        succeeded,
                        failed,
                        total_time_ms = total_time.as_millis(),
                        "Pipeline finished with failures"
                    );
                } else {
                    info!(
                        succeeded,
                        total_time_ms = total_time.as_millis(),
                        "Pipeline finished"
                    );
                }
            }
        }
    }
}
