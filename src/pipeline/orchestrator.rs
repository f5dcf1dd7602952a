use super::confirm::Confirmer;
use super::step::{
    PreCheck, Step, StepAction, StepContext, StepDescriptor, StepError, StepRecord, StepStatus,
};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::runner::CommandRunner;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Characters of command output kept on a step record
pub const OUTPUT_TAIL_CHARS: usize = 2000;

const USER_SKIP_REASON: &str = "skipped by user";

/// Outcome of one pipeline invocation
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub records: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_after: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineRun {
    fn names_with(&self, status: StepStatus) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn completed(&self) -> Vec<String> {
        self.names_with(StepStatus::Succeeded)
    }

    pub fn failed(&self) -> Vec<String> {
        self.names_with(StepStatus::Failed)
    }

    pub fn skipped(&self) -> Vec<String> {
        self.names_with(StepStatus::Skipped)
    }

    /// Steps left pending because the run was aborted
    pub fn not_run(&self) -> Vec<String> {
        self.names_with(StepStatus::Pending)
    }

    pub fn has_failures(&self) -> bool {
        self.records.iter().any(|r| r.status == StepStatus::Failed)
    }

    pub fn status_of(&self, name: &str) -> Option<StepStatus> {
        self.records.iter().find(|r| r.name == name).map(|r| r.status)
    }

    pub fn record(&self, name: &str) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.name == name)
    }
}

/// Runs an ordered list of steps against one project, strictly one after
/// another. After a failure the confirmer decides whether to go on.
pub struct PipelineOrchestrator<'a> {
    project_root: PathBuf,
    steps: Vec<Step>,
    runner: &'a dyn CommandRunner,
    confirmer: &'a dyn Confirmer,
    progress_handler: Option<&'a dyn ProgressHandler>,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(
        project_root: impl Into<PathBuf>,
        descriptors: Vec<StepDescriptor>,
        runner: &'a dyn CommandRunner,
        confirmer: &'a dyn Confirmer,
    ) -> Self {
        let total = descriptors.len();
        let steps = descriptors
            .into_iter()
            .enumerate()
            .map(|(i, d)| Step::new(d, i + 1, total))
            .collect();

        Self {
            project_root: project_root.into(),
            steps,
            runner,
            confirmer,
            progress_handler: None,
        }
    }

    pub fn with_progress(mut self, handler: &'a dyn ProgressHandler) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Marks a step as skipped before the run starts.
    pub fn skip(&mut self, name: &str) -> Result<(), StepError> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.name() == name)
            .ok_or_else(|| StepError::UnknownStep(name.to_string()))?;
        if step.status() == StepStatus::Skipped {
            return Ok(());
        }
        step.finish(StepStatus::Skipped, Some(USER_SKIP_REASON.to_string()), None)
    }

    pub fn records(&self) -> Vec<StepRecord> {
        self.steps.iter().map(Step::record).collect()
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = self.progress_handler {
            handler.on_progress(&event);
        }
    }

    /// Runs every pending step once, in order. Steps that already reached a
    /// terminal status are not run again.
    pub fn run(&mut self) -> PipelineRun {
        let started_at = Utc::now();
        let start = Instant::now();
        let total = self.steps.len();
        let mut aborted_after = None;

        info!(
            "Running {} step(s) in {}",
            total,
            self.project_root.display()
        );
        self.emit(ProgressEvent::PipelineStarted {
            project_root: self.project_root.display().to_string(),
            total_steps: total,
        });

        for index in 0..total {
            let status = self.steps[index].status();
            if status == StepStatus::Skipped {
                let step = &self.steps[index];
                self.emit(ProgressEvent::StepSkipped {
                    name: step.name().to_string(),
                    index: step.ordinal(),
                    total,
                    reason: step.detail().unwrap_or(USER_SKIP_REASON).to_string(),
                });
                continue;
            }
            if status.is_terminal() {
                debug!(step = %self.steps[index].name(), %status, "Step already finished");
                continue;
            }

            let succeeded = self.run_step(index);
            if succeeded {
                continue;
            }

            let has_remaining = self.steps[index + 1..]
                .iter()
                .any(|s| s.status() == StepStatus::Pending);
            if !has_remaining {
                continue;
            }

            let name = self.steps[index].name().to_string();
            let prompt = format!("Step '{}' failed. Continue with the remaining steps?", name);
            if self.confirmer.confirm(&prompt) {
                info!(step = %name, "Continuing after failure");
            } else {
                self.emit(ProgressEvent::PipelineAborted {
                    after_step: name.clone(),
                });
                aborted_after = Some(name);
                break;
            }
        }

        let records = self.records();
        let succeeded = records
            .iter()
            .filter(|r| r.status == StepStatus::Succeeded)
            .count();
        let failed = records
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .count();
        self.emit(ProgressEvent::PipelineCompleted {
            succeeded,
            failed,
            total_time: start.elapsed(),
        });

        PipelineRun {
            records,
            aborted_after,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Pre-check, execute and finish one pending step. Returns whether it
    /// did not fail.
    fn run_step(&mut self, index: usize) -> bool {
        let total = self.steps.len();
        let (name, ordinal) = {
            let step = &self.steps[index];
            (step.name().to_string(), step.ordinal())
        };

        let check = match &self.steps[index].descriptor().pre_check {
            Some(check) => check(self.project_root.as_path()),
            None => PreCheck::Run,
        };

        let (status, detail, duration) = match check {
            PreCheck::Skip(reason) => {
                info!(step = %name, %reason, "Pre-check skipped step");
                self.emit(ProgressEvent::StepSkipped {
                    name: name.clone(),
                    index: ordinal,
                    total,
                    reason: reason.clone(),
                });
                self.finish_step(index, StepStatus::Skipped, Some(reason), None);
                return true;
            }
            PreCheck::Fail(reason) => {
                warn!(step = %name, %reason, "Pre-check failed");
                (StepStatus::Failed, Some(reason), Duration::ZERO)
            }
            PreCheck::Run => {
                self.emit(ProgressEvent::StepStarted {
                    name: name.clone(),
                    index: ordinal,
                    total,
                });
                let start = Instant::now();
                let (ok, detail) = self.execute(index);
                let status = if ok {
                    StepStatus::Succeeded
                } else {
                    StepStatus::Failed
                };
                (status, detail, start.elapsed())
            }
        };

        let success = status == StepStatus::Succeeded;
        self.emit(ProgressEvent::StepFinished {
            name,
            index: ordinal,
            total,
            duration,
            success,
        });
        self.finish_step(index, status, detail, Some(duration));
        success
    }

    fn finish_step(
        &mut self,
        index: usize,
        status: StepStatus,
        detail: Option<String>,
        duration: Option<Duration>,
    ) {
        if let Err(e) = self.steps[index].finish(status, detail, duration) {
            warn!(error = %e, "Ignoring second status change");
        }
    }

    fn execute(&self, index: usize) -> (bool, Option<String>) {
        let step = &self.steps[index];
        match &step.descriptor().action {
            StepAction::Command(spec) => {
                let dir = spec.resolve_dir(&self.project_root);

                for command in &spec.best_effort {
                    let result = self.runner.run(command, &dir);
                    if !result.succeeded {
                        warn!(
                            step = %step.name(),
                            command = %command,
                            exit_code = ?result.exit_code,
                            "Best-effort command failed, continuing"
                        );
                    }
                }

                let result = self.runner.run(&spec.command, &dir);
                let tail = result.output_tail(OUTPUT_TAIL_CHARS);
                let detail = if result.succeeded {
                    (!tail.trim().is_empty()).then_some(tail)
                } else {
                    let reason = match result.exit_code {
                        Some(code) => format!("exited with code {}", code),
                        None => "did not exit normally".to_string(),
                    };
                    if tail.trim().is_empty() {
                        Some(reason)
                    } else {
                        Some(format!("{}\n{}", reason, tail))
                    }
                };
                (result.succeeded, detail)
            }
            StepAction::Task(task) => {
                let ctx = StepContext {
                    project_root: &self.project_root,
                };
                match task(&ctx) {
                    Ok(message) => (true, (!message.is_empty()).then_some(message)),
                    Err(e) => (false, Some(format!("{:#}", e))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::confirm::{AutoConfirmer, MockConfirmer};
    use crate::runner::{CommandResult, MockCommandRunner};
    use anyhow::anyhow;
    use std::cell::RefCell;

    fn command_steps(names: &[&str]) -> Vec<StepDescriptor> {
        names
            .iter()
            .map(|n| StepDescriptor::command(*n, format!("Run {}", n), format!("do-{}", n)))
            .collect()
    }

    /// Runner where `do-<name>` fails for the given names
    fn runner_failing(failing: &'static [&'static str]) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(move |command: &str, dir: &Path| {
            let fails = failing.iter().any(|n| command == format!("do-{}", n));
            if fails {
                CommandResult::exited(command, dir, "boom".to_string(), Some(1))
            } else {
                CommandResult::success(command, dir, "ok".to_string())
            }
        });
        runner
    }

    fn statuses(run: &PipelineRun) -> Vec<StepStatus> {
        run.records.iter().map(|r| r.status).collect()
    }

    #[test]
    fn test_all_steps_succeed() {
        let runner = runner_failing(&[]);
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().never();

        let mut orchestrator =
            PipelineOrchestrator::new("/proj", command_steps(&["a", "b", "c"]), &runner, &confirmer);
        let run = orchestrator.run();

        assert_eq!(statuses(&run), vec![StepStatus::Succeeded; 3]);
        assert!(run.aborted_after.is_none());
        assert!(!run.has_failures());
    }

    #[test]
    fn test_abort_after_failure_leaves_rest_pending() {
        let runner = runner_failing(&["b"]);
        let mut confirmer = MockConfirmer::new();
        confirmer
            .expect_confirm()
            .withf(|prompt: &str| prompt.contains("'b'"))
            .times(1)
            .returning(|_| false);

        let mut orchestrator = PipelineOrchestrator::new(
            "/proj",
            command_steps(&["a", "b", "c", "d"]),
            &runner,
            &confirmer,
        );
        let run = orchestrator.run();

        assert_eq!(
            statuses(&run),
            vec![
                StepStatus::Succeeded,
                StepStatus::Failed,
                StepStatus::Pending,
                StepStatus::Pending
            ]
        );
        assert_eq!(run.aborted_after.as_deref(), Some("b"));
        assert_eq!(run.not_run(), vec!["c".to_string(), "d".to_string()]);
        assert_eq!(run.failed(), vec!["b".to_string()]);
    }

    #[test]
    fn test_continue_after_failure() {
        let runner = runner_failing(&["b"]);
        let confirmer = AutoConfirmer::always_yes();

        let mut orchestrator = PipelineOrchestrator::new(
            "/proj",
            command_steps(&["a", "b", "c"]),
            &runner,
            &confirmer,
        );
        let run = orchestrator.run();

        assert_eq!(run.completed(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(run.failed(), vec!["b".to_string()]);
        assert!(run.aborted_after.is_none());
    }

    #[test]
    fn test_last_step_failure_does_not_prompt() {
        let runner = runner_failing(&["c"]);
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().never();

        let mut orchestrator =
            PipelineOrchestrator::new("/proj", command_steps(&["a", "b", "c"]), &runner, &confirmer);
        let run = orchestrator.run();

        assert_eq!(run.failed(), vec!["c".to_string()]);
        assert!(run.aborted_after.is_none());
    }

    #[test]
    fn test_user_skip_is_never_executed() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|command: &str, _: &Path| command == "do-b")
            .never();
        runner
            .expect_run()
            .returning(|command: &str, dir: &Path| CommandResult::success(command, dir, String::new()));
        let confirmer = AutoConfirmer::always_no();

        let mut orchestrator =
            PipelineOrchestrator::new("/proj", command_steps(&["a", "b", "c"]), &runner, &confirmer);
        orchestrator.skip("b").unwrap();
        let run = orchestrator.run();

        assert_eq!(run.skipped(), vec!["b".to_string()]);
        assert_eq!(
            run.record("b").and_then(|r| r.detail.as_deref()),
            Some(USER_SKIP_REASON)
        );
        assert_eq!(run.completed().len(), 2);
    }

    #[test]
    fn test_skipping_twice_is_harmless() {
        let runner = runner_failing(&[]);
        let confirmer = AutoConfirmer::always_no();
        let mut orchestrator =
            PipelineOrchestrator::new("/proj", command_steps(&["a", "b"]), &runner, &confirmer);

        assert_eq!(orchestrator.skip("b"), Ok(()));
        assert_eq!(orchestrator.skip("b"), Ok(()));
        let run = orchestrator.run();

        assert_eq!(run.skipped(), vec!["b".to_string()]);
        assert_eq!(run.completed(), vec!["a".to_string()]);
    }

    #[test]
    fn test_skip_unknown_step() {
        let runner = MockCommandRunner::new();
        let confirmer = AutoConfirmer::always_no();
        let mut orchestrator =
            PipelineOrchestrator::new("/proj", command_steps(&["a"]), &runner, &confirmer);

        assert_eq!(
            orchestrator.skip("nope"),
            Err(StepError::UnknownStep("nope".to_string()))
        );
    }

    #[test]
    fn test_pre_check_skip_and_fail() {
        let runner = runner_failing(&[]);
        let mut confirmer = MockConfirmer::new();
        confirmer.expect_confirm().times(1).returning(|_| true);

        let steps = vec![
            StepDescriptor::command("clean", "Clean", "do-clean")
                .with_pre_check(|_| PreCheck::Skip("nothing to clean".to_string())),
            StepDescriptor::command("build", "Build", "do-build")
                .with_pre_check(|_| PreCheck::Fail("android directory not found".to_string())),
            StepDescriptor::command("report", "Report", "do-report"),
        ];
        let mut orchestrator = PipelineOrchestrator::new("/proj", steps, &runner, &confirmer);
        let run = orchestrator.run();

        assert_eq!(
            statuses(&run),
            vec![StepStatus::Skipped, StepStatus::Failed, StepStatus::Succeeded]
        );
        assert_eq!(
            run.record("build").and_then(|r| r.detail.as_deref()),
            Some("android directory not found")
        );
    }

    #[test]
    fn test_best_effort_failure_does_not_fail_step() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|command: &str, _: &Path| command == "./gradlew clean")
            .times(1)
            .returning(|command: &str, dir: &Path| {
                CommandResult::exited(command, dir, String::new(), Some(1))
            });
        runner
            .expect_run()
            .withf(|command: &str, dir: &Path| {
                command == "./gradlew assembleDebug" && dir == Path::new("/proj/android")
            })
            .times(1)
            .returning(|command: &str, dir: &Path| {
                CommandResult::success(command, dir, "BUILD SUCCESSFUL".to_string())
            });
        let confirmer = AutoConfirmer::always_no();

        let steps = vec![
            StepDescriptor::command("build", "Build", "./gradlew assembleDebug")
                .in_dir("android")
                .with_best_effort("./gradlew clean"),
        ];
        let mut orchestrator = PipelineOrchestrator::new("/proj", steps, &runner, &confirmer);
        let run = orchestrator.run();

        assert_eq!(run.completed(), vec!["build".to_string()]);
        assert_eq!(
            run.record("build").and_then(|r| r.detail.as_deref()),
            Some("BUILD SUCCESSFUL")
        );
    }

    #[test]
    fn test_task_error_fails_step() {
        let runner = MockCommandRunner::new();
        let confirmer = AutoConfirmer::always_no();
        let steps = vec![
            StepDescriptor::task("fix-config", "Fix", |_| Err(anyhow!("2 fix(es) failed"))),
            StepDescriptor::task("after", "After", |_| Ok("done".to_string())),
        ];

        let mut orchestrator = PipelineOrchestrator::new("/proj", steps, &runner, &confirmer);
        let run = orchestrator.run();

        assert_eq!(
            statuses(&run),
            vec![StepStatus::Failed, StepStatus::Pending]
        );
        assert_eq!(run.aborted_after.as_deref(), Some("fix-config"));
        assert!(run
            .record("fix-config")
            .and_then(|r| r.detail.as_deref())
            .is_some_and(|d| d.contains("2 fix(es) failed")));
    }

    #[test]
    fn test_failed_command_detail_has_exit_code() {
        let runner = runner_failing(&["a"]);
        let confirmer = AutoConfirmer::always_no();
        let mut orchestrator =
            PipelineOrchestrator::new("/proj", command_steps(&["a"]), &runner, &confirmer);
        let run = orchestrator.run();

        let detail = run.record("a").and_then(|r| r.detail.clone()).unwrap();
        assert!(detail.starts_with("exited with code 1"));
        assert!(detail.contains("boom"));
    }

    #[test]
    fn test_second_run_executes_nothing() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(2)
            .returning(|command: &str, dir: &Path| CommandResult::success(command, dir, String::new()));
        let confirmer = AutoConfirmer::always_no();

        let mut orchestrator =
            PipelineOrchestrator::new("/proj", command_steps(&["a", "b"]), &runner, &confirmer);
        orchestrator.run();
        let second = orchestrator.run();

        assert_eq!(second.completed().len(), 2);
    }

    #[test]
    fn test_progress_events_in_order() {
        struct Recorder(RefCell<Vec<String>>);
        impl ProgressHandler for Recorder {
            fn on_progress(&self, event: &ProgressEvent) {
                let label = match event {
                    ProgressEvent::PipelineStarted { .. } => "start".to_string(),
                    ProgressEvent::StepStarted { name, .. } => format!("begin:{}", name),
                    ProgressEvent::StepSkipped { name, .. } => format!("skip:{}", name),
                    ProgressEvent::StepFinished { name, success, .. } => {
                        format!("end:{}:{}", name, success)
                    }
                    ProgressEvent::PipelineAborted { after_step } => format!("abort:{}", after_step),
                    ProgressEvent::PipelineCompleted { .. } => "done".to_string(),
                };
                self.0.borrow_mut().push(label);
            }
        }

        let runner = runner_failing(&["c"]);
        let confirmer = AutoConfirmer::always_no();
        let recorder = Recorder(RefCell::new(Vec::new()));

        let mut orchestrator = PipelineOrchestrator::new(
            "/proj",
            command_steps(&["a", "b", "c", "d"]),
            &runner,
            &confirmer,
        )
        .with_progress(&recorder);
        orchestrator.skip("b").unwrap();
        orchestrator.run();

        assert_eq!(
            *recorder.0.borrow(),
            vec![
                "start",
                "begin:a",
                "end:a:true",
                "skip:b",
                "begin:c",
                "end:c:false",
                "abort:c",
                "done"
            ]
        );
    }
}
