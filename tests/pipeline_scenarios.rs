//! End-to-end pipeline runs with a scripted command runner

mod common;

use apkforge::config::ForgeConfig;
use apkforge::output::{summarize, ArtifactStatus};
use apkforge::pipeline::steps::{gradlew, STEP_BUILD};
use apkforge::pipeline::{
    canonical_steps, AutoConfirmer, PipelineOrchestrator, StepDescriptor, StepStatus,
};
use apkforge::runner::{CommandResult, CommandRunner};
use common::*;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Pretends to be npm/npx/gradlew: records every call, fails the listed
/// commands and fakes the side effects of the ones the pipeline relies on.
struct ScriptedRunner {
    root: PathBuf,
    failing: Vec<String>,
    prebuild_generates_android: bool,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            failing: Vec::new(),
            prebuild_generates_android: true,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn failing(mut self, command: impl Into<String>) -> Self {
        self.failing.push(command.into());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str, working_dir: &Path) -> CommandResult {
        self.calls.borrow_mut().push(command.to_string());

        if self.failing.iter().any(|c| c == command) {
            return CommandResult::exited(command, working_dir, "npm ERR! boom".to_string(), Some(1));
        }

        if command == "npm install" {
            write(&self.root, PLUGIN_SCRIPT, PLUGIN_KTS);
        } else if command.starts_with("npx expo prebuild") && self.prebuild_generates_android {
            write(&self.root, "android/gradle.properties", GRADLE_PROPERTIES);
            write(&self.root, "android/build.gradle", ROOT_BUILD_GRADLE);
            write(&self.root, "android/app/build.gradle", APP_BUILD_GRADLE);
            write(
                &self.root,
                "android/gradle/wrapper/gradle-wrapper.properties",
                WRAPPER_PROPERTIES,
            );
        } else if command == gradlew("assembleDebug") {
            write(
                &self.root,
                "android/app/build/outputs/apk/debug/app-debug.apk",
                &"x".repeat(4096),
            );
        }

        CommandResult::success(command, working_dir, "ok".to_string())
    }
}

#[test]
fn test_failure_then_abort_leaves_remaining_steps_not_run() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::new(dir.path()).failing("step-2");
    let confirmer = AutoConfirmer::always_no();

    let steps = (1..=4)
        .map(|i| StepDescriptor::command(format!("s{}", i), format!("Step {}", i), format!("step-{}", i)))
        .collect();
    let mut orchestrator = PipelineOrchestrator::new(dir.path(), steps, &runner, &confirmer);
    let run = orchestrator.run();

    let statuses: Vec<StepStatus> = run.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Succeeded,
            StepStatus::Failed,
            StepStatus::Pending,
            StepStatus::Pending
        ]
    );
    assert_eq!(runner.calls(), vec!["step-1", "step-2"]);

    let summary = summarize(&run, dir.path(), Path::new("out.apk"), "s4");
    assert_eq!(summary.completed, vec!["s1"]);
    assert_eq!(summary.failed, vec!["s2"]);
    assert_eq!(summary.not_run, vec!["s3", "s4"]);
    assert_ne!(summary.exit_code(), 0);
}

#[test]
fn test_full_pipeline_happy_path() {
    let dir = TempDir::new().unwrap();
    let root = create_js_project(&dir);
    fs::create_dir_all(root.join("node_modules/react-native")).unwrap();

    let config = ForgeConfig::default();
    let runner = ScriptedRunner::new(&root);
    let confirmer = AutoConfirmer::always_no();

    let mut orchestrator =
        PipelineOrchestrator::new(&root, canonical_steps(&config), &runner, &confirmer);
    let run = orchestrator.run();
    let summary = summarize(&run, &root, &config.artifact_path, STEP_BUILD);

    assert!(summary.success, "steps: {:?}", summary.steps);
    assert_eq!(summary.completed.len(), 7);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(
        runner.calls(),
        vec![
            "npm install react-native@0.74.5".to_string(),
            "npm install".to_string(),
            "npx expo prebuild --clean --platform android".to_string(),
            gradlew("clean"),
            gradlew("assembleDebug"),
        ]
    );

    assert!(root.join("package.json.backup").exists());
    assert!(read(&root, "android/build.gradle").contains("project.hasProperty(\"android\")"));
    assert!(matches!(
        summary.artifact,
        ArtifactStatus::Found { size_bytes: 4096, .. }
    ));
}

#[test]
fn test_clean_is_skipped_without_node_modules() {
    let dir = TempDir::new().unwrap();
    let root = create_js_project(&dir);
    let runner = ScriptedRunner::new(&root);
    let confirmer = AutoConfirmer::always_no();

    let mut orchestrator = PipelineOrchestrator::new(
        &root,
        canonical_steps(&ForgeConfig::default()),
        &runner,
        &confirmer,
    );
    let run = orchestrator.run();

    assert_eq!(run.status_of("clean"), Some(StepStatus::Skipped));
    assert!(run.failed().is_empty());
    assert_eq!(run.completed().len(), 6);
}

#[test]
fn test_continue_after_failure_runs_remaining_steps() {
    let dir = TempDir::new().unwrap();
    let root = create_js_project(&dir);
    let runner = ScriptedRunner::new(&root).failing("npm install react-native@0.74.5");
    let confirmer = AutoConfirmer::always_yes();

    let config = ForgeConfig::default();
    let mut orchestrator =
        PipelineOrchestrator::new(&root, canonical_steps(&config), &runner, &confirmer);
    let run = orchestrator.run();
    let summary = summarize(&run, &root, &config.artifact_path, STEP_BUILD);

    assert_eq!(summary.failed, vec!["downgrade"]);
    assert!(summary.not_run.is_empty());
    assert_eq!(summary.exit_code(), 1);
    // Build still ran and produced the APK
    assert!(matches!(summary.artifact, ArtifactStatus::Found { .. }));
    let detail = summary.steps[1].detail.clone().unwrap_or_default();
    assert!(detail.contains("exited with code 1"));
}

#[test]
fn test_build_fails_precheck_when_prebuild_produced_nothing() {
    let dir = TempDir::new().unwrap();
    let root = create_js_project(&dir);
    let mut runner = ScriptedRunner::new(&root);
    runner.prebuild_generates_android = false;
    let confirmer = AutoConfirmer::always_yes();

    let config = ForgeConfig::default();
    let mut orchestrator =
        PipelineOrchestrator::new(&root, canonical_steps(&config), &runner, &confirmer);
    orchestrator.skip("downgrade").unwrap();
    let run = orchestrator.run();
    let summary = summarize(&run, &root, &config.artifact_path, STEP_BUILD);

    assert_eq!(summary.failed, vec!["fix-config", "build"]);
    assert_eq!(summary.skipped, vec!["downgrade", "clean"]);
    assert!(!runner.calls().iter().any(|c| c.contains("gradlew")));
    assert!(matches!(summary.artifact, ArtifactStatus::NotChecked { .. }));

    let build = run.record("build").unwrap();
    assert_eq!(build.detail.as_deref(), Some("android directory not found"));
}
