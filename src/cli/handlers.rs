//! Subcommand handlers. Each returns the process exit code.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::commands::{resolve_path, BuildArgs, FixArgs, StepsArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::ForgeConfig;
use crate::gradle::GradleFixer;
use crate::output::summarize;
use crate::pipeline::steps::{ANDROID_DIR, PACKAGE_JSON, STEP_BUILD};
use crate::pipeline::{
    canonical_steps, step_catalog, AutoConfirmer, Confirmer, PipelineOrchestrator,
    TerminalConfirmer, STEP_NAMES,
};
use crate::progress::LoggingHandler;
use crate::runner::ShellRunner;

pub fn handle_build(args: &BuildArgs) -> i32 {
    exit_code_of(run_build(args))
}

pub fn handle_fix(args: &FixArgs) -> i32 {
    exit_code_of(run_fix(args))
}

pub fn handle_steps(args: &StepsArgs) -> i32 {
    exit_code_of(run_steps(args))
}

fn exit_code_of(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Fails early when `root` is not a directory or lacks `marker`.
pub fn check_project_root(root: &Path, marker: &str) -> Result<PathBuf> {
    if !root.is_dir() {
        bail!("Project directory not found: {}", root.display());
    }
    if !root.join(marker).exists() {
        bail!(
            "{} not found in {}; is this a React Native project root?",
            marker,
            root.display()
        );
    }
    Ok(root.canonicalize().unwrap_or_else(|_| root.to_path_buf()))
}

fn validate_skips(skips: &[String]) -> Result<()> {
    for name in skips {
        if !STEP_NAMES.contains(&name.as_str()) {
            bail!(
                "Unknown step '{}'. Valid steps: {}",
                name,
                STEP_NAMES.join(", ")
            );
        }
    }
    Ok(())
}

fn build_config(root: &Path, args: &BuildArgs) -> Result<ForgeConfig> {
    let mut config = ForgeConfig::load(root)?;
    if let Some(version) = &args.rn_version {
        config.react_native_version = version.clone();
    }
    if args.legacy_peer_deps {
        config.legacy_peer_deps = true;
    }
    config.validate()?;
    Ok(config)
}

fn run_build(args: &BuildArgs) -> Result<i32> {
    let root = check_project_root(&resolve_path(&args.project_path), PACKAGE_JSON)?;
    validate_skips(&args.skip)?;
    let config = build_config(&root, args)?;

    let confirmer: Box<dyn Confirmer> = if args.yes {
        Box::new(AutoConfirmer::always_yes())
    } else if args.no_input {
        Box::new(AutoConfirmer::always_no())
    } else {
        Box::new(TerminalConfirmer)
    };

    if !args.yes && !args.no_input {
        let prompt = format!("Build the Android APK for {}?", root.display());
        if !confirmer.confirm(&prompt) {
            eprintln!("Cancelled. Use --yes or --no-input to run without prompts.");
            return Ok(1);
        }
    }

    let runner = ShellRunner::new();
    let progress = LoggingHandler;
    let mut orchestrator =
        PipelineOrchestrator::new(&root, canonical_steps(&config), &runner, &*confirmer)
            .with_progress(&progress);
    for name in &args.skip {
        orchestrator.skip(name)?;
    }

    let run = orchestrator.run();
    let summary = summarize(&run, &root, &config.artifact_path, STEP_BUILD);
    info!(
        completed = summary.completed.len(),
        failed = summary.failed.len(),
        "Build finished"
    );

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    write_output(&formatter.format_summary(&summary)?, args.output.as_deref())?;
    Ok(summary.exit_code())
}

fn run_fix(args: &FixArgs) -> Result<i32> {
    let root = check_project_root(&resolve_path(&args.project_path), ANDROID_DIR)?;
    let config = ForgeConfig::load(&root)?;
    config.validate()?;

    let report = GradleFixer::from_config(&root, &config).run_all_fixes();

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    write_output(&formatter.format_fix_report(&report)?, args.output.as_deref())?;
    Ok(if report.has_errors() { 1 } else { 0 })
}

fn run_steps(args: &StepsArgs) -> Result<i32> {
    let config = ForgeConfig::load(Path::new("."))?;
    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    write_output(&formatter.format_steps(&step_catalog(&config))?, None)?;
    Ok(0)
}

fn write_output(text: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!("Output written to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
