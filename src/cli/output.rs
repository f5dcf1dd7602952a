//! Output formatting for build summaries, fix reports and step listings
//!
//! Every report renders as JSON, YAML or human-readable text.
//!
//! # Example
//!
//! ```no_run
//! use apkforge::cli::output::{OutputFormat, OutputFormatter};
//! use apkforge::gradle::GradleFixer;
//!
//! let report = GradleFixer::new("/path/to/app").run_all_fixes();
//! let formatter = OutputFormatter::new(OutputFormat::Json);
//! println!("{}", formatter.format_fix_report(&report).unwrap());
//! ```

use anyhow::{Context, Result};
use serde::Serialize;

use crate::gradle::{FixOutcome, FixReport};
use crate::output::{ArtifactStatus, BuildSummary};
use crate::pipeline::{StepInfo, StepStatus};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_summary(&self, summary: &BuildSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(summary, "build summary"),
            OutputFormat::Yaml => to_yaml(summary, "build summary"),
            OutputFormat::Human => Ok(self.format_summary_human(summary)),
        }
    }

    pub fn format_fix_report(&self, report: &FixReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report, "fix report"),
            OutputFormat::Yaml => to_yaml(report, "fix report"),
            OutputFormat::Human => Ok(self.format_fix_report_human(report)),
        }
    }

    pub fn format_steps(&self, steps: &[StepInfo]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&steps, "step list"),
            OutputFormat::Yaml => to_yaml(&steps, "step list"),
            OutputFormat::Human => Ok(self.format_steps_human(steps)),
        }
    }

    // Human-readable formatting methods

    fn format_summary_human(&self, summary: &BuildSummary) -> String {
        let mut output = String::new();

        if summary.success {
            output.push_str("\u{2713} Build Summary\n");
        } else {
            output.push_str("\u{2717} Build Summary (completed with errors)\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!("Project: {}\n\n", summary.project_root.display()));

        output.push_str(&format!(
            "Steps completed ({}/{}):\n",
            summary.completed.len(),
            summary.total_steps()
        ));
        for record in &summary.steps {
            let (symbol, note) = match record.status {
                StepStatus::Succeeded => ("\u{2713}", None),
                StepStatus::Failed => ("\u{2717}", Some("failed")),
                StepStatus::Skipped => ("-", Some("skipped")),
                StepStatus::Pending => (" ", Some("not run")),
            };
            match note {
                Some(note) => output.push_str(&format!(
                    "  {} {}. {} ({})\n",
                    symbol, record.ordinal, record.name, note
                )),
                None => output.push_str(&format!(
                    "  {} {}. {}\n",
                    symbol, record.ordinal, record.name
                )),
            }
        }

        let failures: Vec<_> = summary
            .steps
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .collect();
        if !failures.is_empty() {
            output.push_str(&format!("\nSteps failed ({}):\n", failures.len()));
            for record in failures {
                output.push_str(&format!("  \u{2717} {}\n", record.name));
                if let Some(detail) = &record.detail {
                    for line in detail.lines() {
                        output.push_str(&format!("      {}\n", line));
                    }
                }
            }
        }

        if let Some(step) = &summary.aborted_after {
            output.push_str(&format!(
                "\nStopped after '{}'; {} step(s) not run\n",
                step,
                summary.not_run.len()
            ));
        }

        output.push('\n');
        match &summary.artifact {
            ArtifactStatus::Found { path, size_bytes } => {
                output.push_str(&format!(
                    "APK: {} ({:.2} MB, {} bytes)\n",
                    path.display(),
                    *size_bytes as f64 / (1024.0 * 1024.0),
                    size_bytes
                ));
            }
            ArtifactStatus::NotFound { path } => {
                output.push_str(&format!("APK: not found at {}\n", path.display()));
            }
            ArtifactStatus::NotChecked { path } => {
                output.push_str(&format!(
                    "APK: not checked, build did not succeed ({})\n",
                    path.display()
                ));
            }
        }

        output.push_str(&format!(
            "\nFinished in {:.1}s\n",
            summary.duration_ms() as f64 / 1000.0
        ));
        output
    }

    fn format_fix_report_human(&self, report: &FixReport) -> String {
        let mut output = String::new();

        if report.has_errors() {
            output.push_str("\u{2717} Gradle Fix Report\n");
        } else {
            output.push_str("\u{2713} Gradle Fix Report\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!("Project: {}\n\n", report.project_root.display()));

        if report.is_empty() {
            output.push_str("No fixes ran.\n");
            return output;
        }

        for entry in report.entries() {
            let symbol = match entry.outcome {
                FixOutcome::Applied => "\u{2713}",
                FixOutcome::AlreadyPresent => "=",
                FixOutcome::NoOp(_) => "-",
                FixOutcome::Advisory(_) => "\u{26A0}",
                FixOutcome::Error(_) => "\u{2717}",
            };
            output.push_str(&format!(
                "{} {} [{}]\n",
                symbol,
                entry.description,
                entry.outcome.label()
            ));
            if let Some(message) = entry.outcome.message() {
                output.push_str(&format!("    {}\n", message));
            }
            for detail in &entry.details {
                output.push_str(&format!("    - {}\n", detail));
            }
        }

        output.push_str(&format!(
            "\n{} applied, {} advisory, {} error(s)\n",
            report.applied().count(),
            report.advisories().count(),
            report.errors().count()
        ));
        output
    }

    fn format_steps_human(&self, steps: &[StepInfo]) -> String {
        let mut output = String::new();
        output.push_str("Build Steps\n");
        output.push_str(RULE);
        output.push_str("\n\n");

        for step in steps {
            output.push_str(&format!(
                "{}. {:<11} {}\n",
                step.ordinal, step.name, step.description
            ));
            if let Some(command) = &step.command {
                output.push_str(&format!("   \u{2514}\u{2500} {}\n", command));
            }
        }
        output
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn to_yaml<T: Serialize + ?Sized>(value: &T, what: &str) -> Result<String> {
    serde_yaml::to_string(value).with_context(|| format!("Failed to serialize {} to YAML", what))
}
