//! External command execution
//!
//! The pipeline treats every external tool (npm, npx, gradlew) as an opaque
//! process: it gets a command line and a working directory, and hands back
//! an exit status plus the captured output. A failing process is a value,
//! never an error.

mod shell;

pub use shell::ShellRunner;

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of a single external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub command: String,
    pub working_dir: PathBuf,
    /// Combined stdout and stderr, available only after the process exited
    pub output: String,
    pub succeeded: bool,
    /// `None` when the process never started or was killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandResult {
    pub fn success(command: &str, working_dir: &Path, output: String) -> Self {
        Self {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
            output,
            succeeded: true,
            exit_code: Some(0),
        }
    }

    pub fn exited(command: &str, working_dir: &Path, output: String, exit_code: Option<i32>) -> Self {
        Self {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
            output,
            succeeded: exit_code == Some(0),
            exit_code,
        }
    }

    /// The process could not be started at all (missing executable, bad cwd)
    pub fn spawn_failed(command: &str, working_dir: &Path, reason: &str) -> Self {
        Self {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
            output: format!("failed to start process: {}", reason),
            succeeded: false,
            exit_code: None,
        }
    }

    /// Last `max_chars` characters of the output, trimmed.
    pub fn output_tail(&self, max_chars: usize) -> String {
        tail_chars(&self.output, max_chars)
    }
}

/// Runs one command synchronously. Implementations block until the process
/// exits and never return an error for a non-zero exit.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    fn run(&self, command: &str, working_dir: &Path) -> CommandResult;
}

pub(crate) fn tail_chars(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - max_chars).collect();
    format!("… (truncated)\n{}", tail)
}
