use super::{CommandResult, CommandRunner};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, warn};

/// Runs commands through the platform shell (`sh -c` / `cmd /C`).
///
/// There is no timeout: a process that never exits blocks the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, working_dir: &Path) -> CommandResult {
        debug!(command, dir = %working_dir.display(), "Running command");
        let start = Instant::now();

        let output = Self::shell_command(command)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .output();

        let out = match output {
            Ok(out) => out,
            Err(e) => {
                warn!(command, error = %e, "Failed to start command");
                return CommandResult::spawn_failed(command, working_dir, &e.to_string());
            }
        };

        let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
        if !out.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&String::from_utf8_lossy(&out.stderr));
        }

        let result = CommandResult::exited(command, working_dir, combined, out.status.code());
        debug!(
            command,
            exit_code = ?result.exit_code,
            elapsed_ms = start.elapsed().as_millis(),
            "Command finished"
        );
        result
    }
}
