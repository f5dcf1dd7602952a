//! Continue/abort decisions after a failed step

use std::io::{self, BufRead, Write};
use tracing::warn;

/// Synchronous yes/no decision provider. No timeout.
#[cfg_attr(test, mockall::automock)]
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Always gives the same answer (`--yes` / `--no-input`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoConfirmer {
    answer: bool,
}

impl AutoConfirmer {
    pub fn always_yes() -> Self {
        Self { answer: true }
    }

    pub fn always_no() -> Self {
        Self { answer: false }
    }
}

impl Confirmer for AutoConfirmer {
    fn confirm(&self, _prompt: &str) -> bool {
        self.answer
    }
}

/// Asks on stderr and reads the answer from stdin. Answers "no" when stdin
/// is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        if !atty::is(atty::Stream::Stdin) {
            warn!(prompt, "stdin is not a terminal, answering no");
            return false;
        }

        eprint!("{} [y/N] ", prompt);
        let _ = io::stderr().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => parse_answer(&line),
            Err(e) => {
                warn!(error = %e, "Failed to read answer, answering no");
                false
            }
        }
    }
}

/// Only an explicit `y`/`yes` (any case) counts as yes.
pub fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}
