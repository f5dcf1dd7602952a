use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "kebab-case")]
pub enum FixOutcome {
    Applied,
    AlreadyPresent,
    /// Pattern or anchor not matched; neutral, not an error
    NoOp(String),
    /// Non-blocking recommendation
    Advisory(String),
    Error(String),
}

impl FixOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FixOutcome::Applied => "applied",
            FixOutcome::AlreadyPresent => "already-present",
            FixOutcome::NoOp(_) => "no-op",
            FixOutcome::Advisory(_) => "advisory",
            FixOutcome::Error(_) => "error",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            FixOutcome::NoOp(m) | FixOutcome::Advisory(m) | FixOutcome::Error(m) => Some(m),
            FixOutcome::Applied | FixOutcome::AlreadyPresent => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FixOutcome::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixEntry {
    pub description: String,
    pub outcome: FixOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Outcomes of every fix attempted during one fixer invocation, in the
/// order they were attempted. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixReport {
    pub project_root: PathBuf,
    entries: Vec<FixEntry>,
}

impl FixReport {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, description: impl Into<String>, outcome: FixOutcome) {
        self.record_with_details(description, outcome, Vec::new());
    }

    pub fn record_with_details(
        &mut self,
        description: impl Into<String>,
        outcome: FixOutcome,
        details: Vec<String>,
    ) {
        self.entries.push(FixEntry {
            description: description.into(),
            outcome,
            details,
        });
    }

    pub fn entries(&self) -> &[FixEntry] {
        &self.entries
    }

    pub fn outcome_of(&self, description: &str) -> Option<&FixOutcome> {
        self.entries
            .iter()
            .find(|e| e.description == description)
            .map(|e| &e.outcome)
    }

    pub fn applied(&self) -> impl Iterator<Item = &FixEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome == FixOutcome::Applied)
    }

    pub fn errors(&self) -> impl Iterator<Item = &FixEntry> {
        self.entries.iter().filter(|e| e.outcome.is_error())
    }

    pub fn advisories(&self) -> impl Iterator<Item = &FixEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, FixOutcome::Advisory(_)))
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
