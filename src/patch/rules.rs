//! Idempotent text transformations for build configuration files
//!
//! Every rule is a pure `&str -> String` function that also reports whether
//! it changed anything. Applying a rule to its own output is a no-op.

use super::scope::ScopeTracker;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum RuleStatus {
    Applied,
    AlreadyApplied,
    /// The rule's precondition was not met (anchor or pattern not found)
    NotApplicable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutput {
    pub text: String,
    pub status: RuleStatus,
    /// Human-readable notes, e.g. the lines a rule removed
    pub details: Vec<String>,
}

impl RuleOutput {
    fn unchanged(text: &str, status: RuleStatus) -> Self {
        Self {
            text: text.to_string(),
            status,
            details: Vec::new(),
        }
    }

    fn applied(text: String, details: Vec<String>) -> Self {
        Self {
            text,
            status: RuleStatus::Applied,
            details,
        }
    }

    pub fn changed(&self) -> bool {
        self.status == RuleStatus::Applied
    }
}

pub trait TransformRule {
    fn description(&self) -> String;
    fn apply(&self, text: &str) -> RuleOutput;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// On the line following the first line containing the anchor
    AfterAnchorLine,
    /// At the start of the first line containing the anchor
    BeforeAnchorLine,
}

/// Inserts a fixed block next to a literal anchor.
///
/// The block is considered present when the text contains `marker`, so the
/// marker must occur inside the block.
#[derive(Debug, Clone)]
pub struct InsertBlock {
    anchor: String,
    block: String,
    marker: String,
    placement: Placement,
}

impl InsertBlock {
    pub fn new(anchor: impl Into<String>, block: impl Into<String>, placement: Placement) -> Self {
        let block: String = block.into();
        let marker = block
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string();
        Self {
            anchor: anchor.into(),
            block,
            marker,
            placement,
        }
    }

    pub fn after_line(anchor: impl Into<String>, block: impl Into<String>) -> Self {
        Self::new(anchor, block, Placement::AfterAnchorLine)
    }

    pub fn before_line(anchor: impl Into<String>, block: impl Into<String>) -> Self {
        Self::new(anchor, block, Placement::BeforeAnchorLine)
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        debug_assert!(self.block.contains(&self.marker));
        self
    }
}

impl TransformRule for InsertBlock {
    fn description(&self) -> String {
        format!("insert `{}` block near `{}`", self.marker, self.anchor)
    }

    fn apply(&self, text: &str) -> RuleOutput {
        if !self.marker.is_empty() && text.contains(&self.marker) {
            return RuleOutput::unchanged(text, RuleStatus::AlreadyApplied);
        }

        let Some(anchor_at) = text.find(&self.anchor) else {
            return RuleOutput::unchanged(
                text,
                RuleStatus::NotApplicable(format!("anchor not found: {}", self.anchor)),
            );
        };

        let mut block = self.block.clone();
        if !block.ends_with('\n') {
            block.push('\n');
        }

        let mut out = String::with_capacity(text.len() + block.len() + 1);
        match self.placement {
            Placement::AfterAnchorLine => match text[anchor_at..].find('\n') {
                Some(nl) => {
                    let split = anchor_at + nl + 1;
                    out.push_str(&text[..split]);
                    out.push_str(&block);
                    out.push_str(&text[split..]);
                }
                None => {
                    out.push_str(text);
                    out.push('\n');
                    out.push_str(&block);
                }
            },
            Placement::BeforeAnchorLine => {
                let line_start = text[..anchor_at].rfind('\n').map_or(0, |p| p + 1);
                out.push_str(&text[..line_start]);
                out.push_str(&block);
                out.push_str(&text[line_start..]);
            }
        }

        RuleOutput::applied(out, vec![format!("inserted block near `{}`", self.anchor)])
    }
}

/// Appends `key=value` to a properties file unless some line already
/// assigns `key`. Existing values are never overwritten.
#[derive(Debug, Clone)]
pub struct EnsureKey {
    key: String,
    value: String,
}

impl EnsureKey {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn entry(&self) -> String {
        format!("{}={}", self.key, self.value)
    }
}

/// Key of a `.properties` line: everything before the first `=`, `:` or
/// whitespace. Comments and blank lines have none.
fn property_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }
    let end = line
        .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
        .unwrap_or(line.len());
    Some(&line[..end])
}

impl TransformRule for EnsureKey {
    fn description(&self) -> String {
        format!("ensure {}", self.entry())
    }

    fn apply(&self, text: &str) -> RuleOutput {
        if text.lines().any(|l| property_key(l) == Some(self.key.as_str())) {
            return RuleOutput::unchanged(text, RuleStatus::AlreadyApplied);
        }

        let mut out = text.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&self.entry());
        out.push('\n');
        RuleOutput::applied(out, vec![format!("added {}", self.entry())])
    }
}

/// Removes lines matching `pattern` unless they sit inside one of the
/// protected scopes. Matching lines that themselves contain braces are kept
/// so that removal never shifts the scope structure.
#[derive(Debug, Clone)]
pub struct StripOutsideScope {
    pattern: Regex,
    protected: Vec<String>,
}

impl StripOutsideScope {
    pub fn new<I, S>(pattern: Regex, protected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pattern,
            protected: protected.into_iter().map(Into::into).collect(),
        }
    }
}

impl TransformRule for StripOutsideScope {
    fn description(&self) -> String {
        format!(
            "strip `{}` outside {}",
            self.pattern.as_str(),
            self.protected.join("/")
        )
    }

    fn apply(&self, text: &str) -> RuleOutput {
        let mut tracker = ScopeTracker::new(self.protected.iter().cloned());
        let mut out = String::with_capacity(text.len());
        let mut removed = Vec::new();

        for line in text.split_inclusive('\n') {
            let strip = !tracker.in_tracked_scope()
                && !line.contains(|c: char| c == '{' || c == '}')
                && self.pattern.is_match(line);
            tracker.observe(line);

            if strip {
                removed.push(format!("removed: {}", line.trim()));
            } else {
                out.push_str(line);
            }
        }

        if tracker.depth() != 0 {
            debug!(depth = tracker.depth(), "Unbalanced braces at end of file");
        }

        if removed.is_empty() {
            RuleOutput::unchanged(text, RuleStatus::AlreadyApplied)
        } else {
            RuleOutput::applied(out, removed)
        }
    }
}

/// Regex substitution over the whole text. No change is reported as
/// not-applicable without telling "pattern absent" from "already correct".
#[derive(Debug, Clone)]
pub struct RegexSubstitute {
    label: String,
    pattern: Regex,
    replacement: String,
}

impl RegexSubstitute {
    pub fn new(label: impl Into<String>, pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern,
            replacement: replacement.into(),
        }
    }
}

impl TransformRule for RegexSubstitute {
    fn description(&self) -> String {
        self.label.clone()
    }

    fn apply(&self, text: &str) -> RuleOutput {
        let replaced = self.pattern.replace_all(text, self.replacement.as_str());
        if replaced == text {
            return RuleOutput::unchanged(
                text,
                RuleStatus::NotApplicable(format!("{}: nothing to change", self.label)),
            );
        }
        RuleOutput::applied(replaced.into_owned(), vec![self.label.clone()])
    }
}
