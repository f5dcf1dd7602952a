//! Line-oriented brace scope tracking for Gradle build scripts
//!
//! This is a heuristic, not a Groovy/Kotlin parser. Every `{` pushes a scope
//! labelled by the identifier right before it (`allprojects {` pushes
//! `allprojects`), every `}` pops one. Braces inside string literals and
//! after a `//` comment are ignored; block comments are not understood.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A block whose keyword is in the tracked set
    Tracked(String),
    /// Any other brace-delimited block
    Anonymous,
}

#[derive(Debug, Clone)]
pub struct ScopeTracker {
    tracked: Vec<String>,
    stack: Vec<Scope>,
}

impl ScopeTracker {
    pub fn new<I, S>(tracked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracked: tracked.into_iter().map(Into::into).collect(),
            stack: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True when any enclosing block is a tracked one.
    pub fn in_tracked_scope(&self) -> bool {
        self.stack.iter().any(|s| matches!(s, Scope::Tracked(_)))
    }

    /// Advances the tracker past one line of source.
    pub fn observe(&mut self, line: &str) {
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut prev = '\0';

        for (idx, ch) in line.char_indices() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
                prev = ch;
                continue;
            }

            match ch {
                '"' | '\'' => quote = Some(ch),
                '/' if prev == '/' => break,
                '{' => {
                    let scope = self.label_for(&line[..idx]);
                    self.stack.push(scope);
                }
                '}' => {
                    self.stack.pop();
                }
                _ => {}
            }
            prev = ch;
        }
    }

    fn label_for(&self, before_brace: &str) -> Scope {
        let trimmed = before_brace.trim_end();
        let start = trimmed
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
            .last()
            .map(|(i, _)| i);

        match start {
            Some(i) if self.tracked.iter().any(|t| t == &trimmed[i..]) => {
                Scope::Tracked(trimmed[i..].to_string())
            }
            _ => Scope::Anonymous,
        }
    }
}
