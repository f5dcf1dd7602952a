//! Gradle wrapper version detection

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

pub const DEFAULT_MIN_GRADLE_MAJOR: u32 = 7;
pub const RECOMMENDED_GRADLE_VERSIONS: &str = "7.6.3 or 8.3";

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"gradle-(\d+)\.(\d+)(?:\.(\d+))?").expect("valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GradleVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl fmt::Display for GradleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "{}.{}.{}", self.major, self.minor, patch),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

/// Extracts the Gradle version from wrapper properties, e.g. from
/// `distributionUrl=https\://services.gradle.org/distributions/gradle-8.3-bin.zip`.
pub fn parse_wrapper_version(content: &str) -> Option<GradleVersion> {
    let caps = version_regex().captures(content)?;
    Some(GradleVersion {
        major: caps.get(1)?.as_str().parse().ok()?,
        minor: caps.get(2)?.as_str().parse().ok()?,
        patch: caps.get(3).and_then(|m| m.as_str().parse().ok()),
    })
}
