//! Gradle configuration fixer for React Native / Expo Android projects
//!
//! Runs a fixed sequence of sub-fixes over the generated `android/` tree and
//! the React Native Gradle plugin sources. Each sub-fix owns its files and
//! its failures: an error inside one is recorded in the report and the next
//! one still runs.

use super::report::{FixOutcome, FixReport};
use super::wrapper::{parse_wrapper_version, DEFAULT_MIN_GRADLE_MAJOR, RECOMMENDED_GRADLE_VERSIONS};
use crate::config::ForgeConfig;
use crate::patch::{
    EnsureKey, FilePatcher, InsertBlock, PatchError, RegexSubstitute, RuleOutput, RuleStatus,
    StripOutsideScope, TransformRule,
};
use ignore::WalkBuilder;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

const GRADLE_PROPERTIES: &str = "android/gradle.properties";
const ROOT_BUILD_GRADLE: &str = "android/build.gradle";
const APP_BUILD_GRADLE: &str = "android/app/build.gradle";
const WRAPPER_PROPERTIES: &str = "android/gradle/wrapper/gradle-wrapper.properties";
const PLUGIN_SCRIPT_NAME: &str = "build.gradle.kts";

const REQUIRED_PROPERTIES: [(&str, &str); 5] = [
    ("org.gradle.java.installations.auto-detect", "false"),
    ("org.gradle.java.installations.auto-download", "false"),
    ("org.gradle.jvmargs", "-Xmx2048m -XX:MaxMetaspaceSize=512m"),
    ("android.useAndroidX", "true"),
    ("android.enableJetifier", "true"),
];

const COMPATIBILITY_LINE_PATTERN: &str = r"^\s*(source|target)Compatibility";
const SCOPED_COMPAT_BLOCKS: [&str; 3] = ["buildscript", "allprojects", "subprojects"];

const EXPO_ROOT_ANCHOR: &str = r#"apply plugin: "expo-root-project""#;
const SUBPROJECTS_MARKER: &str = r#"project.hasProperty("android")"#;
const SUBPROJECTS_JAVA_BLOCK: &str = r#"subprojects {
    afterEvaluate { project ->
        if (project.hasProperty("android")) {
            android {
                compileOptions {
                    sourceCompatibility JavaVersion.VERSION_11
                    targetCompatibility JavaVersion.VERSION_11
                }
            }
        }
    }
}
"#;

const NAMESPACE_ANCHOR: &str = "namespace";
const COMPILE_OPTIONS_BLOCK: &str = "
    compileOptions {
        sourceCompatibility JavaVersion.VERSION_11
        targetCompatibility JavaVersion.VERSION_11
    }
";

const WARNINGS_AS_ERRORS_PATTERN: &str = r#"(?m)^([ \t]*)allWarningsAsErrors\s*=\s*\n\s*project\.properties\["enableWarningsAsErrors"\]\?\.toString\(\)\?\.toBoolean\(\)\s*\?:\s*false\)?"#;
const WARNINGS_AS_ERRORS_REPLACEMENT: &str = "${1}allWarningsAsErrors.set(\n${1}    project.properties[\"enableWarningsAsErrors\"]?.toString()?.toBoolean() ?: false\n${1})";

fn warnings_as_errors_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WARNINGS_AS_ERRORS_PATTERN).expect("valid regex"))
}

fn compatibility_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(COMPATIBILITY_LINE_PATTERN).expect("valid regex"))
}

#[derive(Error, Debug)]
pub enum FixerError {
    #[error("{0} not found")]
    MissingFile(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error("Failed to search {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

type SubFix = fn(&GradleFixer, &mut FixReport) -> Result<(), FixerError>;

pub struct GradleFixer {
    project_root: PathBuf,
    patcher: FilePatcher,
    plugin_dir: PathBuf,
    min_gradle_major: u32,
}

impl GradleFixer {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let defaults = ForgeConfig::default();
        Self {
            project_root: project_root.into(),
            patcher: FilePatcher::default(),
            plugin_dir: defaults.plugin_dir,
            min_gradle_major: DEFAULT_MIN_GRADLE_MAJOR,
        }
    }

    pub fn from_config(project_root: impl Into<PathBuf>, config: &ForgeConfig) -> Self {
        Self {
            project_root: project_root.into(),
            patcher: FilePatcher::new(config.backup_suffix.clone()),
            plugin_dir: config.plugin_dir.clone(),
            min_gradle_major: config.min_gradle_major,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Runs every sub-fix in a fixed order and always returns a report.
    pub fn run_all_fixes(&self) -> FixReport {
        info!(root = %self.project_root.display(), "Running Gradle fixes");
        let mut report = FixReport::new(&self.project_root);

        let sub_fixes: [(&str, SubFix); 5] = [
            ("plugin kotlin scripts", Self::fix_plugin_scripts),
            ("gradle.properties", Self::fix_gradle_properties),
            ("root build.gradle", Self::fix_root_build_gradle),
            ("app build.gradle", Self::fix_app_build_gradle),
            ("gradle wrapper", Self::verify_gradle_wrapper),
        ];

        for (name, sub_fix) in sub_fixes {
            debug!(fix = name, "Starting sub-fix");
            if let Err(e) = sub_fix(self, &mut report) {
                warn!(fix = name, error = %e, "Sub-fix failed");
                report.record(name, FixOutcome::Error(e.to_string()));
            }
        }

        info!(
            applied = report.applied().count(),
            advisories = report.advisories().count(),
            errors = report.errors().count(),
            "Gradle fixes complete"
        );
        report
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.project_root).unwrap_or(path)
    }

    fn require_file(&self, relative: &str) -> Result<PathBuf, FixerError> {
        let path = self.project_root.join(relative);
        if path.is_file() {
            Ok(path)
        } else {
            Err(FixerError::MissingFile(PathBuf::from(relative)))
        }
    }

    /// Applies `rules` in order inside a single patch of `path` and returns
    /// each rule's output.
    fn patch_with(
        &self,
        path: &Path,
        rules: &[&dyn TransformRule],
    ) -> Result<Vec<RuleOutput>, FixerError> {
        let mut outputs = Vec::with_capacity(rules.len());
        self.patcher.patch(path, |content| {
            let mut text = content.to_string();
            for rule in rules {
                let output = rule.apply(&text);
                text = output.text.clone();
                outputs.push(output);
            }
            text
        })?;
        Ok(outputs)
    }

    pub fn fix_plugin_scripts(&self, report: &mut FixReport) -> Result<(), FixerError> {
        let plugin_dir = self.project_root.join(&self.plugin_dir);
        if !plugin_dir.is_dir() {
            return Err(FixerError::MissingFile(self.plugin_dir.clone()));
        }

        let mut scripts = Vec::new();
        for entry in WalkBuilder::new(&plugin_dir).standard_filters(false).build() {
            let entry = entry.map_err(|e| FixerError::Walk {
                path: plugin_dir.clone(),
                message: e.to_string(),
            })?;
            if entry.file_type().is_some_and(|t| t.is_file())
                && entry.file_name() == PLUGIN_SCRIPT_NAME
            {
                scripts.push(entry.into_path());
            }
        }
        scripts.sort();

        if scripts.is_empty() {
            report.record(
                format!("{}: allWarningsAsErrors", self.plugin_dir.display()),
                FixOutcome::NoOp(format!("no {} files found", PLUGIN_SCRIPT_NAME)),
            );
            return Ok(());
        }

        let rule = RegexSubstitute::new(
            "allWarningsAsErrors assignment -> .set(...)",
            warnings_as_errors_regex().clone(),
            WARNINGS_AS_ERRORS_REPLACEMENT,
        );

        for script in scripts {
            let description = format!("{}: allWarningsAsErrors", self.relative(&script).display());
            match self.fix_plugin_script(&script, &rule) {
                Ok(outcome) => report.record(description, outcome),
                Err(e) => {
                    warn!(file = %script.display(), error = %e, "Failed to fix plugin script");
                    report.record(description, FixOutcome::Error(e.to_string()));
                }
            }
        }
        Ok(())
    }

    fn fix_plugin_script(
        &self,
        script: &Path,
        rule: &RegexSubstitute,
    ) -> Result<FixOutcome, FixerError> {
        let content = fs::read_to_string(script).map_err(|source| FixerError::Read {
            path: script.to_path_buf(),
            source,
        })?;

        if !content.contains("allWarningsAsErrors") {
            return Ok(FixOutcome::NoOp("no allWarningsAsErrors setting".to_string()));
        }
        if rule.apply(&content).status != RuleStatus::Applied {
            return Ok(FixOutcome::AlreadyPresent);
        }

        let outputs = self.patch_with(script, &[rule as &dyn TransformRule])?;
        Ok(rule_outcome(&outputs[0]))
    }

    pub fn fix_gradle_properties(&self, report: &mut FixReport) -> Result<(), FixerError> {
        let path = self.require_file(GRADLE_PROPERTIES)?;

        let rules: Vec<EnsureKey> = REQUIRED_PROPERTIES
            .iter()
            .map(|(k, v)| EnsureKey::new(*k, *v))
            .collect();
        let rule_refs: Vec<&dyn TransformRule> =
            rules.iter().map(|r| r as &dyn TransformRule).collect();

        let outputs = self.patch_with(&path, &rule_refs)?;
        for (rule, output) in rules.iter().zip(&outputs) {
            report.record(
                format!("gradle.properties: {}", rule.entry()),
                rule_outcome(output),
            );
        }
        Ok(())
    }

    pub fn fix_root_build_gradle(&self, report: &mut FixReport) -> Result<(), FixerError> {
        let path = self.require_file(ROOT_BUILD_GRADLE)?;

        let strip = StripOutsideScope::new(
            compatibility_line_regex().clone(),
            SCOPED_COMPAT_BLOCKS,
        );
        let insert = InsertBlock::before_line(EXPO_ROOT_ANCHOR, SUBPROJECTS_JAVA_BLOCK)
            .with_marker(SUBPROJECTS_MARKER);

        let rules: [&dyn TransformRule; 2] = [&strip, &insert];
        let outputs = self.patch_with(&path, &rules)?;

        for line in &outputs[0].details {
            info!(file = ROOT_BUILD_GRADLE, "{}", line);
        }
        report.record_with_details(
            "build.gradle: project-level source/targetCompatibility",
            rule_outcome(&outputs[0]),
            outputs[0].details.clone(),
        );
        report.record(
            "build.gradle: subprojects Java 11 compileOptions",
            rule_outcome(&outputs[1]),
        );
        Ok(())
    }

    pub fn fix_app_build_gradle(&self, report: &mut FixReport) -> Result<(), FixerError> {
        let path = self.require_file(APP_BUILD_GRADLE)?;

        let insert = InsertBlock::after_line(NAMESPACE_ANCHOR, COMPILE_OPTIONS_BLOCK)
            .with_marker("compileOptions");
        let outputs = self.patch_with(&path, &[&insert as &dyn TransformRule])?;
        report.record("app/build.gradle: compileOptions", rule_outcome(&outputs[0]));

        let text = &outputs[0].text;
        let java_outcome = if text.contains("JavaVersion.VERSION_11")
            || text.contains("JavaVersion.VERSION_17")
        {
            FixOutcome::AlreadyPresent
        } else {
            FixOutcome::Advisory("Java version may need manual configuration".to_string())
        };
        report.record("app/build.gradle: Java version", java_outcome);
        Ok(())
    }

    pub fn verify_gradle_wrapper(&self, report: &mut FixReport) -> Result<(), FixerError> {
        let path = self.require_file(WRAPPER_PROPERTIES)?;
        let content = fs::read_to_string(&path).map_err(|source| FixerError::Read {
            path: path.clone(),
            source,
        })?;

        let outcome = match parse_wrapper_version(&content) {
            None => FixOutcome::Advisory("could not determine Gradle version".to_string()),
            Some(version) if version.major < self.min_gradle_major => {
                warn!(%version, "Gradle wrapper is outdated");
                FixOutcome::Advisory(format!(
                    "Gradle {} is older than {}; consider upgrading to Gradle {}",
                    version, self.min_gradle_major, RECOMMENDED_GRADLE_VERSIONS
                ))
            }
            Some(version) => {
                info!(%version, "Using Gradle version");
                FixOutcome::AlreadyPresent
            }
        };
        report.record("gradle-wrapper.properties: Gradle version", outcome);
        Ok(())
    }
}

fn rule_outcome(output: &RuleOutput) -> FixOutcome {
    match &output.status {
        RuleStatus::Applied => FixOutcome::Applied,
        RuleStatus::AlreadyApplied => FixOutcome::AlreadyPresent,
        RuleStatus::NotApplicable(reason) => FixOutcome::NoOp(reason.clone()),
    }
}
