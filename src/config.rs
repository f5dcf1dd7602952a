//! Configuration management for apkforge
//!
//! Settings are resolved in layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `apkforge.toml` in the project root (optional)
//! 3. `APKFORGE_*` environment variables
//! 4. Command-line flags (applied by the CLI handlers)
//!
//! # Environment Variables
//!
//! - `APKFORGE_RN_VERSION`: React Native version to pin - default: "0.74.5"
//! - `APKFORGE_LEGACY_PEER_DEPS`: pass `--legacy-peer-deps` to `npm install` - default: "false"
//! - `APKFORGE_BACKUP_SUFFIX`: suffix for backup files - default: ".backup"
//! - `APKFORGE_MIN_GRADLE_MAJOR`: oldest Gradle major version not flagged - default: "7"
//! - `APKFORGE_GRADLE_TASK`: Gradle task producing the APK - default: "assembleDebug"
//! - `APKFORGE_ARTIFACT_PATH`: APK path relative to the project root
//! - `APKFORGE_PLUGIN_DIR`: React Native Gradle plugin dir relative to the project root
//! - `APKFORGE_LOG_LEVEL`: logging level - default: "info"

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::gradle::wrapper::DEFAULT_MIN_GRADLE_MAJOR;
use crate::patch::DEFAULT_BACKUP_SUFFIX;

pub const CONFIG_FILE_NAME: &str = "apkforge.toml";

const DEFAULT_RN_VERSION: &str = "0.74.5";
const DEFAULT_GRADLE_TASK: &str = "assembleDebug";
const DEFAULT_ARTIFACT_PATH: &str = "android/app/build/outputs/apk/debug/app-debug.apk";
const DEFAULT_PLUGIN_DIR: &str = "node_modules/@react-native/gradle-plugin";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    InvalidFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForgeConfig {
    pub react_native_version: String,
    pub legacy_peer_deps: bool,
    pub backup_suffix: String,
    pub min_gradle_major: u32,
    pub gradle_task: String,
    /// Relative to the project root
    pub artifact_path: PathBuf,
    /// Relative to the project root
    pub plugin_dir: PathBuf,
    pub log_level: String,
}

/// Shape of `apkforge.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    react_native_version: Option<String>,
    legacy_peer_deps: Option<bool>,
    backup_suffix: Option<String>,
    min_gradle_major: Option<u32>,
    gradle_task: Option<String>,
    artifact_path: Option<PathBuf>,
    plugin_dir: Option<PathBuf>,
    log_level: Option<String>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            react_native_version: DEFAULT_RN_VERSION.to_string(),
            legacy_peer_deps: false,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            min_gradle_major: DEFAULT_MIN_GRADLE_MAJOR,
            gradle_task: DEFAULT_GRADLE_TASK.to_string(),
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            plugin_dir: PathBuf::from(DEFAULT_PLUGIN_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ForgeConfig {
    /// Defaults, then `apkforge.toml` under `project_root` if present, then
    /// the environment.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let file = project_root.join(CONFIG_FILE_NAME);
        if file.is_file() {
            config.merge_file(&file)?;
        }

        config.merge_env()?;
        Ok(config)
    }

    fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::InvalidFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            field: path.display().to_string(),
            error: e.to_string(),
        })?;

        if let Some(v) = file.react_native_version {
            self.react_native_version = v;
        }
        if let Some(v) = file.legacy_peer_deps {
            self.legacy_peer_deps = v;
        }
        if let Some(v) = file.backup_suffix {
            self.backup_suffix = v;
        }
        if let Some(v) = file.min_gradle_major {
            self.min_gradle_major = v;
        }
        if let Some(v) = file.gradle_task {
            self.gradle_task = v;
        }
        if let Some(v) = file.artifact_path {
            self.artifact_path = v;
        }
        if let Some(v) = file.plugin_dir {
            self.plugin_dir = v;
        }
        if let Some(v) = file.log_level {
            self.log_level = v.to_lowercase();
        }
        Ok(())
    }

    fn merge_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = env::var("APKFORGE_RN_VERSION") {
            self.react_native_version = v;
        }
        if let Ok(v) = env::var("APKFORGE_LEGACY_PEER_DEPS") {
            self.legacy_peer_deps = parse_env("APKFORGE_LEGACY_PEER_DEPS", &v)?;
        }
        if let Ok(v) = env::var("APKFORGE_BACKUP_SUFFIX") {
            self.backup_suffix = v;
        }
        if let Ok(v) = env::var("APKFORGE_MIN_GRADLE_MAJOR") {
            self.min_gradle_major = parse_env("APKFORGE_MIN_GRADLE_MAJOR", &v)?;
        }
        if let Ok(v) = env::var("APKFORGE_GRADLE_TASK") {
            self.gradle_task = v;
        }
        if let Ok(v) = env::var("APKFORGE_ARTIFACT_PATH") {
            self.artifact_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("APKFORGE_PLUGIN_DIR") {
            self.plugin_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("APKFORGE_LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.react_native_version.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "react_native_version must not be empty".to_string(),
            ));
        }
        if self.gradle_task.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "gradle_task must not be empty".to_string(),
            ));
        }
        if !self.backup_suffix.starts_with('.') || self.backup_suffix.len() < 2 {
            return Err(ConfigError::ValidationFailed(format!(
                "backup_suffix must start with '.' (got '{}')",
                self.backup_suffix
            )));
        }
        if self.min_gradle_major == 0 {
            return Err(ConfigError::ValidationFailed(
                "min_gradle_major must be at least 1".to_string(),
            ));
        }
        for (name, path) in [
            ("artifact_path", &self.artifact_path),
            ("plugin_dir", &self.plugin_dir),
        ] {
            if path.is_absolute() {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be relative to the project root (got {})",
                    name,
                    path.display()
                )));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}. Valid options: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// `npm install` command line for the reinstall step
    pub fn install_command(&self) -> String {
        if self.legacy_peer_deps {
            "npm install --legacy-peer-deps".to_string()
        } else {
            "npm install".to_string()
        }
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::ParseError {
        field: field.to_string(),
        error: e.to_string(),
    })
}
