//! The React Native Android build, as an ordered list of step descriptors

use super::step::{PreCheck, StepContext, StepDescriptor};
use crate::config::ForgeConfig;
use crate::gradle::GradleFixer;
use crate::patch::FilePatcher;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use tracing::info;

pub const STEP_BACKUP: &str = "backup";
pub const STEP_DOWNGRADE: &str = "downgrade";
pub const STEP_CLEAN: &str = "clean";
pub const STEP_REINSTALL: &str = "reinstall";
pub const STEP_REGENERATE: &str = "regenerate";
pub const STEP_FIX_CONFIG: &str = "fix-config";
pub const STEP_BUILD: &str = "build";

pub const STEP_NAMES: [&str; 7] = [
    STEP_BACKUP,
    STEP_DOWNGRADE,
    STEP_CLEAN,
    STEP_REINSTALL,
    STEP_REGENERATE,
    STEP_FIX_CONFIG,
    STEP_BUILD,
];

pub const PACKAGE_JSON: &str = "package.json";
pub const NODE_MODULES: &str = "node_modules";
pub const ANDROID_DIR: &str = "android";

#[cfg(windows)]
const GRADLEW: &str = "gradlew.bat";
#[cfg(not(windows))]
const GRADLEW: &str = "./gradlew";

pub fn gradlew(task: &str) -> String {
    format!("{} {}", GRADLEW, task)
}

pub fn canonical_steps(config: &ForgeConfig) -> Vec<StepDescriptor> {
    let suffix = config.backup_suffix.clone();
    let fixer_config = config.clone();

    vec![
        StepDescriptor::task(STEP_BACKUP, "Back up package.json", move |ctx| {
            backup_package_json(ctx, &suffix)
        }),
        StepDescriptor::command(
            STEP_DOWNGRADE,
            format!("Pin React Native to {}", config.react_native_version),
            format!("npm install react-native@{}", config.react_native_version),
        ),
        StepDescriptor::task(STEP_CLEAN, "Remove node_modules", clean_node_modules).with_pre_check(
            |root| {
                if root.join(NODE_MODULES).exists() {
                    PreCheck::Run
                } else {
                    PreCheck::Skip("node_modules does not exist".to_string())
                }
            },
        ),
        StepDescriptor::command(
            STEP_REINSTALL,
            "Reinstall dependencies",
            config.install_command(),
        ),
        StepDescriptor::command(
            STEP_REGENERATE,
            "Regenerate the native Android project",
            "npx expo prebuild --clean --platform android",
        ),
        StepDescriptor::task(STEP_FIX_CONFIG, "Fix Gradle configuration", move |ctx| {
            fix_config(ctx, &fixer_config)
        }),
        StepDescriptor::command(
            STEP_BUILD,
            format!("Build the APK ({})", config.gradle_task),
            gradlew(&config.gradle_task),
        )
        .in_dir(ANDROID_DIR)
        .with_best_effort(gradlew("clean"))
        .with_pre_check(|root| {
            if root.join(ANDROID_DIR).is_dir() {
                PreCheck::Run
            } else {
                PreCheck::Fail("android directory not found".to_string())
            }
        }),
    ]
}

/// Static description of one step, for listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepInfo {
    pub ordinal: usize,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

pub fn step_catalog(config: &ForgeConfig) -> Vec<StepInfo> {
    canonical_steps(config)
        .iter()
        .enumerate()
        .map(|(i, d)| StepInfo {
            ordinal: i + 1,
            name: d.name.clone(),
            description: d.description.clone(),
            command: d.command_text().map(str::to_string),
        })
        .collect()
}

fn backup_package_json(ctx: &StepContext<'_>, suffix: &str) -> Result<String> {
    let patcher = FilePatcher::new(suffix);
    let path = ctx.project_root.join(PACKAGE_JSON);
    let created = patcher.ensure_backup(&path)?;
    let backup = patcher.backup_path(&path);

    if created {
        Ok(format!("Created {}", backup.display()))
    } else {
        Ok(format!("Backup already present at {}", backup.display()))
    }
}

fn clean_node_modules(ctx: &StepContext<'_>) -> Result<String> {
    let dir = ctx.project_root.join(NODE_MODULES);
    fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
    info!("Removed {}", dir.display());
    Ok(format!("Removed {}", dir.display()))
}

fn fix_config(ctx: &StepContext<'_>, config: &ForgeConfig) -> Result<String> {
    let report = GradleFixer::from_config(ctx.project_root, config).run_all_fixes();

    if report.has_errors() {
        let failures: Vec<String> = report
            .errors()
            .map(|e| match e.outcome.message() {
                Some(msg) => format!("{}: {}", e.description, msg),
                None => e.description.clone(),
            })
            .collect();
        bail!(
            "{} fix(es) failed:\n{}",
            failures.len(),
            failures.join("\n")
        );
    }

    Ok(format!(
        "{} fix(es) applied, {} advisory note(s)",
        report.applied().count(),
        report.advisories().count()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::step::StepAction;
    use tempfile::TempDir;

    fn find<'a>(steps: &'a [StepDescriptor], name: &str) -> &'a StepDescriptor {
        steps.iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_canonical_order() {
        let steps = canonical_steps(&ForgeConfig::default());
        let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, STEP_NAMES.to_vec());
    }

    #[test]
    fn test_commands_follow_config() {
        let config = ForgeConfig {
            react_native_version: "0.73.0".to_string(),
            legacy_peer_deps: true,
            gradle_task: "assembleRelease".to_string(),
            ..ForgeConfig::default()
        };
        let steps = canonical_steps(&config);

        assert_eq!(
            find(&steps, STEP_DOWNGRADE).command_text(),
            Some("npm install react-native@0.73.0")
        );
        assert_eq!(
            find(&steps, STEP_REINSTALL).command_text(),
            Some("npm install --legacy-peer-deps")
        );
        match &find(&steps, STEP_BUILD).action {
            StepAction::Command(spec) => {
                assert_eq!(spec.command, gradlew("assembleRelease"));
                assert_eq!(spec.best_effort, vec![gradlew("clean")]);
                assert_eq!(spec.working_dir.as_deref(), Some(std::path::Path::new("android")));
            }
            StepAction::Task(_) => panic!("build should be a command step"),
        }
    }

    #[test]
    fn test_step_catalog() {
        let catalog = step_catalog(&ForgeConfig::default());
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog[0].ordinal, 1);
        assert_eq!(catalog[0].name, STEP_BACKUP);
        assert!(catalog[0].command.is_none());
        assert_eq!(
            catalog[4].command.as_deref(),
            Some("npx expo prebuild --clean --platform android")
        );
    }

    #[test]
    fn test_clean_pre_check() {
        let temp = TempDir::new().unwrap();
        let steps = canonical_steps(&ForgeConfig::default());
        let check = find(&steps, STEP_CLEAN).pre_check.as_ref().unwrap();

        assert!(matches!(check(temp.path()), PreCheck::Skip(_)));
        fs::create_dir(temp.path().join(NODE_MODULES)).unwrap();
        assert_eq!(check(temp.path()), PreCheck::Run);
    }

    #[test]
    fn test_build_pre_check_needs_android_dir() {
        let temp = TempDir::new().unwrap();
        let steps = canonical_steps(&ForgeConfig::default());
        let check = find(&steps, STEP_BUILD).pre_check.as_ref().unwrap();

        assert_eq!(
            check(temp.path()),
            PreCheck::Fail("android directory not found".to_string())
        );
        fs::create_dir(temp.path().join(ANDROID_DIR)).unwrap();
        assert_eq!(check(temp.path()), PreCheck::Run);
    }

    #[test]
    fn test_backup_task_is_backup_once() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join(PACKAGE_JSON);
        fs::write(&pkg, "{\"name\":\"app\"}").unwrap();
        let ctx = StepContext {
            project_root: temp.path(),
        };

        let first = backup_package_json(&ctx, ".backup").unwrap();
        assert!(first.starts_with("Created"));

        fs::write(&pkg, "{\"name\":\"changed\"}").unwrap();
        let second = backup_package_json(&ctx, ".backup").unwrap();
        assert!(second.starts_with("Backup already present"));

        let backup = fs::read_to_string(temp.path().join("package.json.backup")).unwrap();
        assert_eq!(backup, "{\"name\":\"app\"}");
    }

    #[test]
    fn test_backup_task_fails_without_package_json() {
        let temp = TempDir::new().unwrap();
        let ctx = StepContext {
            project_root: temp.path(),
        };

        assert!(backup_package_json(&ctx, ".backup").is_err());
    }

    #[test]
    fn test_clean_removes_node_modules() {
        let temp = TempDir::new().unwrap();
        let nm = temp.path().join(NODE_MODULES).join("left-pad");
        fs::create_dir_all(&nm).unwrap();
        fs::write(nm.join("index.js"), "module.exports = 1").unwrap();
        let ctx = StepContext {
            project_root: temp.path(),
        };

        clean_node_modules(&ctx).unwrap();
        assert!(!temp.path().join(NODE_MODULES).exists());
    }

    #[test]
    fn test_fix_config_fails_without_android_project() {
        let temp = TempDir::new().unwrap();
        let ctx = StepContext {
            project_root: temp.path(),
        };

        let err = fix_config(&ctx, &ForgeConfig::default()).unwrap_err();
        assert!(err.to_string().contains("fix(es) failed"));
    }
}
