//! apkforge - build orchestrator and Gradle config fixer for React Native
//! Android projects
//!
//! The library has two halves that share a backup-on-write file patcher:
//!
//! - **Pipeline**: an ordered, strictly sequential list of steps (backup,
//!   downgrade, clean, reinstall, regenerate, fix-config, build). After a
//!   failing step a [`pipeline::Confirmer`] decides whether to continue;
//!   declining leaves the remaining steps not run.
//! - **Gradle fixer**: idempotent text patches for the generated Android
//!   build files. Every file is backed up once before its first change and
//!   only rewritten when its content actually changes.
//!
//! # Example
//!
//! ```no_run
//! use apkforge::pipeline::{canonical_steps, AutoConfirmer, PipelineOrchestrator};
//! use apkforge::{ForgeConfig, ShellRunner};
//!
//! let config = ForgeConfig::default();
//! let runner = ShellRunner::new();
//! let confirmer = AutoConfirmer::always_no();
//!
//! let mut orchestrator =
//!     PipelineOrchestrator::new("/path/to/app", canonical_steps(&config), &runner, &confirmer);
//! let run = orchestrator.run();
//! println!("failed steps: {:?}", run.failed());
//! ```
//!
//! # Project Structure
//!
//! - [`runner`]: blocking external command execution
//! - [`patch`]: backup-on-write patcher, transformation rules, brace scope tracking
//! - [`gradle`]: the concrete Gradle fixes and their report
//! - [`pipeline`]: steps, the orchestrator and continue/abort confirmation
//! - [`output`]: build summary and artifact lookup

pub mod cli;
pub mod config;
pub mod gradle;
pub mod output;
pub mod patch;
pub mod pipeline;
pub mod progress;
pub mod runner;
pub mod util;

pub use config::{ConfigError, ForgeConfig};
pub use gradle::{FixOutcome, FixReport, FixerError, GradleFixer};
pub use output::{summarize, ArtifactStatus, BuildSummary};
pub use patch::{FilePatcher, PatchError, PatchOutcome};
pub use pipeline::{PipelineOrchestrator, PipelineRun, StepStatus};
pub use runner::{CommandResult, CommandRunner, ShellRunner};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
