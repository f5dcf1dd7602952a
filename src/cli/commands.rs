use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Build orchestrator and Gradle config fixer for React Native Android apps
#[derive(Parser, Debug)]
#[command(
    name = "apkforge",
    about = "Build a React Native Android APK and repair its generated Gradle configuration",
    version,
    author,
    long_about = "apkforge runs the React Native Android build as a fixed sequence of steps \
                  (backup, downgrade, clean, reinstall, regenerate, fix-config, build), asks \
                  whether to continue after a failing step, and reports which steps completed \
                  and where the APK ended up. The fix-config step is also available on its own \
                  and is safe to run repeatedly."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

impl CliArgs {
    /// Project root named by the subcommand, if it takes one
    pub fn project_path(&self) -> Option<PathBuf> {
        match &self.command {
            Commands::Build(args) => Some(resolve_path(&args.project_path)),
            Commands::Fix(args) => Some(resolve_path(&args.project_path)),
            Commands::Steps(_) => None,
        }
    }
}

/// Defaults to the current directory.
pub fn resolve_path(path: &Option<PathBuf>) -> PathBuf {
    path.clone().unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the full build pipeline",
        long_about = "Runs every build step in order. When a step fails you are asked whether \
                      to continue; declining stops the run and leaves the remaining steps \
                      not run.\n\n\
                      Examples:\n  \
                      apkforge build\n  \
                      apkforge build /path/to/app --yes\n  \
                      apkforge build --skip downgrade --skip clean\n  \
                      apkforge build --format json --output summary.json"
    )]
    Build(BuildArgs),

    #[command(
        about = "Apply the Gradle configuration fixes only",
        long_about = "Patches gradle.properties, the root and app build.gradle files and the \
                      React Native Gradle plugin scripts, and checks the Gradle wrapper version. \
                      Every fix is idempotent and backs up each file once before changing it.\n\n\
                      Examples:\n  \
                      apkforge fix\n  \
                      apkforge fix /path/to/app --format yaml"
    )]
    Fix(FixArgs),

    #[command(about = "List the build steps in execution order")]
    Steps(StepsArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the React Native project (defaults to current directory)"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(
        short = 'y',
        long,
        help = "Start without asking and continue after failing steps"
    )]
    pub yes: bool,

    #[arg(
        long,
        conflicts_with = "yes",
        help = "Never prompt; stop at the first failing step"
    )]
    pub no_input: bool,

    #[arg(
        long = "skip",
        value_name = "STEP",
        help = "Skip a step by name (repeatable)"
    )]
    pub skip: Vec<String>,

    #[arg(long, help = "Pass --legacy-peer-deps to npm install")]
    pub legacy_peer_deps: bool,

    #[arg(
        long = "rn-version",
        value_name = "VERSION",
        help = "React Native version to pin in the downgrade step"
    )]
    pub rn_version: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the summary to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct FixArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the React Native project (defaults to current directory)"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the report to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct StepsArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
