use apkforge::cli::commands::{CliArgs, Commands};
use apkforge::cli::handlers::{handle_build, handle_fix, handle_steps};
use apkforge::util::{init_logging, LoggingConfig};
use apkforge::{ForgeConfig, VERSION};

use clap::Parser;
use tracing::debug;

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("apkforge v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Build(build_args) => handle_build(build_args),
        Commands::Fix(fix_args) => handle_fix(fix_args),
        Commands::Steps(steps_args) => handle_steps(steps_args),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    // Configuration errors surface later from the handler, with context.
    let configured = args
        .project_path()
        .and_then(|root| ForgeConfig::load(&root).ok())
        .map(|config| config.log_level);

    init_logging(LoggingConfig::from_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
        configured.as_deref(),
    ));
}
