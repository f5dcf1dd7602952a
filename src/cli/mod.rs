pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{BuildArgs, CliArgs, Commands, FixArgs, OutputFormatArg, StepsArgs};
pub use output::{OutputFormat, OutputFormatter};
