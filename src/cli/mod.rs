pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AnalyzeArgs, CliArgs, Commands, GenerateArgs, InterpretArgs, OutputFormatArg};
pub use output::{OutputFormat, OutputFormatter};
