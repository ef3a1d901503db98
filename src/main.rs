use infrakit::cli::commands::{CliArgs, Commands};
use infrakit::cli::handlers::{handle_analyze, handle_generate, handle_interpret, resolve_config, EXIT_FAILURE};
use infrakit::util::logging::{init_logging, LoggingConfig};
use infrakit::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    init_logging(LoggingConfig::from_config(&config));

    debug!("infrakit v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, &config).await,
        Commands::Interpret(interpret_args) => handle_interpret(interpret_args, &config).await,
        Commands::Generate(generate_args) => handle_generate(generate_args, &config).await,
    };

    std::process::exit(exit_code);
}
