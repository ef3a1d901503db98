//! Subcommand handlers. Each returns the process exit code.

use super::commands::{AnalyzeArgs, CliArgs, GenerateArgs, InterpretArgs};
use super::output::OutputFormatter;
use crate::analysis::{default_probe, ProjectAnalyzer};
use crate::config::InfrakitConfig;
use crate::context::AccountContext;
use crate::error::PipelineError;
use crate::fs::RealFileSystem;
use crate::generate::GenerateOptions;
use crate::intent::{
    AutoConfirm, FallbackInterpreter, IntentInterpreter, KeywordInterpreter,
    RecommendationInterpreter, TerminalConfirmer,
};
use crate::inventory::{ResourceInventory, SnapshotProvider};
use crate::llm::select_recommender;
use crate::pipeline::{Pipeline, RunOptions};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Environment configuration with the global flags applied on top
pub fn resolve_config(args: &CliArgs) -> Result<InfrakitConfig> {
    let mut config = InfrakitConfig::default();

    if let Some(level) = &args.log_level {
        config.log_level = level.to_lowercase();
    } else if args.verbose {
        config.log_level = "debug".to_string();
    } else if args.quiet {
        config.log_level = "error".to_string();
    }
    if let Some(account) = &args.account {
        config.account = Some(account.clone());
    }
    if let Some(region) = &args.region {
        config.region = region.clone();
    }
    if let Some(inventory) = &args.inventory {
        config.inventory_file = Some(inventory.clone());
    }
    if args.no_ai {
        config.provider = None;
    }
    if args.no_probe {
        config.probe_ports = false;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn project_root(path: Option<&PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.clone()),
        None => std::env::current_dir().context("Failed to determine current directory"),
    }
}

fn build_analyzer(config: &InfrakitConfig, ctx: &AccountContext) -> ProjectAnalyzer<RealFileSystem> {
    let mut analyzer = ProjectAnalyzer::new(RealFileSystem::new());

    match (&config.inventory_file, ctx.is_configured()) {
        (Some(file), true) => {
            debug!(file = %file.display(), "Using inventory snapshot");
            let inventory = ResourceInventory::new(Arc::new(SnapshotProvider::new(file)))
                .with_timeout(ctx.timeout);
            analyzer = analyzer.with_inventory(Arc::new(inventory));
        }
        (Some(_), false) => {
            warn!("Inventory file given without an account; skipping inventory");
        }
        (None, true) => {
            warn!("No inventory source for account; cloud footprint will be empty");
        }
        (None, false) => {}
    }

    if config.probe_ports {
        analyzer = analyzer.with_probe(default_probe());
    }
    analyzer
}

fn build_interpreter(config: &InfrakitConfig) -> Box<dyn IntentInterpreter> {
    match select_recommender(config) {
        Some(selected) => {
            info!("Interpreting goals with {}", selected.description);
            let primary = RecommendationInterpreter::new(selected.recommender, config.request_timeout());
            Box::new(FallbackInterpreter::with_keywords(primary))
        }
        None => Box::new(KeywordInterpreter),
    }
}

fn build_pipeline(config: &InfrakitConfig, ctx: &AccountContext) -> Pipeline<RealFileSystem> {
    Pipeline::new(build_analyzer(config, ctx), build_interpreter(config))
}

/// Exit code for an error that reached the command boundary
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PipelineError>()
        .map(PipelineError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}

fn finish(result: Result<()>) -> i32 {
    match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            let code = exit_code_for(&e);
            match e.downcast_ref::<PipelineError>() {
                Some(PipelineError::Declined) => eprintln!("Generation declined; nothing was written"),
                _ => {
                    error!("{:#}", e);
                    eprintln!("Error: {:#}", e);
                }
            }
            code
        }
    }
}

fn print(text: &str) {
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

pub async fn handle_analyze(args: &AnalyzeArgs, config: &InfrakitConfig) -> i32 {
    finish(run_analyze(args, config).await)
}

async fn run_analyze(args: &AnalyzeArgs, config: &InfrakitConfig) -> Result<()> {
    let root = project_root(args.path.as_ref())?;
    let ctx = config.account_context();
    let pipeline = build_pipeline(config, &ctx);

    let analysis = pipeline.analyze(&root, &ctx).await?;
    let text = OutputFormatter::new(args.format.into()).format_analysis(&analysis)?;
    print(&text);
    Ok(())
}

pub async fn handle_interpret(args: &InterpretArgs, config: &InfrakitConfig) -> i32 {
    finish(run_interpret(args, config).await)
}

async fn run_interpret(args: &InterpretArgs, config: &InfrakitConfig) -> Result<()> {
    let root = project_root(args.path.as_ref())?;
    let ctx = config.account_context();
    let pipeline = build_pipeline(config, &ctx);

    let analysis = pipeline.analyze(&root, &ctx).await?;
    let intent = pipeline.interpret(&args.goal, &analysis).await?;
    let text = OutputFormatter::new(args.format.into()).format_intent(&intent)?;
    print(&text);
    Ok(())
}

pub async fn handle_generate(args: &GenerateArgs, config: &InfrakitConfig) -> i32 {
    finish(run_generate(args, config).await)
}

async fn run_generate(args: &GenerateArgs, config: &InfrakitConfig) -> Result<()> {
    let root = project_root(args.path.as_ref())?;
    let ctx = config.account_context();
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());

    let mut pipeline = build_pipeline(config, &ctx);
    pipeline = if args.yes {
        pipeline.with_confirmer(Box::new(AutoConfirm))
    } else {
        pipeline.with_confirmer(Box::new(TerminalConfirmer::new()))
    };

    let generate = GenerateOptions::new()
        .with_region(ctx.region.clone())
        .with_import_existing(args.import_existing);
    let options = match args.family {
        Some(selection) => RunOptions::new(selection, &output_dir),
        None => RunOptions::for_intent(&output_dir),
    }
    .with_generate_options(generate);

    let report = pipeline.generate(&root, &args.goal, &ctx, &options).await?;
    let text = OutputFormatter::new(args.format.into()).format_report(&report)?;
    print(&text);

    match report.error() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_flags_override_config() {
        let args = CliArgs::parse_from([
            "infrakit",
            "analyze",
            "--account",
            "acme",
            "--region",
            "eu-central-1",
            "--no-ai",
            "--no-probe",
            "-v",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.account.as_deref(), Some("acme"));
        assert_eq!(config.region, "eu-central-1");
        assert!(config.provider.is_none());
        assert!(!config.probe_ports);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_invalid_log_level_rejected() {
        let args = CliArgs::parse_from(["infrakit", "analyze", "--log-level", "chatty"]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&anyhow::Error::from(PipelineError::Declined)), 2);
        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), EXIT_FAILURE);
        let wrapped = anyhow::Error::from(PipelineError::Declined).context("generate");
        assert_eq!(exit_code_for(&wrapped), 2);
    }
}
