use crate::generate::FamilySelection;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Project analysis and intent-driven infrastructure-as-code generation
#[derive(Parser, Debug)]
#[command(
    name = "infrakit",
    about = "Project analysis and intent-driven infrastructure-as-code generation",
    version,
    author,
    long_about = "infrakit inspects a project directory, interprets a plain-language \
                  infrastructure goal, and generates Terraform, Kubernetes, container, CI, \
                  monitoring and security-policy artifacts for it."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Verbose logging (debug level)")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        value_name = "NAME",
        help = "Cloud account or profile; enables the resource inventory"
    )]
    pub account: Option<String>,

    #[arg(long, global = true, value_name = "REGION", help = "Cloud region")]
    pub region: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Read the resource inventory from a JSON snapshot"
    )]
    pub inventory: Option<PathBuf>,

    #[arg(long, global = true, help = "Skip the recommendation backend; keywords only")]
    pub no_ai: bool,

    #[arg(long, global = true, help = "Do not probe listening ports")]
    pub no_probe: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Analyze a project directory",
        long_about = "Detects the project type, tech stack, dependencies, data services, \
                      ports, environment variables and tooling of a project.\n\n\
                      Examples:\n  \
                      infrakit analyze\n  \
                      infrakit analyze /path/to/project --format json"
    )]
    Analyze(AnalyzeArgs),

    #[command(
        about = "Interpret an infrastructure goal",
        long_about = "Turns a plain-language goal into environments, components and an \
                      artifact family, using the project analysis as context.\n\n\
                      Examples:\n  \
                      infrakit interpret --goal \"production setup with monitoring\""
    )]
    Interpret(InterpretArgs),

    #[command(
        about = "Generate infrastructure artifacts",
        long_about = "Analyzes the project, interprets the goal, asks for confirmation and \
                      writes the artifacts under the output directory.\n\n\
                      Examples:\n  \
                      infrakit generate --goal \"dev and prod on kubernetes\"\n  \
                      infrakit generate --goal \"ci pipeline\" --family ci --yes\n  \
                      infrakit generate --goal \"migrate\" --family all -o out --import-existing"
    )]
    Generate(GenerateArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "PATH", help = "Project root (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct InterpretArgs {
    #[arg(value_name = "PATH", help = "Project root (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(short = 'g', long, value_name = "TEXT", help = "Infrastructure goal")]
    pub goal: String,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "PATH", help = "Project root (defaults to current directory)")]
    pub path: Option<PathBuf>,

    #[arg(short = 'g', long, value_name = "TEXT", help = "Infrastructure goal")]
    pub goal: String,

    #[arg(
        long,
        value_name = "FAMILY",
        value_parser = parse_family_selection,
        help = "Artifact family to generate, or 'all' (defaults to the interpreted family)"
    )]
    pub family: Option<FamilySelection>,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Output directory (defaults to ./infrakit-out)"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Emit import declarations for existing cloud resources")]
    pub import_existing: bool,

    #[arg(short = 'y', long, help = "Skip the confirmation prompt")]
    pub yes: bool,

    #[arg(short = 'f', long, value_enum, default_value = "human", help = "Report format")]
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

fn parse_family_selection(s: &str) -> Result<FamilySelection, String> {
    s.parse()
}
