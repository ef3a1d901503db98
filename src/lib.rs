//! infrakit - project analysis and intent-driven infrastructure-as-code generation
//!
//! A run has three stages:
//!
//! - **Analysis**: [`analysis::ProjectAnalyzer`] inspects a project directory (and,
//!   when an account is configured, the cloud inventory) and builds an [`Analysis`]
//! - **Interpretation**: an [`intent::IntentInterpreter`] turns a plain-language goal
//!   into an [`Intent`], through an AI recommender when one is configured and
//!   keyword rules otherwise
//! - **Generation**: [`generate::GeneratorRegistry`] renders artifact families and
//!   [`output::OutputWriter`] writes them idempotently
//!
//! # Example Usage
//!
//! ```ignore
//! use infrakit::analysis::ProjectAnalyzer;
//! use infrakit::fs::RealFileSystem;
//! use infrakit::generate::FamilySelection;
//! use infrakit::intent::{AutoConfirm, KeywordInterpreter};
//! use infrakit::pipeline::{Pipeline, RunOptions};
//! use infrakit::AccountContext;
//! use std::path::Path;
//!
//! let pipeline = Pipeline::new(
//!     ProjectAnalyzer::new(RealFileSystem::new()),
//!     Box::new(KeywordInterpreter),
//! )
//! .with_confirmer(Box::new(AutoConfirm));
//!
//! let options = RunOptions::new(FamilySelection::All, "infrakit-out");
//! let report = pipeline
//!     .generate(Path::new("."), "dev and prod with monitoring", &AccountContext::unconfigured(), &options)
//!     .await?;
//! println!("{} families written", report.written.len());
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod fs;
pub mod generate;
pub mod intent;
pub mod inventory;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod util;

pub use analysis::{Analysis, AnalysisError, ProjectAnalyzer};
pub use config::{ConfigError, InfrakitConfig};
pub use context::AccountContext;
pub use error::{FamilyFailure, PipelineError, Stage};
pub use generate::{ArtifactFamily, ArtifactSet, FamilySelection, GeneratorRegistry};
pub use intent::{Intent, IntentInterpreter, InterpretError};
pub use output::{OutputWriter, WriteError};
pub use pipeline::{GenerationReport, Pipeline, RunOptions};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
