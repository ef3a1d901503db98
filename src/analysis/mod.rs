//! Project analysis: technology, services, ports, env, tooling and cloud footprint
//!
//! [`ProjectAnalyzer::analyze`] runs every detector against a project root. Detectors
//! never abort the analysis; a failing one is logged and contributes nothing.

pub mod advice;
mod analyzer;
pub mod cloud;
pub mod dependencies;
pub mod env;
pub mod infra;
pub mod pattern;
pub mod ports;
pub mod probe;
pub mod services;
pub mod stack;
pub mod types;

pub use analyzer::ProjectAnalyzer;
pub use probe::{default_probe, ListeningSocket, NoopProbe, PortProbe, ProcNetProbe, StaticProbe};
pub use types::{
    Analysis, CategorySummary, DataService, Dependency, Ecosystem, Endpoint, EndpointSource,
    EnvEntry, EvidenceSource, InfraFlags, InfrastructureSummary, PackageManager, ProjectType,
    Recommendation, ServiceCategory,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Project path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Project path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

impl AnalysisError {
    pub fn help_message(&self) -> &'static str {
        match self {
            AnalysisError::PathNotFound(_) => "Check the path argument; it must point at an existing project directory",
            AnalysisError::NotADirectory(_) => "Pass the project directory, not a file inside it",
        }
    }
}
