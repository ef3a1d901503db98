//! Pipeline-level errors
//!
//! Every user-visible failure names the stage it happened in and, where it applies,
//! the artifact family, so a scoped re-run is possible.

use crate::analysis::AnalysisError;
use crate::generate::ArtifactFamily;
use crate::intent::InterpretError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Inventory,
    Analysis,
    Interpretation,
    Generation,
    Write,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Inventory => "inventory",
            Stage::Analysis => "analysis",
            Stage::Interpretation => "interpretation",
            Stage::Generation => "generation",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single artifact family that failed during a generate run
#[derive(Debug, Clone, Serialize)]
pub struct FamilyFailure {
    pub family: ArtifactFamily,
    /// Either `Generation` or `Write`
    pub stage: Stage,
    pub message: String,
    /// Files already on disk when the failure happened
    pub written: Vec<PathBuf>,
}

impl fmt::Display for FamilyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.family, self.message)?;
        if !self.written.is_empty() {
            write!(f, " ({} file(s) written before failure)", self.written.len())?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[analysis] {0}")]
    Analysis(#[from] AnalysisError),

    #[error("[interpretation] {0}")]
    Interpretation(#[from] InterpretError),

    #[error("[interpretation] generation declined by operator")]
    Declined,

    #[error("[interpretation] confirmation failed: {0}")]
    Confirmation(String),

    #[error("{} of {} artifact families failed: {}", failures.len(), attempted, join_failures(failures))]
    PartialGeneration {
        attempted: usize,
        failures: Vec<FamilyFailure>,
    },
}

fn join_failures(failures: &[FamilyFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl PipelineError {
    /// Stage of the first failure
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Analysis(_) => Stage::Analysis,
            PipelineError::Interpretation(_)
            | PipelineError::Declined
            | PipelineError::Confirmation(_) => Stage::Interpretation,
            PipelineError::PartialGeneration { failures, .. } => failures
                .iter()
                .map(|f| f.stage)
                .min()
                .unwrap_or(Stage::Generation),
        }
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Declined => 2,
            PipelineError::PartialGeneration { .. } => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Inventory.to_string(), "inventory");
        assert_eq!(Stage::Write.to_string(), "write");
    }

    #[test]
    fn test_partial_generation_names_family_and_stage() {
        let err = PipelineError::PartialGeneration {
            attempted: 6,
            failures: vec![FamilyFailure {
                family: ArtifactFamily::Ci,
                stage: Stage::Write,
                message: "permission denied".to_string(),
                written: vec![PathBuf::from(".github/workflows/ci.yml")],
            }],
        };

        let message = err.to_string();
        assert!(message.contains("1 of 6"));
        assert!(message.contains("[write] ci"));
        assert!(message.contains("1 file(s) written"));
        assert_eq!(err.stage(), Stage::Write);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_declined() {
        let err = PipelineError::Declined;
        assert_eq!(err.stage(), Stage::Interpretation);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_analysis_error_stage() {
        let err = PipelineError::from(AnalysisError::PathNotFound(PathBuf::from("/nope")));
        assert_eq!(err.stage(), Stage::Analysis);
        assert!(err.to_string().starts_with("[analysis]"));
    }
}
