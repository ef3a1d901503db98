use crate::analysis::Analysis;
use crate::error::{FamilyFailure, PipelineError};
use crate::intent::Intent;
use crate::output::{WriteOutcome, WriteReport};
use serde::Serialize;
use std::path::PathBuf;

/// Everything a generate run produced, including families that failed
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub analysis: Analysis,
    pub intent: Intent,
    pub output_dir: PathBuf,
    pub written: Vec<WriteReport>,
    pub failures: Vec<FamilyFailure>,
}

impl GenerationReport {
    pub fn attempted(&self) -> usize {
        self.written.len() + self.failures.len()
    }

    pub fn files(&self, outcome: WriteOutcome) -> usize {
        self.written.iter().map(|r| r.count(outcome)).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// `PartialGeneration` when any family failed
    pub fn error(&self) -> Option<PipelineError> {
        if self.failures.is_empty() {
            return None;
        }
        Some(PipelineError::PartialGeneration {
            attempted: self.attempted(),
            failures: self.failures.clone(),
        })
    }
}
