use super::family::ArtifactFamily;
use crate::context::DEFAULT_REGION;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One generated file, path relative to the output root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub content: String,
}

/// The ordered files one generator produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
    pub family: ArtifactFamily,
    pub artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn new(family: ArtifactFamily) -> Self {
        Self {
            family,
            artifacts: Vec::new(),
        }
    }

    pub fn push(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.artifacts.push(Artifact {
            path: path.into(),
            content: content.into(),
        });
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&Artifact> {
        let path = path.as_ref();
        self.artifacts.iter().find(|a| a.path == path)
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.get(path).is_some()
    }

    pub fn position(&self, path: impl AsRef<Path>) -> Option<usize> {
        let path = path.as_ref();
        self.artifacts.iter().position(|a| a.path == path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.iter().map(|a| a.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Emit import scaffolding for existing cloud resources
    pub import_existing: bool,
    /// Timestamp written into provenance lines
    pub generated_at: String,
    /// Cloud region the provisioning targets
    pub region: String,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            import_existing: false,
            generated_at: time.to_rfc3339_opts(SecondsFormat::Secs, true),
            region: DEFAULT_REGION.to_string(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_import_existing(mut self, import_existing: bool) -> Self {
        self.import_existing = import_existing;
        self
    }
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    #[error("[generation] {family}: failed to render {path}: {message}")]
    Render {
        family: ArtifactFamily,
        path: String,
        message: String,
    },

    #[error("[generation] {family}: {message}")]
    Unsupported {
        family: ArtifactFamily,
        message: String,
    },
}

impl GenerateError {
    pub fn family(&self) -> ArtifactFamily {
        match self {
            GenerateError::Render { family, .. } | GenerateError::Unsupported { family, .. } => {
                *family
            }
        }
    }
}
