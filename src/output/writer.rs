use crate::generate::builder::strip_provenance;
use crate::generate::{ArtifactFamily, ArtifactSet};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOutcome {
    Created,
    Updated,
    /// Existing file differed at most in its provenance line
    Unchanged,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    /// Relative to the output root
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteReport {
    pub family: ArtifactFamily,
    pub files: Vec<WrittenFile>,
}

impl WriteReport {
    pub fn count(&self, outcome: WriteOutcome) -> usize {
        self.files.iter().filter(|f| f.outcome == outcome).count()
    }

    /// Files created or updated
    pub fn changed(&self) -> usize {
        self.files.len() - self.count(WriteOutcome::Unchanged)
    }
}

#[derive(Debug, Error)]
#[error("failed to write {}: {source}", path.display())]
pub struct WriteError {
    pub path: PathBuf,
    /// Files of this family already on disk, relative to the output root
    pub written_so_far: Vec<PathBuf>,
    #[source]
    pub source: io::Error,
}

/// SHA-256 of the content with provenance lines removed
pub fn fingerprint(content: &str) -> String {
    hex::encode(Sha256::digest(strip_provenance(content).as_bytes()))
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes every artifact in order. Stops at the first failure and reports what
    /// was already written; nothing is rolled back.
    pub fn write(&self, set: &ArtifactSet) -> Result<WriteReport, WriteError> {
        let mut files: Vec<WrittenFile> = Vec::with_capacity(set.len());

        for artifact in &set.artifacts {
            let fail = |files: &[WrittenFile], source: io::Error| WriteError {
                path: artifact.path.clone(),
                written_so_far: files.iter().map(|f| f.path.clone()).collect(),
                source,
            };

            let target = self
                .resolve(&artifact.path)
                .map_err(|e| fail(&files, e))?;
            let outcome = write_one(&target, &artifact.content).map_err(|e| fail(&files, e))?;

            trace!(path = %artifact.path.display(), ?outcome, "Wrote artifact");
            files.push(WrittenFile {
                path: artifact.path.clone(),
                outcome,
            });
        }

        debug!(
            family = %set.family,
            files = files.len(),
            root = %self.root.display(),
            "Family written"
        );
        Ok(WriteReport {
            family: set.family,
            files,
        })
    }

    /// Artifact paths must stay inside the output root
    fn resolve(&self, relative: &Path) -> io::Result<PathBuf> {
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("artifact path {} leaves the output root", relative.display()),
            ));
        }
        Ok(self.root.join(relative))
    }
}

fn write_one(target: &Path, content: &str) -> io::Result<WriteOutcome> {
    let outcome = match fs::read(target) {
        Ok(existing) => {
            let existing = String::from_utf8_lossy(&existing);
            if fingerprint(&existing) == fingerprint(content) {
                return Ok(WriteOutcome::Unchanged);
            }
            WriteOutcome::Updated
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => WriteOutcome::Created,
        Err(e) => return Err(e),
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, content)?;
    Ok(outcome)
}
