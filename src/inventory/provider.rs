//! Inventory providers
//!
//! The concrete cloud API client lives outside this crate; the pipeline talks to
//! whatever implements [`InventoryProvider`].

use super::types::{CloudResource, InventoryError, ResourceCategory};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn list(
        &self,
        category: ResourceCategory,
        region: &str,
    ) -> Result<Vec<CloudResource>, InventoryError>;

    fn name(&self) -> &str;
}

/// Serves an inventory export from a JSON or YAML file.
///
/// ```yaml
/// resources:
///   compute:
///     - { id: i-0abc, kind: aws_instance, name: web-1, region: us-east-1 }
/// errors:
///   function: AccessDenied
/// ```
///
/// Entries under `errors` make that category fail, mirroring a partial export.
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    path: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    resources: BTreeMap<ResourceCategory, Vec<CloudResource>>,
    #[serde(default)]
    errors: BTreeMap<ResourceCategory, String>,
}

impl SnapshotProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Snapshot, InventoryError> {
        let snapshot_error = |message: String| InventoryError::Snapshot {
            path: self.path.display().to_string(),
            message,
        };

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| snapshot_error(e.to_string()))?;

        // YAML is a superset of JSON, one parser covers both
        serde_yaml::from_str(&content).map_err(|e| snapshot_error(e.to_string()))
    }
}

#[async_trait]
impl InventoryProvider for SnapshotProvider {
    async fn list(
        &self,
        category: ResourceCategory,
        region: &str,
    ) -> Result<Vec<CloudResource>, InventoryError> {
        let mut snapshot = self.load().await?;

        if let Some(message) = snapshot.errors.remove(&category) {
            return Err(InventoryError::Provider { category, message });
        }

        Ok(snapshot
            .resources
            .remove(&category)
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.region.as_deref().map(|rg| rg == region).unwrap_or(true))
            .collect())
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}

/// In-memory provider with per-category results
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    results: BTreeMap<ResourceCategory, Result<Vec<CloudResource>, String>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(
        mut self,
        category: ResourceCategory,
        resources: Vec<CloudResource>,
    ) -> Self {
        self.results.insert(category, Ok(resources));
        self
    }

    pub fn failing(mut self, category: ResourceCategory, message: impl Into<String>) -> Self {
        self.results.insert(category, Err(message.into()));
        self
    }

    /// Every category fails with the same message
    pub fn all_failing(message: &str) -> Self {
        ResourceCategory::ALL
            .iter()
            .fold(Self::new(), |p, c| p.failing(*c, message))
    }
}

#[async_trait]
impl InventoryProvider for StaticProvider {
    async fn list(
        &self,
        category: ResourceCategory,
        _region: &str,
    ) -> Result<Vec<CloudResource>, InventoryError> {
        match self.results.get(&category) {
            Some(Ok(items)) => Ok(items.clone()),
            Some(Err(message)) => Err(InventoryError::Provider {
                category,
                message: message.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
