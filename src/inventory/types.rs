use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Resource categories queried on every inventory run, in query order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Compute,
    Storage,
    Database,
    Network,
    Function,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 5] = [
        ResourceCategory::Compute,
        ResourceCategory::Storage,
        ResourceCategory::Database,
        ResourceCategory::Network,
        ResourceCategory::Function,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Compute => "compute",
            ResourceCategory::Storage => "storage",
            ResourceCategory::Database => "database",
            ResourceCategory::Network => "network",
            ResourceCategory::Function => "function",
        }
    }

    /// Rough monthly cost of one resource in this category, in USD
    pub fn monthly_cost_per_resource(&self) -> f64 {
        match self {
            ResourceCategory::Compute => 35.0,
            ResourceCategory::Storage => 2.5,
            ResourceCategory::Database => 60.0,
            ResourceCategory::Network => 18.0,
            ResourceCategory::Function => 1.5,
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resource reported by the cloud account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudResource {
    pub id: String,
    /// Provider resource type, e.g. `aws_instance`
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl CloudResource {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            name: None,
            region: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Listing result for a single category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryInventory {
    pub category: ResourceCategory,
    pub items: Vec<CloudResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategoryInventory {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of listing every category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryReport {
    pub categories: Vec<CategoryInventory>,
}

impl InventoryReport {
    /// Resources in categories that listed successfully
    pub fn total_resources(&self) -> usize {
        self.successful().map(|c| c.items.len()).sum()
    }

    pub fn successful(&self) -> impl Iterator<Item = &CategoryInventory> {
        self.categories.iter().filter(|c| !c.is_error())
    }

    pub fn failed(&self) -> impl Iterator<Item = &CategoryInventory> {
        self.categories.iter().filter(|c| c.is_error())
    }

    pub fn category(&self, category: ResourceCategory) -> Option<&CategoryInventory> {
        self.categories.iter().find(|c| c.category == category)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    #[error("[inventory] {category}: {message}")]
    Provider {
        category: ResourceCategory,
        message: String,
    },

    #[error("[inventory] {category}: timed out after {seconds}s")]
    Timeout {
        category: ResourceCategory,
        seconds: u64,
    },

    #[error("[inventory] failed to load snapshot {path}: {message}")]
    Snapshot { path: String, message: String },
}
