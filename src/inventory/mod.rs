//! Cloud resource inventory
//!
//! Lists a fixed set of resource categories from an account. A category that fails
//! is recorded with its error and left out of the totals; it never stops the other
//! categories from being listed.

mod provider;
mod types;

pub use provider::{InventoryProvider, SnapshotProvider, StaticProvider};
pub use types::{
    CategoryInventory, CloudResource, InventoryError, InventoryReport, ResourceCategory,
};

use crate::context::AccountContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 20;

pub struct ResourceInventory {
    provider: Arc<dyn InventoryProvider>,
    timeout: Duration,
}

impl ResourceInventory {
    pub fn new(provider: Arc<dyn InventoryProvider>) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Lists every category for the account in `ctx`.
    pub async fn list_all(&self, ctx: &AccountContext) -> InventoryReport {
        let mut categories = Vec::with_capacity(ResourceCategory::ALL.len());

        for category in ResourceCategory::ALL {
            let entry = match self.list_bounded(category, &ctx.region, ctx.timeout).await {
                Ok(items) => CategoryInventory {
                    category,
                    items,
                    error: None,
                },
                Err(e) => {
                    warn!(category = %category, error = %e, "Inventory category failed");
                    CategoryInventory {
                        category,
                        items: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            categories.push(entry);
        }

        let report = InventoryReport { categories };
        info!(
            provider = self.provider.name(),
            region = %ctx.region,
            resources = report.total_resources(),
            failed_categories = report.failed().count(),
            "Inventory complete"
        );
        report
    }

    /// Lists one category.
    ///
    /// With `silent` set, a failure is logged and degrades to an empty list; otherwise
    /// it is returned to the caller.
    pub async fn list(
        &self,
        category: ResourceCategory,
        region: &str,
        silent: bool,
    ) -> Result<Vec<CloudResource>, InventoryError> {
        match self.list_bounded(category, region, self.timeout).await {
            Ok(items) => Ok(items),
            Err(e) if silent => {
                debug!(category = %category, error = %e, "Inventory listing failed silently");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn list_bounded(
        &self,
        category: ResourceCategory,
        region: &str,
        timeout: Duration,
    ) -> Result<Vec<CloudResource>, InventoryError> {
        match tokio::time::timeout(timeout, self.provider.list(category, region)).await {
            Ok(result) => result,
            Err(_) => Err(InventoryError::Timeout {
                category,
                seconds: timeout.as_secs(),
            }),
        }
    }
}
