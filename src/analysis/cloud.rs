//! Cloud footprint summary from the resource inventory

use super::types::{CategorySummary, InfrastructureSummary};
use crate::context::AccountContext;
use crate::inventory::{InventoryReport, ResourceInventory};
use tracing::{debug, info};

/// Summarizes the account, or `None` when nothing usable was found
pub async fn detect_infrastructure(
    inventory: &ResourceInventory,
    ctx: &AccountContext,
) -> Option<InfrastructureSummary> {
    if !ctx.is_configured() {
        debug!("No account configured; skipping cloud inventory");
        return None;
    }

    let report = inventory.list_all(ctx).await;
    let summary = summarize(&report, ctx);
    match &summary {
        Some(s) => info!(
            resources = s.total_resources,
            estimated_monthly_cost = s.estimated_monthly_cost,
            "Cloud inventory collected"
        ),
        None => info!("No cloud infrastructure detected"),
    }
    summary
}

pub fn summarize(report: &InventoryReport, ctx: &AccountContext) -> Option<InfrastructureSummary> {
    if report.successful().next().is_none() || report.total_resources() == 0 {
        return None;
    }

    let categories: Vec<CategorySummary> = report
        .categories
        .iter()
        .map(|c| {
            let count = if c.is_error() { 0 } else { c.items.len() };
            CategorySummary {
                category: c.category,
                count,
                estimated_monthly_cost: count as f64 * c.category.monthly_cost_per_resource(),
                items: c.items.clone(),
                error: c.error.clone(),
            }
        })
        .collect();

    Some(InfrastructureSummary {
        account: ctx.account.clone().unwrap_or_default(),
        region: ctx.region.clone(),
        total_resources: categories.iter().map(|c| c.count).sum(),
        estimated_monthly_cost: categories.iter().map(|c| c.estimated_monthly_cost).sum(),
        categories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{CloudResource, ResourceCategory, StaticProvider};
    use std::sync::Arc;

    fn ctx() -> AccountContext {
        AccountContext::new("prod-account", "eu-west-1")
    }

    #[tokio::test]
    async fn test_unconfigured_context_skips_inventory() {
        let provider = StaticProvider::default().with_resources(
            ResourceCategory::Compute,
            vec![CloudResource::new("i-1", "instance")],
        );
        let inventory = ResourceInventory::new(Arc::new(provider));

        let summary = detect_infrastructure(&inventory, &AccountContext::unconfigured()).await;
        assert!(summary.is_none());
    }

    #[tokio::test]
    async fn test_costs_and_partial_failure() {
        let provider = StaticProvider::default()
            .with_resources(
                ResourceCategory::Compute,
                vec![
                    CloudResource::new("i-1", "instance"),
                    CloudResource::new("i-2", "instance"),
                ],
            )
            .with_resources(
                ResourceCategory::Database,
                vec![CloudResource::new("db-1", "rds")],
            )
            .failing(ResourceCategory::Storage, "AccessDenied");
        let inventory = ResourceInventory::new(Arc::new(provider));

        let summary = detect_infrastructure(&inventory, &ctx()).await.unwrap();
        assert_eq!(summary.total_resources, 3);
        assert!((summary.estimated_monthly_cost - 130.0).abs() < f64::EPSILON);
        assert_eq!(summary.account, "prod-account");

        let storage = summary
            .categories
            .iter()
            .find(|c| c.category == ResourceCategory::Storage)
            .unwrap();
        assert!(storage.error.is_some());
        assert_eq!(storage.count, 0);
    }

    #[tokio::test]
    async fn test_all_categories_failing_is_none() {
        let inventory = ResourceInventory::new(Arc::new(StaticProvider::all_failing("expired")));
        assert!(detect_infrastructure(&inventory, &ctx()).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_account_is_none() {
        let inventory = ResourceInventory::new(Arc::new(StaticProvider::default()));
        assert!(detect_infrastructure(&inventory, &ctx()).await.is_none());
    }
}
