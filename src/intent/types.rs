use crate::generate::ArtifactFamily;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Environment::Dev, Environment::Staging, Environment::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "staging" | "stage" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(format!("Unknown environment '{}'", other)),
        }
    }
}

/// Infrastructure areas an operator can ask for, in generation order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Compute,
    Storage,
    Networking,
    Database,
    Monitoring,
    Ci,
}

impl Component {
    pub const DEFAULTS: [Component; 3] = [Component::Compute, Component::Storage, Component::Networking];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Compute => "compute",
            Component::Storage => "storage",
            Component::Networking => "networking",
            Component::Database => "database",
            Component::Monitoring => "monitoring",
            Component::Ci => "ci",
        }
    }

    pub fn default_specification(&self) -> &'static str {
        match self {
            Component::Compute => "Container service sized per environment",
            Component::Storage => "Private object storage bucket with versioning",
            Component::Networking => "VPC with public and private subnets across two zones",
            Component::Database => "Managed relational database in private subnets",
            Component::Monitoring => "Metrics scraping with alert rules",
            Component::Ci => "Build and test on every push, staged deploys",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compute" => Ok(Component::Compute),
            "storage" => Ok(Component::Storage),
            "networking" | "network" => Ok(Component::Networking),
            "database" | "db" => Ok(Component::Database),
            "monitoring" => Ok(Component::Monitoring),
            "ci" | "ci/cd" | "cicd" => Ok(Component::Ci),
            other => Err(format!("Unknown component '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error("An intent needs at least one environment")]
    NoEnvironments,

    #[error("An intent needs at least one component")]
    NoComponents,
}

/// The operator's goal, normalized.
///
/// Environments and components are sorted and unique, and every component has a
/// specification. Only [`Intent::new`] builds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intent {
    environments: Vec<Environment>,
    components: Vec<Component>,
    specifications: BTreeMap<Component, String>,
    artifact_family: ArtifactFamily,
    summary: String,
}

impl Intent {
    pub fn new(
        environments: impl IntoIterator<Item = Environment>,
        components: impl IntoIterator<Item = Component>,
        mut specifications: BTreeMap<Component, String>,
        artifact_family: ArtifactFamily,
        summary: impl Into<String>,
    ) -> Result<Self, IntentError> {
        let mut environments: Vec<Environment> = environments.into_iter().collect();
        environments.sort();
        environments.dedup();
        if environments.is_empty() {
            return Err(IntentError::NoEnvironments);
        }

        let mut components: Vec<Component> = components.into_iter().collect();
        components.sort();
        components.dedup();
        if components.is_empty() {
            return Err(IntentError::NoComponents);
        }

        specifications.retain(|c, spec| components.contains(c) && !spec.trim().is_empty());
        for component in &components {
            specifications
                .entry(*component)
                .or_insert_with(|| component.default_specification().to_string());
        }

        let summary = summary.into();
        let summary = if summary.trim().is_empty() {
            default_summary(&environments, &components, artifact_family)
        } else {
            summary
        };

        Ok(Self {
            environments,
            components,
            specifications,
            artifact_family,
            summary,
        })
    }

    /// Dev and prod with the default components
    pub(crate) fn baseline(artifact_family: ArtifactFamily, summary: impl Into<String>) -> Self {
        let environments = vec![Environment::Dev, Environment::Prod];
        let components = Component::DEFAULTS.to_vec();
        let specifications = components
            .iter()
            .map(|c| (*c, c.default_specification().to_string()))
            .collect();
        let summary = summary.into();
        let summary = if summary.trim().is_empty() {
            default_summary(&environments, &components, artifact_family)
        } else {
            summary
        };
        Self {
            environments,
            components,
            specifications,
            artifact_family,
            summary,
        }
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn has_component(&self, component: Component) -> bool {
        self.components.contains(&component)
    }

    pub fn specification(&self, component: Component) -> Option<&str> {
        self.specifications.get(&component).map(String::as_str)
    }

    pub fn specifications(&self) -> &BTreeMap<Component, String> {
        &self.specifications
    }

    pub fn artifact_family(&self) -> ArtifactFamily {
        self.artifact_family
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn default_summary(
    environments: &[Environment],
    components: &[Component],
    family: ArtifactFamily,
) -> String {
    format!(
        "{} artifacts for {} covering {}",
        family,
        join(environments),
        join(components)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_normalizes_order_and_duplicates() {
        let intent = Intent::new(
            [Environment::Prod, Environment::Dev, Environment::Prod],
            [Component::Database, Component::Compute, Component::Database],
            BTreeMap::new(),
            ArtifactFamily::Provisioning,
            "",
        )
        .unwrap();

        assert_eq!(intent.environments(), &[Environment::Dev, Environment::Prod]);
        assert_eq!(intent.components(), &[Component::Compute, Component::Database]);
        assert_eq!(intent.specifications().len(), 2);
        assert_eq!(
            intent.summary(),
            "provisioning artifacts for dev, prod covering compute, database"
        );
    }

    #[test]
    fn test_intent_drops_specs_for_unselected_components() {
        let mut specs = BTreeMap::new();
        specs.insert(Component::Compute, "two t3.small nodes".to_string());
        specs.insert(Component::Monitoring, "grafana".to_string());

        let intent = Intent::new(
            [Environment::Dev],
            [Component::Compute],
            specs,
            ArtifactFamily::Provisioning,
            "small",
        )
        .unwrap();
        assert_eq!(intent.specification(Component::Compute), Some("two t3.small nodes"));
        assert_eq!(intent.specification(Component::Monitoring), None);
    }

    #[test]
    fn test_intent_rejects_empty_sets() {
        assert_eq!(
            Intent::new([], [Component::Compute], BTreeMap::new(), ArtifactFamily::Ci, ""),
            Err(IntentError::NoEnvironments)
        );
        assert_eq!(
            Intent::new([Environment::Dev], [], BTreeMap::new(), ArtifactFamily::Ci, ""),
            Err(IntentError::NoComponents)
        );
    }

    #[test]
    fn test_environment_aliases() {
        assert_eq!("Production".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("qa-east".parse::<Environment>().is_err());
    }
}
