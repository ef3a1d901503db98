//! Artifact generation: one generator per family, all pure

pub mod artifact;
pub mod builder;
mod ci;
mod docker;
pub mod family;
pub mod graph;
mod kubernetes;
mod monitoring;
pub mod registry;
mod security;
pub mod sizing;
mod terraform;
pub mod toolchain;

pub use artifact::{Artifact, ArtifactSet, GenerateError, GenerateOptions};
pub use ci::CiGenerator;
pub use docker::DockerGenerator;
pub use family::{ArtifactFamily, FamilySelection};
pub use kubernetes::KubernetesGenerator;
pub use monitoring::MonitoringGenerator;
pub use registry::{ArtifactGenerator, FamilyOutcome, GeneratorRegistry};
pub use security::SecurityGenerator;
pub use terraform::TerraformGenerator;

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{ArtifactFamily, GenerateOptions};
    use crate::analysis::{
        Analysis, DataService, Dependency, Ecosystem, Endpoint, EndpointSource, EvidenceSource,
        ProjectType, ServiceCategory,
    };
    use crate::intent::{Component, Environment, Intent};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    pub fn analysis() -> Analysis {
        Analysis::empty("Storefront", "/srv/storefront")
    }

    /// Node project with an Express backend, a React frontend, postgres and redis
    pub fn web_analysis() -> Analysis {
        let mut analysis = analysis();
        analysis.project_type = ProjectType::Node;
        analysis.tech_stack = vec!["Express.js".to_string(), "React".to_string()];
        analysis.dependencies = vec![
            Dependency::new("express", Ecosystem::Node),
            Dependency::new("react", Ecosystem::Node),
            Dependency::new("pg", Ecosystem::Node),
            Dependency::new("redis", Ecosystem::Node),
        ];
        analysis.databases = service(ServiceCategory::Database, "postgresql", "pg");
        analysis.caches = service(ServiceCategory::Cache, "redis", "redis");
        analysis.endpoints = vec![Endpoint {
            port: 3000,
            process: Some("node".to_string()),
            source: EndpointSource::Script("start".to_string()),
        }];
        analysis
    }

    pub fn service(category: ServiceCategory, name: &str, dependency: &str) -> Vec<DataService> {
        DataService::new(category, name, EvidenceSource::Dependency(dependency.to_string()))
            .into_iter()
            .collect()
    }

    pub fn intent(environments: &[Environment], components: &[Component]) -> Intent {
        Intent::new(
            environments.iter().copied(),
            components.iter().copied(),
            BTreeMap::new(),
            ArtifactFamily::Provisioning,
            "",
        )
        .unwrap()
    }

    pub fn options() -> GenerateOptions {
        GenerateOptions::at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }
}
