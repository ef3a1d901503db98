//! Ordered keyword tables matched per word token

use super::types::{Component, Environment};
use crate::generate::ArtifactFamily;

/// Predicate over one lowercase token
pub type TokenPredicate = fn(&str) -> bool;

/// An ordered list of (predicate, value) pairs. For each token the first matching rule wins.
pub struct RuleSet<T: 'static> {
    rules: &'static [(TokenPredicate, T)],
}

impl<T: Copy + PartialEq + 'static> RuleSet<T> {
    pub const fn new(rules: &'static [(TokenPredicate, T)]) -> Self {
        Self { rules }
    }

    pub fn classify(&self, token: &str) -> Option<T> {
        self.rules
            .iter()
            .find(|(predicate, _)| predicate(token))
            .map(|(_, value)| *value)
    }

    /// Matched values in token order, de-duplicated
    pub fn matches(&self, tokens: &[String]) -> Vec<T> {
        let mut found = Vec::new();
        for value in tokens.iter().filter_map(|t| self.classify(t)) {
            if !found.contains(&value) {
                found.push(value);
            }
        }
        found
    }
}

/// Lowercase word tokens; `/` and `-` split words
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

fn any_of(token: &str, words: &[&str]) -> bool {
    words.contains(&token)
}

const ENVIRONMENT_TABLE: &[(TokenPredicate, Environment)] = &[
    (|t| any_of(t, &["dev", "development", "local", "sandbox"]), Environment::Dev),
    (|t| any_of(t, &["staging", "stage", "qa", "uat", "preprod"]), Environment::Staging),
    (|t| any_of(t, &["prod", "production", "live", "prd"]), Environment::Prod),
];

const COMPONENT_TABLE: &[(TokenPredicate, Component)] = &[
    (
        |t| any_of(t, &["database", "databases", "db", "postgres", "postgresql", "mysql", "mongodb", "rds", "sql"]),
        Component::Database,
    ),
    (
        |t| any_of(t, &["monitoring", "metrics", "alerts", "alerting", "observability", "prometheus", "grafana", "dashboard", "dashboards"]),
        Component::Monitoring,
    ),
    (
        |t| any_of(t, &["ci", "cd", "cicd", "pipeline", "pipelines", "workflow", "workflows"]),
        Component::Ci,
    ),
    (
        |t| any_of(t, &["network", "networking", "vpc", "subnet", "subnets", "loadbalancer", "lb", "cdn", "dns"]),
        Component::Networking,
    ),
    (
        |t| any_of(t, &["storage", "bucket", "buckets", "s3", "files", "uploads", "blob"]),
        Component::Storage,
    ),
    (
        |t| any_of(t, &["compute", "server", "servers", "instance", "instances", "ec2", "ecs", "cluster", "app", "api", "backend", "service", "services"]),
        Component::Compute,
    ),
];

const FAMILY_TABLE: &[(TokenPredicate, ArtifactFamily)] = &[
    (
        |t| any_of(t, &["terraform", "provision", "provisioning", "iac", "infrastructure"]),
        ArtifactFamily::Provisioning,
    ),
    (
        |t| any_of(t, &["kubernetes", "k8s", "kustomize", "helm", "skaffold", "orchestration"]),
        ArtifactFamily::Orchestration,
    ),
    (
        |t| any_of(t, &["docker", "dockerfile", "container", "containers", "containerize", "image", "compose"]),
        ArtifactFamily::ContainerBuild,
    ),
    (
        |t| any_of(t, &["ci", "cd", "cicd", "pipeline", "pipelines", "actions", "workflow", "workflows"]),
        ArtifactFamily::Ci,
    ),
    (
        |t| any_of(t, &["monitoring", "prometheus", "grafana", "alerting", "observability"]),
        ArtifactFamily::Monitoring,
    ),
    (
        |t| any_of(t, &["security", "iam", "policy", "policies", "rego", "compliance"]),
        ArtifactFamily::SecurityPolicy,
    ),
];

pub static ENVIRONMENT_RULES: RuleSet<Environment> = RuleSet::new(ENVIRONMENT_TABLE);
pub static COMPONENT_RULES: RuleSet<Component> = RuleSet::new(COMPONENT_TABLE);
pub static FAMILY_RULES: RuleSet<ArtifactFamily> = RuleSet::new(FAMILY_TABLE);

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Dev/Prod, with a DB-backed API!"),
            vec!["dev", "prod", "with", "a", "db", "backed", "api"]
        );
    }

    #[parameterized(
        dev = { "development", Some(Environment::Dev) },
        staging = { "uat", Some(Environment::Staging) },
        prod = { "production", Some(Environment::Prod) },
        unrelated = { "developer", None },
    )]
    fn test_environment_rules(token: &str, expected: Option<Environment>) {
        assert_eq!(ENVIRONMENT_RULES.classify(token), expected);
    }

    #[parameterized(
        database = { "postgres", Some(Component::Database) },
        monitoring = { "grafana", Some(Component::Monitoring) },
        ci = { "pipeline", Some(Component::Ci) },
        networking = { "vpc", Some(Component::Networking) },
        storage = { "s3", Some(Component::Storage) },
        compute = { "ecs", Some(Component::Compute) },
        none = { "with", None },
    )]
    fn test_component_rules(token: &str, expected: Option<Component>) {
        assert_eq!(COMPONENT_RULES.classify(token), expected);
    }

    #[parameterized(
        terraform = { "terraform", Some(ArtifactFamily::Provisioning) },
        k8s = { "k8s", Some(ArtifactFamily::Orchestration) },
        docker = { "dockerfile", Some(ArtifactFamily::ContainerBuild) },
        ci = { "actions", Some(ArtifactFamily::Ci) },
        monitoring = { "prometheus", Some(ArtifactFamily::Monitoring) },
        security = { "iam", Some(ArtifactFamily::SecurityPolicy) },
    )]
    fn test_family_rules(token: &str, expected: Option<ArtifactFamily>) {
        assert_eq!(FAMILY_RULES.classify(token), expected);
    }

    #[test]
    fn test_matches_in_token_order_deduplicated() {
        let tokens = tokenize("prod and dev, prod again");
        assert_eq!(
            ENVIRONMENT_RULES.matches(&tokens),
            vec![Environment::Prod, Environment::Dev]
        );
    }
}
