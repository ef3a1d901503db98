//! Orchestration artifacts: Kustomize base, per-environment overlays, Skaffold

use super::artifact::{ArtifactSet, GenerateError, GenerateOptions};
use super::builder::{yaml, Document};
use super::family::ArtifactFamily;
use super::registry::ArtifactGenerator;
use super::sizing::Sizing;
use crate::analysis::stack::{has_server_framework, has_ui_framework};
use crate::analysis::{Analysis, ServiceCategory};
use crate::intent::{Environment, Intent};
use serde_json::{json, Value};

const ROOT: &str = "k8s";
const FAMILY: ArtifactFamily = ArtifactFamily::Orchestration;
/// Namespace of the controller behind `ingressClassName: nginx`
const INGRESS_NAMESPACE: &str = "ingress-nginx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Frontend,
    Backend,
    Cache,
    App,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Unit {
    role: Role,
    name: &'static str,
    image: String,
    port: u16,
}

impl Unit {
    /// Cache units keep state in memory and never autoscale
    fn stateless(&self) -> bool {
        self.role != Role::Cache
    }

    fn builds_image(&self) -> bool {
        self.role != Role::Cache
    }

    /// In-namespace traffic the base policies allow
    fn calls(&self, other: &Unit) -> bool {
        matches!(
            (self.role, other.role),
            (Role::Frontend, Role::Backend) | (Role::Backend, Role::Cache) | (Role::App, Role::Cache)
        )
    }

    /// Reaches managed services outside the cluster
    fn egresses_externally(&self) -> bool {
        matches!(self.role, Role::Backend | Role::App)
    }
}

fn units(analysis: &Analysis) -> Vec<Unit> {
    let slug = analysis.slug();
    let app_port = analysis.app_port().unwrap_or(8080);
    let mut units = Vec::new();

    if has_ui_framework(&analysis.tech_stack) {
        units.push(Unit {
            role: Role::Frontend,
            name: "frontend",
            image: format!("{}-frontend", slug),
            port: 80,
        });
    }
    if has_server_framework(&analysis.tech_stack) {
        units.push(Unit {
            role: Role::Backend,
            name: "backend",
            image: format!("{}-backend", slug),
            port: app_port,
        });
    }
    if units.is_empty() {
        units.push(Unit {
            role: Role::App,
            name: "app",
            image: slug.clone(),
            port: app_port,
        });
    }

    let caches = analysis.services_in(ServiceCategory::Cache);
    if !caches.is_empty() {
        let (image, port) = if caches.iter().any(|c| c.service() == "memcached") {
            ("memcached:1.6-alpine", 11211)
        } else {
            ("redis:7-alpine", 6379)
        };
        units.push(Unit {
            role: Role::Cache,
            name: "cache",
            image: image.to_string(),
            port,
        });
    }

    units
}

/// Frontend, else backend, else app
fn exposed(units: &[Unit]) -> Option<&Unit> {
    [Role::Frontend, Role::Backend, Role::App]
        .iter()
        .find_map(|role| units.iter().find(|u| u.role == *role))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KubernetesGenerator;

impl KubernetesGenerator {
    pub fn new() -> Self {
        Self
    }
}

struct Render<'a> {
    set: ArtifactSet,
    options: &'a GenerateOptions,
}

impl<'a> Render<'a> {
    fn push_yaml(&mut self, path: String, value: &Value) -> Result<(), GenerateError> {
        let body = yaml(FAMILY, &path, value)?;
        let doc = Document::hash_commented()
            .provenance(&self.options.generated_at)
            .section("manifest", body);
        self.set.push(path, doc.render());
        Ok(())
    }
}

impl ArtifactGenerator for KubernetesGenerator {
    fn family(&self) -> ArtifactFamily {
        FAMILY
    }

    fn generate(
        &self,
        analysis: &Analysis,
        intent: &Intent,
        options: &GenerateOptions,
    ) -> Result<ArtifactSet, GenerateError> {
        let namespace = analysis.slug();
        let units = units(analysis);
        let exposed_name = exposed(&units).map(|u| u.name);
        let base_sizing = Sizing::for_environment(Environment::Dev);

        let mut render = Render {
            set: ArtifactSet::new(FAMILY),
            options,
        };
        let mut resources: Vec<String> = vec![
            "namespace.yaml".into(),
            "network-policy.yaml".into(),
            "allow-dns.yaml".into(),
        ];

        render.push_yaml(format!("{}/base/namespace.yaml", ROOT), &namespace_manifest(&namespace))?;
        render.push_yaml(
            format!("{}/base/network-policy.yaml", ROOT),
            &default_deny(&namespace),
        )?;
        render.push_yaml(format!("{}/base/allow-dns.yaml", ROOT), &allow_dns(&namespace))?;

        for unit in &units {
            let dir = format!("{}/base/{}", ROOT, unit.name);
            render.push_yaml(format!("{}/deployment.yaml", dir), &deployment(unit, &namespace, &base_sizing))?;
            render.push_yaml(format!("{}/service.yaml", dir), &service(unit, &namespace))?;
            resources.push(format!("{}/deployment.yaml", unit.name));
            resources.push(format!("{}/service.yaml", unit.name));

            let exposed = exposed_name == Some(unit.name);
            render.push_yaml(
                format!("{}/network-policy.yaml", dir),
                &allow_unit(unit, &units, exposed, &namespace),
            )?;
            resources.push(format!("{}/network-policy.yaml", unit.name));

            if exposed {
                render.push_yaml(format!("{}/ingress.yaml", dir), &ingress(unit, &namespace))?;
                resources.push(format!("{}/ingress.yaml", unit.name));
            }
            if unit.stateless() {
                render.push_yaml(format!("{}/hpa.yaml", dir), &hpa(unit, &namespace, &base_sizing))?;
                resources.push(format!("{}/hpa.yaml", unit.name));
            }
        }

        render.push_yaml(
            format!("{}/base/kustomization.yaml", ROOT),
            &json!({
                "apiVersion": "kustomize.config.k8s.io/v1beta1",
                "kind": "Kustomization",
                "namespace": namespace,
                "labels": [{ "pairs": { "app.kubernetes.io/part-of": namespace } }],
                "resources": resources,
            }),
        )?;

        for environment in intent.environments() {
            let sizing = Sizing::for_environment(*environment);
            render.push_yaml(
                format!("{}/overlays/{}/kustomization.yaml", ROOT, environment.as_str()),
                &overlay(&units, *environment, &sizing),
            )?;
        }

        render.push_yaml(
            format!("{}/skaffold.yaml", ROOT),
            &skaffold(&namespace, &units, intent.environments()),
        )?;

        Ok(render.set)
    }
}

fn labels(unit: &Unit) -> Value {
    json!({ "app.kubernetes.io/name": unit.name })
}

fn namespace_manifest(namespace: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": namespace },
    })
}

fn default_deny(namespace: &str) -> Value {
    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "NetworkPolicy",
        "metadata": { "name": "default-deny", "namespace": namespace },
        "spec": {
            "podSelector": {},
            "policyTypes": ["Ingress", "Egress"],
        },
    })
}

fn allow_dns(namespace: &str) -> Value {
    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "NetworkPolicy",
        "metadata": { "name": "allow-dns", "namespace": namespace },
        "spec": {
            "podSelector": {},
            "policyTypes": ["Egress"],
            "egress": [{
                "to": [{
                    "namespaceSelector": { "matchLabels": { "kubernetes.io/metadata.name": "kube-system" } },
                    "podSelector": { "matchLabels": { "k8s-app": "kube-dns" } },
                }],
                "ports": [{ "protocol": "UDP", "port": 53 }, { "protocol": "TCP", "port": 53 }],
            }],
        },
    })
}

/// Opens the paths one unit needs on top of the default deny
fn allow_unit(unit: &Unit, units: &[Unit], exposed: bool, namespace: &str) -> Value {
    let port = json!([{ "protocol": "TCP", "port": unit.port }]);

    let mut ingress = Vec::new();
    if exposed {
        ingress.push(json!({
            "from": [{
                "namespaceSelector": { "matchLabels": { "kubernetes.io/metadata.name": INGRESS_NAMESPACE } },
            }],
            "ports": port,
        }));
    }
    for caller in units.iter().filter(|u| u.calls(unit)) {
        ingress.push(json!({
            "from": [{ "podSelector": { "matchLabels": labels(caller) } }],
            "ports": port,
        }));
    }

    let mut egress: Vec<Value> = units
        .iter()
        .filter(|callee| unit.calls(callee))
        .map(|callee| {
            json!({
                "to": [{ "podSelector": { "matchLabels": labels(callee) } }],
                "ports": [{ "protocol": "TCP", "port": callee.port }],
            })
        })
        .collect();
    if unit.egresses_externally() {
        egress.push(json!({ "to": [{ "ipBlock": { "cidr": "0.0.0.0/0" } }] }));
    }

    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "NetworkPolicy",
        "metadata": { "name": format!("allow-{}", unit.name), "namespace": namespace },
        "spec": {
            "podSelector": { "matchLabels": labels(unit) },
            "policyTypes": ["Ingress", "Egress"],
            "ingress": ingress,
            "egress": egress,
        },
    })
}

fn deployment(unit: &Unit, namespace: &str, sizing: &Sizing) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": unit.name, "namespace": namespace, "labels": labels(unit) },
        "spec": {
            "replicas": 1,
            "selector": { "matchLabels": labels(unit) },
            "template": {
                "metadata": { "labels": labels(unit) },
                "spec": {
                    "containers": [{
                        "name": unit.name,
                        "image": unit.image,
                        "ports": [{ "containerPort": unit.port }],
                        "resources": {
                            "requests": { "cpu": sizing.cpu_request(), "memory": sizing.memory_request() },
                            "limits": { "memory": sizing.memory_request() },
                        },
                        "readinessProbe": { "tcpSocket": { "port": unit.port } },
                    }],
                },
            },
        },
    })
}

fn service(unit: &Unit, namespace: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": unit.name, "namespace": namespace, "labels": labels(unit) },
        "spec": {
            "type": "ClusterIP",
            "selector": labels(unit),
            "ports": [{ "port": unit.port, "targetPort": unit.port }],
        },
    })
}

fn ingress(unit: &Unit, namespace: &str) -> Value {
    json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": { "name": unit.name, "namespace": namespace },
        "spec": {
            "ingressClassName": "nginx",
            "rules": [{
                "host": format!("{}.example.com", namespace),
                "http": {
                    "paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": { "service": { "name": unit.name, "port": { "number": unit.port } } },
                    }],
                },
            }],
        },
    })
}

fn hpa(unit: &Unit, namespace: &str, sizing: &Sizing) -> Value {
    json!({
        "apiVersion": "autoscaling/v2",
        "kind": "HorizontalPodAutoscaler",
        "metadata": { "name": unit.name, "namespace": namespace },
        "spec": {
            "scaleTargetRef": { "apiVersion": "apps/v1", "kind": "Deployment", "name": unit.name },
            "minReplicas": sizing.min_units,
            "maxReplicas": sizing.max_units,
            "metrics": [{
                "type": "Resource",
                "resource": { "name": "cpu", "target": { "type": "Utilization", "averageUtilization": 70 } },
            }],
        },
    })
}

fn overlay(units: &[Unit], environment: Environment, sizing: &Sizing) -> Value {
    let replicas: Vec<Value> = units
        .iter()
        .map(|u| {
            let count = if u.stateless() { sizing.min_units } else { 1 };
            json!({ "name": u.name, "count": count })
        })
        .collect();

    let patches: Vec<Value> = units
        .iter()
        .filter(|u| u.stateless())
        .map(|u| {
            json!({
                "target": { "kind": "HorizontalPodAutoscaler", "name": u.name },
                "patch": format!(
                    "- op: replace\n  path: /spec/minReplicas\n  value: {}\n- op: replace\n  path: /spec/maxReplicas\n  value: {}\n",
                    sizing.min_units, sizing.max_units
                ),
            })
        })
        .collect();

    json!({
        "apiVersion": "kustomize.config.k8s.io/v1beta1",
        "kind": "Kustomization",
        "resources": ["../../base"],
        "labels": [{ "pairs": { "environment": environment.as_str() } }],
        "replicas": replicas,
        "patches": patches,
    })
}

fn skaffold(namespace: &str, units: &[Unit], environments: &[Environment]) -> Value {
    let artifacts: Vec<Value> = units
        .iter()
        .filter(|u| u.builds_image())
        .map(|u| json!({ "image": u.image, "context": "..", "docker": { "dockerfile": "Dockerfile" } }))
        .collect();

    let profiles: Vec<Value> = environments
        .iter()
        .map(|env| {
            json!({
                "name": env.as_str(),
                "manifests": { "kustomize": { "paths": [format!("overlays/{}", env.as_str())] } },
            })
        })
        .collect();

    json!({
        "apiVersion": "skaffold/v4beta6",
        "kind": "Config",
        "metadata": { "name": namespace },
        "build": { "artifacts": artifacts },
        "manifests": { "kustomize": { "paths": ["base"] } },
        "profiles": profiles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::fixtures::{analysis, intent, options, web_analysis};
    use crate::intent::Component;

    fn generate(analysis: &Analysis, environments: &[Environment]) -> ArtifactSet {
        let intent = intent(environments, &Component::DEFAULTS);
        KubernetesGenerator::new()
            .generate(analysis, &intent, &options())
            .unwrap()
    }

    fn parse(set: &ArtifactSet, path: &str) -> serde_yaml::Value {
        serde_yaml::from_str(&set.get(path).unwrap().content).unwrap()
    }

    #[test]
    fn test_units_follow_tech_stack() {
        let set = generate(&web_analysis(), &[Environment::Dev]);

        for unit in ["frontend", "backend", "cache"] {
            assert!(set.contains(format!("k8s/base/{}/deployment.yaml", unit)));
            assert!(set.contains(format!("k8s/base/{}/service.yaml", unit)));
        }
        assert!(!set.contains("k8s/base/app/deployment.yaml"));

        assert!(set.contains("k8s/base/frontend/ingress.yaml"));
        assert!(!set.contains("k8s/base/backend/ingress.yaml"));
        assert!(set.contains("k8s/base/backend/hpa.yaml"));
        assert!(!set.contains("k8s/base/cache/hpa.yaml"));
    }

    #[test]
    fn test_app_unit_when_no_framework() {
        let set = generate(&analysis(), &[Environment::Dev]);
        assert!(set.contains("k8s/base/app/deployment.yaml"));
        assert!(set.contains("k8s/base/app/ingress.yaml"));
        assert!(set.contains("k8s/base/app/hpa.yaml"));
    }

    #[test]
    fn test_base_kustomization_lists_every_unit() {
        let set = generate(&web_analysis(), &[Environment::Dev]);
        let kustomization = parse(&set, "k8s/base/kustomization.yaml");
        let resources: Vec<&str> = kustomization["resources"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|r| r.as_str())
            .collect();

        assert_eq!(resources[0], "namespace.yaml");
        assert_eq!(resources[1], "network-policy.yaml");
        assert_eq!(resources[2], "allow-dns.yaml");
        for unit in ["frontend", "backend", "cache"] {
            assert!(resources.contains(&format!("{}/network-policy.yaml", unit).as_str()));
        }
        assert!(resources.contains(&"cache/deployment.yaml"));
        assert!(resources.contains(&"frontend/ingress.yaml"));
        assert_eq!(kustomization["namespace"].as_str(), Some("storefront"));
    }

    #[test]
    fn test_overlay_replicas_per_environment() {
        let set = generate(&web_analysis(), &[Environment::Dev, Environment::Prod]);

        let prod = parse(&set, "k8s/overlays/prod/kustomization.yaml");
        let replicas = prod["replicas"].as_sequence().unwrap();
        let backend = replicas.iter().find(|r| r["name"].as_str() == Some("backend")).unwrap();
        let cache = replicas.iter().find(|r| r["name"].as_str() == Some("cache")).unwrap();
        assert_eq!(backend["count"].as_u64(), Some(3));
        assert_eq!(cache["count"].as_u64(), Some(1));

        let dev = parse(&set, "k8s/overlays/dev/kustomization.yaml");
        assert_eq!(dev["replicas"][0]["count"].as_u64(), Some(1));
        assert!(!set.contains("k8s/overlays/staging/kustomization.yaml"));
    }

    #[test]
    fn test_default_deny_and_skaffold_profiles() {
        let set = generate(&web_analysis(), &[Environment::Dev, Environment::Staging]);

        let policy = parse(&set, "k8s/base/network-policy.yaml");
        assert_eq!(policy["metadata"]["name"].as_str(), Some("default-deny"));
        assert_eq!(policy["spec"]["policyTypes"].as_sequence().unwrap().len(), 2);

        let skaffold = parse(&set, "k8s/skaffold.yaml");
        let profiles: Vec<&str> = skaffold["profiles"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|p| p["name"].as_str())
            .collect();
        assert_eq!(profiles, vec!["dev", "staging"]);
        // cache runs a stock image
        assert_eq!(skaffold["build"]["artifacts"].as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn test_allow_policies_open_the_unit_paths() {
        let set = generate(&web_analysis(), &[Environment::Dev]);

        let dns = parse(&set, "k8s/base/allow-dns.yaml");
        assert_eq!(dns["spec"]["egress"][0]["ports"][0]["port"].as_u64(), Some(53));

        let frontend = parse(&set, "k8s/base/frontend/network-policy.yaml");
        assert_eq!(
            frontend["spec"]["ingress"][0]["from"][0]["namespaceSelector"]["matchLabels"]
                ["kubernetes.io/metadata.name"]
                .as_str(),
            Some("ingress-nginx")
        );
        assert_eq!(frontend["spec"]["ingress"][0]["ports"][0]["port"].as_u64(), Some(80));

        let backend = parse(&set, "k8s/base/backend/network-policy.yaml");
        let from = &backend["spec"]["ingress"][0]["from"][0]["podSelector"]["matchLabels"];
        assert_eq!(from["app.kubernetes.io/name"].as_str(), Some("frontend"));
        let egress = backend["spec"]["egress"].as_sequence().unwrap();
        assert_eq!(egress[0]["to"][0]["podSelector"]["matchLabels"]["app.kubernetes.io/name"].as_str(), Some("cache"));
        assert_eq!(egress[0]["ports"][0]["port"].as_u64(), Some(6379));
        assert_eq!(egress[1]["to"][0]["ipBlock"]["cidr"].as_str(), Some("0.0.0.0/0"));

        let cache = parse(&set, "k8s/base/cache/network-policy.yaml");
        let from = &cache["spec"]["ingress"][0]["from"][0]["podSelector"]["matchLabels"];
        assert_eq!(from["app.kubernetes.io/name"].as_str(), Some("backend"));
        assert!(cache["spec"]["egress"].as_sequence().unwrap().is_empty());
    }

    #[test]
    fn test_manifests_carry_provenance() {
        let set = generate(&analysis(), &[Environment::Dev]);
        let namespace = &set.get("k8s/base/namespace.yaml").unwrap().content;
        assert!(namespace.starts_with("# Generated by infrakit at 2024-05-01T12:00:00Z\n"));
    }
}
