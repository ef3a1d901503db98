//! Monitoring artifacts: Prometheus scrape config, alert rules, Grafana dashboard

use super::artifact::{ArtifactSet, GenerateError, GenerateOptions};
use super::builder::{json as json_text, yaml, Document};
use super::family::ArtifactFamily;
use super::registry::ArtifactGenerator;
use crate::analysis::Analysis;
use crate::intent::{Component, Intent};
use serde_json::{json, Value};

const FAMILY: ArtifactFamily = ArtifactFamily::Monitoring;
const DEFAULT_TARGET_PORT: u16 = 8080;

/// Exporters scraped when their service is detected: `(service, job, target)`
const EXPORTERS: &[(&str, &str, &str)] = &[
    ("postgresql", "postgres", "postgres-exporter:9187"),
    ("mysql", "mysql", "mysqld-exporter:9104"),
    ("mongodb", "mongodb", "mongodb-exporter:9216"),
    ("redis", "redis", "redis-exporter:9121"),
    ("rabbitmq", "rabbitmq", "rabbitmq:15692"),
];

struct AlertRule {
    component: Component,
    alert: &'static str,
    expr: &'static str,
    duration: &'static str,
    severity: &'static str,
    summary: &'static str,
}

const ALERT_RULES: &[AlertRule] = &[
    AlertRule {
        component: Component::Compute,
        alert: "InstanceDown",
        expr: "up{job=\"{job}\"} == 0",
        duration: "2m",
        severity: "critical",
        summary: "{{ $labels.instance }} is not responding to scrapes",
    },
    AlertRule {
        component: Component::Compute,
        alert: "HighCpuUsage",
        expr: "rate(process_cpu_seconds_total{job=\"{job}\"}[5m]) > 0.8",
        duration: "10m",
        severity: "warning",
        summary: "CPU usage above 80% on {{ $labels.instance }}",
    },
    AlertRule {
        component: Component::Networking,
        alert: "HighErrorRate",
        expr: "sum(rate(http_requests_total{job=\"{job}\",status=~\"5..\"}[5m])) / sum(rate(http_requests_total{job=\"{job}\"}[5m])) > 0.05",
        duration: "5m",
        severity: "critical",
        summary: "More than 5% of requests are failing",
    },
    AlertRule {
        component: Component::Networking,
        alert: "HighLatency",
        expr: "histogram_quantile(0.95, sum(rate(http_request_duration_seconds_bucket{job=\"{job}\"}[5m])) by (le)) > 1",
        duration: "10m",
        severity: "warning",
        summary: "p95 latency above 1s",
    },
    AlertRule {
        component: Component::Database,
        alert: "DatabaseDown",
        expr: "up{job=~\"postgres|mysql|mongodb\"} == 0",
        duration: "1m",
        severity: "critical",
        summary: "Database exporter reports the database unreachable",
    },
    AlertRule {
        component: Component::Storage,
        alert: "DiskSpaceLow",
        expr: "node_filesystem_avail_bytes / node_filesystem_size_bytes < 0.1",
        duration: "15m",
        severity: "warning",
        summary: "Less than 10% disk space left on {{ $labels.instance }}",
    },
    AlertRule {
        component: Component::Monitoring,
        alert: "PrometheusTargetMissing",
        expr: "absent(up{job=\"{job}\"})",
        duration: "5m",
        severity: "warning",
        summary: "No scrape target reported for {job}",
    },
];

#[derive(Debug, Default, Clone, Copy)]
pub struct MonitoringGenerator;

impl MonitoringGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactGenerator for MonitoringGenerator {
    fn family(&self) -> ArtifactFamily {
        FAMILY
    }

    fn generate(
        &self,
        analysis: &Analysis,
        intent: &Intent,
        options: &GenerateOptions,
    ) -> Result<ArtifactSet, GenerateError> {
        let job = analysis.slug();
        let mut set = ArtifactSet::new(FAMILY);

        let prometheus = yaml(FAMILY, "monitoring/prometheus.yml", &prometheus(analysis, &job))?;
        set.push(
            "monitoring/prometheus.yml",
            Document::hash_commented()
                .provenance(&options.generated_at)
                .section("config", prometheus)
                .render(),
        );

        let alerts = yaml(FAMILY, "monitoring/alerts.yml", &alerts(intent, &job))?;
        set.push(
            "monitoring/alerts.yml",
            Document::hash_commented()
                .provenance(&options.generated_at)
                .section("rules", alerts)
                .render(),
        );

        let dashboard = json_text(FAMILY, "monitoring/dashboard.json", &dashboard(intent, &job))?;
        set.push(
            "monitoring/dashboard.json",
            Document::uncommented()
                .provenance(&options.generated_at)
                .section("dashboard", dashboard)
                .render(),
        );

        Ok(set)
    }
}

fn targets(analysis: &Analysis) -> Vec<String> {
    let mut ports = analysis.app_ports();
    if ports.is_empty() {
        ports.push(DEFAULT_TARGET_PORT);
    }
    ports.dedup();
    ports.iter().map(|p| format!("app:{}", p)).collect()
}

fn prometheus(analysis: &Analysis, job: &str) -> Value {
    let mut scrape = vec![json!({
        "job_name": job,
        "metrics_path": "/metrics",
        "static_configs": [{ "targets": targets(analysis) }],
    })];
    for (service, exporter_job, target) in EXPORTERS {
        if analysis.has_service(service) {
            scrape.push(json!({
                "job_name": exporter_job,
                "static_configs": [{ "targets": [target] }],
            }));
        }
    }

    json!({
        "global": { "scrape_interval": "15s", "evaluation_interval": "15s" },
        "rule_files": ["alerts.yml"],
        "scrape_configs": scrape,
    })
}

fn alerts(intent: &Intent, job: &str) -> Value {
    let rules: Vec<Value> = ALERT_RULES
        .iter()
        .filter(|r| intent.has_component(r.component))
        .map(|r| {
            json!({
                "alert": r.alert,
                "expr": r.expr.replace("{job}", job),
                "for": r.duration,
                "labels": { "severity": r.severity, "component": r.component.as_str() },
                "annotations": { "summary": r.summary.replace("{job}", job) },
            })
        })
        .collect();

    json!({ "groups": [{ "name": format!("{}-alerts", job), "rules": rules }] })
}

fn dashboard(intent: &Intent, job: &str) -> Value {
    let mut panels = vec![panel(1, "Targets up", &format!("up{{job=\"{}\"}}", job))];
    if intent.has_component(Component::Compute) {
        panels.push(panel(
            2,
            "CPU",
            &format!("rate(process_cpu_seconds_total{{job=\"{}\"}}[5m])", job),
        ));
    }
    if intent.has_component(Component::Networking) {
        panels.push(panel(
            3,
            "Requests per second",
            &format!("sum(rate(http_requests_total{{job=\"{}\"}}[5m]))", job),
        ));
    }
    if intent.has_component(Component::Database) {
        panels.push(panel(4, "Database up", "up{job=~\"postgres|mysql|mongodb\"}"));
    }

    json!({
        "title": format!("{} overview", job),
        "uid": format!("{}-overview", job),
        "schemaVersion": 39,
        "time": { "from": "now-6h", "to": "now" },
        "panels": panels,
    })
}

fn panel(id: u32, title: &str, expr: &str) -> Value {
    json!({
        "id": id,
        "type": "timeseries",
        "title": title,
        "datasource": { "type": "prometheus" },
        "gridPos": { "h": 8, "w": 12, "x": ((id - 1) % 2) * 12, "y": ((id - 1) / 2) * 8 },
        "targets": [{ "expr": expr, "refId": "A" }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::fixtures::{analysis, intent, options, web_analysis};
    use crate::intent::Environment;

    fn generate(analysis: &Analysis, components: &[Component]) -> ArtifactSet {
        let intent = intent(&[Environment::Dev], components);
        MonitoringGenerator::new()
            .generate(analysis, &intent, &options())
            .unwrap()
    }

    #[test]
    fn test_scrape_targets_from_endpoints() {
        let set = generate(&web_analysis(), &Component::DEFAULTS);
        let config: serde_yaml::Value =
            serde_yaml::from_str(&set.get("monitoring/prometheus.yml").unwrap().content).unwrap();

        let scrape = config["scrape_configs"].as_sequence().unwrap();
        assert_eq!(scrape[0]["job_name"].as_str(), Some("storefront"));
        assert_eq!(scrape[0]["static_configs"][0]["targets"][0].as_str(), Some("app:3000"));

        let jobs: Vec<&str> = scrape.iter().filter_map(|s| s["job_name"].as_str()).collect();
        assert!(jobs.contains(&"postgres"));
        assert!(jobs.contains(&"redis"));
    }

    #[test]
    fn test_default_target_without_endpoints() {
        let set = generate(&analysis(), &Component::DEFAULTS);
        assert!(set.get("monitoring/prometheus.yml").unwrap().content.contains("app:8080"));
    }

    #[test]
    fn test_alert_rules_follow_components() {
        let set = generate(&analysis(), &[Component::Compute, Component::Database]);
        let alerts: serde_yaml::Value =
            serde_yaml::from_str(&set.get("monitoring/alerts.yml").unwrap().content).unwrap();
        let names: Vec<&str> = alerts["groups"][0]["rules"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|r| r["alert"].as_str())
            .collect();

        assert_eq!(names, vec!["InstanceDown", "HighCpuUsage", "DatabaseDown"]);
        assert_eq!(
            alerts["groups"][0]["rules"][0]["expr"].as_str(),
            Some("up{job=\"storefront\"} == 0")
        );
        assert_eq!(
            alerts["groups"][0]["rules"][2]["labels"]["component"].as_str(),
            Some("database")
        );
    }

    #[test]
    fn test_dashboard_is_plain_json() {
        let set = generate(&analysis(), &Component::DEFAULTS);
        let content = &set.get("monitoring/dashboard.json").unwrap().content;
        let dashboard: Value = serde_json::from_str(content).unwrap();

        assert_eq!(dashboard["uid"], "storefront-overview");
        // Targets, CPU, Requests
        assert_eq!(dashboard["panels"].as_array().unwrap().len(), 3);
        assert!(!content.contains("Generated by infrakit"));
    }
}
