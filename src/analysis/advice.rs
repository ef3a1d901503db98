//! Advisory recommendations and suggested next commands

use super::types::{Analysis, Recommendation};

/// Resource count above which monitoring is recommended
pub const MONITORING_THRESHOLD: usize = 10;

struct AdviceRule {
    id: &'static str,
    applies: fn(&Analysis) -> bool,
    message: fn(&Analysis) -> String,
    next_action: Option<&'static str>,
}

fn service_names(analysis: &Analysis) -> String {
    analysis
        .services()
        .map(|s| s.service())
        .collect::<Vec<_>>()
        .join(", ")
}

const RULES: &[AdviceRule] = &[
    AdviceRule {
        id: "containerize",
        applies: |a| !a.infra.has_container_build,
        message: |_| {
            "No container build found; add a Dockerfile so the project can run on any container platform".to_string()
        },
        next_action: Some("infrakit generate --family container-build"),
    },
    AdviceRule {
        id: "ci-pipeline",
        applies: |a| !a.infra.has_ci,
        message: |_| "No CI configuration found; add a pipeline that builds and tests every change".to_string(),
        next_action: Some("infrakit generate --family ci"),
    },
    AdviceRule {
        id: "codify-infrastructure",
        applies: |a| a.total_resources() > 0 && !a.infra.has_provisioning_code,
        message: |a| {
            format!(
                "{} cloud resource(s) exist but no provisioning code was found; import them into Terraform",
                a.total_resources()
            )
        },
        next_action: Some("infrakit generate --family provisioning --import-existing"),
    },
    AdviceRule {
        id: "monitoring",
        applies: |a| a.total_resources() > MONITORING_THRESHOLD,
        message: |a| {
            format!(
                "{} cloud resources detected; add metrics scraping and alerting",
                a.total_resources()
            )
        },
        next_action: Some("infrakit generate --family monitoring"),
    },
    AdviceRule {
        id: "managed-services",
        applies: |a| a.services().next().is_some() && !a.infra.has_orchestration,
        message: |a| {
            format!(
                "Detected data services ({}) without orchestration; provision managed equivalents per environment",
                service_names(a)
            )
        },
        next_action: Some("infrakit generate --family orchestration"),
    },
];

/// Applies every rule in table order
pub fn advise(analysis: &Analysis) -> (Vec<Recommendation>, Vec<String>) {
    let mut recommendations = Vec::new();
    let mut next_actions = Vec::new();

    for rule in RULES.iter().filter(|r| (r.applies)(analysis)) {
        recommendations.push(Recommendation {
            id: rule.id.to_string(),
            message: (rule.message)(analysis),
        });
        if let Some(action) = rule.next_action {
            next_actions.push(action.to_string());
        }
    }
    next_actions.push("infrakit interpret --goal \"<describe the environments you need>\"".to_string());

    (recommendations, next_actions)
}
