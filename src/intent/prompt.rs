//! Prompt and context for the recommendation call

use crate::analysis::Analysis;
use serde_json::{json, Value};

pub const INTENT_INSTRUCTIONS: &str = r#"You are an infrastructure planning assistant. Translate an operator's goal into a deployment intent for the project described in the context.

Reply with exactly one JSON object and nothing else:
{
  "environments": ["dev" | "staging" | "prod", ...],
  "components": ["compute" | "storage" | "networking" | "database" | "monitoring" | "ci", ...],
  "specifications": { "<component>": "<one-line sizing or configuration note>" },
  "artifact_family": "provisioning" | "orchestration" | "container-build" | "ci" | "monitoring" | "security-policy",
  "summary": "<one sentence>"
}

Rules:
- Only use the listed values
- Include "database" when the context lists a database service
- Prefer the smallest set of components that satisfies the goal"#;

/// Instructions plus the goal, sent as the recommendation prompt
pub fn build_prompt(goal: &str) -> String {
    let goal = goal.trim();
    let goal = if goal.is_empty() {
        "(no goal given; propose a sensible default)"
    } else {
        goal
    };
    format!("{}\n\nOperator goal:\n{}", INTENT_INSTRUCTIONS, goal)
}

/// Compact project summary sent alongside the prompt
pub fn analysis_context(analysis: &Analysis) -> Value {
    let services: Vec<Value> = analysis
        .services()
        .map(|s| json!({ "category": s.category(), "service": s.service() }))
        .collect();

    json!({
        "project": analysis.project_name,
        "project_type": analysis.project_type,
        "tech_stack": analysis.tech_stack,
        "package_manager": analysis.package_manager,
        "services": services,
        "ports": analysis.declared_ports(),
        "existing_tooling": {
            "container_build": analysis.infra.has_container_build,
            "orchestration": analysis.infra.has_orchestration,
            "provisioning": analysis.infra.has_provisioning_code,
            "ci": analysis.infra.has_ci,
        },
        "cloud_resources": analysis.total_resources(),
    })
}
