//! CI artifacts: GitHub Actions build and deploy workflows

use super::artifact::{ArtifactSet, GenerateError, GenerateOptions};
use super::builder::{yaml, Document};
use super::family::ArtifactFamily;
use super::registry::ArtifactGenerator;
use super::toolchain::{toolchain, Recipe};
use crate::analysis::Analysis;
use crate::intent::{Environment, Intent};
use serde_json::{json, Map, Value};

const FAMILY: ArtifactFamily = ArtifactFamily::Ci;
const CI_PATH: &str = ".github/workflows/ci.yml";
const DEPLOY_PATH: &str = ".github/workflows/deploy.yml";

/// The GitHub environment that requires approval before its job runs
const GATED: Environment = Environment::Prod;

#[derive(Debug, Default, Clone, Copy)]
pub struct CiGenerator;

impl CiGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactGenerator for CiGenerator {
    fn family(&self) -> ArtifactFamily {
        FAMILY
    }

    fn generate(
        &self,
        analysis: &Analysis,
        intent: &Intent,
        options: &GenerateOptions,
    ) -> Result<ArtifactSet, GenerateError> {
        let mut set = ArtifactSet::new(FAMILY);
        set.push(CI_PATH, workflow(CI_PATH, &ci_workflow(analysis), options)?);
        set.push(
            DEPLOY_PATH,
            workflow(DEPLOY_PATH, &deploy_workflow(analysis, intent.environments()), options)?,
        );
        Ok(set)
    }
}

fn workflow(path: &str, value: &Value, options: &GenerateOptions) -> Result<String, GenerateError> {
    let body = yaml(FAMILY, path, value)?;
    Ok(Document::hash_commented()
        .provenance(&options.generated_at)
        .section("workflow", body)
        .render())
}

fn checkout() -> Value {
    json!({ "uses": "actions/checkout@v4" })
}

fn run(name: &str, command: &str) -> Value {
    json!({ "name": name, "run": command })
}

fn ci_workflow(analysis: &Analysis) -> Value {
    let mut jobs = Map::new();

    for ecosystem in analysis.ecosystems() {
        let tc = toolchain(ecosystem);
        let recipe = Recipe::resolve(ecosystem, analysis.package_manager, &analysis.slug());

        let mut setup = Map::new();
        setup.insert("uses".into(), json!(tc.setup_action));
        if !tc.setup_with.is_empty() {
            let with: Map<String, Value> = tc
                .setup_with
                .iter()
                .map(|(k, v)| (k.to_string(), json!(v)))
                .collect();
            setup.insert("with".into(), Value::Object(with));
        }

        let mut steps = vec![checkout(), Value::Object(setup)];
        if let Some(install) = &recipe.install_ci {
            steps.push(run("Install dependencies", install));
        }
        steps.push(run("Test", &recipe.test));

        jobs.insert(
            format!("build-{}", ecosystem.as_str()),
            json!({ "runs-on": "ubuntu-latest", "steps": steps }),
        );
    }

    if jobs.is_empty() {
        jobs.insert(
            "build".into(),
            json!({
                "runs-on": "ubuntu-latest",
                "steps": [checkout(), run("Build", "echo \"No build toolchain detected; add build steps here\"")],
            }),
        );
    }

    json!({
        "name": "CI",
        "on": { "push": { "branches": ["main"] }, "pull_request": {} },
        "jobs": jobs,
    })
}

fn deploy_workflow(analysis: &Analysis, environments: &[Environment]) -> Value {
    let mut jobs = Map::new();
    let mut previous: Option<String> = None;

    for environment in environments {
        let id = format!("deploy-{}", environment.as_str());
        let dir = format!("terraform/environments/{}", environment.as_str());

        let mut job = Map::new();
        job.insert("runs-on".into(), json!("ubuntu-latest"));
        if let Some(needs) = &previous {
            job.insert("needs".into(), json!(needs));
        }
        if *environment == GATED {
            job.insert(
                "environment".into(),
                json!({ "name": environment.as_str(), "url": format!("https://{}.example.com", analysis.slug()) }),
            );
        }
        job.insert(
            "concurrency".into(),
            json!({ "group": format!("deploy-{}", environment.as_str()), "cancel-in-progress": false }),
        );
        job.insert(
            "steps".into(),
            json!([
                checkout(),
                {
                    "uses": "aws-actions/configure-aws-credentials@v4",
                    "with": {
                        "role-to-assume": "${{ secrets.AWS_DEPLOY_ROLE_ARN }}",
                        "aws-region": "${{ vars.AWS_REGION }}",
                    },
                },
                { "uses": "hashicorp/setup-terraform@v3" },
                run("Terraform init", &format!("terraform -chdir={} init -input=false", dir)),
                run("Terraform apply", &format!("terraform -chdir={} apply -input=false -auto-approve", dir)),
            ]),
        );

        jobs.insert(id.clone(), Value::Object(job));
        previous = Some(id);
    }

    json!({
        "name": "Deploy",
        "on": { "push": { "branches": ["main"] }, "workflow_dispatch": {} },
        "permissions": { "id-token": "write", "contents": "read" },
        "jobs": jobs,
    })
}
