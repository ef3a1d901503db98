//! Provisioning artifacts: Terraform for AWS

mod hcl;
mod modules;

use super::artifact::{ArtifactSet, GenerateError, GenerateOptions};
use super::builder::Document;
use super::family::ArtifactFamily;
use super::graph::{self, Module};
use super::registry::ArtifactGenerator;
use super::sizing::Sizing;
use crate::analysis::{Analysis, InfrastructureSummary, ServiceCategory};
use crate::intent::{Environment, Intent};
use crate::inventory::{CloudResource, ResourceCategory};
use hcl::{identifier, map, quote, Block};
use std::collections::BTreeSet;
use tracing::debug;

const ROOT: &str = "terraform";
const DEFAULT_CONTAINER_PORT: u16 = 8080;

#[derive(Debug, Default, Clone, Copy)]
pub struct TerraformGenerator;

impl TerraformGenerator {
    pub fn new() -> Self {
        Self
    }
}

/// Values shared by every environment
struct Project {
    slug: String,
    container_port: u16,
    db_engine: &'static str,
    modules: Vec<Module>,
}

impl Project {
    fn from(analysis: &Analysis, intent: &Intent) -> Self {
        Self {
            slug: analysis.slug(),
            container_port: analysis.app_port().unwrap_or(DEFAULT_CONTAINER_PORT),
            db_engine: database_engine(analysis),
            modules: graph::resolve(intent.components()),
        }
    }

    fn has(&self, module: Module) -> bool {
        self.modules.contains(&module)
    }
}

impl ArtifactGenerator for TerraformGenerator {
    fn family(&self) -> ArtifactFamily {
        ArtifactFamily::Provisioning
    }

    fn generate(
        &self,
        analysis: &Analysis,
        intent: &Intent,
        options: &GenerateOptions,
    ) -> Result<ArtifactSet, GenerateError> {
        let project = Project::from(analysis, intent);
        let mut set = ArtifactSet::new(ArtifactFamily::Provisioning);
        let mut emitted: BTreeSet<Module> = BTreeSet::new();

        debug!(modules = ?project.modules, "Resolved provisioning modules");

        for environment in intent.environments() {
            for module in &project.modules {
                if emitted.insert(*module) {
                    push_module(&mut set, *module, options);
                }
            }
            push_environment(&mut set, &project, *environment, options);
        }

        if options.import_existing {
            if let Some(infrastructure) = &analysis.infrastructure {
                push_imports(&mut set, infrastructure, options);
            }
        }

        Ok(set)
    }
}

fn push_module(set: &mut ArtifactSet, module: Module, options: &GenerateOptions) {
    let source = modules::source(module);
    let files = [
        ("main.tf", source.main),
        ("variables.tf", source.variables),
        ("outputs.tf", source.outputs),
    ];
    for (file, body) in files {
        let doc = Document::hash_commented()
            .provenance(&options.generated_at)
            .section("body", body);
        set.push(format!("{}/modules/{}/{}", ROOT, module.name(), file), doc.render());
    }
}

fn push_environment(
    set: &mut ArtifactSet,
    project: &Project,
    environment: Environment,
    options: &GenerateOptions,
) {
    let sizing = Sizing::for_environment(environment);
    let dir = format!("{}/environments/{}", ROOT, environment.as_str());

    set.push(format!("{}/versions.tf", dir), versions_tf(project, environment, options));
    set.push(format!("{}/main.tf", dir), main_tf(project, environment, options));
    set.push(format!("{}/variables.tf", dir), variables_tf(project, options));
    set.push(
        format!("{}/terraform.tfvars", dir),
        tfvars(project, environment, &sizing, options),
    );
    set.push(format!("{}/outputs.tf", dir), outputs_tf(project, options));
}

fn versions_tf(project: &Project, environment: Environment, options: &GenerateOptions) -> String {
    let terraform = Block::new("terraform")
        .attr("required_version", quote(">= 1.5.0"))
        .nested(
            "required_providers {\n  aws = {\n    source  = \"hashicorp/aws\"\n    version = \"~> 5.0\"\n  }\n}",
        )
        .nested(
            &Block::new("backend \"s3\"")
                .group([
                    ("bucket", quote(&format!("{}-terraform-state", project.slug))),
                    ("key", quote(&format!("{}/terraform.tfstate", environment.as_str()))),
                    ("region", quote(&options.region)),
                ])
                .render(),
        );

    let provider = Block::new("provider \"aws\"")
        .attr("region", "var.region".to_string())
        .nested("default_tags {\n  tags = local.tags\n}");

    Document::hash_commented()
        .provenance(&options.generated_at)
        .section("terraform", terraform.render())
        .section("provider", provider.render())
        .render()
}

fn main_tf(project: &Project, environment: Environment, options: &GenerateOptions) -> String {
    let tags = map(
        &[
            ("Project", quote(&project.slug)),
            ("Environment", quote(environment.as_str())),
            ("ManagedBy", quote("terraform")),
        ],
        2,
    );
    let locals = Block::new("locals").group([
        ("name", quote(&format!("{}-{}", project.slug, environment.as_str()))),
        ("tags", tags),
    ]);

    let mut doc = Document::hash_commented()
        .provenance(&options.generated_at)
        .section("locals", locals.render());
    for module in &project.modules {
        doc = doc.section(
            format!("module.{}", module.name()),
            module_block(project, *module, environment).render(),
        );
    }
    doc.render()
}

fn module_block(project: &Project, module: Module, environment: Environment) -> Block {
    let block = Block::new(format!("module \"{}\"", module.name()))
        .attr("source", quote(&format!("../../modules/{}", module.name())));

    let name = ("name", "local.name".to_string());
    let tags = ("tags", "local.tags".to_string());

    let inputs: Vec<(&str, String)> = match module {
        Module::Network => vec![name, ("cidr_block", "var.vpc_cidr".into()), tags],
        Module::Compute => vec![
            name,
            ("vpc_id", "module.network.vpc_id".into()),
            ("subnet_ids", "module.network.public_subnet_ids".into()),
            ("image", "var.image".into()),
            ("container_port", "var.container_port".into()),
            ("cpu", "var.cpu".into()),
            ("memory", "var.memory".into()),
            ("desired_count", "var.desired_count".into()),
            ("max_count", "var.max_count".into()),
            ("autoscaling_enabled", "var.autoscaling_enabled".into()),
            tags,
        ],
        Module::Storage => vec![
            name,
            ("retention_days", "var.retention_days".into()),
            ("force_destroy", (environment == Environment::Dev).to_string()),
            tags,
        ],
        Module::Database => vec![
            name,
            ("vpc_id", "module.network.vpc_id".into()),
            ("subnet_ids", "module.network.private_subnet_ids".into()),
            ("app_security_group_id", "module.compute.security_group_id".into()),
            ("engine", "var.db_engine".into()),
            ("instance_class", "var.db_instance_class".into()),
            ("allocated_storage", "var.db_allocated_storage".into()),
            ("multi_az", "var.db_multi_az".into()),
            ("backup_retention_days", "var.retention_days".into()),
            tags,
        ],
        Module::Monitoring => {
            let mut inputs = vec![name, ("retention_days", "var.retention_days".into())];
            for dependency in graph::dependencies_within(Module::Monitoring, &project.modules) {
                match dependency {
                    Module::Compute => {
                        inputs.push(("service_alarm_enabled", "true".into()));
                        inputs.push(("cluster_name", "module.compute.cluster_name".into()));
                        inputs.push(("service_name", "module.compute.service_name".into()));
                    }
                    Module::Database => {
                        inputs.push(("database_alarm_enabled", "true".into()));
                        inputs.push(("db_instance_id", "module.database.db_instance_id".into()));
                    }
                    Module::Storage => {
                        inputs.push(("bucket_name", "module.storage.bucket_name".into()))
                    }
                    Module::Network | Module::Monitoring => {}
                }
            }
            inputs.push(tags);
            inputs
        }
    };

    block.group(inputs)
}

/// Root variables: `(name, type)` in declaration order
fn root_variables(project: &Project) -> Vec<(&'static str, &'static str)> {
    let mut vars = vec![("region", "string")];
    if project.has(Module::Network) {
        vars.push(("vpc_cidr", "string"));
    }
    if project.has(Module::Compute) {
        vars.extend([
            ("image", "string"),
            ("container_port", "number"),
            ("cpu", "number"),
            ("memory", "number"),
            ("desired_count", "number"),
            ("max_count", "number"),
            ("autoscaling_enabled", "bool"),
        ]);
    }
    if project.has(Module::Storage) || project.has(Module::Database) || project.has(Module::Monitoring) {
        vars.push(("retention_days", "number"));
    }
    if project.has(Module::Database) {
        vars.extend([
            ("db_engine", "string"),
            ("db_instance_class", "string"),
            ("db_allocated_storage", "number"),
            ("db_multi_az", "bool"),
        ]);
    }
    vars
}

fn variables_tf(project: &Project, options: &GenerateOptions) -> String {
    let mut doc = Document::hash_commented().provenance(&options.generated_at);
    for (name, kind) in root_variables(project) {
        let block = Block::new(format!("variable \"{}\"", name)).attr("type", kind.to_string());
        doc = doc.section(name, block.render());
    }
    doc.render()
}

fn tfvars(project: &Project, environment: Environment, sizing: &Sizing, options: &GenerateOptions) -> String {
    let mut values: Vec<(&str, String)> = Vec::new();
    for (name, _) in root_variables(project) {
        let value = match name {
            "region" => quote(&options.region),
            "vpc_cidr" => quote(vpc_cidr(environment)),
            "image" => quote(&format!("{}:latest", project.slug)),
            "container_port" => project.container_port.to_string(),
            "cpu" => sizing.cpu.to_string(),
            "memory" => sizing.memory.to_string(),
            "desired_count" => sizing.min_units.to_string(),
            "max_count" => sizing.max_units.to_string(),
            "autoscaling_enabled" => sizing.autoscaling.to_string(),
            "retention_days" => sizing.retention_days.to_string(),
            "db_engine" => quote(project.db_engine),
            "db_instance_class" => quote(sizing.db_instance_class),
            "db_allocated_storage" => sizing.db_storage_gb.to_string(),
            "db_multi_az" => sizing.multi_az_database.to_string(),
            _ => continue,
        };
        values.push((name, value));
    }

    let width = values.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let body = values
        .iter()
        .map(|(k, v)| format!("{:width$} = {}", k, v, width = width))
        .collect::<Vec<_>>()
        .join("\n");

    Document::hash_commented()
        .provenance(&options.generated_at)
        .section("values", body)
        .render()
}

fn vpc_cidr(environment: Environment) -> &'static str {
    match environment {
        Environment::Dev => "10.10.0.0/16",
        Environment::Staging => "10.20.0.0/16",
        Environment::Prod => "10.30.0.0/16",
    }
}

fn outputs_tf(project: &Project, options: &GenerateOptions) -> String {
    let mut doc = Document::hash_commented().provenance(&options.generated_at);
    for module in &project.modules {
        let blocks: Vec<String> = module
            .outputs()
            .iter()
            .map(|output| {
                Block::new(format!("output \"{}_{}\"", module.name(), output))
                    .attr("value", format!("module.{}.{}", module.name(), output))
                    .render()
            })
            .collect();
        doc = doc.section(module.name(), blocks.join("\n\n"));
    }
    doc.render()
}

/// `kind.name`, suffixed `_2`, `_3`, ... when an earlier resource already took the address
fn unique_address(taken: &mut BTreeSet<String>, kind: &str, id: &str) -> String {
    let base = format!("{}.{}", kind, identifier(id));
    let mut address = base.clone();
    let mut n = 2;
    while !taken.insert(address.clone()) {
        address = format!("{}_{}", base, n);
        n += 1;
    }
    address
}

fn push_imports(set: &mut ArtifactSet, infrastructure: &InfrastructureSummary, options: &GenerateOptions) {
    // every imports/*.tf file lives in one module, so addresses are unique across categories
    let mut taken = BTreeSet::new();
    for summary in &infrastructure.categories {
        if summary.items.is_empty() {
            continue;
        }
        let mut items: Vec<&CloudResource> = summary.items.iter().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));

        let mut doc = Document::hash_commented().provenance(&options.generated_at);
        for resource in items {
            let kind = import_type(summary.category, resource);
            let label = resource.name.as_deref().unwrap_or(&resource.id);
            let block = Block::new("import").group([
                ("to", unique_address(&mut taken, &kind, &resource.id)),
                ("id", quote(&resource.id)),
            ]);
            doc = doc.section(
                resource.id.clone(),
                format!("# {} ({})\n{}", label, summary.category, block.render()),
            );
        }
        set.push(
            format!("{}/imports/{}.tf", ROOT, summary.category.as_str()),
            doc.render(),
        );
    }
}

fn import_type(category: ResourceCategory, resource: &CloudResource) -> String {
    if resource.kind.starts_with("aws_") {
        return resource.kind.clone();
    }
    match category {
        ResourceCategory::Compute => "aws_instance",
        ResourceCategory::Storage => "aws_s3_bucket",
        ResourceCategory::Database => "aws_db_instance",
        ResourceCategory::Network => "aws_vpc",
        ResourceCategory::Function => "aws_lambda_function",
    }
    .to_string()
}

fn database_engine(analysis: &Analysis) -> &'static str {
    if analysis
        .services_in(ServiceCategory::Database)
        .iter()
        .any(|s| s.service() == "mysql")
    {
        "mysql"
    } else {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CategorySummary, Endpoint, EndpointSource};
    use crate::generate::fixtures::{analysis, intent, options};
    use crate::intent::Component;

    fn generate(analysis: &Analysis, intent: &Intent, options: &GenerateOptions) -> ArtifactSet {
        TerraformGenerator::new()
            .generate(analysis, intent, options)
            .unwrap()
    }

    #[test]
    fn test_modules_emitted_once_before_first_environment() {
        let intent = intent(
            &[Environment::Dev, Environment::Prod],
            &[Component::Compute, Component::Database],
        );
        let set = generate(&analysis(), &intent, &options());

        let network = set.position("terraform/modules/network/main.tf").unwrap();
        let compute = set.position("terraform/modules/compute/main.tf").unwrap();
        let database = set.position("terraform/modules/database/main.tf").unwrap();
        let dev = set.position("terraform/environments/dev/versions.tf").unwrap();
        let prod = set.position("terraform/environments/prod/versions.tf").unwrap();

        assert!(network < compute && compute < database && database < dev && dev < prod);
        assert_eq!(
            set.paths().filter(|p| p.ends_with("modules/network/main.tf")).count(),
            1
        );
        assert!(!set.contains("terraform/modules/storage/main.tf"));
    }

    #[test]
    fn test_database_consumes_network_and_compute_outputs() {
        let intent = intent(&[Environment::Dev], &[Component::Database]);
        let set = generate(&analysis(), &intent, &options());
        let main = &set.get("terraform/environments/dev/main.tf").unwrap().content;

        assert!(main.contains("vpc_id                = module.network.vpc_id"));
        assert!(main.contains("subnet_ids            = module.network.private_subnet_ids"));
        assert!(main.contains("app_security_group_id = module.compute.security_group_id"));

        let network = main.find("module \"network\"").unwrap();
        let compute = main.find("module \"compute\"").unwrap();
        let database = main.find("module \"database\"").unwrap();
        assert!(network < compute && compute < database);
    }

    #[test]
    fn test_sizing_differs_per_environment() {
        let intent = intent(
            &[Environment::Dev, Environment::Prod],
            &[Component::Compute, Component::Database, Component::Storage],
        );
        let set = generate(&analysis(), &intent, &options());

        let dev = &set.get("terraform/environments/dev/terraform.tfvars").unwrap().content;
        let prod = &set.get("terraform/environments/prod/terraform.tfvars").unwrap().content;

        assert!(dev.contains("desired_count        = 1"));
        assert!(dev.contains("autoscaling_enabled  = false"));
        assert!(dev.contains("retention_days       = 7"));
        assert!(dev.contains("db_multi_az          = false"));

        assert!(prod.contains("desired_count        = 3"));
        assert!(prod.contains("max_count            = 6"));
        assert!(prod.contains("autoscaling_enabled  = true"));
        assert!(prod.contains("retention_days       = 30"));
        assert!(prod.contains("db_multi_az          = true"));
    }

    #[test]
    fn test_region_and_container_port_flow_into_values() {
        let mut analysis = analysis();
        analysis.endpoints.push(Endpoint {
            port: 3000,
            process: None,
            source: EndpointSource::Compose("app".to_string()),
        });
        let intent = intent(&[Environment::Dev], &[Component::Compute]);
        let options = options().with_region("eu-west-1");
        let set = generate(&analysis, &intent, &options);

        let tfvars = &set.get("terraform/environments/dev/terraform.tfvars").unwrap().content;
        assert!(tfvars.contains("\"eu-west-1\""));
        assert!(tfvars.contains("= 3000"));

        let versions = &set.get("terraform/environments/dev/versions.tf").unwrap().content;
        assert!(versions.contains("key    = \"dev/terraform.tfstate\""));
        assert!(versions.contains("version = \"~> 5.0\""));
    }

    #[test]
    fn test_monitoring_wires_selected_modules_only() {
        let intent = intent(&[Environment::Dev], &[Component::Monitoring, Component::Storage]);
        let set = generate(&analysis(), &intent, &options());
        let main = &set.get("terraform/environments/dev/main.tf").unwrap().content;

        assert!(main.contains("bucket_name    = module.storage.bucket_name"));
        assert!(!main.contains("module.compute.cluster_name"));
        assert!(!main.contains("alarm_enabled"));
    }

    #[test]
    fn test_monitoring_alarms_enabled_by_literal_flags() {
        let intent = intent(
            &[Environment::Prod],
            &[Component::Compute, Component::Networking, Component::Database, Component::Monitoring],
        );
        let set = generate(&analysis(), &intent, &options());
        let main = &set.get("terraform/environments/prod/main.tf").unwrap().content;
        let monitoring = &main[main.find("module \"monitoring\"").unwrap()..];

        assert_eq!(block_value(monitoring, "database_alarm_enabled").as_deref(), Some("true"));
        assert_eq!(block_value(monitoring, "service_alarm_enabled").as_deref(), Some("true"));
        assert_eq!(
            block_value(monitoring, "db_instance_id").as_deref(),
            Some("module.database.db_instance_id")
        );
    }

    fn block_value(block: &str, key: &str) -> Option<String> {
        block.lines().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            (k.trim() == key).then(|| v.trim().to_string())
        })
    }

    #[test]
    fn test_import_scaffolding_sorted_by_id() {
        let mut analysis = analysis();
        analysis.infrastructure = Some(InfrastructureSummary {
            account: "123456789012".to_string(),
            region: "us-east-1".to_string(),
            categories: vec![CategorySummary {
                category: ResourceCategory::Compute,
                count: 2,
                estimated_monthly_cost: 70.0,
                items: vec![
                    CloudResource::new("i-0bbb", "instance"),
                    CloudResource::new("i-0aaa", "aws_instance"),
                ],
                error: None,
            }],
            total_resources: 2,
            estimated_monthly_cost: 70.0,
        });
        let intent = intent(&[Environment::Dev], &[Component::Compute]);

        let without = generate(&analysis, &intent, &options());
        assert!(!without.contains("terraform/imports/compute.tf"));

        let set = generate(&analysis, &intent, &options().with_import_existing(true));
        let imports = &set.get("terraform/imports/compute.tf").unwrap().content;
        let first = imports.find("id = \"i-0aaa\"").unwrap();
        let second = imports.find("id = \"i-0bbb\"").unwrap();
        assert!(first < second);
        assert!(imports.contains("to = aws_instance.i_0aaa"));
        assert!(imports.contains("# i-0bbb (compute)"));
    }

    #[test]
    fn test_import_addresses_never_collide() {
        let mut analysis = analysis();
        let category = |category, items: Vec<CloudResource>| CategorySummary {
            category,
            count: items.len(),
            estimated_monthly_cost: 0.0,
            items,
            error: None,
        };
        analysis.infrastructure = Some(InfrastructureSummary {
            account: "123456789012".to_string(),
            region: "us-east-1".to_string(),
            categories: vec![
                category(
                    ResourceCategory::Compute,
                    vec![
                        CloudResource::new("i_0aaa", "aws_instance"),
                        CloudResource::new("i-0aaa", "aws_instance"),
                        CloudResource::new("I-0AAA", "aws_instance"),
                    ],
                ),
                category(ResourceCategory::Network, vec![CloudResource::new("i.0aaa", "aws_instance")]),
            ],
            total_resources: 4,
            estimated_monthly_cost: 0.0,
        });
        let intent = intent(&[Environment::Dev], &[Component::Compute]);
        let set = generate(&analysis, &intent, &options().with_import_existing(true));

        let compute = &set.get("terraform/imports/compute.tf").unwrap().content;
        let network = &set.get("terraform/imports/network.tf").unwrap().content;
        let addresses: Vec<&str> = compute
            .lines()
            .chain(network.lines())
            .filter_map(|line| line.trim().strip_prefix("to = "))
            .collect();

        assert_eq!(
            addresses,
            vec![
                "aws_instance.i_0aaa",
                "aws_instance.i_0aaa_2",
                "aws_instance.i_0aaa_3",
                "aws_instance.i_0aaa_4",
            ]
        );
    }

    #[test]
    fn test_output_is_deterministic() {
        let intent = intent(&[Environment::Dev, Environment::Staging], &Component::DEFAULTS);
        let a = generate(&analysis(), &intent, &options());
        let b = generate(&analysis(), &intent, &options());
        assert_eq!(a, b);
        assert!(a
            .get("terraform/environments/staging/main.tf")
            .unwrap()
            .content
            .starts_with("# Generated by infrakit at 2024-05-01T12:00:00Z\nlocals {"));
    }

    #[test]
    fn test_database_engine_follows_detected_service() {
        let mut analysis = analysis();
        assert_eq!(database_engine(&analysis), "postgres");
        analysis.databases = crate::analysis::DataService::new(
            ServiceCategory::Database,
            "mysql",
            crate::analysis::EvidenceSource::Dependency("mysql2".to_string()),
        )
        .into_iter()
        .collect();
        assert_eq!(database_engine(&analysis), "mysql");
    }
}
