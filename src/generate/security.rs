//! Security policy artifacts: deployer IAM policies, conftest rules, PodSecurity labels

use super::artifact::{ArtifactSet, GenerateError, GenerateOptions};
use super::builder::{json as json_text, yaml, Document};
use super::family::ArtifactFamily;
use super::registry::ArtifactGenerator;
use crate::analysis::Analysis;
use crate::intent::{Component, Environment, Intent};
use serde_json::{json, Value};

const FAMILY: ArtifactFamily = ArtifactFamily::SecurityPolicy;

/// `(component, sid, actions)`; a component's actions are granted only when it is selected
const DEPLOYER_ACTIONS: &[(Component, &str, &[&str])] = &[
    (
        Component::Networking,
        "Network",
        &[
            "ec2:CreateVpc",
            "ec2:CreateSubnet",
            "ec2:CreateInternetGateway",
            "ec2:AttachInternetGateway",
            "ec2:CreateRouteTable",
            "ec2:CreateRoute",
            "ec2:AssociateRouteTable",
            "ec2:CreateSecurityGroup",
            "ec2:AuthorizeSecurityGroupIngress",
            "ec2:AuthorizeSecurityGroupEgress",
            "ec2:CreateTags",
            "ec2:Describe*",
        ],
    ),
    (
        Component::Compute,
        "Compute",
        &[
            "ecs:CreateCluster",
            "ecs:CreateService",
            "ecs:UpdateService",
            "ecs:RegisterTaskDefinition",
            "ecs:DeregisterTaskDefinition",
            "ecs:Describe*",
            "ecr:GetAuthorizationToken",
            "ecr:BatchGetImage",
            "ecr:PutImage",
            "application-autoscaling:*",
            "iam:PassRole",
        ],
    ),
    (
        Component::Storage,
        "Storage",
        &[
            "s3:CreateBucket",
            "s3:PutBucketVersioning",
            "s3:PutBucketPublicAccessBlock",
            "s3:PutEncryptionConfiguration",
            "s3:PutLifecycleConfiguration",
            "s3:PutBucketTagging",
            "s3:GetBucket*",
            "s3:ListBucket",
        ],
    ),
    (
        Component::Database,
        "Database",
        &[
            "rds:CreateDBInstance",
            "rds:ModifyDBInstance",
            "rds:CreateDBSubnetGroup",
            "rds:AddTagsToResource",
            "rds:Describe*",
            "secretsmanager:CreateSecret",
            "secretsmanager:DescribeSecret",
        ],
    ),
    (
        Component::Monitoring,
        "Monitoring",
        &[
            "cloudwatch:PutMetricAlarm",
            "cloudwatch:DescribeAlarms",
            "logs:CreateLogGroup",
            "logs:PutRetentionPolicy",
            "logs:DescribeLogGroups",
            "sns:CreateTopic",
            "sns:GetTopicAttributes",
        ],
    ),
];

const DOCKERFILE_REGO: &str = r#"package main

import rego.v1

deny contains msg if {
	input[i].Cmd == "from"
	image := input[i].Value[0]
	endswith(image, ":latest")
	msg := sprintf("line %d: pin base image %s to a version", [i, image])
}

deny contains msg if {
	not any_user
	msg := "the final stage must switch to a non-root USER"
}

deny contains msg if {
	input[i].Cmd == "user"
	input[i].Value[0] in {"root", "0"}
	msg := sprintf("line %d: do not run as root", [i])
}

deny contains msg if {
	input[i].Cmd == "add"
	startswith(input[i].Value[0], "http")
	msg := sprintf("line %d: use curl in a RUN step instead of ADD with a URL", [i])
}

warn contains msg if {
	not any_healthcheck
	msg := "consider a HEALTHCHECK instruction"
}

any_user if input[_].Cmd == "user"

any_healthcheck if input[_].Cmd == "healthcheck"
"#;

#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityGenerator;

impl SecurityGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactGenerator for SecurityGenerator {
    fn family(&self) -> ArtifactFamily {
        FAMILY
    }

    fn generate(
        &self,
        analysis: &Analysis,
        intent: &Intent,
        options: &GenerateOptions,
    ) -> Result<ArtifactSet, GenerateError> {
        let slug = analysis.slug();
        let mut set = ArtifactSet::new(FAMILY);

        for environment in intent.environments() {
            let path = format!("security/iam/{}-deployer.json", environment.as_str());
            let policy = json_text(FAMILY, &path, &deployer_policy(&slug, *environment, intent, options))?;
            set.push(
                path,
                Document::uncommented().section("policy", policy).render(),
            );
        }

        set.push(
            "security/policies/dockerfile.rego",
            Document::hash_commented()
                .provenance(&options.generated_at)
                .section("rules", DOCKERFILE_REGO)
                .render(),
        );

        let pod_security = yaml(FAMILY, "security/pod-security.yaml", &pod_security(&slug, intent))?;
        set.push(
            "security/pod-security.yaml",
            Document::hash_commented()
                .provenance(&options.generated_at)
                .section("namespace", pod_security)
                .render(),
        );

        Ok(set)
    }
}

fn deployer_policy(slug: &str, environment: Environment, intent: &Intent, options: &GenerateOptions) -> Value {
    let state_bucket = format!("arn:aws:s3:::{}-terraform-state", slug);
    let mut statements = vec![json!({
        "Sid": "TerraformState",
        "Effect": "Allow",
        "Action": ["s3:GetObject", "s3:PutObject", "s3:DeleteObject"],
        "Resource": format!("{}/{}/*", state_bucket, environment.as_str()),
    })];

    for (component, sid, actions) in DEPLOYER_ACTIONS {
        if !intent.has_component(*component) {
            continue;
        }
        statements.push(json!({
            "Sid": sid,
            "Effect": "Allow",
            "Action": actions,
            "Resource": "*",
            "Condition": {
                "StringEquals": {
                    "aws:RequestedRegion": options.region,
                    "aws:ResourceTag/Environment": environment.as_str(),
                },
            },
        }));
    }

    json!({ "Version": "2012-10-17", "Statement": statements })
}

fn pod_security(slug: &str, intent: &Intent) -> Value {
    let enforce = if intent.environments().contains(&Environment::Prod) {
        "restricted"
    } else {
        "baseline"
    };
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": slug,
            "labels": {
                "pod-security.kubernetes.io/enforce": enforce,
                "pod-security.kubernetes.io/enforce-version": "latest",
                "pod-security.kubernetes.io/audit": "restricted",
                "pod-security.kubernetes.io/warn": "restricted",
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::fixtures::{analysis, intent, options};

    fn generate(environments: &[Environment], components: &[Component]) -> ArtifactSet {
        let intent = intent(environments, components);
        SecurityGenerator::new()
            .generate(&analysis(), &intent, &options())
            .unwrap()
    }

    fn sids(set: &ArtifactSet, path: &str) -> Vec<String> {
        let policy: Value = serde_json::from_str(&set.get(path).unwrap().content).unwrap();
        policy["Statement"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|s| s["Sid"].as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_one_policy_per_environment() {
        let set = generate(&[Environment::Dev, Environment::Prod], &Component::DEFAULTS);
        assert!(set.contains("security/iam/dev-deployer.json"));
        assert!(set.contains("security/iam/prod-deployer.json"));
        assert!(!set.contains("security/iam/staging-deployer.json"));
    }

    #[test]
    fn test_actions_limited_to_selected_components() {
        let set = generate(&[Environment::Dev], &[Component::Storage]);
        assert_eq!(sids(&set, "security/iam/dev-deployer.json"), vec!["TerraformState", "Storage"]);

        let policy = &set.get("security/iam/dev-deployer.json").unwrap().content;
        assert!(policy.contains("arn:aws:s3:::storefront-terraform-state/dev/*"));
        assert!(!policy.contains("rds:CreateDBInstance"));
    }

    #[test]
    fn test_rego_and_pod_security() {
        let set = generate(&[Environment::Prod], &Component::DEFAULTS);

        let rego = &set.get("security/policies/dockerfile.rego").unwrap().content;
        assert!(rego.starts_with("# Generated by infrakit at"));
        assert!(rego.contains("package main"));

        let ns: serde_yaml::Value =
            serde_yaml::from_str(&set.get("security/pod-security.yaml").unwrap().content).unwrap();
        assert_eq!(
            ns["metadata"]["labels"]["pod-security.kubernetes.io/enforce"].as_str(),
            Some("restricted")
        );

        let dev_only = generate(&[Environment::Dev], &Component::DEFAULTS);
        assert!(dev_only
            .get("security/pod-security.yaml")
            .unwrap()
            .content
            .contains("pod-security.kubernetes.io/enforce: baseline"));
    }
}
