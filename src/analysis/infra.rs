//! Existing infrastructure tooling in the project tree

use super::ports::COMPOSE_FILES;
use super::types::InfraFlags;
use crate::fs::FileSystem;
use std::path::Path;

/// Directory levels below the root that the walk descends
pub const WALK_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tooling {
    ContainerBuild,
    Orchestration,
    Provisioning,
    Ci,
}

const ORCHESTRATION_DIRS: &[&str] = &["k8s", "kubernetes", "manifests", "helm", "charts", "deploy"];

const CI_FILES: &[&str] = &[
    ".gitlab-ci.yml",
    "Jenkinsfile",
    "azure-pipelines.yml",
    "bitbucket-pipelines.yml",
    ".travis.yml",
    ".drone.yml",
];

fn classify(relative: &Path) -> Option<Tooling> {
    let name = relative.file_name()?.to_str()?;
    let parents: Vec<&str> = relative
        .parent()
        .map(|p| p.iter().filter_map(|c| c.to_str()).collect())
        .unwrap_or_default();
    let is_yaml = name.ends_with(".yml") || name.ends_with(".yaml");

    if name == "Dockerfile"
        || name == "Containerfile"
        || name.starts_with("Dockerfile.")
        || name.ends_with(".dockerfile")
    {
        return Some(Tooling::ContainerBuild);
    }

    if name.ends_with(".tf")
        || name.ends_with(".tf.json")
        || name.ends_with(".bicep")
        || name == "Pulumi.yaml"
        || name == "cdk.json"
        || name == "serverless.yml"
        || name == "serverless.yaml"
    {
        return Some(Tooling::Provisioning);
    }

    if CI_FILES.contains(&name)
        || (is_yaml && parents.starts_with(&[".github", "workflows"]))
        || (name == "config.yml" && parents.first() == Some(&".circleci"))
    {
        return Some(Tooling::Ci);
    }

    if COMPOSE_FILES.contains(&name)
        || name == "Chart.yaml"
        || name == "kustomization.yaml"
        || name == "kustomization.yml"
        || name == "skaffold.yaml"
        || (is_yaml && parents.iter().any(|p| ORCHESTRATION_DIRS.contains(p)))
    {
        return Some(Tooling::Orchestration);
    }

    None
}

pub fn detect_infra(fs: &dyn FileSystem, root: &Path) -> InfraFlags {
    let mut flags = InfraFlags::default();

    for path in fs.walk_files(root, WALK_DEPTH) {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let Some(tooling) = classify(relative) else {
            continue;
        };
        let flag = match tooling {
            Tooling::ContainerBuild => &mut flags.has_container_build,
            Tooling::Orchestration => &mut flags.has_orchestration,
            Tooling::Provisioning => &mut flags.has_provisioning_code,
            Tooling::Ci => &mut flags.has_ci,
        };
        *flag = true;
        flags.evidence.push(relative.to_string_lossy().into_owned());
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use yare::parameterized;

    #[parameterized(
        dockerfile = { "Dockerfile", Some(Tooling::ContainerBuild) },
        dockerfile_variant = { "docker/Dockerfile.prod", Some(Tooling::ContainerBuild) },
        containerfile = { "Containerfile", Some(Tooling::ContainerBuild) },
        terraform = { "infra/main.tf", Some(Tooling::Provisioning) },
        pulumi = { "Pulumi.yaml", Some(Tooling::Provisioning) },
        cdk = { "cdk.json", Some(Tooling::Provisioning) },
        github = { ".github/workflows/ci.yml", Some(Tooling::Ci) },
        gitlab = { ".gitlab-ci.yml", Some(Tooling::Ci) },
        circle = { ".circleci/config.yml", Some(Tooling::Ci) },
        jenkins = { "Jenkinsfile", Some(Tooling::Ci) },
        compose = { "docker-compose.yml", Some(Tooling::Orchestration) },
        k8s = { "k8s/deployment.yaml", Some(Tooling::Orchestration) },
        chart = { "charts/api/Chart.yaml", Some(Tooling::Orchestration) },
        readme = { "README.md", None },
        random_yaml = { "config/settings.yaml", None },
    )]
    fn test_classify(path: &str, expected: Option<Tooling>) {
        assert_eq!(classify(Path::new(path)), expected);
    }

    #[test]
    fn test_detect_infra_flags_and_evidence() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/Dockerfile", "FROM node:20");
        fs.add_file("/mock/.github/workflows/ci.yml", "on: push");
        fs.add_file("/mock/src/index.js", "");

        let flags = detect_infra(&fs, Path::new("/mock"));
        assert!(flags.has_container_build);
        assert!(flags.has_ci);
        assert!(!flags.has_orchestration);
        assert!(!flags.has_provisioning_code);
        assert_eq!(flags.evidence, vec![".github/workflows/ci.yml", "Dockerfile"]);
    }

    #[test]
    fn test_terraform_in_node_modules_ignored() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/node_modules/pkg/main.tf", "");

        let flags = detect_infra(&fs, Path::new("/mock"));
        assert!(!flags.has_provisioning_code);
    }
}
