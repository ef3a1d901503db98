//! Per-manifest dependency parsing and package manager detection

use super::types::{Dependency, Ecosystem, PackageManager};
use crate::fs::FileSystem;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Lockfile or manifest → package manager. First present file wins.
const PACKAGE_MANAGER_RULES: &[(&str, PackageManager)] = &[
    ("bun.lockb", PackageManager::Bun),
    ("bun.lock", PackageManager::Bun),
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
    ("package-lock.json", PackageManager::Npm),
    ("poetry.lock", PackageManager::Poetry),
    ("Pipfile.lock", PackageManager::Pipenv),
    ("Pipfile", PackageManager::Pipenv),
    ("Cargo.lock", PackageManager::Cargo),
    ("Cargo.toml", PackageManager::Cargo),
    ("go.mod", PackageManager::Go),
    ("pom.xml", PackageManager::Maven),
    ("build.gradle", PackageManager::Gradle),
    ("build.gradle.kts", PackageManager::Gradle),
    ("Gemfile", PackageManager::Bundler),
    ("composer.json", PackageManager::Composer),
    ("requirements.txt", PackageManager::Pip),
    ("pyproject.toml", PackageManager::Pip),
    ("package.json", PackageManager::Npm),
];

/// What one manifest contributed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestData {
    pub name: Option<String>,
    pub dependencies: Vec<Dependency>,
}

/// Aggregate over every manifest that parsed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyScan {
    pub project_name: Option<String>,
    pub dependencies: Vec<Dependency>,
}

pub fn detect_package_manager(fs: &dyn FileSystem, root: &Path) -> Option<PackageManager> {
    for (file, manager) in PACKAGE_MANAGER_RULES {
        if fs.is_file(&root.join(file)) {
            return Some(*manager);
        }
    }

    let has_project_file = fs
        .read_dir(root)
        .map(|entries| {
            entries.iter().any(|e| {
                e.file_name().ends_with(".csproj") || e.file_name().ends_with(".sln")
            })
        })
        .unwrap_or(false);
    has_project_file.then_some(PackageManager::Dotnet)
}

/// Parses every manifest; a manifest that fails to read or parse is skipped with a warning.
///
/// The first manifest that names the project provides `project_name`. Dependencies are
/// de-duplicated by (ecosystem, name), keeping the first occurrence.
pub fn scan_manifests(fs: &dyn FileSystem, manifests: &[PathBuf]) -> DependencyScan {
    let mut scan = DependencyScan::default();
    let mut seen: HashSet<(Ecosystem, String)> = HashSet::new();

    for manifest in manifests {
        match parse_manifest(fs, manifest) {
            Ok(data) => {
                debug!(
                    manifest = %manifest.display(),
                    dependencies = data.dependencies.len(),
                    "Parsed manifest"
                );
                if scan.project_name.is_none() {
                    scan.project_name = data.name.filter(|n| !n.trim().is_empty());
                }
                for dep in data.dependencies {
                    if seen.insert((dep.ecosystem, dep.name.clone())) {
                        scan.dependencies.push(dep);
                    }
                }
            }
            Err(e) => {
                warn!(manifest = %manifest.display(), error = %e, "Skipping unparseable manifest");
            }
        }
    }

    scan
}

pub fn parse_manifest(fs: &dyn FileSystem, path: &Path) -> Result<ManifestData> {
    let content = fs
        .read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    match file_name {
        "package.json" => parse_package_json(&content),
        "composer.json" => parse_composer_json(&content),
        "requirements.txt" => parse_requirements_txt(&content),
        "pyproject.toml" => parse_pyproject(&content),
        "Pipfile" => parse_pipfile(&content),
        "setup.py" => parse_setup_py(&content),
        "Cargo.toml" => parse_cargo_toml(&content),
        "go.mod" => parse_go_mod(&content),
        "pom.xml" => parse_pom_xml(&content),
        "build.gradle" | "build.gradle.kts" => parse_gradle(&content),
        "Gemfile" => parse_gemfile(&content),
        name if name.ends_with(".csproj") => parse_csproj(&content),
        _ => Ok(ManifestData::default()),
    }
}

fn json_deps(
    value: &serde_json::Value,
    section: &str,
    ecosystem: Ecosystem,
    dev: bool,
    out: &mut Vec<Dependency>,
) {
    if let Some(map) = value.get(section).and_then(|d| d.as_object()) {
        for (name, version) in map {
            let dep = Dependency::new(name, ecosystem)
                .with_version(version.as_str().unwrap_or_default())
                .dev(dev);
            out.push(dep);
        }
    }
}

pub fn parse_package_json(content: &str) -> Result<ManifestData> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("Invalid package.json")?;
    let mut dependencies = Vec::new();
    json_deps(&value, "dependencies", Ecosystem::Node, false, &mut dependencies);
    json_deps(&value, "devDependencies", Ecosystem::Node, true, &mut dependencies);

    Ok(ManifestData {
        name: value.get("name").and_then(|n| n.as_str()).map(String::from),
        dependencies,
    })
}

pub fn parse_composer_json(content: &str) -> Result<ManifestData> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("Invalid composer.json")?;
    let mut dependencies = Vec::new();
    json_deps(&value, "require", Ecosystem::Php, false, &mut dependencies);
    json_deps(&value, "require-dev", Ecosystem::Php, true, &mut dependencies);
    dependencies.retain(|d| d.name != "php" && !d.name.starts_with("ext-"));

    Ok(ManifestData {
        name: value.get("name").and_then(|n| n.as_str()).map(String::from),
        dependencies,
    })
}

/// Splits a PEP 508 requirement into name and version specifier
fn split_requirement(spec: &str) -> Option<(String, String)> {
    let spec = spec.split(';').next()?.trim();
    let end = spec
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(spec.len());
    let name = &spec[..end];
    if name.is_empty() {
        return None;
    }
    let rest = spec[end..].trim();
    let version = match rest.strip_prefix('[') {
        Some(extras) => extras.split_once(']').map(|(_, v)| v).unwrap_or_default(),
        None => rest,
    };
    Some((name.to_ascii_lowercase(), version.trim().to_string()))
}

pub fn parse_requirements_txt(content: &str) -> Result<ManifestData> {
    let dependencies = content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter_map(split_requirement)
        .map(|(name, version)| Dependency::new(name, Ecosystem::Python).with_version(version))
        .collect();

    Ok(ManifestData {
        name: None,
        dependencies,
    })
}

fn toml_table_deps(
    table: Option<&toml::Value>,
    ecosystem: Ecosystem,
    dev: bool,
    out: &mut Vec<Dependency>,
) {
    let Some(table) = table.and_then(|t| t.as_table()) else {
        return;
    };
    for (name, value) in table {
        if ecosystem == Ecosystem::Python && name.eq_ignore_ascii_case("python") {
            continue;
        }
        let version = match value {
            toml::Value::String(v) => v.clone(),
            toml::Value::Table(t) => t
                .get("version")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };
        out.push(Dependency::new(name, ecosystem).with_version(version).dev(dev));
    }
}

pub fn parse_pyproject(content: &str) -> Result<ManifestData> {
    let value: toml::Value = toml::from_str(content).context("Invalid pyproject.toml")?;
    let mut dependencies = Vec::new();

    if let Some(list) = value
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        for (name, version) in list.iter().filter_map(|v| v.as_str()).filter_map(split_requirement) {
            dependencies.push(Dependency::new(name, Ecosystem::Python).with_version(version));
        }
    }

    let poetry = value.get("tool").and_then(|t| t.get("poetry"));
    if let Some(poetry) = poetry {
        toml_table_deps(poetry.get("dependencies"), Ecosystem::Python, false, &mut dependencies);
        toml_table_deps(poetry.get("dev-dependencies"), Ecosystem::Python, true, &mut dependencies);
        toml_table_deps(
            poetry
                .get("group")
                .and_then(|g| g.get("dev"))
                .and_then(|d| d.get("dependencies")),
            Ecosystem::Python,
            true,
            &mut dependencies,
        );
    }
    for dep in &mut dependencies {
        dep.name = dep.name.to_ascii_lowercase();
    }

    let name = value
        .get("project")
        .and_then(|p| p.get("name"))
        .or_else(|| poetry.and_then(|p| p.get("name")))
        .and_then(|n| n.as_str())
        .map(String::from);

    Ok(ManifestData { name, dependencies })
}

pub fn parse_pipfile(content: &str) -> Result<ManifestData> {
    let value: toml::Value = toml::from_str(content).context("Invalid Pipfile")?;
    let mut dependencies = Vec::new();
    toml_table_deps(value.get("packages"), Ecosystem::Python, false, &mut dependencies);
    toml_table_deps(value.get("dev-packages"), Ecosystem::Python, true, &mut dependencies);
    for dep in &mut dependencies {
        dep.name = dep.name.to_ascii_lowercase();
        if dep.version.as_deref() == Some("*") {
            dep.version = None;
        }
    }
    Ok(ManifestData {
        name: None,
        dependencies,
    })
}

pub fn parse_setup_py(content: &str) -> Result<ManifestData> {
    let block_re = Regex::new(r"(?s)install_requires\s*=\s*\[(.*?)\]")?;
    let item_re = Regex::new(r#"["']([^"']+)["']"#)?;
    let name_re = Regex::new(r#"name\s*=\s*["']([^"']+)["']"#)?;

    let mut dependencies = Vec::new();
    if let Some(block) = block_re.captures(content).and_then(|c| c.get(1)) {
        for cap in item_re.captures_iter(block.as_str()) {
            if let Some((name, version)) = split_requirement(&cap[1]) {
                dependencies.push(Dependency::new(name, Ecosystem::Python).with_version(version));
            }
        }
    }

    Ok(ManifestData {
        name: name_re.captures(content).map(|c| c[1].to_string()),
        dependencies,
    })
}

pub fn parse_cargo_toml(content: &str) -> Result<ManifestData> {
    let value: toml::Value = toml::from_str(content).context("Invalid Cargo.toml")?;
    let mut dependencies = Vec::new();
    toml_table_deps(value.get("dependencies"), Ecosystem::Rust, false, &mut dependencies);
    toml_table_deps(value.get("dev-dependencies"), Ecosystem::Rust, true, &mut dependencies);
    toml_table_deps(
        value.get("workspace").and_then(|w| w.get("dependencies")),
        Ecosystem::Rust,
        false,
        &mut dependencies,
    );

    Ok(ManifestData {
        name: value
            .get("package")
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(String::from),
        dependencies,
    })
}

pub fn parse_go_mod(content: &str) -> Result<ManifestData> {
    let mut name = None;
    let mut dependencies = Vec::new();
    let mut in_require = false;

    for line in content.lines() {
        let line = line.split("//").next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        if let Some(module) = line.strip_prefix("module ") {
            name = module.trim().rsplit('/').next().map(String::from);
            continue;
        }
        if line == "require (" {
            in_require = true;
            continue;
        }
        if in_require && line == ")" {
            in_require = false;
            continue;
        }

        let spec = if in_require {
            Some(line)
        } else {
            line.strip_prefix("require ")
        };
        if let Some(spec) = spec {
            let mut parts = spec.split_whitespace();
            if let Some(path) = parts.next() {
                let dep = Dependency::new(path, Ecosystem::Go)
                    .with_version(parts.next().unwrap_or_default());
                dependencies.push(dep);
            }
        }
    }

    Ok(ManifestData { name, dependencies })
}

pub fn parse_pom_xml(content: &str) -> Result<ManifestData> {
    let doc = roxmltree::Document::parse(content).context("Invalid pom.xml")?;
    let root = doc.root_element();

    let child_text = |node: roxmltree::Node, tag: &str| -> Option<String> {
        node.children()
            .find(|c| c.has_tag_name(tag))
            .and_then(|c| c.text())
            .map(|t| t.trim().to_string())
    };

    let mut dependencies = Vec::new();
    for dep in root.descendants().filter(|n| n.has_tag_name("dependency")) {
        let (Some(group), Some(artifact)) =
            (child_text(dep, "groupId"), child_text(dep, "artifactId"))
        else {
            continue;
        };
        let scope = child_text(dep, "scope").unwrap_or_default();
        let dependency = Dependency::new(format!("{}:{}", group, artifact), Ecosystem::Java)
            .with_version(child_text(dep, "version").unwrap_or_default())
            .dev(scope == "test");
        dependencies.push(dependency);
    }

    Ok(ManifestData {
        name: child_text(root, "artifactId"),
        dependencies,
    })
}

pub fn parse_gradle(content: &str) -> Result<ManifestData> {
    let dep_re = Regex::new(
        r#"(implementation|api|compileOnly|runtimeOnly|testImplementation|testRuntimeOnly)\s*\(?\s*["']([^:"']+):([^:"']+)(?::([^"']+))?["']"#,
    )?;

    let dependencies = dep_re
        .captures_iter(content)
        .map(|cap| {
            let configuration = &cap[1];
            Dependency::new(format!("{}:{}", &cap[2], &cap[3]), Ecosystem::Java)
                .with_version(cap.get(4).map(|m| m.as_str()).unwrap_or_default())
                .dev(configuration.starts_with("test"))
        })
        .collect();

    Ok(ManifestData {
        name: None,
        dependencies,
    })
}

pub fn parse_gemfile(content: &str) -> Result<ManifestData> {
    let gem_re = Regex::new(r#"^\s*gem\s+["']([^"']+)["'](?:\s*,\s*["']([^"']+)["'])?"#)?;
    let group_re = Regex::new(r"^\s*group\s+.*:(development|test)")?;

    let mut dependencies = Vec::new();
    let mut dev_depth = 0usize;
    for line in content.lines() {
        if group_re.is_match(line) {
            dev_depth += 1;
            continue;
        }
        if dev_depth > 0 && line.trim() == "end" {
            dev_depth -= 1;
            continue;
        }
        if let Some(cap) = gem_re.captures(line) {
            let dep = Dependency::new(&cap[1], Ecosystem::Ruby)
                .with_version(cap.get(2).map(|m| m.as_str()).unwrap_or_default())
                .dev(dev_depth > 0);
            dependencies.push(dep);
        }
    }

    Ok(ManifestData {
        name: None,
        dependencies,
    })
}

pub fn parse_csproj(content: &str) -> Result<ManifestData> {
    let doc = roxmltree::Document::parse(content).context("Invalid project file")?;
    let dependencies = doc
        .descendants()
        .filter(|n| n.has_tag_name("PackageReference"))
        .filter_map(|n| {
            let name = n.attribute("Include")?;
            Some(
                Dependency::new(name, Ecosystem::Dotnet)
                    .with_version(n.attribute("Version").unwrap_or_default()),
            )
        })
        .collect();

    Ok(ManifestData {
        name: None,
        dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_package_json() {
        let data = parse_package_json(
            r#"{
                "name": "shop",
                "dependencies": {"react": "^18.2.0", "express": "4.18.2"},
                "devDependencies": {"jest": "^29.0.0"}
            }"#,
        )
        .unwrap();

        assert_eq!(data.name.as_deref(), Some("shop"));
        assert_eq!(data.dependencies.len(), 3);
        let jest = data.dependencies.iter().find(|d| d.name == "jest").unwrap();
        assert!(jest.dev);
        let react = data.dependencies.iter().find(|d| d.name == "react").unwrap();
        assert_eq!(react.version.as_deref(), Some("^18.2.0"));
    }

    #[test]
    fn test_package_json_invalid() {
        assert!(parse_package_json("{ not json").is_err());
    }

    #[test]
    fn test_requirements_txt() {
        let data = parse_requirements_txt(
            "# deps\nDjango==4.2\npsycopg2-binary>=2.9 # db\n-r base.txt\ncelery[redis]==5.3\n\n",
        )
        .unwrap();
        let names: Vec<_> = data.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["django", "psycopg2-binary", "celery"]);
        assert_eq!(data.dependencies[0].version.as_deref(), Some("==4.2"));
        assert_eq!(data.dependencies[2].version.as_deref(), Some("==5.3"));
    }

    #[test]
    fn test_pyproject_pep621_and_poetry() {
        let data = parse_pyproject(
            r#"
[project]
name = "api"
dependencies = ["fastapi>=0.100", "asyncpg"]

[tool.poetry.dependencies]
python = "^3.11"
redis = "^5.0"

[tool.poetry.group.dev.dependencies]
pytest = "^7"
"#,
        )
        .unwrap();
        assert_eq!(data.name.as_deref(), Some("api"));
        let names: Vec<_> = data.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["fastapi", "asyncpg", "redis", "pytest"]);
        assert!(data.dependencies[3].dev);
    }

    #[test]
    fn test_cargo_toml() {
        let data = parse_cargo_toml(
            r#"
[package]
name = "svc"

[dependencies]
axum = "0.7"
sqlx = { version = "0.7", features = ["postgres"] }

[dev-dependencies]
tempfile = "3"
"#,
        )
        .unwrap();
        assert_eq!(data.name.as_deref(), Some("svc"));
        let sqlx = data.dependencies.iter().find(|d| d.name == "sqlx").unwrap();
        assert_eq!(sqlx.version.as_deref(), Some("0.7"));
        assert!(data.dependencies.iter().any(|d| d.name == "tempfile" && d.dev));
    }

    #[test]
    fn test_go_mod() {
        let data = parse_go_mod(
            "module github.com/acme/orders\n\ngo 1.21\n\nrequire (\n\tgithub.com/gin-gonic/gin v1.9.1\n\tgithub.com/lib/pq v1.10.9 // indirect\n)\n\nrequire github.com/redis/go-redis/v9 v9.0.5\n",
        )
        .unwrap();
        assert_eq!(data.name.as_deref(), Some("orders"));
        let names: Vec<_> = data.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "github.com/gin-gonic/gin",
                "github.com/lib/pq",
                "github.com/redis/go-redis/v9"
            ]
        );
    }

    #[test]
    fn test_pom_xml() {
        let data = parse_pom_xml(
            r#"<project>
  <artifactId>billing</artifactId>
  <dependencies>
    <dependency>
      <groupId>org.springframework.boot</groupId>
      <artifactId>spring-boot-starter-web</artifactId>
    </dependency>
    <dependency>
      <groupId>org.postgresql</groupId>
      <artifactId>postgresql</artifactId>
      <version>42.6.0</version>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>"#,
        )
        .unwrap();
        assert_eq!(data.name.as_deref(), Some("billing"));
        assert_eq!(data.dependencies.len(), 3);
        assert_eq!(data.dependencies[1].name, "org.postgresql:postgresql");
        assert!(data.dependencies[2].dev);
    }

    #[test]
    fn test_gradle() {
        let data = parse_gradle(
            "dependencies {\n    implementation 'org.springframework.boot:spring-boot-starter-web:3.1.0'\n    testImplementation(\"junit:junit:4.13\")\n}\n",
        )
        .unwrap();
        assert_eq!(data.dependencies.len(), 2);
        assert_eq!(data.dependencies[0].version.as_deref(), Some("3.1.0"));
        assert!(data.dependencies[1].dev);
    }

    #[test]
    fn test_gemfile() {
        let data = parse_gemfile(
            "source 'https://rubygems.org'\ngem 'rails', '~> 7.0'\ngem 'pg'\ngroup :development, :test do\n  gem 'rspec'\nend\ngem 'redis'\n",
        )
        .unwrap();
        let names: Vec<_> = data.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["rails", "pg", "rspec", "redis"]);
        assert!(data.dependencies[2].dev);
        assert!(!data.dependencies[3].dev);
    }

    #[test]
    fn test_composer_skips_platform_requirements() {
        let data = parse_composer_json(
            r#"{"name": "acme/site", "require": {"php": "^8.1", "ext-json": "*", "laravel/framework": "^10.0"}}"#,
        )
        .unwrap();
        assert_eq!(data.dependencies.len(), 1);
        assert_eq!(data.dependencies[0].name, "laravel/framework");
    }

    #[test]
    fn test_scan_skips_broken_manifest() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/package.json", "{ broken");
        fs.add_file("/mock/requirements.txt", "flask\n");

        let scan = scan_manifests(
            &fs,
            &[
                PathBuf::from("/mock/package.json"),
                PathBuf::from("/mock/requirements.txt"),
            ],
        );
        assert_eq!(scan.dependencies.len(), 1);
        assert_eq!(scan.dependencies[0].name, "flask");
    }

    #[test]
    fn test_package_manager_from_lockfile() {
        let fs = MockFileSystem::new();
        fs.add_file("/mock/package.json", "{}");
        fs.add_file("/mock/yarn.lock", "");
        assert_eq!(
            detect_package_manager(&fs, Path::new("/mock")),
            Some(PackageManager::Yarn)
        );

        let fs = MockFileSystem::new();
        fs.add_file("/mock/package.json", "{}");
        assert_eq!(
            detect_package_manager(&fs, Path::new("/mock")),
            Some(PackageManager::Npm)
        );

        let empty = MockFileSystem::new();
        assert_eq!(detect_package_manager(&empty, Path::new("/mock")), None);
    }
}
