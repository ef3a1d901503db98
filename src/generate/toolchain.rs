//! Build recipes per ecosystem, shared by the container and CI generators

use crate::analysis::{Analysis, Ecosystem, PackageManager};

#[derive(Debug)]
pub struct Toolchain {
    pub ecosystem: Ecosystem,
    pub build_image: &'static str,
    pub runtime_image: &'static str,
    /// Files copied before dependency install, for layer caching
    pub manifests: &'static [&'static str],
    pub install: Option<&'static str>,
    pub build: Option<&'static str>,
    pub test: &'static str,
    /// `(from build stage, to)`; `{name}` is the project slug
    pub copies: &'static [(&'static str, &'static str)],
    pub command: &'static [&'static str],
    /// Non-root user the runtime stage switches to
    pub user: &'static str,
    pub setup_action: &'static str,
    pub setup_with: &'static [(&'static str, &'static str)],
    pub ignore: &'static [&'static str],
}

pub const TOOLCHAINS: &[Toolchain] = &[
    Toolchain {
        ecosystem: Ecosystem::Node,
        build_image: "node:20-alpine",
        runtime_image: "node:20-alpine",
        manifests: &["package*.json"],
        install: Some("npm ci"),
        build: Some("npm run build --if-present"),
        test: "npm test --if-present",
        copies: &[("/app", "./")],
        command: &["npm", "start"],
        user: "node",
        setup_action: "actions/setup-node@v4",
        setup_with: &[("node-version", "20")],
        ignore: &["node_modules", "npm-debug.log", "dist", ".next", "coverage"],
    },
    Toolchain {
        ecosystem: Ecosystem::Python,
        build_image: "python:3.12-slim",
        runtime_image: "python:3.12-slim",
        manifests: &["requirements*.txt"],
        install: Some("pip install --no-cache-dir --prefix=/install -r requirements.txt"),
        build: None,
        test: "python -m pytest",
        copies: &[("/install", "/usr/local"), ("/app", "./")],
        command: &["python", "-m", "{name}"],
        user: "10001",
        setup_action: "actions/setup-python@v5",
        setup_with: &[("python-version", "3.12")],
        ignore: &["__pycache__", "*.pyc", ".venv", ".pytest_cache", ".mypy_cache"],
    },
    Toolchain {
        ecosystem: Ecosystem::Rust,
        build_image: "rust:1.77-slim",
        runtime_image: "debian:bookworm-slim",
        manifests: &[],
        install: None,
        build: Some("cargo build --release --locked"),
        test: "cargo test --locked",
        copies: &[("/app/target/release/{name}", "/usr/local/bin/{name}")],
        command: &["/usr/local/bin/{name}"],
        user: "10001",
        setup_action: "dtolnay/rust-toolchain@stable",
        setup_with: &[],
        ignore: &["target"],
    },
    Toolchain {
        ecosystem: Ecosystem::Go,
        build_image: "golang:1.22-alpine",
        runtime_image: "gcr.io/distroless/static-debian12",
        manifests: &["go.mod", "go.sum*"],
        install: Some("go mod download"),
        build: Some("CGO_ENABLED=0 go build -o /out/{name} ."),
        test: "go test ./...",
        copies: &[("/out/{name}", "/{name}")],
        command: &["/{name}"],
        user: "nonroot",
        setup_action: "actions/setup-go@v5",
        setup_with: &[("go-version-file", "go.mod")],
        ignore: &["bin", "vendor"],
    },
    Toolchain {
        ecosystem: Ecosystem::Java,
        build_image: "maven:3.9-eclipse-temurin-21",
        runtime_image: "eclipse-temurin:21-jre",
        manifests: &["pom.xml"],
        install: Some("mvn -B dependency:go-offline"),
        build: Some("mvn -B package -DskipTests"),
        test: "mvn -B verify",
        copies: &[("/app/target/*.jar", "app.jar")],
        command: &["java", "-jar", "app.jar"],
        user: "10001",
        setup_action: "actions/setup-java@v4",
        setup_with: &[("distribution", "temurin"), ("java-version", "21")],
        ignore: &["target", "build", ".gradle"],
    },
    Toolchain {
        ecosystem: Ecosystem::Ruby,
        build_image: "ruby:3.3-slim",
        runtime_image: "ruby:3.3-slim",
        manifests: &["Gemfile", "Gemfile.lock*"],
        install: Some("bundle config set deployment true && bundle install"),
        build: None,
        test: "bundle exec rake",
        copies: &[("/app", "./")],
        command: &["bundle", "exec", "rackup", "--host", "0.0.0.0"],
        user: "10001",
        setup_action: "ruby/setup-ruby@v1",
        setup_with: &[("bundler-cache", "true")],
        ignore: &["vendor/bundle", "log", "tmp"],
    },
    Toolchain {
        ecosystem: Ecosystem::Php,
        build_image: "composer:2",
        runtime_image: "php:8.3-apache",
        manifests: &["composer.json", "composer.lock*"],
        install: Some("composer install --no-dev --no-scripts --prefer-dist"),
        build: None,
        test: "vendor/bin/phpunit",
        copies: &[("/app", "/var/www/html")],
        command: &["apache2-foreground"],
        user: "www-data",
        setup_action: "shivammathur/setup-php@v2",
        setup_with: &[("php-version", "8.3")],
        ignore: &["vendor"],
    },
    Toolchain {
        ecosystem: Ecosystem::Dotnet,
        build_image: "mcr.microsoft.com/dotnet/sdk:8.0",
        runtime_image: "mcr.microsoft.com/dotnet/aspnet:8.0",
        manifests: &[],
        install: None,
        build: Some("dotnet publish -c Release -o /out"),
        test: "dotnet test",
        copies: &[("/out", "./")],
        command: &["dotnet", "{name}.dll"],
        user: "app",
        setup_action: "actions/setup-dotnet@v4",
        setup_with: &[("dotnet-version", "8.0.x")],
        ignore: &["bin", "obj"],
    },
];

/// `(ecosystem, manager, manifests, install)`
const INSTALL_OVERRIDES: &[(Ecosystem, PackageManager, &[&str], &str)] = &[
    (Ecosystem::Node, PackageManager::Yarn, &["package.json", "yarn.lock*"], "yarn install --frozen-lockfile"),
    (
        Ecosystem::Node,
        PackageManager::Pnpm,
        &["package.json", "pnpm-lock.yaml*"],
        "corepack enable && pnpm install --frozen-lockfile",
    ),
    (Ecosystem::Node, PackageManager::Bun, &["package.json", "bun.lockb*"], "npm install -g bun && bun install"),
    (
        Ecosystem::Python,
        PackageManager::Poetry,
        &["pyproject.toml", "poetry.lock*"],
        "pip install --no-cache-dir poetry && poetry export -o requirements.txt && pip install --no-cache-dir --prefix=/install -r requirements.txt",
    ),
    (
        Ecosystem::Python,
        PackageManager::Pipenv,
        &["Pipfile", "Pipfile.lock*"],
        "pip install --no-cache-dir pipenv && pipenv requirements > requirements.txt && pip install --no-cache-dir --prefix=/install -r requirements.txt",
    ),
];

/// Gradle replaces every Maven step
const GRADLE: (&str, &str, &str) = (
    "gradle:8.7-jdk21",
    "gradle build -x test --no-daemon",
    "./gradlew build",
);

pub fn toolchain(ecosystem: Ecosystem) -> &'static Toolchain {
    // every ecosystem has a row
    TOOLCHAINS
        .iter()
        .find(|t| t.ecosystem == ecosystem)
        .unwrap_or(&TOOLCHAINS[0])
}

/// A toolchain resolved against the detected package manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub ecosystem: Ecosystem,
    pub build_image: String,
    pub runtime_image: String,
    pub manifests: Vec<String>,
    pub install: Option<String>,
    pub build: Option<String>,
    pub test: String,
    pub install_ci: Option<String>,
    pub copies: Vec<(String, String)>,
    pub command: Vec<String>,
    pub user: String,
}

impl Recipe {
    pub fn resolve(ecosystem: Ecosystem, manager: Option<PackageManager>, name: &str) -> Self {
        let tc = toolchain(ecosystem);
        let fill = |s: &str| s.replace("{name}", name);

        let mut recipe = Recipe {
            ecosystem,
            build_image: tc.build_image.to_string(),
            runtime_image: tc.runtime_image.to_string(),
            manifests: tc.manifests.iter().map(|m| m.to_string()).collect(),
            install: tc.install.map(fill),
            build: tc.build.map(fill),
            test: tc.test.to_string(),
            install_ci: tc.install.map(|i| ci_install(ecosystem, i)),
            copies: tc.copies.iter().map(|(a, b)| (fill(a), fill(b))).collect(),
            command: tc.command.iter().map(|c| fill(c)).collect(),
            user: tc.user.to_string(),
        };

        if let Some(manager) = manager {
            if manager == PackageManager::Gradle && ecosystem == Ecosystem::Java {
                recipe.build_image = GRADLE.0.to_string();
                recipe.manifests.clear();
                recipe.install = None;
                recipe.install_ci = None;
                recipe.build = Some(GRADLE.1.to_string());
                recipe.test = GRADLE.2.to_string();
                recipe.copies = vec![("/app/build/libs/*.jar".to_string(), "app.jar".to_string())];
            } else if let Some((_, _, manifests, install)) = INSTALL_OVERRIDES
                .iter()
                .find(|(e, m, _, _)| *e == ecosystem && *m == manager)
            {
                recipe.manifests = manifests.iter().map(|m| m.to_string()).collect();
                recipe.install = Some(install.to_string());
                recipe.install_ci = Some(ci_install(ecosystem, install));
            }
        }

        recipe
    }

    /// Recipe for the analysis' main runtime; the backend side of a full-stack project
    pub fn for_analysis(analysis: &Analysis) -> Option<Self> {
        let ecosystem = primary_ecosystem(analysis)?;
        Some(Self::resolve(ecosystem, analysis.package_manager, &analysis.slug()))
    }
}

/// CI installs into the runner, not a staging prefix
fn ci_install(ecosystem: Ecosystem, install: &str) -> String {
    match ecosystem {
        Ecosystem::Python => install.replace(" --prefix=/install", ""),
        Ecosystem::Ruby => "bundle install".to_string(),
        _ => install.to_string(),
    }
}

/// The single ecosystem, or the first non-Node one of a full-stack project
pub fn primary_ecosystem(analysis: &Analysis) -> Option<Ecosystem> {
    if let Some(ecosystem) = analysis.project_type.ecosystem() {
        return Some(ecosystem);
    }
    let ecosystems = analysis.ecosystems();
    ecosystems
        .iter()
        .copied()
        .find(|e| *e != Ecosystem::Node)
        .or_else(|| ecosystems.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Dependency, ProjectType};
    use crate::generate::fixtures::analysis;

    #[test]
    fn test_every_ecosystem_has_a_toolchain() {
        for ecosystem in [
            Ecosystem::Node,
            Ecosystem::Python,
            Ecosystem::Rust,
            Ecosystem::Go,
            Ecosystem::Java,
            Ecosystem::Ruby,
            Ecosystem::Php,
            Ecosystem::Dotnet,
        ] {
            assert_eq!(toolchain(ecosystem).ecosystem, ecosystem);
        }
    }

    #[test]
    fn test_package_manager_overrides_install() {
        let recipe = Recipe::resolve(Ecosystem::Node, Some(PackageManager::Pnpm), "web");
        assert_eq!(recipe.manifests, vec!["package.json", "pnpm-lock.yaml*"]);
        assert!(recipe.install.unwrap().contains("pnpm install"));

        let recipe = Recipe::resolve(Ecosystem::Java, Some(PackageManager::Gradle), "api");
        assert_eq!(recipe.build_image, "gradle:8.7-jdk21");
        assert_eq!(recipe.install, None);
    }

    #[test]
    fn test_name_placeholder_is_filled() {
        let recipe = Recipe::resolve(Ecosystem::Rust, Some(PackageManager::Cargo), "billing");
        assert_eq!(recipe.command, vec!["/usr/local/bin/billing"]);
        assert_eq!(recipe.copies[0].0, "/app/target/release/billing");
    }

    #[test]
    fn test_python_ci_install_has_no_prefix() {
        let recipe = Recipe::resolve(Ecosystem::Python, None, "svc");
        assert_eq!(
            recipe.install_ci.as_deref(),
            Some("pip install --no-cache-dir -r requirements.txt")
        );
    }

    #[test]
    fn test_full_stack_prefers_backend_ecosystem() {
        let mut analysis = analysis();
        analysis.project_type = ProjectType::FullStack;
        analysis.dependencies = vec![
            Dependency::new("react", Ecosystem::Node),
            Dependency::new("django", Ecosystem::Python),
        ];
        assert_eq!(primary_ecosystem(&analysis), Some(Ecosystem::Python));

        assert_eq!(primary_ecosystem(&crate::generate::fixtures::analysis()), None);
    }
}
