//! Project type and framework detection

use super::pattern::DependencyPattern;
use super::types::{Dependency, Ecosystem, ProjectType};
use crate::fs::{FileSystem, FileType};
use std::path::{Path, PathBuf};

/// Root-level manifests, checked in this order
pub const MANIFESTS: &[(&str, Ecosystem)] = &[
    ("package.json", Ecosystem::Node),
    ("requirements.txt", Ecosystem::Python),
    ("pyproject.toml", Ecosystem::Python),
    ("Pipfile", Ecosystem::Python),
    ("setup.py", Ecosystem::Python),
    ("Cargo.toml", Ecosystem::Rust),
    ("go.mod", Ecosystem::Go),
    ("pom.xml", Ecosystem::Java),
    ("build.gradle", Ecosystem::Java),
    ("build.gradle.kts", Ecosystem::Java),
    ("Gemfile", Ecosystem::Ruby),
    ("composer.json", Ecosystem::Php),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameworkKind {
    Ui,
    Server,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameworkRule {
    pub pattern: DependencyPattern,
    pub label: &'static str,
    pub kind: FrameworkKind,
}

const fn ui(pattern: DependencyPattern, label: &'static str) -> FrameworkRule {
    FrameworkRule {
        pattern,
        label,
        kind: FrameworkKind::Ui,
    }
}

const fn server(pattern: DependencyPattern, label: &'static str) -> FrameworkRule {
    FrameworkRule {
        pattern,
        label,
        kind: FrameworkKind::Server,
    }
}

/// Dependency → framework label. First matching rule wins for a dependency.
pub const FRAMEWORK_RULES: &[FrameworkRule] = &[
    ui(DependencyPattern::exact("next"), "Next.js"),
    ui(DependencyPattern::exact("nuxt"), "Nuxt"),
    ui(DependencyPattern::exact("react"), "React"),
    ui(DependencyPattern::exact("vue"), "Vue"),
    ui(DependencyPattern::exact("@angular/core"), "Angular"),
    ui(DependencyPattern::exact("svelte"), "Svelte"),
    ui(DependencyPattern::exact("@sveltejs/kit"), "Svelte"),
    server(DependencyPattern::exact("express"), "Express.js"),
    server(DependencyPattern::exact("@nestjs/core"), "NestJS"),
    server(DependencyPattern::exact("fastify"), "Fastify"),
    server(DependencyPattern::exact("koa"), "Koa"),
    server(DependencyPattern::exact("django"), "Django"),
    server(DependencyPattern::exact("flask"), "Flask"),
    server(DependencyPattern::exact("fastapi"), "FastAPI"),
    server(DependencyPattern::exact("rails"), "Rails"),
    server(DependencyPattern::exact("sinatra"), "Sinatra"),
    server(DependencyPattern::contains("spring-boot-starter"), "Spring Boot"),
    server(DependencyPattern::exact("laravel/framework"), "Laravel"),
    server(DependencyPattern::exact("symfony/framework-bundle"), "Symfony"),
    server(DependencyPattern::exact("axum"), "Axum"),
    server(DependencyPattern::exact("actix-web"), "Actix Web"),
    server(DependencyPattern::exact("rocket"), "Rocket"),
    server(DependencyPattern::prefix("github.com/gin-gonic/gin"), "Gin"),
    server(DependencyPattern::prefix("github.com/labstack/echo"), "Echo"),
    server(DependencyPattern::prefix("github.com/gofiber/fiber"), "Fiber"),
];

/// Classification of a tech-stack label, `None` for labels outside the table
pub fn framework_kind(label: &str) -> Option<FrameworkKind> {
    FRAMEWORK_RULES
        .iter()
        .find(|rule| rule.label == label)
        .map(|rule| rule.kind)
}

pub fn has_ui_framework(tech_stack: &[String]) -> bool {
    tech_stack
        .iter()
        .any(|label| framework_kind(label) == Some(FrameworkKind::Ui))
}

pub fn has_server_framework(tech_stack: &[String]) -> bool {
    tech_stack
        .iter()
        .any(|label| framework_kind(label) == Some(FrameworkKind::Server))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackDetection {
    pub project_type: ProjectType,
    pub ecosystems: Vec<Ecosystem>,
    pub manifests: Vec<PathBuf>,
}

/// Walks the root-level manifests and folds their ecosystems into a project type
pub fn detect_project_type(fs: &dyn FileSystem, root: &Path) -> StackDetection {
    let mut detection = StackDetection::default();

    for (file, ecosystem) in MANIFESTS {
        let path = root.join(file);
        if fs.is_file(&path) {
            record(&mut detection, *ecosystem, path);
        }
    }

    if let Ok(entries) = fs.read_dir(root) {
        for entry in entries {
            let name = entry.file_name();
            if entry.file_type() == FileType::File
                && (name.ends_with(".csproj") || name.ends_with(".sln"))
            {
                record(&mut detection, Ecosystem::Dotnet, entry.path.clone());
            }
        }
    }

    detection
}

fn record(detection: &mut StackDetection, ecosystem: Ecosystem, manifest: PathBuf) {
    detection.project_type = detection.project_type.escalate(ecosystem);
    if !detection.ecosystems.contains(&ecosystem) {
        detection.ecosystems.push(ecosystem);
    }
    detection.manifests.push(manifest);
}

/// Framework labels in order of first detection, de-duplicated
pub fn detect_frameworks(dependencies: &[Dependency]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for dep in dependencies {
        if let Some(rule) = FRAMEWORK_RULES.iter().find(|r| r.pattern.matches(&dep.name)) {
            if !labels.iter().any(|l| l == rule.label) {
                labels.push(rule.label.to_string());
            }
        }
    }
    labels
}
