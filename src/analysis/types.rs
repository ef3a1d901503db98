//! The `Analysis` record and its parts

use crate::inventory::{CloudResource, ResourceCategory};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Language ecosystems recognized from root-level manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Node,
    Python,
    Rust,
    Go,
    Java,
    Ruby,
    Php,
    Dotnet,
}

impl Ecosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Node => "node",
            Ecosystem::Python => "python",
            Ecosystem::Rust => "rust",
            Ecosystem::Go => "go",
            Ecosystem::Java => "java",
            Ecosystem::Ruby => "ruby",
            Ecosystem::Php => "php",
            Ecosystem::Dotnet => "dotnet",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    #[default]
    Unknown,
    Node,
    Python,
    Rust,
    Go,
    Java,
    Ruby,
    Php,
    Dotnet,
    FullStack,
}

impl ProjectType {
    /// Folds one more detected ecosystem into the current type.
    ///
    /// The first ecosystem sets the type, a different one escalates to `FullStack`,
    /// and a repeat of the same ecosystem leaves it alone.
    pub fn escalate(self, ecosystem: Ecosystem) -> ProjectType {
        let detected = ProjectType::from(ecosystem);
        match self {
            ProjectType::Unknown => detected,
            ProjectType::FullStack => ProjectType::FullStack,
            current if current == detected => current,
            _ => ProjectType::FullStack,
        }
    }

    /// The single ecosystem behind this type, if there is one
    pub fn ecosystem(&self) -> Option<Ecosystem> {
        match self {
            ProjectType::Unknown | ProjectType::FullStack => None,
            ProjectType::Node => Some(Ecosystem::Node),
            ProjectType::Python => Some(Ecosystem::Python),
            ProjectType::Rust => Some(Ecosystem::Rust),
            ProjectType::Go => Some(Ecosystem::Go),
            ProjectType::Java => Some(Ecosystem::Java),
            ProjectType::Ruby => Some(Ecosystem::Ruby),
            ProjectType::Php => Some(Ecosystem::Php),
            ProjectType::Dotnet => Some(Ecosystem::Dotnet),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Unknown => "unknown",
            ProjectType::Node => "node",
            ProjectType::Python => "python",
            ProjectType::Rust => "rust",
            ProjectType::Go => "go",
            ProjectType::Java => "java",
            ProjectType::Ruby => "ruby",
            ProjectType::Php => "php",
            ProjectType::Dotnet => "dotnet",
            ProjectType::FullStack => "full-stack",
        }
    }
}

impl From<Ecosystem> for ProjectType {
    fn from(ecosystem: Ecosystem) -> Self {
        match ecosystem {
            Ecosystem::Node => ProjectType::Node,
            Ecosystem::Python => ProjectType::Python,
            Ecosystem::Rust => ProjectType::Rust,
            Ecosystem::Go => ProjectType::Go,
            Ecosystem::Java => ProjectType::Java,
            Ecosystem::Ruby => ProjectType::Ruby,
            Ecosystem::Php => ProjectType::Php,
            Ecosystem::Dotnet => ProjectType::Dotnet,
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
    Pip,
    Poetry,
    Pipenv,
    Cargo,
    Go,
    Maven,
    Gradle,
    Bundler,
    Composer,
    Dotnet,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
            PackageManager::Pip => "pip",
            PackageManager::Poetry => "poetry",
            PackageManager::Pipenv => "pipenv",
            PackageManager::Cargo => "cargo",
            PackageManager::Go => "go",
            PackageManager::Maven => "maven",
            PackageManager::Gradle => "gradle",
            PackageManager::Bundler => "bundler",
            PackageManager::Composer => "composer",
            PackageManager::Dotnet => "dotnet",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub ecosystem: Ecosystem,
    pub dev: bool,
}

impl Dependency {
    pub fn new(name: impl Into<String>, ecosystem: Ecosystem) -> Self {
        Self {
            name: name.into(),
            version: None,
            ecosystem,
            dev: false,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        if !version.trim().is_empty() {
            self.version = Some(version);
        }
        self
    }

    pub fn dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }
}

/// Existing infrastructure tooling found in the project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InfraFlags {
    pub has_container_build: bool,
    pub has_orchestration: bool,
    pub has_provisioning_code: bool,
    pub has_ci: bool,
    /// Relative paths that set any of the flags
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceCategory {
    Database,
    Cache,
    Queue,
    Storage,
}

impl ServiceCategory {
    /// Service name used when only the category is known
    pub fn generic_service(&self) -> &'static str {
        match self {
            ServiceCategory::Database => "database",
            ServiceCategory::Cache => "cache",
            ServiceCategory::Queue => "queue",
            ServiceCategory::Storage => "object-storage",
        }
    }
}

/// The concrete signal behind a service detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum EvidenceSource {
    Dependency(String),
    EnvKey(String),
    File(String),
}

impl EvidenceSource {
    pub fn as_str(&self) -> &str {
        match self {
            EvidenceSource::Dependency(s) | EvidenceSource::EnvKey(s) | EvidenceSource::File(s) => s,
        }
    }
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceSource::Dependency(s) => write!(f, "dependency {}", s),
            EvidenceSource::EnvKey(s) => write!(f, "env key {}", s),
            EvidenceSource::File(s) => write!(f, "file {}", s),
        }
    }
}

/// A detected data service. Only constructible with non-empty provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataService {
    category: ServiceCategory,
    service: String,
    evidence: EvidenceSource,
}

impl DataService {
    /// Returns `None` when the service name or the evidence is blank
    pub fn new(
        category: ServiceCategory,
        service: impl Into<String>,
        evidence: EvidenceSource,
    ) -> Option<Self> {
        let service = service.into();
        if service.trim().is_empty() || evidence.as_str().trim().is_empty() {
            return None;
        }
        Some(Self {
            category,
            service,
            evidence,
        })
    }

    pub fn category(&self) -> ServiceCategory {
        self.category
    }

    /// Canonical service type, e.g. `postgresql` or `redis`
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn evidence(&self) -> &EvidenceSource {
        &self.evidence
    }

    pub fn is_generic(&self) -> bool {
        self.service == self.category.generic_service()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum EndpointSource {
    /// Compose service name
    Compose(String),
    /// Compose service running a stock backing image (database, cache, broker)
    ComposeBacking(String),
    /// Script or process-file entry name
    Script(String),
    LiveProbe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    pub source: EndpointSource,
}

impl Endpoint {
    pub fn is_declared(&self) -> bool {
        !matches!(self.source, EndpointSource::LiveProbe)
    }
}

/// One key read from an env file. `value` is never set for secret-like keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvEntry {
    pub key: String,
    pub file: String,
    pub secret: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: ResourceCategory,
    pub count: usize,
    pub estimated_monthly_cost: f64,
    pub items: Vec<CloudResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureSummary {
    pub account: String,
    pub region: String,
    pub categories: Vec<CategorySummary>,
    pub total_resources: usize,
    pub estimated_monthly_cost: f64,
}

impl InfrastructureSummary {
    pub fn resources(&self) -> impl Iterator<Item = (ResourceCategory, &CloudResource)> {
        self.categories
            .iter()
            .flat_map(|c| c.items.iter().map(move |r| (c.category, r)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub id: String,
    pub message: String,
}

/// Structured snapshot of a project's technology, services and cloud footprint.
///
/// Built once per invocation and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub project_name: String,
    pub root: PathBuf,
    pub project_type: ProjectType,
    pub tech_stack: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<PackageManager>,
    pub dependencies: Vec<Dependency>,
    pub infra: InfraFlags,
    pub databases: Vec<DataService>,
    pub caches: Vec<DataService>,
    pub queues: Vec<DataService>,
    pub storage: Vec<DataService>,
    pub endpoints: Vec<Endpoint>,
    pub env: Vec<EnvEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<InfrastructureSummary>,
    pub recommendations: Vec<Recommendation>,
    pub next_actions: Vec<String>,
}

impl Analysis {
    /// An analysis with no evidence at all
    pub fn empty(project_name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            project_name: project_name.into(),
            root: root.into(),
            project_type: ProjectType::Unknown,
            tech_stack: Vec::new(),
            package_manager: None,
            dependencies: Vec::new(),
            infra: InfraFlags::default(),
            databases: Vec::new(),
            caches: Vec::new(),
            queues: Vec::new(),
            storage: Vec::new(),
            endpoints: Vec::new(),
            env: Vec::new(),
            infrastructure: None,
            recommendations: Vec::new(),
            next_actions: Vec::new(),
        }
    }

    /// All detected data services, databases first
    pub fn services(&self) -> impl Iterator<Item = &DataService> {
        self.databases
            .iter()
            .chain(self.caches.iter())
            .chain(self.queues.iter())
            .chain(self.storage.iter())
    }

    pub fn services_in(&self, category: ServiceCategory) -> &[DataService] {
        match category {
            ServiceCategory::Database => &self.databases,
            ServiceCategory::Cache => &self.caches,
            ServiceCategory::Queue => &self.queues,
            ServiceCategory::Storage => &self.storage,
        }
    }

    pub fn has_database(&self) -> bool {
        !self.databases.is_empty()
    }

    pub fn has_service(&self, service: &str) -> bool {
        self.services().any(|s| s.service() == service)
    }

    pub fn total_resources(&self) -> usize {
        self.infrastructure
            .as_ref()
            .map(|i| i.total_resources)
            .unwrap_or(0)
    }

    /// Ports the project itself declares (compose maps, scripts), ascending
    pub fn declared_ports(&self) -> Vec<u16> {
        self.endpoints
            .iter()
            .filter(|e| e.is_declared())
            .map(|e| e.port)
            .collect()
    }

    /// Ports the application listens on: script ports first, then app compose services.
    /// Backing-service and live ports never count.
    pub fn app_ports(&self) -> Vec<u16> {
        let scripts = self
            .endpoints
            .iter()
            .filter(|e| matches!(e.source, EndpointSource::Script(_)));
        let compose = self
            .endpoints
            .iter()
            .filter(|e| matches!(e.source, EndpointSource::Compose(_)));
        scripts.chain(compose).map(|e| e.port).collect()
    }

    /// Port the application container exposes, when one is declared
    pub fn app_port(&self) -> Option<u16> {
        self.app_ports().first().copied()
    }

    /// Ecosystems seen in the dependency list, in declaration order of [`Ecosystem`]
    pub fn ecosystems(&self) -> Vec<Ecosystem> {
        let mut ecosystems: Vec<Ecosystem> = self.dependencies.iter().map(|d| d.ecosystem).collect();
        if let Some(ecosystem) = self.project_type.ecosystem() {
            ecosystems.push(ecosystem);
        }
        ecosystems.sort();
        ecosystems.dedup();
        ecosystems
    }

    /// Slug used for resource names in generated files
    pub fn slug(&self) -> String {
        slugify(&self.project_name)
    }
}

/// Lowercase, `[a-z0-9-]` only, never empty
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "app".to_string()
    } else {
        slug
    }
}
