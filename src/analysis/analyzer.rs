use super::advice::advise;
use super::cloud::detect_infrastructure;
use super::dependencies::{detect_package_manager, scan_manifests, DependencyScan};
use super::env::{scan_env_files, EnvScan};
use super::infra::detect_infra;
use super::ports::{compose_ports, merge_endpoints, script_ports};
use super::probe::{probe_bounded, PortProbe};
use super::services::{detect_services, merge_services};
use super::stack::{detect_frameworks, detect_project_type};
use super::types::{Analysis, DataService, ServiceCategory};
use super::AnalysisError;
use crate::context::AccountContext;
use crate::fs::FileSystem;
use crate::inventory::ResourceInventory;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Runs one detector; a failure is logged and treated as "no evidence"
fn isolate<T: Default>(detector: &str, result: anyhow::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(detector, error = %e, "Detector failed; recording no evidence");
            T::default()
        }
    }
}

/// Builds an [`Analysis`] for one project root
pub struct ProjectAnalyzer<F: FileSystem> {
    fs: F,
    inventory: Option<Arc<ResourceInventory>>,
    probe: Option<Arc<dyn PortProbe>>,
    probe_timeout: Duration,
}

impl<F: FileSystem> ProjectAnalyzer<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            inventory: None,
            probe: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_inventory(mut self, inventory: Arc<ResourceInventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn PortProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Fails only when `root` is missing or not a directory
    pub async fn analyze(&self, root: &Path, ctx: &AccountContext) -> Result<Analysis, AnalysisError> {
        let start = Instant::now();
        let fs: &dyn FileSystem = &self.fs;

        if !fs.exists(root) {
            return Err(AnalysisError::PathNotFound(root.to_path_buf()));
        }
        if !fs.is_dir(root) {
            return Err(AnalysisError::NotADirectory(root.to_path_buf()));
        }

        info!(root = %root.display(), "Analyzing project");

        let stack = detect_project_type(fs, root);
        let DependencyScan {
            project_name,
            dependencies,
        } = scan_manifests(fs, &stack.manifests);
        let tech_stack = detect_frameworks(&dependencies);
        let package_manager = detect_package_manager(fs, root);
        debug!(
            project_type = %stack.project_type,
            dependencies = dependencies.len(),
            frameworks = ?tech_stack,
            "Stack detected"
        );

        let infra = detect_infra(fs, root);
        let EnvScan {
            entries: env,
            services: env_services,
        } = scan_env_files(fs, root);
        let services = merge_services(detect_services(&dependencies), env_services);

        let compose = isolate("compose-ports", compose_ports(fs, root));
        let scripts = isolate("script-ports", script_ports(fs, root));
        let live = match &self.probe {
            Some(probe) => isolate(
                "live-ports",
                probe_bounded(Arc::clone(probe), self.probe_timeout).await,
            ),
            None => Vec::new(),
        };
        let endpoints = merge_endpoints(compose, scripts, live);

        let infrastructure = match &self.inventory {
            Some(inventory) => detect_infrastructure(inventory, ctx).await,
            None => None,
        };

        let mut analysis = Analysis::empty(
            project_name.unwrap_or_else(|| directory_name(root)),
            root.to_path_buf(),
        );
        analysis.project_type = stack.project_type;
        analysis.tech_stack = tech_stack;
        analysis.package_manager = package_manager;
        analysis.dependencies = dependencies;
        analysis.infra = infra;
        analysis.databases = in_category(&services, ServiceCategory::Database);
        analysis.caches = in_category(&services, ServiceCategory::Cache);
        analysis.queues = in_category(&services, ServiceCategory::Queue);
        analysis.storage = in_category(&services, ServiceCategory::Storage);
        analysis.endpoints = endpoints;
        analysis.env = env;
        analysis.infrastructure = infrastructure;

        let (recommendations, next_actions) = advise(&analysis);
        analysis.recommendations = recommendations;
        analysis.next_actions = next_actions;

        info!(
            project = %analysis.project_name,
            project_type = %analysis.project_type,
            services = analysis.services().count(),
            endpoints = analysis.endpoints.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(analysis)
    }
}

fn in_category(services: &[DataService], category: ServiceCategory) -> Vec<DataService> {
    services
        .iter()
        .filter(|s| s.category() == category)
        .cloned()
        .collect()
}

fn directory_name(root: &Path) -> String {
    let absolute: PathBuf = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(root))
            .unwrap_or_else(|_| root.to_path_buf())
    };
    absolute
        .components()
        .rev()
        .find_map(|c| match c {
            std::path::Component::Normal(name) => name.to_str().map(String::from),
            _ => None,
        })
        .unwrap_or_else(|| "app".to_string())
}
