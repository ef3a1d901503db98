//! Provisioning module dependency graph

use crate::intent::Component;
use serde::Serialize;
use std::fmt;

/// Modules in topological order; the derive order is the emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Network,
    Compute,
    Storage,
    Database,
    Monitoring,
}

impl Module {
    pub const ALL: [Module; 5] = [
        Module::Network,
        Module::Compute,
        Module::Storage,
        Module::Database,
        Module::Monitoring,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Module::Network => "network",
            Module::Compute => "compute",
            Module::Storage => "storage",
            Module::Database => "database",
            Module::Monitoring => "monitoring",
        }
    }

    /// Modules that must be declared before this one. Monitoring's edges are dynamic.
    pub fn depends_on(&self) -> &'static [Module] {
        match self {
            Module::Network | Module::Storage | Module::Monitoring => &[],
            Module::Compute => &[Module::Network],
            Module::Database => &[Module::Network, Module::Compute],
        }
    }

    /// Output identifiers the module declares
    pub fn outputs(&self) -> &'static [&'static str] {
        match self {
            Module::Network => &["vpc_id", "public_subnet_ids", "private_subnet_ids"],
            Module::Compute => &["cluster_name", "service_name", "security_group_id"],
            Module::Storage => &["bucket_name", "bucket_arn"],
            Module::Database => &["db_instance_id", "endpoint", "port"],
            Module::Monitoring => &["alarm_topic_arn", "log_group_name"],
        }
    }

    fn for_component(component: Component) -> Option<Module> {
        match component {
            Component::Compute => Some(Module::Compute),
            Component::Storage => Some(Module::Storage),
            Component::Networking => Some(Module::Network),
            Component::Database => Some(Module::Database),
            Component::Monitoring => Some(Module::Monitoring),
            Component::Ci => None,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The selected modules plus everything they depend on, in emission order
pub fn resolve(components: &[Component]) -> Vec<Module> {
    let mut selected: Vec<Module> = Vec::new();
    let mut pending: Vec<Module> = components
        .iter()
        .filter_map(|c| Module::for_component(*c))
        .collect();

    while let Some(module) = pending.pop() {
        if selected.contains(&module) {
            continue;
        }
        selected.push(module);
        pending.extend(module.depends_on().iter().copied());
    }

    selected.sort();
    selected
}

/// Direct dependencies of `module` within a resolved selection
pub fn dependencies_within(module: Module, resolved: &[Module]) -> Vec<Module> {
    match module {
        Module::Monitoring => resolved
            .iter()
            .copied()
            .filter(|m| *m != Module::Monitoring)
            .collect(),
        _ => module
            .depends_on()
            .iter()
            .copied()
            .filter(|m| resolved.contains(m))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        database_pulls_network_and_compute = { &[Component::Database], &[Module::Network, Module::Compute, Module::Database] },
        compute_pulls_network = { &[Component::Compute], &[Module::Network, Module::Compute] },
        storage_alone = { &[Component::Storage], &[Module::Storage] },
        ci_has_no_module = { &[Component::Ci], &[] },
        defaults = { &[Component::Compute, Component::Storage, Component::Networking], &[Module::Network, Module::Compute, Module::Storage] },
        monitoring_last = { &[Component::Monitoring, Component::Database, Component::Storage], &[Module::Network, Module::Compute, Module::Storage, Module::Database, Module::Monitoring] },
    )]
    fn test_resolve(components: &[Component], expected: &[Module]) {
        assert_eq!(resolve(components), expected);
    }

    #[test]
    fn test_every_dependency_precedes_dependent() {
        let resolved = resolve(&[Component::Database, Component::Monitoring, Component::Storage]);
        for (i, module) in resolved.iter().enumerate() {
            for dep in dependencies_within(*module, &resolved) {
                let position = resolved.iter().position(|m| *m == dep).unwrap();
                assert!(position < i, "{} must precede {}", dep, module);
            }
        }
    }

    #[test]
    fn test_monitoring_depends_on_selected_only() {
        let resolved = resolve(&[Component::Storage, Component::Monitoring]);
        assert_eq!(dependencies_within(Module::Monitoring, &resolved), vec![Module::Storage]);
    }
}
