//! Per-environment sizing

use crate::intent::Environment;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sizing {
    pub min_units: u32,
    pub max_units: u32,
    pub autoscaling: bool,
    pub multi_az_database: bool,
    pub retention_days: u32,
    pub cpu: u32,
    pub memory: u32,
    pub db_instance_class: &'static str,
    pub db_storage_gb: u32,
}

impl Sizing {
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Dev => Sizing {
                min_units: 1,
                max_units: 1,
                autoscaling: false,
                multi_az_database: false,
                retention_days: 7,
                cpu: 256,
                memory: 512,
                db_instance_class: "db.t3.micro",
                db_storage_gb: 20,
            },
            Environment::Staging => Sizing {
                min_units: 2,
                max_units: 2,
                autoscaling: false,
                multi_az_database: false,
                retention_days: 14,
                cpu: 512,
                memory: 1024,
                db_instance_class: "db.t3.small",
                db_storage_gb: 50,
            },
            Environment::Prod => Sizing {
                min_units: 3,
                max_units: 6,
                autoscaling: true,
                multi_az_database: true,
                retention_days: 30,
                cpu: 1024,
                memory: 2048,
                db_instance_class: "db.r6g.large",
                db_storage_gb: 100,
            },
        }
    }

    /// Kubernetes CPU request, e.g. `250m`
    pub fn cpu_request(&self) -> String {
        format!("{}m", self.cpu * 1000 / 1024)
    }

    /// Kubernetes memory request, e.g. `512Mi`
    pub fn memory_request(&self) -> String {
        format!("{}Mi", self.memory)
    }
}
