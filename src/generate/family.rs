use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six kinds of generated trees
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactFamily {
    Provisioning,
    Orchestration,
    ContainerBuild,
    Ci,
    Monitoring,
    SecurityPolicy,
}

impl ArtifactFamily {
    pub const ALL: [ArtifactFamily; 6] = [
        ArtifactFamily::Provisioning,
        ArtifactFamily::Orchestration,
        ArtifactFamily::ContainerBuild,
        ArtifactFamily::Ci,
        ArtifactFamily::Monitoring,
        ArtifactFamily::SecurityPolicy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactFamily::Provisioning => "provisioning",
            ArtifactFamily::Orchestration => "orchestration",
            ArtifactFamily::ContainerBuild => "container-build",
            ArtifactFamily::Ci => "ci",
            ArtifactFamily::Monitoring => "monitoring",
            ArtifactFamily::SecurityPolicy => "security-policy",
        }
    }
}

impl fmt::Display for ArtifactFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "provisioning" | "terraform" | "iac" => Ok(ArtifactFamily::Provisioning),
            "orchestration" | "kubernetes" | "k8s" => Ok(ArtifactFamily::Orchestration),
            "container-build" | "container" | "docker" => Ok(ArtifactFamily::ContainerBuild),
            "ci" | "pipeline" => Ok(ArtifactFamily::Ci),
            "monitoring" => Ok(ArtifactFamily::Monitoring),
            "security-policy" | "security" => Ok(ArtifactFamily::SecurityPolicy),
            other => Err(format!(
                "Unknown artifact family '{}'. Expected one of: {}",
                other,
                ArtifactFamily::ALL
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// One family, or every family in [`ArtifactFamily::ALL`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilySelection {
    One(ArtifactFamily),
    All,
}

impl FamilySelection {
    pub fn families(&self) -> Vec<ArtifactFamily> {
        match self {
            FamilySelection::One(family) => vec![*family],
            FamilySelection::All => ArtifactFamily::ALL.to_vec(),
        }
    }
}

impl FromStr for FamilySelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(FamilySelection::All)
        } else {
            s.parse().map(FamilySelection::One)
        }
    }
}
