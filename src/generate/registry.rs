//! Generator lookup and per-family failure isolation

use super::artifact::{ArtifactSet, GenerateError, GenerateOptions};
use super::family::{ArtifactFamily, FamilySelection};
use super::{
    CiGenerator, DockerGenerator, KubernetesGenerator, MonitoringGenerator, SecurityGenerator,
    TerraformGenerator,
};
use crate::analysis::Analysis;
use crate::intent::Intent;
use tracing::{debug, warn};

/// Produces the in-memory artifact tree of one family. Generators never touch disk.
pub trait ArtifactGenerator: Send + Sync {
    fn family(&self) -> ArtifactFamily;

    fn generate(
        &self,
        analysis: &Analysis,
        intent: &Intent,
        options: &GenerateOptions,
    ) -> Result<ArtifactSet, GenerateError>;
}

#[derive(Debug)]
pub struct FamilyOutcome {
    pub family: ArtifactFamily,
    pub result: Result<ArtifactSet, GenerateError>,
}

impl FamilyOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct GeneratorRegistry {
    generators: Vec<Box<dyn ArtifactGenerator>>,
}

impl GeneratorRegistry {
    /// A registry with no generators
    pub fn empty() -> Self {
        Self {
            generators: Vec::new(),
        }
    }

    /// One generator per family
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(TerraformGenerator::new()));
        registry.register(Box::new(KubernetesGenerator::new()));
        registry.register(Box::new(DockerGenerator::new()));
        registry.register(Box::new(CiGenerator::new()));
        registry.register(Box::new(MonitoringGenerator::new()));
        registry.register(Box::new(SecurityGenerator::new()));
        registry
    }

    /// Adds a generator, replacing any existing one for the same family
    pub fn register(&mut self, generator: Box<dyn ArtifactGenerator>) {
        let family = generator.family();
        self.generators.retain(|g| g.family() != family);
        self.generators.push(generator);
    }

    pub fn get(&self, family: ArtifactFamily) -> Option<&dyn ArtifactGenerator> {
        self.generators
            .iter()
            .find(|g| g.family() == family)
            .map(|g| g.as_ref())
    }

    pub fn families(&self) -> Vec<ArtifactFamily> {
        let mut families: Vec<ArtifactFamily> = self.generators.iter().map(|g| g.family()).collect();
        families.sort();
        families
    }

    /// Runs every selected family. One family failing never stops the rest.
    pub fn generate(
        &self,
        selection: &FamilySelection,
        analysis: &Analysis,
        intent: &Intent,
        options: &GenerateOptions,
    ) -> Vec<FamilyOutcome> {
        selection
            .families()
            .into_iter()
            .map(|family| {
                let result = match self.get(family) {
                    Some(generator) => generator.generate(analysis, intent, options),
                    None => Err(GenerateError::Unsupported {
                        family,
                        message: "no generator registered".to_string(),
                    }),
                };
                match &result {
                    Ok(set) => debug!(family = %family, files = set.len(), "Generated artifacts"),
                    Err(e) => warn!(family = %family, error = %e, "Generation failed"),
                }
                FamilyOutcome { family, result }
            })
            .collect()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
