//! Deterministic keyword interpretation

use super::rules::{tokenize, COMPONENT_RULES, ENVIRONMENT_RULES, FAMILY_RULES};
use super::types::{Component, Environment, Intent};
use super::{IntentInterpreter, InterpretError};
use crate::analysis::Analysis;
use crate::generate::ArtifactFamily;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

/// Keyword tables over the goal text. Always returns an intent.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordInterpreter;

impl KeywordInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Infallible form of [`IntentInterpreter::interpret`]
    pub fn interpret_goal(&self, goal: &str, analysis: &Analysis) -> Intent {
        let tokens = tokenize(goal);

        let mut environments = ENVIRONMENT_RULES.matches(&tokens);
        if environments.is_empty() {
            environments = vec![Environment::Dev, Environment::Prod];
        }

        let mut components: Vec<Component> = Component::DEFAULTS.to_vec();
        components.extend(COMPONENT_RULES.matches(&tokens));
        if analysis.has_database() {
            components.push(Component::Database);
        }

        let family = FAMILY_RULES
            .matches(&tokens)
            .first()
            .copied()
            .unwrap_or(ArtifactFamily::Provisioning);

        debug!(
            tokens = tokens.len(),
            environments = ?environments,
            family = %family,
            "Keyword interpretation"
        );

        let summary = if goal.trim().is_empty() {
            String::new()
        } else {
            goal.trim().to_string()
        };

        Intent::new(environments, components, BTreeMap::new(), family, summary.clone())
            .unwrap_or_else(|_| Intent::baseline(family, summary))
    }
}

#[async_trait]
impl IntentInterpreter for KeywordInterpreter {
    async fn interpret(&self, goal: &str, analysis: &Analysis) -> Result<Intent, InterpretError> {
        Ok(self.interpret_goal(goal, analysis))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
