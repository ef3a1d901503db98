use super::keyword::KeywordInterpreter;
use super::types::Intent;
use super::{IntentInterpreter, InterpretError};
use crate::analysis::Analysis;
use async_trait::async_trait;
use tracing::warn;

/// Primary interpreter with a fallback taken on any primary error
pub struct FallbackInterpreter<P, F = KeywordInterpreter> {
    primary: P,
    fallback: F,
}

impl<P: IntentInterpreter> FallbackInterpreter<P, KeywordInterpreter> {
    pub fn with_keywords(primary: P) -> Self {
        Self::new(primary, KeywordInterpreter)
    }
}

impl<P: IntentInterpreter, F: IntentInterpreter> FallbackInterpreter<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P: IntentInterpreter, F: IntentInterpreter> IntentInterpreter for FallbackInterpreter<P, F> {
    async fn interpret(&self, goal: &str, analysis: &Analysis) -> Result<Intent, InterpretError> {
        match self.primary.interpret(goal, analysis).await {
            Ok(intent) => Ok(intent),
            Err(e) => {
                warn!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "Primary interpretation failed; using fallback"
                );
                self.fallback.interpret(goal, analysis).await
            }
        }
    }

    fn name(&self) -> &str {
        self.primary.name()
    }
}
