//! Interpretation through the recommendation backend

use super::prompt::{analysis_context, build_prompt};
use super::response::parse_intent;
use super::types::Intent;
use super::{IntentInterpreter, InterpretError};
use crate::analysis::Analysis;
use crate::llm::Recommender;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct RecommendationInterpreter {
    recommender: Arc<dyn Recommender>,
    timeout: Duration,
}

impl RecommendationInterpreter {
    pub fn new(recommender: Arc<dyn Recommender>, timeout: Duration) -> Self {
        Self {
            recommender,
            timeout,
        }
    }
}

#[async_trait]
impl IntentInterpreter for RecommendationInterpreter {
    async fn interpret(&self, goal: &str, analysis: &Analysis) -> Result<Intent, InterpretError> {
        let start = Instant::now();
        let prompt = build_prompt(goal);
        let context = analysis_context(analysis);

        let response = tokio::time::timeout(self.timeout, self.recommender.recommend(&prompt, &context))
            .await
            .map_err(|_| InterpretError::Timeout {
                seconds: self.timeout.as_secs(),
            })??;

        debug!(
            backend = self.recommender.name(),
            response_chars = response.len(),
            "Received recommendation"
        );

        let intent = parse_intent(&response)?;
        info!(
            backend = self.recommender.name(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Intent interpreted from recommendation"
        );
        Ok(intent)
    }

    fn name(&self) -> &str {
        "recommendation"
    }
}
