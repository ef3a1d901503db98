//! The single call the pipeline makes to an AI backend

use super::client::{ChatMessage, LLMClient, LLMRequest};
use super::error::BackendError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are an infrastructure planning assistant. \
Answer with a single JSON object when asked for structured output.";

/// `recommend(prompt, context) -> text`
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(
        &self,
        prompt: &str,
        context: &serde_json::Value,
    ) -> Result<String, BackendError>;

    fn name(&self) -> &str;
}

/// Recommender backed by any [`LLMClient`], bounded by a caller-side timeout
pub struct LlmRecommender {
    client: Arc<dyn LLMClient>,
    timeout: Duration,
}

impl LlmRecommender {
    pub fn new(client: Arc<dyn LLMClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Recommender for LlmRecommender {
    async fn recommend(
        &self,
        prompt: &str,
        context: &serde_json::Value,
    ) -> Result<String, BackendError> {
        let context_json =
            serde_json::to_string_pretty(context).map_err(|e| BackendError::Other {
                message: format!("Failed to serialize context: {}", e),
            })?;

        let request = LLMRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "{}\n\nProject context:\n```json\n{}\n```",
                prompt, context_json
            )),
        ])
        .with_temperature(0.1)
        .with_max_tokens(1024);

        debug!(
            backend = self.client.name(),
            model = self.client.model(),
            prompt_chars = prompt.len(),
            "Requesting recommendation"
        );

        match tokio::time::timeout(self.timeout, self.client.chat(request)).await {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BackendError::TimeoutError {
                seconds: self.timeout.as_secs(),
            }),
        }
    }

    fn name(&self) -> &str {
        self.client.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLLMClient, MockResponse};

    #[tokio::test]
    async fn test_recommend_embeds_prompt_and_context() {
        let client = Arc::new(MockLLMClient::new());
        client.add_response(MockResponse::text("{\"ok\": true}"));

        let recommender = LlmRecommender::new(client.clone(), Duration::from_secs(5));
        let text = recommender
            .recommend("plan it", &serde_json::json!({"tech_stack": ["React"]}))
            .await
            .unwrap();

        assert_eq!(text, "{\"ok\": true}");
        let prompts = client.prompts();
        let user = &prompts[0];
        assert!(user.starts_with("plan it"));
        assert!(user.contains("\"React\""));
    }

    #[tokio::test]
    async fn test_recommend_times_out() {
        let client = Arc::new(MockLLMClient::new());
        client.add_response(MockResponse::text("late").delayed(Duration::from_millis(500)));

        let recommender = LlmRecommender::new(client, Duration::from_millis(20));
        let result = recommender.recommend("p", &serde_json::json!({})).await;

        assert!(matches!(result, Err(BackendError::TimeoutError { .. })));
    }
}
