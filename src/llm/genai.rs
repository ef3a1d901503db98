//! [`LLMClient`] over the `genai` crate
//!
//! One client type reaches Ollama, OpenAI, Anthropic, Gemini, xAI or Groq. genai
//! reads credentials from each provider's standard environment variable.

use super::client::{ChatMessage, LLMClient, LLMRequest, LLMResponse, MessageRole};
use super::error::BackendError;
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Overrides the provider endpoint, for proxies and self-hosted compatible servers
const BASE_URL_ENV: &str = "INFRAKIT_API_BASE_URL";

pub struct GenAIClient {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
}

fn endpoint_client(provider: AdapterKind, model: String, endpoint_url: String) -> Client {
    let resolver = ServiceTargetResolver::from_resolver_fn(
        move |_default: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let auth = provider
                .default_key_env_name()
                .map(AuthData::from_env)
                .unwrap_or_else(|| AuthData::from_single(""));
            Ok(ServiceTarget {
                endpoint: Endpoint::from_owned(endpoint_url.clone()),
                auth,
                model: ModelIden::new(provider, &model),
            })
        },
    );
    Client::builder().with_service_target_resolver(resolver).build()
}

impl GenAIClient {
    /// Building the client does no network I/O; failures surface on the first call.
    pub fn new(provider: AdapterKind, model: String, timeout: Duration) -> Self {
        let client = match std::env::var(BASE_URL_ENV) {
            Ok(url) => {
                debug!(provider = provider.as_str(), endpoint = %url, "Using custom endpoint");
                endpoint_client(provider, model.clone(), url)
            }
            Err(_) => Client::default(),
        };

        Self {
            client,
            model,
            provider,
            timeout,
        }
    }

    fn to_genai(message: &ChatMessage) -> GenAIChatMessage {
        match message.role {
            MessageRole::System => GenAIChatMessage::system(&message.content),
            MessageRole::User => GenAIChatMessage::user(&message.content),
        }
    }
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let start = Instant::now();
        let chat = ChatRequest::new(request.messages.iter().map(Self::to_genai).collect());

        let mut options = ChatOptions::default();
        if let Some(temperature) = request.temperature {
            options = options.with_temperature(temperature as f64);
        }
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }

        let call = self.client.exec_chat(&self.model, chat, Some(&options));
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                warn!(provider = self.provider.as_str(), seconds = self.timeout.as_secs(), "Backend timed out");
                BackendError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| BackendError::ApiError {
                message: format!("{} request failed: {}", self.provider.as_str(), e),
                status_code: None,
            })?;

        Ok(LLMResponse {
            content: response.first_text().unwrap_or_default().to_string(),
            elapsed: start.elapsed(),
        })
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
