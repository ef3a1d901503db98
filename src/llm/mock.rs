use super::client::{LLMClient, LLMRequest, LLMResponse};
use super::error::BackendError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    Error(BackendError),
    /// Waits before yielding the inner reply, for exercising caller-side timeouts
    Delayed(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        MockResponse::Text(content.into())
    }

    pub fn error(error: BackendError) -> Self {
        MockResponse::Error(error)
    }

    pub fn delayed(self, delay: Duration) -> Self {
        MockResponse::Delayed(delay, Box::new(self))
    }
}

/// Replays scripted replies in order and keeps every prompt it was sent.
/// An exhausted script answers with `BackendError::Other`.
#[derive(Debug, Default)]
pub struct MockLLMClient {
    script: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn add_response(&self, response: MockResponse) {
        lock(&self.script).push_back(response);
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }

    /// User prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let start = Instant::now();
        lock(&self.prompts).push(request.prompt().unwrap_or_default().to_string());

        let mut next = lock(&self.script)
            .pop_front()
            .ok_or_else(|| BackendError::Other {
                message: "mock script exhausted".to_string(),
            })?;

        loop {
            match next {
                MockResponse::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    next = *inner;
                }
                MockResponse::Error(error) => return Err(error),
                MockResponse::Text(content) => {
                    return Ok(LLMResponse {
                        content,
                        elapsed: start.elapsed(),
                    })
                }
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn ask(text: &str) -> LLMRequest {
        LLMRequest::new(vec![ChatMessage::system("sys"), ChatMessage::user(text)])
    }

    #[tokio::test]
    async fn test_replays_in_order_and_records_prompts() {
        let client = MockLLMClient::scripted([MockResponse::text("first"), MockResponse::text("second")]);

        assert_eq!(client.chat(ask("a")).await.unwrap().content, "first");
        assert_eq!(client.remaining(), 1);
        assert_eq!(client.chat(ask("b")).await.unwrap().content, "second");
        assert_eq!(client.prompts(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::error(BackendError::TimeoutError { seconds: 30 }));

        let result = client.chat(ask("x")).await;
        assert!(matches!(result, Err(BackendError::TimeoutError { seconds: 30 })));
    }

    #[tokio::test]
    async fn test_exhausted_script_fails() {
        let client = MockLLMClient::new();
        assert!(client.chat(ask("x")).await.is_err());
        assert_eq!(client.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_delayed_reply_arrives() {
        let client = MockLLMClient::scripted([MockResponse::text("late").delayed(Duration::from_millis(5))]);
        let response = client.chat(ask("x")).await.unwrap();
        assert_eq!(response.content, "late");
        assert!(response.elapsed >= Duration::from_millis(5));
    }
}
