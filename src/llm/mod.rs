//! LLM client abstraction layer
//!
//! A trait-based abstraction over chat backends (GenAI, Mock) and the
//! [`Recommender`] seam the intent interpreter talks to.

mod client;
mod error;
mod genai;
mod mock;
mod recommender;
mod selector;

pub use client::{ChatMessage, LLMClient, LLMRequest, LLMResponse, MessageRole};
pub use error::BackendError;
pub use genai::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use recommender::{LlmRecommender, Recommender};
pub use selector::{select_recommender, SelectedRecommender};
