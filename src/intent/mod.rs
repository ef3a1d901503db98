//! Goal text → normalized [`Intent`]
//!
//! The pipeline always goes through [`FallbackInterpreter`], so callers get the same
//! shape whichever path produced it.

pub mod confirm;
mod fallback;
mod keyword;
pub mod prompt;
mod recommendation;
pub mod response;
pub mod rules;
pub mod types;

pub use confirm::{AlwaysDecline, AutoConfirm, ConfirmError, Confirmer, TerminalConfirmer};
pub use fallback::FallbackInterpreter;
pub use keyword::KeywordInterpreter;
pub use recommendation::RecommendationInterpreter;
pub use types::{Component, Environment, Intent, IntentError};

use crate::analysis::Analysis;
use crate::llm::BackendError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("Recommendation backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Recommendation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("No structured block in the recommendation")]
    NoStructuredBlock,

    #[error("Malformed structured block: {0}")]
    MalformedBlock(String),

    #[error("Missing field '{0}' in the structured block")]
    MissingField(&'static str),

    #[error("Unknown value '{value}' for '{field}'")]
    InvalidValue { field: &'static str, value: String },

    #[error(transparent)]
    Intent(#[from] IntentError),
}

#[async_trait]
pub trait IntentInterpreter: Send + Sync {
    async fn interpret(&self, goal: &str, analysis: &Analysis) -> Result<Intent, InterpretError>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: IntentInterpreter + ?Sized> IntentInterpreter for Box<T> {
    async fn interpret(&self, goal: &str, analysis: &Analysis) -> Result<Intent, InterpretError> {
        (**self).interpret(goal, analysis).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
