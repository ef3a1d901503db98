use crate::config::InfrakitConfig;
use crate::llm::{GenAIClient, LlmRecommender, Recommender};
use genai::adapter::AdapterKind;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SelectedRecommender {
    pub recommender: Arc<dyn Recommender>,
    pub provider: AdapterKind,
    pub description: String,
}

/// Builds the recommender for the configured provider.
///
/// Returns `None` when AI is disabled or the provider's credential variable is
/// unset; interpretation then runs on keywords alone.
pub fn select_recommender(config: &InfrakitConfig) -> Option<SelectedRecommender> {
    let provider = match config.provider {
        Some(provider) => provider,
        None => {
            debug!("No recommendation provider configured");
            return None;
        }
    };

    if !provider_has_credentials(provider) {
        info!(
            "Skipping {} - no credentials available, using keyword interpretation",
            provider
        );
        return None;
    }

    let timeout = config.request_timeout();
    let client = GenAIClient::new(provider, config.model.clone(), timeout);
    info!("Using recommendation provider: {} ({})", provider, config.model);

    Some(SelectedRecommender {
        recommender: Arc::new(LlmRecommender::new(Arc::new(client), timeout)),
        provider,
        description: format!("{} ({})", provider, config.model),
    })
}

fn provider_has_credentials(provider: AdapterKind) -> bool {
    match provider.default_key_env_name() {
        None => true,
        Some(env_var) => std::env::var(env_var).is_ok(),
    }
}
