//! Configuration for infrakit
//!
//! Settings load from environment variables with defaults; command-line flags
//! override them afterwards.
//!
//! # Environment Variables
//!
//! - `INFRAKIT_PROVIDER`: recommendation backend (ollama|openai|anthropic|gemini|xai|groq); unset disables AI
//! - `INFRAKIT_MODEL`: model name - default: "qwen2.5-coder:7b" for Ollama
//! - `INFRAKIT_REQUEST_TIMEOUT`: recommendation timeout in seconds - default: "30"
//! - `INFRAKIT_ACCOUNT`: cloud account or profile; enables the inventory
//! - `INFRAKIT_REGION`: region - default: "us-east-1"
//! - `INFRAKIT_INVENTORY_FILE`: JSON or YAML snapshot read by the inventory
//! - `INFRAKIT_INVENTORY_TIMEOUT`: per-category inventory timeout in seconds - default: "20"
//! - `INFRAKIT_PROBE_PORTS`: probe listening sockets (true|false) - default: "true"
//! - `INFRAKIT_OUTPUT_DIR`: output root - default: "infrakit-out"
//! - `INFRAKIT_LOG_LEVEL`: logging level - default: "info"
//! - `INFRAKIT_LOG_JSON`: JSON log lines (true|false) - default: "false"
//!
//! Provider credentials (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `OLLAMA_HOST`, ...) are
//! read by genai directly.
//!
//! # Example
//!
//! ```no_run
//! use infrakit::InfrakitConfig;
//!
//! let config = InfrakitConfig::default();
//! config.validate().expect("Invalid configuration");
//! let ctx = config.account_context();
//! ```

use crate::context::{AccountContext, DEFAULT_REGION};
use crate::output::DEFAULT_OUTPUT_DIR;
use genai::adapter::AdapterKind;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INVENTORY_TIMEOUT_SECS: u64 = 20;
const MAX_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: ollama, openai, anthropic, gemini, xai, groq")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Accepts genai adapter names plus the `claude` and `grok` aliases
pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    let lower = name.trim().to_lowercase();
    let canonical = match lower.as_str() {
        "claude" => "anthropic",
        "grok" => "xai",
        other => other,
    };
    AdapterKind::from_lower_str(canonical).ok_or_else(|| ConfigError::InvalidProvider(name.to_string()))
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_secs(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct InfrakitConfig {
    /// `None` disables the recommendation backend; keyword interpretation only
    pub provider: Option<AdapterKind>,
    pub model: String,
    pub request_timeout_secs: u64,
    pub account: Option<String>,
    pub region: String,
    pub inventory_file: Option<PathBuf>,
    pub inventory_timeout_secs: u64,
    pub probe_ports: bool,
    pub output_dir: PathBuf,
    /// trace, debug, info, warn, error
    pub log_level: String,
    pub log_json: bool,
}

impl Default for InfrakitConfig {
    /// Reads `INFRAKIT_*` variables, falling back to defaults. An unrecognized
    /// provider name leaves AI disabled.
    fn default() -> Self {
        let provider = env_string("INFRAKIT_PROVIDER").and_then(|p| parse_provider(&p).ok());
        let model = env_string("INFRAKIT_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());

        Self {
            provider,
            model,
            request_timeout_secs: env_secs("INFRAKIT_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS),
            account: env_string("INFRAKIT_ACCOUNT"),
            region: env_string("INFRAKIT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            inventory_file: env_string("INFRAKIT_INVENTORY_FILE").map(PathBuf::from),
            inventory_timeout_secs: env_secs("INFRAKIT_INVENTORY_TIMEOUT", DEFAULT_INVENTORY_TIMEOUT_SECS),
            probe_ports: env_flag("INFRAKIT_PROBE_PORTS", true),
            output_dir: env_string("INFRAKIT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            log_level: env::var("INFRAKIT_LOG_LEVEL")
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
            log_json: env_flag("INFRAKIT_LOG_JSON", false),
        }
    }
}

impl InfrakitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secs) in [
            ("Request timeout", self.request_timeout_secs),
            ("Inventory timeout", self.inventory_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be at least 1 second",
                    name
                )));
            }
            if secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} cannot exceed 10 minutes",
                    name
                )));
            }
        }

        if self.region.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("Region cannot be empty".to_string()));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The account scope handed to inventory, analysis and generation
    pub fn account_context(&self) -> AccountContext {
        let ctx = match &self.account {
            Some(account) => AccountContext::new(account.clone(), self.region.clone()),
            None => AccountContext {
                region: self.region.clone(),
                ..AccountContext::unconfigured()
            },
        };
        ctx.with_timeout(Duration::from_secs(self.inventory_timeout_secs))
    }

    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(
            "provider".to_string(),
            self.provider
                .map(|p| p.as_str().to_string())
                .unwrap_or_else(|| "none".to_string()),
        );
        map.insert("model".to_string(), self.model.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        if let Some(account) = &self.account {
            map.insert("account".to_string(), account.clone());
        }
        map.insert("region".to_string(), self.region.clone());
        if let Some(file) = &self.inventory_file {
            map.insert("inventory_file".to_string(), file.display().to_string());
        }
        map.insert(
            "inventory_timeout_secs".to_string(),
            self.inventory_timeout_secs.to_string(),
        );
        map.insert("probe_ports".to_string(), self.probe_ports.to_string());
        map.insert("output_dir".to_string(), self.output_dir.display().to_string());
        map.insert("log_level".to_string(), self.log_level.clone());
        map.insert("log_json".to_string(), self.log_json.to_string());
        map
    }
}

impl fmt::Display for InfrakitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Infrakit Configuration:")?;
        for (key, value) in self.to_display_map() {
            writeln!(f, "  {}: {}", key, value)?;
        }
        Ok(())
    }
}
