//! Explicit account context threaded through inventory, analysis and generation

use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_INVENTORY_TIMEOUT_SECS: u64 = 20;

/// The cloud account a run is scoped to.
///
/// Nothing in the pipeline reads the active account or region from globals; every
/// consumer receives this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    /// Account or profile name; `None` means no cloud account is configured
    pub account: Option<String>,
    pub region: String,
    /// Upper bound for a single inventory category call
    pub timeout: Duration,
}

impl AccountContext {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            region: region.into(),
            timeout: Duration::from_secs(DEFAULT_INVENTORY_TIMEOUT_SECS),
        }
    }

    /// A context with no account; inventory is skipped entirely
    pub fn unconfigured() -> Self {
        Self {
            account: None,
            region: DEFAULT_REGION.to_string(),
            timeout: Duration::from_secs(DEFAULT_INVENTORY_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.account
            .as_deref()
            .map(|a| !a.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for AccountContext {
    fn default() -> Self {
        Self::unconfigured()
    }
}
