//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { stage } => {
                debug!(%stage, "Stage started");
            }
            ProgressEvent::StageComplete { stage, duration } => {
                info!(
                    %stage,
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::StageDegraded { stage, reason } => {
                warn!(%stage, reason = %reason, "Stage continued with degraded input");
            }
            ProgressEvent::FamilyComplete {
                family,
                files_written,
                files_unchanged,
            } => {
                info!(
                    family = %family,
                    files_written,
                    files_unchanged,
                    "Artifact family written"
                );
            }
            ProgressEvent::FamilyFailed { family, error } => {
                warn!(family = %family, error = %error, "Artifact family failed");
            }
        }
    }
}
