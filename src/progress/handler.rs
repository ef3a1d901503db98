//! Progress handler trait and events

use crate::error::Stage;
use std::time::Duration;

/// Events emitted while the pipeline runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A pipeline stage started
    StageStarted { stage: Stage },

    /// A pipeline stage finished
    StageComplete { stage: Stage, duration: Duration },

    /// A stage finished but used degraded input (empty inventory, fallback interpretation)
    StageDegraded { stage: Stage, reason: String },

    /// One artifact family was generated and written
    FamilyComplete {
        family: String,
        files_written: usize,
        files_unchanged: usize,
    },

    /// One artifact family failed; others continue
    FamilyFailed { family: String, error: String },
}

/// Trait for handling pipeline progress events
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
