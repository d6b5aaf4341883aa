use tracing::{error, info};

use super::Stage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageStatus {
    Started,
    Completed,
    Failed,
}

/// Progress signal emitted by a stage wrapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageEvent {
    pub stage: Stage,
    pub status: StageStatus,
    /// Human-readable announcement, e.g. "Writing out metadata locally...".
    pub message: String,
    /// Display form of the error for [`StageStatus::Failed`].
    pub error: Option<String>,
}

/// Receives stage announcements.
pub trait StageObserver: Send + Sync {
    fn on_event(&self, event: &StageEvent);
}

/// Observer that reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_event(&self, event: &StageEvent) {
        match event.status {
            StageStatus::Started => info!(stage = %event.stage, "{}", event.message),
            StageStatus::Completed => info!(stage = %event.stage, "{}Complete.", event.message),
            StageStatus::Failed => error!(
                stage = %event.stage,
                error = event.error.as_deref().unwrap_or("unknown"),
                "{}Failed.",
                event.message
            ),
        }
    }
}
