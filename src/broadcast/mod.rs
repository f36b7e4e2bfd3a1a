//! Per-task progress event fan-out.
//!
//! The pipeline and queue never talk to a transport directly: they emit
//! through the [`ProgressBroadcaster`] trait and whoever holds a receiver
//! (the WebSocket handler, a test) observes. Delivery is best-effort and
//! at-most-once; subscribers joining after an emission see nothing
//! retroactively.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Buffered events per task channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 32;

/// An event observed by subscribers of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TaskEvent {
    Progress {
        step: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    Complete {
        report: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

/// Human-readable message for a pipeline step name.
///
/// Unrecognized names get a generic message rather than an error - the
/// mapping is presentation, not validation.
pub fn step_message(step: &str) -> &'static str {
    match step {
        "planning" => "Planning research strategy...",
        "searching" => "Searching the web for relevant sources...",
        "analyzing" => "Analyzing and synthesizing findings...",
        "generating" => "Generating comprehensive report...",
        _ => "Processing...",
    }
}

/// Fan-out seam between pipeline execution and observers.
pub trait ProgressBroadcaster: Send + Sync {
    /// Subscribe to a task's events. Only emissions after this call are seen.
    fn subscribe(&self, task_id: Uuid) -> broadcast::Receiver<TaskEvent>;

    /// Emit a stage-progress event
    fn emit_progress(&self, task_id: Uuid, step: &str);

    /// Emit the terminal completion event and drop the task's channel
    fn emit_complete(&self, task_id: Uuid, report: &str);

    /// Emit the terminal error event and drop the task's channel
    fn emit_error(&self, task_id: Uuid, error: &str);

    /// Drop the task's channel if no subscribers remain.
    ///
    /// Transports call this after dropping their receiver; without it a
    /// subscription to an already-finished task would leave an entry in the
    /// map forever.
    fn release(&self, task_id: Uuid);
}

/// In-process broadcaster backed by one tokio broadcast channel per task.
///
/// A task's channel lives from its first subscription until a terminal
/// emission or until the last subscriber releases it, whichever comes first.
#[derive(Default)]
pub struct ChannelBroadcaster {
    channels: RwLock<HashMap<Uuid, broadcast::Sender<TaskEvent>>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn send(&self, task_id: Uuid, event: TaskEvent) {
        // Fire-and-forget: no subscribers means the event is dropped.
        if let Some(sender) = self.channels.read().get(&task_id) {
            let _ = sender.send(event);
        }
    }

    fn close(&self, task_id: Uuid) {
        self.channels.write().remove(&task_id);
    }

    /// Number of tasks with a live channel (diagnostics and tests)
    pub fn active_channels(&self) -> usize {
        self.channels.read().len()
    }
}

impl ProgressBroadcaster for ChannelBroadcaster {
    fn subscribe(&self, task_id: Uuid) -> broadcast::Receiver<TaskEvent> {
        let mut channels = self.channels.write();
        channels
            .entry(task_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    fn emit_progress(&self, task_id: Uuid, step: &str) {
        self.send(
            task_id,
            TaskEvent::Progress {
                step: step.to_string(),
                message: step_message(step).to_string(),
                timestamp: Utc::now(),
            },
        );
    }

    fn emit_complete(&self, task_id: Uuid, report: &str) {
        self.send(
            task_id,
            TaskEvent::Complete {
                report: report.to_string(),
                timestamp: Utc::now(),
            },
        );
        self.close(task_id);
    }

    fn emit_error(&self, task_id: Uuid, error: &str) {
        self.send(
            task_id,
            TaskEvent::Error {
                error: error.to_string(),
                timestamp: Utc::now(),
            },
        );
        self.close(task_id);
    }

    fn release(&self, task_id: Uuid) {
        let mut channels = self.channels.write();
        // checked under the write lock, so a concurrent subscribe cannot
        // slip in between the count and the removal
        if let Some(sender) = channels.get(&task_id) {
            if sender.receiver_count() == 0 {
                channels.remove(&task_id);
            }
        }
    }
}

/// Shared trait-object handle used across the orchestrator and handlers.
pub type SharedBroadcaster = std::sync::Arc<dyn ProgressBroadcaster>;
