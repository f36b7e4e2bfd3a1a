//! Task persistence seam.
//!
//! Storage engine internals are an external concern; the orchestrator only
//! needs a keyed record store with create/partial-update/find-by-id plus
//! attached source records. [`TaskStore`] is that seam and
//! [`MemoryTaskStore`] the in-process implementation a SQL-backed client
//! would replace.

use crate::types::{
    AppError, ResearchTask, Result, SearchResult, TaskSource, TaskStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Partial update applied to a task record. `None` fields are left as-is,
/// mirroring a partial database UPDATE.
#[derive(Debug, Default, Clone)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub report: Option<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Durable task record store.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a pending task for a query (progress 0)
    async fn create_task(&self, query: &str) -> Result<ResearchTask>;

    /// Apply a partial update to a task
    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> Result<()>;

    /// Fetch a task by id
    async fn get_task(&self, id: Uuid) -> Result<ResearchTask>;

    /// Attach a source record to a task
    async fn add_source(&self, task_id: Uuid, source: &SearchResult) -> Result<()>;

    /// All sources attached to a task, in insertion order
    async fn sources(&self, task_id: Uuid) -> Result<Vec<TaskSource>>;
}

/// In-memory task store. Ephemeral; lost on restart.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, ResearchTask>>,
    sources: RwLock<HashMap<Uuid, Vec<TaskSource>>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create_task(&self, query: &str) -> Result<ResearchTask> {
        let task = ResearchTask {
            id: Uuid::new_v4(),
            query: query.to_string(),
            status: TaskStatus::Pending,
            progress: 0,
            report: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.tasks.write().insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> Result<()> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Research task {} not found", id)))?;

        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(progress) = patch.progress {
            task.progress = progress;
        }
        if let Some(report) = patch.report {
            task.report = Some(report);
        }
        if let Some(error) = patch.error {
            task.error = Some(error);
        }
        if let Some(started_at) = patch.started_at {
            task.started_at = Some(started_at);
        }
        if let Some(completed_at) = patch.completed_at {
            task.completed_at = Some(completed_at);
        }

        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<ResearchTask> {
        self.tasks
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Research task {} not found", id)))
    }

    async fn add_source(&self, task_id: Uuid, source: &SearchResult) -> Result<()> {
        let record = TaskSource {
            task_id,
            title: source.title.clone(),
            url: source.url.clone(),
            content: source.content.clone(),
            snippet: source.snippet.clone(),
            relevance_score: source.score.unwrap_or(0.0),
        };
        self.sources.write().entry(task_id).or_default().push(record);
        Ok(())
    }

    async fn sources(&self, task_id: Uuid) -> Result<Vec<TaskSource>> {
        Ok(self
            .sources
            .read()
            .get(&task_id)
            .cloned()
            .unwrap_or_default())
    }
}
