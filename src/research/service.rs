use crate::queue::{Job, JobQueue};
use crate::store::TaskStore;
use crate::types::{
    AppError, ResearchTask, ResearchTaskResponse, Result, TaskStatusResponse,
};
use std::sync::Arc;
use uuid::Uuid;

/// Accepted query length bounds, in chars.
const MIN_QUERY_LEN: usize = 5;
const MAX_QUERY_LEN: usize = 500;

/// Owns the durable task lifecycle from the client's point of view.
///
/// Mutation of a task record after creation happens only in the processor;
/// this service is validation, creation, enqueueing, and reads.
pub struct ResearchService {
    store: Arc<dyn TaskStore>,
    queue: JobQueue,
}

impl ResearchService {
    pub fn new(store: Arc<dyn TaskStore>, queue: JobQueue) -> Self {
        Self { store, queue }
    }

    /// Validate the query, create a pending task, and enqueue its job.
    ///
    /// Rejects queries outside 5-500 chars before any state is created.
    pub async fn start_research(&self, query: &str) -> Result<ResearchTask> {
        let len = query.chars().count();
        if !(MIN_QUERY_LEN..=MAX_QUERY_LEN).contains(&len) {
            return Err(AppError::InvalidInput(format!(
                "query must be between {} and {} characters",
                MIN_QUERY_LEN, MAX_QUERY_LEN
            )));
        }

        let task = self.store.create_task(query).await?;
        tracing::info!(task_id = %task.id, "research task created");

        self.queue
            .enqueue(Job {
                task_id: task.id,
                query: query.to_string(),
            })
            .await?;

        Ok(task)
    }

    /// Full task record with attached sources
    pub async fn get_research(&self, id: Uuid) -> Result<ResearchTaskResponse> {
        let task = self.store.get_task(id).await?;
        let sources = self.store.sources(id).await?;

        Ok(ResearchTaskResponse {
            id: task.id,
            query: task.query,
            status: task.status,
            progress: task.progress,
            report: task.report,
            error: task.error,
            created_at: task.created_at,
            completed_at: task.completed_at,
            sources,
        })
    }

    /// Lightweight status projection for polling clients
    pub async fn get_status(&self, id: Uuid) -> Result<TaskStatusResponse> {
        let task = self.store.get_task(id).await?;
        Ok(TaskStatusResponse {
            status: task.status,
            progress: task.progress,
            error: task.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTaskStore;
    use crate::types::TaskStatus;
    use rstest::rstest;

    fn service() -> (ResearchService, tokio::sync::mpsc::Receiver<Job>) {
        let (queue, rx) = JobQueue::new(8);
        (
            ResearchService::new(Arc::new(MemoryTaskStore::new()), queue),
            rx,
        )
    }

    #[tokio::test]
    async fn test_start_research_creates_pending_task_and_enqueues() {
        let (service, mut rx) = service();

        let task = service.start_research("what is a borrow checker").await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);

        let job = rx.recv().await.unwrap();
        assert_eq!(job.task_id, task.id);
        assert_eq!(job.query, "what is a borrow checker");
        // exactly one job
        assert!(rx.try_recv().is_err());
    }

    #[rstest]
    #[case("")]
    #[case("hey")]
    #[tokio::test]
    async fn test_too_short_query_rejected(#[case] query: &str) {
        let (service, mut rx) = service();
        let outcome = service.start_research(query).await;
        assert!(matches!(outcome, Err(AppError::InvalidInput(_))));
        // no task, no job
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_too_long_query_rejected() {
        let (service, _rx) = service();
        let query = "q".repeat(501);
        assert!(matches!(
            service.start_research(&query).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_boundary_lengths_accepted() {
        let (service, _rx) = service();
        assert!(service.start_research("12345").await.is_ok());
        assert!(service.start_research(&"q".repeat(500)).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_status_is_idempotent() {
        let (service, _rx) = service();
        let task = service.start_research("stable reads").await.unwrap();

        let first = service.get_status(task.id).await.unwrap();
        let second = service.get_status(task.id).await.unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.progress, second.progress);
        assert_eq!(first.error, second.error);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (service, _rx) = service();
        let missing = Uuid::new_v4();
        assert!(matches!(
            service.get_research(missing).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get_status(missing).await,
            Err(AppError::NotFound(_))
        ));
    }
}
