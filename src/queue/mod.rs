//! Durable-ish job queue and the research job processor.
//!
//! One job is enqueued per started task. Workers drain the queue and run
//! the agent pipeline with a retry policy around the whole execution:
//! up to [`MAX_ATTEMPTS`] attempts with exponential backoff starting at
//! [`BACKOFF_BASE`]. The task record is only marked `failed` once the final
//! attempt fails; earlier failures keep it `processing` through the backoff.

use crate::agent::{AgentPipeline, PipelineStep};
use crate::broadcast::SharedBroadcaster;
use crate::store::{TaskPatch, TaskStore};
use crate::types::{AppError, Result, TaskStatus};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Total execution attempts per job, including the first.
const MAX_ATTEMPTS: u32 = 3;
/// Delay before the second attempt; doubles per subsequent attempt.
const BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Queue envelope for one task execution.
#[derive(Debug, Clone)]
pub struct Job {
    pub task_id: Uuid,
    pub query: String,
}

/// A job that exhausted its attempts, parked for inspection.
#[derive(Debug, Clone)]
pub struct DeadJob {
    pub job: Job,
    pub attempts: u32,
    pub error: String,
}

/// Producer half of the job queue.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
}

impl JobQueue {
    /// Create a queue; the receiver goes to [`spawn_workers`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue a job for execution
    pub async fn enqueue(&self, job: Job) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| AppError::Internal("job queue is closed".to_string()))
    }
}

/// Stage -> task progress value. Progress is monotonically non-decreasing
/// across one attempt because stages run in a fixed order.
fn progress_for_step(step: PipelineStep) -> u8 {
    match step {
        PipelineStep::Planning => 20,
        PipelineStep::Searching => 40,
        PipelineStep::Analyzing => 70,
        PipelineStep::Generating => 95,
    }
}

/// Executes research jobs: owns the task lifecycle writes, drives the
/// pipeline, and broadcasts progress.
pub struct ResearchProcessor {
    store: Arc<dyn TaskStore>,
    pipeline: Arc<AgentPipeline>,
    broadcaster: SharedBroadcaster,
    dead_letters: Mutex<Vec<DeadJob>>,
}

impl ResearchProcessor {
    pub fn new(
        store: Arc<dyn TaskStore>,
        pipeline: Arc<AgentPipeline>,
        broadcaster: SharedBroadcaster,
    ) -> Self {
        Self {
            store,
            pipeline,
            broadcaster,
            dead_letters: Mutex::new(Vec::new()),
        }
    }

    /// Jobs that failed all attempts since startup
    pub fn dead_jobs(&self) -> Vec<DeadJob> {
        self.dead_letters.lock().clone()
    }

    /// Run a job to terminal success or failure, applying the retry policy.
    pub async fn process(&self, job: Job) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.run_attempt(&job).await {
                Ok(()) => {
                    tracing::info!(task_id = %job.task_id, attempt, "research complete");
                    return Ok(());
                }
                Err(err) if attempt < MAX_ATTEMPTS => {
                    let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                    tracing::warn!(
                        task_id = %job.task_id,
                        attempt,
                        error = %err,
                        retry_in_secs = delay.as_secs(),
                        "research attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::error!(
                        task_id = %job.task_id,
                        attempt,
                        error = %message,
                        "research failed, attempts exhausted"
                    );

                    self.store
                        .update_task(
                            job.task_id,
                            TaskPatch {
                                status: Some(TaskStatus::Failed),
                                error: Some(message.clone()),
                                completed_at: Some(Utc::now()),
                                ..TaskPatch::default()
                            },
                        )
                        .await?;
                    self.broadcaster.emit_error(job.task_id, &message);

                    self.dead_letters.lock().push(DeadJob {
                        job: job.clone(),
                        attempts: attempt,
                        error: message,
                    });
                    return Err(err);
                }
            }
        }
    }

    /// One execution attempt: processing transition, pipeline run,
    /// persistence of the outcome.
    async fn run_attempt(&self, job: &Job) -> Result<()> {
        self.store
            .update_task(
                job.task_id,
                TaskPatch {
                    status: Some(TaskStatus::Processing),
                    started_at: Some(Utc::now()),
                    ..TaskPatch::default()
                },
            )
            .await?;

        // The pipeline's progress callback is synchronous; stage signals are
        // forwarded through a channel and applied concurrently so the task
        // record and subscribers see each stage before the next one starts.
        let (step_tx, mut step_rx) = mpsc::unbounded_channel();
        let pipeline_run = self.pipeline.execute(&job.query, move |step| {
            let _ = step_tx.send(step);
        });

        let progress_writer = async {
            while let Some(step) = step_rx.recv().await {
                if let Err(err) = self
                    .store
                    .update_task(
                        job.task_id,
                        TaskPatch {
                            progress: Some(progress_for_step(step)),
                            ..TaskPatch::default()
                        },
                    )
                    .await
                {
                    tracing::warn!(task_id = %job.task_id, error = %err, "progress update failed");
                }
                self.broadcaster.emit_progress(job.task_id, step.as_str());
            }
        };

        let (state, ()) = tokio::join!(pipeline_run, progress_writer);
        let state = state?;

        for source in &state.search_results {
            self.store.add_source(job.task_id, source).await?;
        }

        self.store
            .update_task(
                job.task_id,
                TaskPatch {
                    status: Some(TaskStatus::Complete),
                    report: Some(state.report.clone()),
                    progress: Some(100),
                    completed_at: Some(Utc::now()),
                    ..TaskPatch::default()
                },
            )
            .await?;
        self.broadcaster.emit_complete(job.task_id, &state.report);

        Ok(())
    }
}

/// Spawn `count` workers draining the queue. Each job is delivered to
/// exactly one worker; distinct tasks run in parallel across workers.
pub fn spawn_workers(
    processor: Arc<ResearchProcessor>,
    rx: mpsc::Receiver<Job>,
    count: usize,
) -> Vec<tokio::task::JoinHandle<()>> {
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    (0..count)
        .map(|worker| {
            let processor = processor.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    let job = { rx.lock().await.recv().await };
                    match job {
                        Some(job) => {
                            tracing::debug!(worker, task_id = %job.task_id, "job picked up");
                            // terminal failure is already persisted and logged
                            let _ = processor.process(job).await;
                        }
                        None => break,
                    }
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentPipeline;
    use crate::broadcast::{ChannelBroadcaster, ProgressBroadcaster, TaskEvent};
    use crate::llm::LlmClient;
    use crate::search::{SearchAggregator, SearchClient};
    use crate::store::MemoryTaskStore;
    use crate::types::SearchResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubLlm {
        calls: AtomicU32,
        fail_generations: u32,
    }

    impl StubLlm {
        fn ok() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_generations: 0,
            }
        }

        fn always_failing() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_generations: u32::MAX,
            }
        }
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_generations {
                return Err(AppError::Llm("model overloaded".to_string()));
            }
            if prompt.starts_with("You are a research strategist") {
                Ok("Plan\n- first query\n- second query".to_string())
            } else {
                Ok("A first analysis block that is long enough to become a finding on its own."
                    .to_string())
            }
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubSearch;

    #[async_trait]
    impl SearchClient for StubSearch {
        async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
            Ok(vec![SearchResult {
                title: format!("result for {}", query),
                url: format!("https://example.com/{}", query.replace(' ', "-")),
                content: "indexed content".to_string(),
                snippet: None,
                score: Some(0.8),
            }])
        }
    }

    fn build_processor(llm: StubLlm) -> (Arc<ResearchProcessor>, Arc<MemoryTaskStore>, Arc<ChannelBroadcaster>) {
        let store = Arc::new(MemoryTaskStore::new());
        let broadcaster = Arc::new(ChannelBroadcaster::new());
        let pipeline = Arc::new(AgentPipeline::new(
            Arc::new(llm),
            SearchAggregator::new(Arc::new(StubSearch)),
        ));
        let processor = Arc::new(ResearchProcessor::new(
            store.clone(),
            pipeline,
            broadcaster.clone(),
        ));
        (processor, store, broadcaster)
    }

    #[test]
    fn test_progress_mapping() {
        assert_eq!(progress_for_step(PipelineStep::Planning), 20);
        assert_eq!(progress_for_step(PipelineStep::Searching), 40);
        assert_eq!(progress_for_step(PipelineStep::Analyzing), 70);
        assert_eq!(progress_for_step(PipelineStep::Generating), 95);
    }

    #[tokio::test]
    async fn test_successful_job_completes_task() {
        let (processor, store, broadcaster) = build_processor(StubLlm::ok());
        let task = store.create_task("how do rockets work").await.unwrap();
        let mut rx = broadcaster.subscribe(task.id);

        processor
            .process(Job {
                task_id: task.id,
                query: task.query.clone(),
            })
            .await
            .unwrap();

        let task = store.get_task(task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Complete);
        assert_eq!(task.progress, 100);
        assert!(task.report.as_deref().unwrap().starts_with("# Research Report:"));
        assert!(task.error.is_none());
        assert!(task.started_at.is_some());
        assert!(task.completed_at.is_some());

        // two extracted queries, distinct URLs, both persisted
        assert_eq!(store.sources(task.id).await.unwrap().len(), 2);

        // progress events in stage order, then the completion event
        let mut steps = Vec::new();
        loop {
            match rx.recv().await {
                Ok(TaskEvent::Progress { step, .. }) => steps.push(step),
                Ok(TaskEvent::Complete { .. }) => break,
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(steps, vec!["planning", "searching", "analyzing", "generating"]);
        assert!(processor.dead_jobs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_marks_failed_once() {
        let llm = StubLlm::always_failing();
        let (processor, store, broadcaster) = build_processor(llm);
        let task = store.create_task("doomed query").await.unwrap();
        let mut rx = broadcaster.subscribe(task.id);

        let outcome = processor
            .process(Job {
                task_id: task.id,
                query: task.query.clone(),
            })
            .await;
        assert!(outcome.is_err());

        let task = store.get_task(task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error.as_deref().unwrap().contains("model overloaded"));
        assert!(task.report.is_none());

        // the only event subscribers saw is the terminal error - intermediate
        // attempt failures are not broadcast
        match rx.recv().await.unwrap() {
            TaskEvent::Error { error, .. } => assert!(error.contains("model overloaded")),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx.recv().await.is_err());

        let dead = processor.dead_jobs();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].attempts, MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exactly_three_attempts() {
        let llm = StubLlm::always_failing();
        let store = Arc::new(MemoryTaskStore::new());
        let broadcaster = Arc::new(ChannelBroadcaster::new());
        let llm = Arc::new(llm);
        let pipeline = Arc::new(AgentPipeline::new(
            llm.clone(),
            SearchAggregator::new(Arc::new(StubSearch)),
        ));
        let processor = ResearchProcessor::new(store.clone(), pipeline, broadcaster);

        let task = store.create_task("q").await.unwrap();
        let _ = processor
            .process(Job {
                task_id: task.id,
                query: task.query,
            })
            .await;

        // planning fails on every attempt, so generate() is called once per attempt
        assert_eq!(llm.calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers_without_terminal_error() {
        // first generation fails, everything after succeeds
        let llm = StubLlm {
            calls: AtomicU32::new(0),
            fail_generations: 1,
        };
        let (processor, store, broadcaster) = build_processor(llm);
        let task = store.create_task("flaky upstream").await.unwrap();
        let mut rx = broadcaster.subscribe(task.id);

        processor
            .process(Job {
                task_id: task.id,
                query: task.query.clone(),
            })
            .await
            .unwrap();

        let task = store.get_task(task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Complete);
        assert!(task.error.is_none());

        // no Error event was broadcast for the failed first attempt
        loop {
            match rx.recv().await {
                Ok(TaskEvent::Error { .. }) => panic!("intermediate failure was broadcast"),
                Ok(TaskEvent::Complete { .. }) => break,
                Ok(TaskEvent::Progress { .. }) => {}
                Err(_) => break,
            }
        }
    }

    #[tokio::test]
    async fn test_workers_drain_queue() {
        let (processor, store, _broadcaster) = build_processor(StubLlm::ok());
        let (queue, rx) = JobQueue::new(16);
        let handles = spawn_workers(processor, rx, 2);

        let mut ids = Vec::new();
        for i in 0..3 {
            let task = store.create_task(&format!("query {}", i)).await.unwrap();
            queue
                .enqueue(Job {
                    task_id: task.id,
                    query: task.query.clone(),
                })
                .await
                .unwrap();
            ids.push(task.id);
        }

        drop(queue);
        for handle in handles {
            handle.await.unwrap();
        }

        for id in ids {
            assert_eq!(
                store.get_task(id).await.unwrap().status,
                TaskStatus::Complete
            );
        }
    }
}
