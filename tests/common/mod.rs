//! Shared mock collaborators for integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

use scryer::{
    AgentPipeline, AppState, ChannelBroadcaster, JobQueue, MemoryTaskStore, ResearchProcessor,
    ResearchService, SearchAggregator,
    broadcast::SharedBroadcaster,
    llm::LlmClient,
    queue::spawn_workers,
    search::SearchClient,
    store::{TaskPatch, TaskStore},
    types::{AppError, ResearchTask, Result, SearchResult, TaskSource},
};

// ============= Mock LLM =============

/// LLM that recognizes the planning prompt and otherwise answers with a
/// fixed analysis; optionally fails the first N generations.
pub struct MockLlm {
    pub calls: AtomicU32,
    pub fail_first: u32,
    pub plan: String,
}

impl MockLlm {
    pub fn healthy() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_first: 0,
            plan: "Plan:\n- rust futures\n- tokio scheduler".to_string(),
        }
    }

    pub fn always_failing() -> Self {
        Self {
            fail_first: u32::MAX,
            ..Self::healthy()
        }
    }

    pub fn with_plan(plan: &str) -> Self {
        Self {
            plan: plan.to_string(),
            ..Self::healthy()
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(AppError::Llm("model temporarily unavailable".to_string()));
        }
        if prompt.starts_with("You are a research strategist") {
            Ok(self.plan.clone())
        } else {
            Ok("First analysis block with more than enough text to qualify as a finding.\n\n\
                Second analysis block, also comfortably past the length threshold for findings."
                .to_string())
        }
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

// ============= Mock search =============

/// Search returning one deterministic result per query; specific queries
/// can be made to fail.
pub struct MockSearch {
    pub failing_queries: Vec<String>,
    pub search_calls: AtomicU32,
}

impl MockSearch {
    pub fn healthy() -> Self {
        Self {
            failing_queries: Vec::new(),
            search_calls: AtomicU32::new(0),
        }
    }

    pub fn failing_on(query: &str) -> Self {
        Self {
            failing_queries: vec![query.to_string()],
            search_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl SearchClient for MockSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_queries.iter().any(|q| q == query) {
            return Err(AppError::Search("search provider unavailable".to_string()));
        }
        let mut results = vec![SearchResult {
            title: format!("Result for {}", query),
            url: format!("https://example.com/{}", query.replace(' ', "-")),
            content: format!("Indexed content about {}", query),
            snippet: None,
            score: Some(0.9),
        }];
        results.truncate(max_results);
        Ok(results)
    }
}

// ============= Recording store =============

/// Wraps the in-memory store and records every progress value written, so
/// tests can assert the exact monotonic sequence.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryTaskStore,
    progress_log: Mutex<HashMap<Uuid, Vec<u8>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress_values(&self, task_id: Uuid) -> Vec<u8> {
        self.progress_log
            .lock()
            .get(&task_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl TaskStore for RecordingStore {
    async fn create_task(&self, query: &str) -> Result<ResearchTask> {
        self.inner.create_task(query).await
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> Result<()> {
        if let Some(progress) = patch.progress {
            self.progress_log.lock().entry(id).or_default().push(progress);
        }
        self.inner.update_task(id, patch).await
    }

    async fn get_task(&self, id: Uuid) -> Result<ResearchTask> {
        self.inner.get_task(id).await
    }

    async fn add_source(&self, task_id: Uuid, source: &SearchResult) -> Result<()> {
        self.inner.add_source(task_id, source).await
    }

    async fn sources(&self, task_id: Uuid) -> Result<Vec<TaskSource>> {
        self.inner.sources(task_id).await
    }
}

// ============= Wiring =============

pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<RecordingStore>,
    pub broadcaster: Arc<ChannelBroadcaster>,
    pub processor: Arc<ResearchProcessor>,
    pub llm: Arc<MockLlm>,
    pub search: Arc<MockSearch>,
    pub workers: Vec<tokio::task::JoinHandle<()>>,
}

/// Full application wiring over mock collaborators, workers running.
pub fn harness(llm: MockLlm, search: MockSearch) -> TestHarness {
    let llm = Arc::new(llm);
    let search = Arc::new(search);
    let store = Arc::new(RecordingStore::new());
    let broadcaster = Arc::new(ChannelBroadcaster::new());
    let pipeline = Arc::new(AgentPipeline::new(
        llm.clone() as Arc<dyn LlmClient>,
        SearchAggregator::new(search.clone() as Arc<dyn SearchClient>),
    ));

    let (queue, jobs) = JobQueue::new(16);
    let processor = Arc::new(ResearchProcessor::new(
        store.clone(),
        pipeline,
        broadcaster.clone() as SharedBroadcaster,
    ));
    let workers = spawn_workers(processor.clone(), jobs, 2);

    let state = AppState {
        research: Arc::new(ResearchService::new(store.clone(), queue)),
        broadcaster: broadcaster.clone(),
    };

    TestHarness {
        state,
        store,
        broadcaster,
        processor,
        llm,
        search,
        workers,
    }
}

/// A timestamp helper some assertions use.
pub fn recent(ts: DateTime<Utc>) -> bool {
    (Utc::now() - ts).num_seconds().abs() < 60
}
