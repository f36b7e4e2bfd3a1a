//! # Scryer - Deep Research Server
//!
//! A research server that turns a natural-language query into a cited
//! report: it plans sub-queries with an LLM, fans out web searches,
//! deduplicates and analyzes the results, and assembles a structured
//! report - while streaming step-level progress to subscribers and
//! persisting final state for later retrieval.
//!
//! ## Overview
//!
//! Scryer can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `scryer-server` binary
//! 2. **As a library** - Import components into your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use scryer::{
//!     agent::AgentPipeline,
//!     llm::GroqClient,
//!     search::{SearchAggregator, TavilyClient},
//! };
//! use std::sync::Arc;
//!
//! let llm = Arc::new(GroqClient::new(groq_key, "llama-3.3-70b-versatile".into()));
//! let aggregator = SearchAggregator::new(Arc::new(TavilyClient::new(tavily_key)));
//! let pipeline = AgentPipeline::new(llm, aggregator);
//!
//! let state = pipeline.execute("how do CRDTs converge", |step| {
//!     println!("running: {}", step.as_str());
//! }).await?;
//! println!("{}", state.report);
//! ```
//!
//! ## Architecture
//!
//! - A task is created `pending` and a job queued for it.
//! - A worker picks the job up, marks the task `processing`, and runs the
//!   four-stage pipeline (plan, search, analyze, report), broadcasting each
//!   stage to WebSocket subscribers of the task.
//! - Success persists the report and sources (`complete`); a job that fails
//!   all retry attempts records the last error (`failed`).
//!
//! ## Modules
//!
//! - [`agent`] - The four-stage research pipeline
//! - [`api`] - REST + WebSocket handlers and routes
//! - [`broadcast`] - Per-task progress event fan-out
//! - [`llm`] - LLM client trait and the Groq provider
//! - [`queue`] - Job queue, workers, retry policy
//! - [`research`] - Task lifecycle service
//! - [`search`] - Search client trait, Tavily provider, aggregation
//! - [`store`] - Task persistence seam and in-memory store
//! - [`types`] - Common types and error handling

#![warn(missing_docs)]

/// The four-stage research agent pipeline.
pub mod agent;
/// HTTP API handlers and routes.
pub mod api;
/// Progress event fan-out to subscribers.
pub mod broadcast;
/// LLM provider clients and abstractions.
pub mod llm;
/// Job queue, worker pool and retry policy.
pub mod queue;
/// Research task lifecycle service.
pub mod research;
/// Web search clients and aggregation.
pub mod search;
/// Task persistence.
pub mod store;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use agent::{AgentPipeline, PipelineStep, ResearchState};
pub use broadcast::{ChannelBroadcaster, ProgressBroadcaster, TaskEvent};
pub use llm::{GroqClient, LlmClient};
pub use queue::{Job, JobQueue, ResearchProcessor};
pub use research::ResearchService;
pub use search::{SearchAggregator, SearchClient, TavilyClient};
pub use store::{MemoryTaskStore, TaskStore};
pub use types::{AppError, Result};
pub use utils::Config;

use broadcast::SharedBroadcaster;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Task lifecycle service (start / fetch / status)
    pub research: Arc<ResearchService>,
    /// Progress broadcaster the WebSocket endpoint subscribes through
    pub broadcaster: SharedBroadcaster,
}
