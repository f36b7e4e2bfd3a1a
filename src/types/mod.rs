//! Core types (requests, responses, domain records, errors).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartResearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResearchTaskResponse {
    pub id: Uuid,
    pub query: String,
    pub status: TaskStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sources: Vec<TaskSource>,
}

impl From<ResearchTask> for ResearchTaskResponse {
    fn from(task: ResearchTask) -> Self {
        Self {
            id: task.id,
            query: task.query,
            status: task.status,
            progress: task.progress,
            report: task.report,
            error: task.error,
            created_at: task.created_at,
            completed_at: task.completed_at,
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskStatusResponse {
    pub status: TaskStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============= Task Types =============

/// Lifecycle of a research task.
///
/// Transitions are strictly `Pending -> Processing -> {Complete, Failed}`;
/// the two terminal states are never left once entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl TaskStatus {
    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Complete | TaskStatus::Failed)
    }
}

/// Durable record of one research request and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResearchTask {
    pub id: Uuid,
    pub query: String,
    pub status: TaskStatus,
    /// 0-100, monotonically non-decreasing within one execution attempt
    pub progress: u8,
    pub report: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A persisted source attached to a completed task.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskSource {
    pub task_id: Uuid,
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    pub relevance_score: f32,
}

// ============= Search Types =============

/// A single web search hit. Immutable once produced; `url` is the
/// deduplication key across queries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Llm(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Search(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Pipeline(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
