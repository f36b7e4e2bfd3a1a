use crate::{
    AppState,
    types::{
        Result, ResearchTaskResponse, StartResearchRequest, TaskStatusResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

/// Start a research task
#[utoipa::path(
    post,
    path = "/api/research",
    request_body = StartResearchRequest,
    responses(
        (status = 200, description = "Task created and queued", body = ResearchTaskResponse),
        (status = 400, description = "Invalid query")
    ),
    tag = "research"
)]
pub async fn start_research(
    State(state): State<AppState>,
    Json(payload): Json<StartResearchRequest>,
) -> Result<Json<ResearchTaskResponse>> {
    let task = state.research.start_research(&payload.query).await?;
    Ok(Json(task.into()))
}

/// Fetch a research task with its attached sources
#[utoipa::path(
    get,
    path = "/api/research/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task found", body = ResearchTaskResponse),
        (status = 404, description = "Unknown task id")
    ),
    tag = "research"
)]
pub async fn get_research(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResearchTaskResponse>> {
    Ok(Json(state.research.get_research(id).await?))
}

/// Fetch a lightweight status projection
#[utoipa::path(
    get,
    path = "/api/research/{id}/status",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Status found", body = TaskStatusResponse),
        (status = 404, description = "Unknown task id")
    ),
    tag = "research"
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskStatusResponse>> {
    Ok(Json(state.research.get_status(id).await?))
}
