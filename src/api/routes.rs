use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/research",
            post(crate::api::handlers::research::start_research),
        )
        .route(
            "/api/research/{id}",
            get(crate::api::handlers::research::get_research),
        )
        .route(
            "/api/research/{id}/status",
            get(crate::api::handlers::research::get_status),
        )
        // Progress subscription, one room per task id
        .route("/ws/{task_id}", get(crate::api::handlers::ws::subscribe))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
