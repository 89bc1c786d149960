use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::middleware::{make_span, request_id_middleware};

use super::{handlers, AppState};

/// Creates the application router with all routes
pub fn create_router(state: AppState, request_deadline: Duration) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TimeoutLayer::new(request_deadline))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::create_user))
        .route(
            "/users/:user_id/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route(
            "/users/:user_id/recommendations",
            get(handlers::get_recommendations),
        )
        .route("/recommendations/query", post(handlers::search_recommendations))
        .route(
            "/users/:user_id/registrations",
            get(handlers::list_registrations).post(handlers::register),
        )
        .route(
            "/users/:user_id/registrations/:program_id",
            delete(handlers::unregister),
        )
        .route(
            "/programs/:program_id/registrations/count",
            get(handlers::registration_count),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
