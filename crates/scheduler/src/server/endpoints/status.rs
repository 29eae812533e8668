use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::server::middleware::Caller;
use crate::server::types::{ApiErrorType, ApiResponse};
use crate::service;
use crate::types::AppState;

/// GET /health
pub async fn get_health(State(s): State<Arc<AppState>>) -> Response {
    s.sessions.cleanup_expired();
    let stats = s.sessions.stats();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "active_sessions": stats.active_sessions,
        })),
    )
        .into_response()
}

/// GET /home
/// Returns the caller's weekly section assignments
pub async fn get_home(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Response {
    info!("GET /home - {}", caller.user.email);

    match service::weekly_schedule(&s.db, &caller.user) {
        Ok(week) => ApiResponse::data(json!({
            "first_name": caller.user.contact.first_name,
            "role": caller.user.role,
            "assignments": week,
        }))
        .into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
