use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::server::middleware::Caller;
use crate::server::types::{ApiErrorType, ApiResponse};
use crate::service;
use crate::types::{AppState, Notice};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /login
/// Exchanges an email and password for a session token
pub async fn post_login(
    State(s): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Response {
    match service::authenticate(&s.db, &body.email, &body.password) {
        Ok(user) => {
            let token = s.sessions.login(&user.email);
            info!("POST /login - {} logged in", user.email);
            (
                StatusCode::OK,
                Json(json!({ "token": token, "email": user.email, "role": user.role })),
            )
                .into_response()
        }
        Err(e) => {
            warn!("POST /login - rejected");
            ApiErrorType::from(e).into_response()
        }
    }
}

/// POST /logout
pub async fn post_logout(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Response {
    info!("POST /logout - {}", caller.user.email);
    s.sessions.logout(&caller.token);
    ApiResponse::notices(vec![Notice::success("You were logged out")]).into_response()
}
