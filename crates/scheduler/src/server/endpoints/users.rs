use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::db::Role;
use crate::server::middleware::Caller;
use crate::server::types::{ApiErrorType, ApiResponse};
use crate::service::{self, UserInfoUpdate};
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "type", default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Ta
}

/// GET /users
pub async fn get_users(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Response {
    info!("GET /users");

    match service::list_users(&s.db, &caller.user) {
        Ok(users) => ApiResponse::data(users).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /users
pub async fn post_user(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<NewUserRequest>,
) -> Response {
    info!("POST /users - {} ({})", body.email, body.role);

    match service::create_user(&s.db, &caller.user, &body.email, &body.password, body.role) {
        Ok(notice) => ApiResponse::notices(vec![notice]).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /users/:email
/// Returns the user's profile and the skills they can still add
pub async fn get_user_info(
    Path(email): Path<String>,
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Response {
    info!("GET /users/{}", email);

    match service::user_info(&s.db, &caller.user, &email) {
        Ok(info) => ApiResponse::data(info).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /users/:email
pub async fn post_user_info(
    Path(email): Path<String>,
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<UserInfoUpdate>,
) -> Response {
    info!("POST /users/{}", email);

    match service::update_user_info(&s.db, &caller.user, &email, &body) {
        Ok(notices) => ApiResponse::notices(notices).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// DELETE /users/:email
pub async fn delete_user(
    Path(email): Path<String>,
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Response {
    info!("DELETE /users/{}", email);

    match service::delete_user(&s.db, &caller.user, &email) {
        Ok(notice) => {
            s.sessions.logout_user(&email.to_lowercase());
            ApiResponse::notices(vec![notice]).into_response()
        }
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
