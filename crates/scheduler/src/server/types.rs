use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::error::SchedulerError;
use crate::types::Notice;

/// An error response: a status code plus the message shown to the user.
#[derive(Debug)]
pub struct ApiErrorType {
    pub status: StatusCode,
    pub error: String,
}

impl From<(StatusCode, &str)> for ApiErrorType {
    fn from((status, error): (StatusCode, &str)) -> Self {
        Self {
            status,
            error: error.to_string(),
        }
    }
}

impl From<SchedulerError> for ApiErrorType {
    fn from(err: SchedulerError) -> Self {
        let status = match &err {
            SchedulerError::Unauthenticated | SchedulerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            SchedulerError::AccessDenied | SchedulerError::SelfDelete => StatusCode::FORBIDDEN,
            SchedulerError::NotFound { .. } => StatusCode::NOT_FOUND,
            SchedulerError::Integrity { .. } => StatusCode::CONFLICT,
            SchedulerError::Format { .. }
            | SchedulerError::Type { .. }
            | SchedulerError::Value { .. } => StatusCode::BAD_REQUEST,
            SchedulerError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // store details stay in the log
        if err.is_client_error() {
            Self::from((status, err.to_string().as_str()))
        } else {
            tracing::error!("{}", err);
            Self::from((status, "Internal server error"))
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.error }))).into_response()
    }
}

/// A successful response: notices to display plus an optional payload.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub messages: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            messages: Vec::new(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn notices(messages: Vec<Notice>) -> Self {
        Self {
            messages,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
