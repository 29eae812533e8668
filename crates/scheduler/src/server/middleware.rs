//! Request guards applied before any handler runs.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::db::User;
use crate::error::SchedulerError;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// The authenticated user of a request, inserted by [`require_session`].
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub token: String,
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the session token to a user, or rejects the request with 401.
pub async fn require_session(
    State(s): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let caller = bearer_token(&req)
        .ok_or(SchedulerError::Unauthenticated)
        .and_then(|token| {
            let email = s.sessions.resolve(token)?;
            // the account may have been deleted since login
            let user = s.db.get_user(&email).map_err(|e| match e {
                SchedulerError::NotFound { .. } => SchedulerError::Unauthenticated,
                other => other,
            })?;
            Ok(Caller {
                user,
                token: token.to_string(),
            })
        });

    match caller {
        Ok(caller) => {
            debug!("{} {} as {}", req.method(), req.uri(), caller.user.email);
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
