use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware as mw, Router};

use crate::server::endpoints::{auth, courses, status, users};
use crate::server::middleware::require_session;
use crate::types::AppState;

mod endpoints;
pub mod middleware;
pub mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Router whose endpoints require a logged-in caller
    let session_router = Router::new()
        .route("/logout", post(auth::post_logout))
        .route("/home", get(status::get_home))
        .route("/courses", get(courses::get_courses).post(courses::post_course))
        .route(
            "/courses/:name",
            get(courses::get_course)
                .post(courses::post_course_update)
                .delete(courses::delete_course),
        )
        .route("/users", get(users::get_users).post(users::post_user))
        .route(
            "/users/:email",
            get(users::get_user_info)
                .post(users::post_user_info)
                .delete(users::delete_user),
        )
        .route("/skills", post(courses::post_skill))
        .layer(mw::from_fn_with_state(app_state.clone(), require_session));

    Router::new()
        .route("/health", get(status::get_health))
        .route("/login", post(auth::post_login))
        .merge(session_router)
        .with_state(app_state)
}
