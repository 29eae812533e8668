use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::server::middleware::Caller;
use crate::server::types::{ApiErrorType, ApiResponse};
use crate::service;
use crate::types::AppState;
use crate::update::CourseUpdate;

#[derive(Debug, Deserialize)]
pub struct NewCourseRequest {
    #[serde(default)]
    pub course_dpt: String,
    #[serde(default)]
    pub course_num: String,
    pub course_descr: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewSkillRequest {
    #[serde(default)]
    pub name: String,
}

/// GET /courses
/// Lists all courses ordered by department and number
pub async fn get_courses(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Response {
    info!("GET /courses");

    match service::list_courses(&s.db, &caller.user) {
        Ok(courses) => ApiResponse::data(courses).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /courses
pub async fn post_course(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<NewCourseRequest>,
) -> Response {
    info!("POST /courses - {}{}", body.course_dpt, body.course_num);

    match service::create_course(
        &s.db,
        &caller.user,
        &body.course_dpt,
        &body.course_num,
        body.course_descr.as_deref(),
    ) {
        Ok(notice) => ApiResponse::notices(vec![notice]).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /courses/:name
/// Returns the course with its sections, members and addable users
pub async fn get_course(
    Path(name): Path<String>,
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Response {
    info!("GET /courses/{}", name);

    match service::course_detail(&s.db, &caller.user, &name) {
        Ok(detail) => ApiResponse::data(detail).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /courses/:name
/// Applies an update batch; per-step failures come back as warnings
pub async fn post_course_update(
    Path(name): Path<String>,
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<CourseUpdate>,
) -> Response {
    info!("POST /courses/{} - {}", name, caller.user.email);

    match service::update_course(&s.db, &caller.user, &name, &body) {
        Ok(report) => ApiResponse {
            messages: report.notices.clone(),
            data: Some(report.outcomes),
        }
        .into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// DELETE /courses/:name
pub async fn delete_course(
    Path(name): Path<String>,
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Response {
    info!("DELETE /courses/{}", name);

    match service::delete_course(&s.db, &caller.user, &name) {
        Ok(notice) => ApiResponse::notices(vec![notice]).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// POST /skills
pub async fn post_skill(
    State(s): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<NewSkillRequest>,
) -> Response {
    info!("POST /skills - {}", body.name);

    match service::create_skill(&s.db, &caller.user, &body.name) {
        Ok(notice) => ApiResponse::notices(vec![notice]).into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
