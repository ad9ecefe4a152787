use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    db::{CourseExt, LessonExt},
    dtos::{
        CourseWithLessonsDto, CoursesQuery, CreateCourseDto, DataResponse, LessonSummaryDto,
        Response, UpdateCourseDto,
    },
    error::HttpError,
    handler::db_error,
    middleware::{JWTAuthMiddleware, admin_only, maybe_signed_in, signed_in},
};

pub fn courses_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", maybe_signed_in(&app_state, get(get_courses)))
        .route("/", admin_only(&app_state, post(create_course)))
        .route("/my", signed_in(&app_state, get(get_my_courses)))
        .route("/{course_id}", maybe_signed_in(&app_state, get(get_course)))
        .route(
            "/{course_id}",
            admin_only(&app_state, put(update_course).delete(delete_course)),
        )
}

fn is_admin(caller: &Option<Extension<JWTAuthMiddleware>>) -> bool {
    caller.as_ref().is_some_and(|Extension(auth)| auth.is_admin())
}

/// Published courses; admins may pass `?include_unpublished=true`
#[instrument(skip(app_state, caller))]
pub async fn get_courses(
    Query(query): Query<CoursesQuery>,
    caller: Option<Extension<JWTAuthMiddleware>>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let include_unpublished = is_admin(&caller) && query.include_unpublished.unwrap_or(false);

    let courses = app_state
        .db_client
        .get_courses(include_unpublished)
        .await
        .map_err(db_error("getting courses"))?;

    Ok(Json(DataResponse::success(courses)))
}

/// One course with its lesson list. Drafts are visible to admins only.
#[instrument(skip(app_state, caller))]
pub async fn get_course(
    Path(course_id): Path<Uuid>,
    caller: Option<Extension<JWTAuthMiddleware>>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let admin = is_admin(&caller);

    let course = app_state
        .db_client
        .get_course(course_id)
        .await
        .map_err(db_error("getting course"))?
        .filter(|course| admin || course.is_published)
        .ok_or_else(|| HttpError::not_found("Course not found"))?;

    let lessons = app_state
        .db_client
        .get_lessons_by_course(course_id, !admin)
        .await
        .map_err(db_error("getting course lessons"))?;

    Ok(Json(DataResponse::success(CourseWithLessonsDto {
        course,
        lessons: lessons.iter().map(LessonSummaryDto::from).collect(),
    })))
}

/// Courses the caller is enrolled in
#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_my_courses(
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let courses = app_state
        .db_client
        .get_user_courses(auth.user.id)
        .await
        .map_err(db_error("getting user courses"))?;

    Ok(Json(DataResponse::success(courses)))
}

#[instrument(skip(app_state, body), fields(title = %body.title))]
pub async fn create_course(
    State(app_state): State<AppState>,
    Json(body): Json<CreateCourseDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid course input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let course = app_state
        .db_client
        .create_course(&body)
        .await
        .map_err(db_error("creating course"))?;

    tracing::info!(course_id = %course.id, "Course created");
    Ok((StatusCode::CREATED, Json(DataResponse::success(course))))
}

#[instrument(skip(app_state, body))]
pub async fn update_course(
    Path(course_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateCourseDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid course input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let course = app_state
        .db_client
        .update_course(course_id, &body)
        .await
        .map_err(db_error("updating course"))?
        .ok_or_else(|| HttpError::not_found("Course not found"))?;

    tracing::info!(%course_id, "Course updated");
    Ok(Json(DataResponse::success(course)))
}

#[instrument(skip(app_state))]
pub async fn delete_course(
    Path(course_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted = app_state
        .db_client
        .delete_course(course_id)
        .await
        .map_err(db_error("deleting course"))?;
    if !deleted {
        return Err(HttpError::not_found("Course not found"));
    }

    tracing::info!(%course_id, "Course deleted");
    Ok(Json(Response {
        status: "success",
        message: "Course deleted".to_string(),
    }))
}
