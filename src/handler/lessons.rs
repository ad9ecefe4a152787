use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    db::LessonExt,
    dtos::{
        CreateLessonDto, DataResponse, LessonSummaryDto, ReorderLessonsDto, Response,
        UpdateLessonDto,
    },
    error::HttpError,
    handler::db_error,
    middleware::{JWTAuthMiddleware, admin_only, maybe_signed_in, signed_in},
    service::lesson,
};

pub fn lessons_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", admin_only(&app_state, post(create_lesson)))
        .route(
            "/course/{course_id}",
            maybe_signed_in(&app_state, get(get_course_lessons)),
        )
        .route(
            "/course/{course_id}/reorder",
            admin_only(&app_state, put(reorder_lessons)),
        )
        .route("/{lesson_id}", signed_in(&app_state, get(get_lesson)))
        .route(
            "/{lesson_id}",
            admin_only(&app_state, put(update_lesson).delete(delete_lesson)),
        )
}

/// Lesson summaries of a course, without gated content
#[instrument(skip(app_state, caller))]
pub async fn get_course_lessons(
    Path(course_id): Path<Uuid>,
    caller: Option<Extension<JWTAuthMiddleware>>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let admin = caller.as_ref().is_some_and(|Extension(auth)| auth.is_admin());

    let lessons = app_state
        .db_client
        .get_lessons_by_course(course_id, !admin)
        .await
        .map_err(db_error("getting course lessons"))?;

    let summaries: Vec<LessonSummaryDto> = lessons.iter().map(LessonSummaryDto::from).collect();
    Ok(Json(DataResponse::success(summaries)))
}

/// Full lesson including content, for admins and learners with access
#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_lesson(
    Path(lesson_id): Path<Uuid>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let lesson = lesson::open_lesson(
        &app_state.db_client,
        auth.user.id,
        auth.user.role,
        lesson_id,
        Utc::now(),
    )
    .await?;

    Ok(Json(DataResponse::success(lesson)))
}

#[instrument(skip(app_state, body), fields(course_id = %body.course_id))]
pub async fn create_lesson(
    State(app_state): State<AppState>,
    Json(body): Json<CreateLessonDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid lesson input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let lesson = lesson::create_lesson(&app_state.db_client, body).await?;

    tracing::info!(lesson_id = %lesson.id, "Lesson created");
    Ok((StatusCode::CREATED, Json(DataResponse::success(lesson))))
}

#[instrument(skip(app_state, body))]
pub async fn update_lesson(
    Path(lesson_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateLessonDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid lesson input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let lesson = lesson::update_lesson(&app_state.db_client, lesson_id, body).await?;

    tracing::info!(%lesson_id, "Lesson updated");
    Ok(Json(DataResponse::success(lesson)))
}

#[instrument(skip(app_state))]
pub async fn delete_lesson(
    Path(lesson_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted = app_state
        .db_client
        .delete_lesson(lesson_id)
        .await
        .map_err(db_error("deleting lesson"))?;
    if !deleted {
        return Err(HttpError::not_found("Lesson not found"));
    }

    tracing::info!(%lesson_id, "Lesson deleted");
    Ok(Json(Response {
        status: "success",
        message: "Lesson deleted".to_string(),
    }))
}

#[instrument(skip(app_state, body))]
pub async fn reorder_lessons(
    Path(course_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Json(body): Json<ReorderLessonsDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid reorder input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let lessons = lesson::reorder_lessons(&app_state.db_client, course_id, &body.lessons).await?;

    tracing::info!(%course_id, count = body.lessons.len(), "Lessons reordered");
    let summaries: Vec<LessonSummaryDto> = lessons.iter().map(LessonSummaryDto::from).collect();
    Ok(Json(DataResponse::success(summaries)))
}
