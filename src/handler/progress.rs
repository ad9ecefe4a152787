use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    db::ProgressExt,
    dtos::{DataResponse, RecentActivityQuery, WatchTimeDto},
    error::HttpError,
    handler::db_error,
    middleware::{JWTAuthMiddleware, admin_only, signed_in},
    service::progress,
};

pub fn progress_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/course/{course_id}",
            signed_in(&app_state, get(get_course_progress)),
        )
        .route(
            "/course/{course_id}/stats",
            admin_only(&app_state, get(get_course_stats)),
        )
        .route(
            "/lesson/{lesson_id}/complete",
            signed_in(&app_state, post(complete_lesson)),
        )
        .route(
            "/lesson/{lesson_id}/watch",
            signed_in(&app_state, put(update_watch_time)),
        )
        .route("/me/stats", signed_in(&app_state, get(get_my_stats)))
        .route("/me/recent", signed_in(&app_state, get(get_recent_activity)))
}

#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_course_progress(
    Path(course_id): Path<Uuid>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let progress = progress::get_user_progress(&app_state.db_client, auth.user.id, course_id).await?;
    Ok(Json(DataResponse::success(progress)))
}

#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn complete_lesson(
    Path(lesson_id): Path<Uuid>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let progress =
        progress::mark_complete(&app_state.db_client, auth.user.id, lesson_id, Utc::now()).await?;

    tracing::info!(%lesson_id, "Lesson completed");
    Ok(Json(DataResponse::success(progress)))
}

#[instrument(skip(app_state, auth, body), fields(user_id = %auth.user.id))]
pub async fn update_watch_time(
    Path(lesson_id): Path<Uuid>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
    Json(body): Json<WatchTimeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid watch time input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let progress = progress::update_watch_time(
        &app_state.db_client,
        auth.user.id,
        lesson_id,
        body.watched_duration,
        Utc::now(),
    )
    .await?;

    Ok(Json(DataResponse::success(progress)))
}

#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_my_stats(
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = progress::learner_stats(&app_state.db_client, auth.user.id).await?;
    Ok(Json(DataResponse::success(stats)))
}

#[instrument(skip(app_state))]
pub async fn get_course_stats(
    Path(course_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = progress::course_stats(&app_state.db_client, course_id).await?;
    Ok(Json(DataResponse::success(stats)))
}

/// Latest progress rows of the caller. Query params: ?limit=10
#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_recent_activity(
    Query(query): Query<RecentActivityQuery>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate().map_err(|e| {
        tracing::error!("Invalid recent activity input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let recent = app_state
        .db_client
        .get_recent_progress(auth.user.id, query.limit.unwrap_or(10))
        .await
        .map_err(db_error("getting recent progress"))?;

    Ok(Json(DataResponse::success(recent)))
}
