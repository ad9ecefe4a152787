use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    db::VideoExt,
    dtos::{CreateVideoDto, DataResponse, Response, UpdateVideoDto},
    error::HttpError,
    handler::db_error,
    middleware::{JWTAuthMiddleware, admin_only, signed_in},
    service::video,
};

pub fn videos_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            admin_only(&app_state, get(get_videos).post(create_video)),
        )
        .route("/lesson/{lesson_id}", signed_in(&app_state, get(get_video)))
        .route(
            "/lesson/{lesson_id}",
            admin_only(&app_state, put(update_video).delete(delete_video)),
        )
        .route(
            "/lesson/{lesson_id}/signed-url",
            signed_in(&app_state, get(get_signed_url)),
        )
        .route(
            "/lesson/{lesson_id}/stats",
            admin_only(&app_state, get(get_video_stats)),
        )
}

/// Video metadata of a lesson. Learners get the playable URL from `signed-url`.
#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_video(
    Path(lesson_id): Path<Uuid>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let mut video = app_state
        .db_client
        .get_video(lesson_id)
        .await
        .map_err(db_error("getting video"))?
        .ok_or_else(|| HttpError::not_found("Video not found"))?;
    if !auth.is_admin() {
        video.video_url.clear();
    }

    Ok(Json(DataResponse::success(video)))
}

#[instrument(skip(app_state))]
pub async fn get_videos(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let videos = app_state
        .db_client
        .get_videos()
        .await
        .map_err(db_error("getting videos"))?;

    Ok(Json(DataResponse::success(videos)))
}

#[instrument(skip(app_state, body), fields(lesson_id = %body.lesson_id))]
pub async fn create_video(
    State(app_state): State<AppState>,
    Json(body): Json<CreateVideoDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid video input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let video = video::create_video(&app_state.db_client, &body).await?;

    tracing::info!(video_id = %video.id, "Video created");
    Ok((StatusCode::CREATED, Json(DataResponse::success(video))))
}

#[instrument(skip(app_state, body))]
pub async fn update_video(
    Path(lesson_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateVideoDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid video input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let video = app_state
        .db_client
        .update_video(lesson_id, &body)
        .await
        .map_err(db_error("updating video"))?
        .ok_or_else(|| HttpError::not_found("Video not found"))?;

    tracing::info!(%lesson_id, "Video updated");
    Ok(Json(DataResponse::success(video)))
}

#[instrument(skip(app_state))]
pub async fn delete_video(
    Path(lesson_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let deleted = app_state
        .db_client
        .delete_video(lesson_id)
        .await
        .map_err(db_error("deleting video"))?;
    if !deleted {
        return Err(HttpError::not_found("Video not found"));
    }

    tracing::info!(%lesson_id, "Video deleted");
    Ok(Json(Response {
        status: "success",
        message: "Video deleted".to_string(),
    }))
}

#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_signed_url(
    Path(lesson_id): Path<Uuid>,
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let signed = video::signed_url(
        &app_state.db_client,
        auth.user.id,
        auth.user.role,
        lesson_id,
        app_state.env.signed_url_expires_in,
        Utc::now(),
    )
    .await?;

    Ok(Json(DataResponse::success(signed)))
}

#[instrument(skip(app_state))]
pub async fn get_video_stats(
    Path(lesson_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = video::video_stats(&app_state.db_client, lesson_id).await?;
    Ok(Json(DataResponse::success(stats)))
}
