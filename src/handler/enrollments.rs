use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    db::{EnrollmentExt, UserExt},
    dtos::{
        AccessCheckDto, CreateEnrollmentDto, DataResponse, EnrollmentsQuery, ExpiringQuery,
        Response, UpdateEnrollmentDto,
    },
    error::HttpError,
    handler::db_error,
    middleware::{auth, role_check},
    models::UserRole,
    service::enrollment,
};

/// Enrollment administration. Every route requires the admin role.
pub fn enrollments_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_enrollments).post(create_enrollment))
        .route("/expiring", get(get_expiring))
        .route("/access/{user_id}/{course_id}", get(check_access))
        .route(
            "/{user_id}/{course_id}",
            put(update_enrollment).delete(delete_enrollment),
        )
        .route_layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .route_layer(middleware::from_fn_with_state(app_state, auth))
}

/// All enrollments, optionally narrowed with ?user_id= and/or ?course_id=
#[instrument(skip(app_state))]
pub async fn get_enrollments(
    Query(query): Query<EnrollmentsQuery>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let enrollments = app_state
        .db_client
        .get_enrollments(query.user_id, query.course_id)
        .await
        .map_err(db_error("getting enrollments"))?;

    Ok(Json(DataResponse::success(enrollments)))
}

#[instrument(skip(app_state, body), fields(user_id = %body.user_id, course_id = %body.course_id))]
pub async fn create_enrollment(
    State(app_state): State<AppState>,
    Json(body): Json<CreateEnrollmentDto>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .get_user(Some(body.user_id), None)
        .await
        .map_err(db_error("getting user"))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    let enrollment = enrollment::enroll(
        &app_state.db_client,
        body.user_id,
        body.course_id,
        body.expires_at,
    )
    .await?;

    tracing::info!("Enrollment created");
    Ok((StatusCode::CREATED, Json(DataResponse::success(enrollment))))
}

/// Replace the expiry; `expires_at: null` makes the enrollment permanent
#[instrument(skip(app_state, body))]
pub async fn update_enrollment(
    Path((user_id, course_id)): Path<(Uuid, Uuid)>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateEnrollmentDto>,
) -> Result<impl IntoResponse, HttpError> {
    let enrollment =
        enrollment::update_expiry(&app_state.db_client, user_id, course_id, body.expires_at)
            .await?;

    tracing::info!(expires_at = ?enrollment.expires_at, "Enrollment updated");
    Ok(Json(DataResponse::success(enrollment)))
}

#[instrument(skip(app_state))]
pub async fn delete_enrollment(
    Path((user_id, course_id)): Path<(Uuid, Uuid)>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    enrollment::revoke(&app_state.db_client, user_id, course_id).await?;

    tracing::info!("Enrollment deleted");
    Ok(Json(Response {
        status: "success",
        message: "Enrollment deleted".to_string(),
    }))
}

#[instrument(skip(app_state))]
pub async fn check_access(
    Path((user_id, course_id)): Path<(Uuid, Uuid)>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let has_access =
        enrollment::has_access(&app_state.db_client, user_id, course_id, Utc::now()).await?;

    Ok(Json(DataResponse::success(AccessCheckDto { has_access })))
}

/// Enrollments expiring within ?days= (7 by default)
#[instrument(skip(app_state))]
pub async fn get_expiring(
    Query(query): Query<ExpiringQuery>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query.validate().map_err(|e| {
        tracing::error!("Invalid expiring input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let days = query.days.unwrap_or(7);
    let enrollments = enrollment::expiring(&app_state.db_client, days, Utc::now()).await?;

    Ok(Json(DataResponse::success(enrollments)))
}
