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
    db::{PaymentExt, UserExt},
    dtos::{
        CreatePaymentDto, DataResponse, GrantAccessDto, PaymentCreatedDto, UpdatePaymentStatusDto,
        WebhookDto,
    },
    error::HttpError,
    handler::db_error,
    middleware::{JWTAuthMiddleware, admin_only, signed_in},
    service::{enrollment, payment},
};

const RECENT_PAYMENTS: i64 = 10;

pub fn payments_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", admin_only(&app_state, get(get_payments)))
        .route("/", signed_in(&app_state, post(create_payment)))
        .route("/my", signed_in(&app_state, get(get_my_payments)))
        .route("/stats", admin_only(&app_state, get(get_payment_stats)))
        .route("/grant-access", admin_only(&app_state, post(grant_access)))
        .route("/webhook", post(webhook))
        .route("/{payment_id}", admin_only(&app_state, get(get_payment)))
        .route(
            "/{payment_id}/status",
            admin_only(&app_state, put(update_payment_status)),
        )
}

fn validation_error(e: validator::ValidationErrors) -> HttpError {
    tracing::error!("Invalid payment input: {}", e);
    HttpError::bad_request(e.to_string())
}

#[instrument(skip(app_state))]
pub async fn get_payments(State(app_state): State<AppState>) -> Result<impl IntoResponse, HttpError> {
    let payments = app_state
        .db_client
        .get_payments(None, None)
        .await
        .map_err(db_error("getting payments"))?;

    Ok(Json(DataResponse::success(payments)))
}

#[instrument(skip(app_state))]
pub async fn get_payment(
    Path(payment_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let payment = app_state
        .db_client
        .get_payment(payment_id)
        .await
        .map_err(db_error("getting payment"))?
        .ok_or_else(|| HttpError::not_found("Payment not found"))?;

    Ok(Json(DataResponse::success(payment)))
}

#[instrument(skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_my_payments(
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let payments = app_state
        .db_client
        .get_payments(Some(auth.user.id), None)
        .await
        .map_err(db_error("getting user payments"))?;

    Ok(Json(DataResponse::success(payments)))
}

/// Open a payment for a course and hand back the checkout path
#[instrument(skip(app_state, auth, body), fields(user_id = %auth.user.id, course_id = %body.course_id))]
pub async fn create_payment(
    Extension(auth): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
    Json(body): Json<CreatePaymentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(validation_error)?;

    let (payment, payment_url) = payment::create_payment(
        &app_state.db_client,
        auth.user.id,
        body.course_id,
        &body.payment_system,
        &app_state.env.payment_currency,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::success(PaymentCreatedDto {
            payment,
            payment_url,
        })),
    ))
}

#[instrument(skip(app_state, body))]
pub async fn update_payment_status(
    Path(payment_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdatePaymentStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(validation_error)?;

    let payment = payment::update_payment_status(
        &app_state.db_client,
        payment_id,
        body.status,
        body.transaction_id.as_deref(),
        Utc::now(),
    )
    .await?;

    Ok(Json(DataResponse::success(payment)))
}

/// Manual grant, without a payment. Omitting `duration_days` grants lifetime access.
#[instrument(skip(app_state, body), fields(user_id = %body.user_id, course_id = %body.course_id))]
pub async fn grant_access(
    State(app_state): State<AppState>,
    Json(body): Json<GrantAccessDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(validation_error)?;

    app_state
        .db_client
        .get_user(Some(body.user_id), None)
        .await
        .map_err(db_error("getting user"))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    let enrollment = enrollment::grant_course_access(
        &app_state.db_client,
        body.user_id,
        body.course_id,
        body.duration_days,
        Utc::now(),
    )
    .await?;

    tracing::info!(expires_at = ?enrollment.expires_at, "Access granted");
    Ok(Json(DataResponse::success(enrollment)))
}

#[instrument(skip(app_state))]
pub async fn get_payment_stats(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = payment::payment_stats(&app_state.db_client, RECENT_PAYMENTS).await?;
    Ok(Json(DataResponse::success(stats)))
}

/// Provider callback. Unauthenticated.
#[instrument(skip(app_state, body), fields(payment_id = %body.payment_id, status = %body.status))]
pub async fn webhook(
    State(app_state): State<AppState>,
    Json(body): Json<WebhookDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(validation_error)?;

    let payment = payment::process_webhook(
        &app_state.db_client,
        body.payment_id,
        &body.status,
        body.transaction_id.as_deref(),
        Utc::now(),
    )
    .await?;

    Ok(Json(DataResponse::success(payment)))
}
