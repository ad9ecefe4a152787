use crate::{
    AppState,
    db::UserExt,
    dtos::{
        DataResponse, FilterUserDto, ProfileUpdateDto, RequestQueryDto, Response, RoleUpdateDto,
        UserListResponseDto, UserStatsDto,
    },
    error::{ErrorMessage, HttpError},
    service::is_unique_violation,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::{auth, role_check};
use crate::models::UserRole;

/// Router for user management, admins only
pub fn users_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_users))
        .route("/stats", get(get_user_stats))
        .route("/{user_id}", get(get_user).delete(delete_user))
        .route("/{user_id}/role", put(update_user_role))
        .route("/{user_id}/profile", put(update_user_profile))
        .route_layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .route_layer(middleware::from_fn_with_state(app_state, auth))
}

fn user_db_error(context: &'static str) -> impl Fn(sqlx::Error) -> HttpError {
    move |e| match e {
        sqlx::Error::RowNotFound => HttpError::not_found("User not found"),
        e if is_unique_violation(&e) => {
            HttpError::unique_constraint_violation(ErrorMessage::EmailExist.to_string())
        }
        e => {
            tracing::error!("DB error, {}: {}", context, e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        }
    }
}

/// Paginated user list. Query params: ?page=1&limit=10
#[instrument(skip(app_state))]
pub async fn get_users(
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_users input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page as u32, limit)
        .await
        .map_err(user_db_error("getting users"))?;

    let user_count = app_state
        .db_client
        .get_user_count()
        .await
        .map_err(user_db_error("getting user count"))?;

    tracing::info!("get_users successful");
    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    }))
}

#[instrument(skip(app_state))]
pub async fn get_user(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .get_user(Some(user_id), None)
        .await
        .map_err(user_db_error("getting user"))?
        .ok_or_else(|| HttpError::not_found("User not found"))?;

    Ok(Json(DataResponse::success(FilterUserDto::filter_user(&user))))
}

#[instrument(skip(app_state))]
pub async fn update_user_role(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = app_state
        .db_client
        .update_user_role(user_id, body.role)
        .await
        .map_err(user_db_error("updating user role"))?;

    tracing::info!(%user_id, role = body.role.to_str(), "User role updated");
    Ok(Json(DataResponse::success(FilterUserDto::filter_user(&user))))
}

#[instrument(skip(app_state, body))]
pub async fn update_user_profile(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Json(body): Json<ProfileUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid profile input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .update_user_profile(user_id, &body)
        .await
        .map_err(user_db_error("updating user profile"))?;

    tracing::info!(%user_id, "User profile updated");
    Ok(Json(DataResponse::success(FilterUserDto::filter_user(&user))))
}

#[instrument(skip(app_state))]
pub async fn delete_user(
    Path(user_id): Path<Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_user(user_id)
        .await
        .map_err(user_db_error("deleting user"))?;

    tracing::info!(%user_id, "User deleted");
    Ok(Json(Response {
        status: "success",
        message: "User deleted".to_string(),
    }))
}

#[instrument(skip(app_state))]
pub async fn get_user_stats(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let total_users = app_state
        .db_client
        .get_user_count()
        .await
        .map_err(user_db_error("getting user count"))?;
    let admin_count = app_state
        .db_client
        .get_admin_count()
        .await
        .map_err(user_db_error("getting admin count"))?;
    let recent = app_state
        .db_client
        .get_users(1, 5)
        .await
        .map_err(user_db_error("getting recent users"))?;

    Ok(Json(DataResponse::success(UserStatsDto {
        total_users,
        admin_count,
        user_count: total_users - admin_count,
        recent_users: FilterUserDto::filter_users(&recent),
    })))
}
