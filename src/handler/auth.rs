use crate::{
    AppState,
    db::UserExt,
    dtos::{
        DataResponse, FilterUserDto, LoginUserDto, RefreshResponseDto, RegisterUserDto, Response,
        UserLoginResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, signed_in},
    models::User,
    redisdb::MAX_LOGIN_ATTEMPTS,
    service::is_unique_violation,
    utils::{password, token},
};
use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use axum_client_ip::ClientIp;
use tracing::instrument;
use validator::Validate;

/// Router for authentication endpoints
pub fn auth_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route(
            "/login",
            post(login).layer(app_state.ip_extraction.clone().into_extension()),
        )
        .route("/refresh", post(refresh))
        .route("/logout", signed_in(&app_state, post(logout)))
        .route("/me", signed_in(&app_state, get(get_me)))
}

fn token_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

fn create_token(app_state: &AppState, user_id: &str, max_age: i64) -> Result<String, HttpError> {
    token::create_token(user_id, app_state.env.jwt_secret.as_bytes(), max_age).map_err(|e| {
        tracing::error!("Token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })
}

/// Register a new learner account
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let existing = app_state
        .db_client
        .get_user(None, Some(&body.email))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;
    if existing.is_some() {
        return Err(HttpError::unique_constraint_violation(
            ErrorMessage::EmailExist.to_string(),
        ));
    }

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .save_user(
            &body.email,
            &hash_password,
            body.first_name.as_deref(),
            body.last_name.as_deref(),
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                HttpError::unique_constraint_violation(ErrorMessage::EmailExist.to_string())
            } else {
                tracing::error!("DB error, saving user: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(user_id = %user.id, "Register successful");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse::success(FilterUserDto::filter_user(&user))),
    ))
}

/// Login, limited to `MAX_LOGIN_ATTEMPTS` failures per email and IP per hour
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn login(
    ClientIp(ip): ClientIp,
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let attempts = app_state
        .redis_client
        .get_login_attempts(ip, &body.email)
        .await
        .map_err(|e| {
            tracing::error!("RedisDB error, getting login attempts: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .unwrap_or(0);
    if attempts >= MAX_LOGIN_ATTEMPTS {
        tracing::warn!("Login attempt limit reached");
        return Err(HttpError::new(
            ErrorMessage::TooManyAttempts.to_string(),
            StatusCode::TOO_MANY_REQUESTS,
        ));
    }

    let user = match authenticate(&app_state, &body).await {
        Ok(user) => user,
        Err(e) => {
            if let Err(e) = app_state
                .redis_client
                .increment_login_attempts(ip, &body.email)
                .await
            {
                tracing::warn!("Failed to count login attempt: {}", e);
            }
            return Err(e);
        }
    };

    if let Err(e) = app_state
        .redis_client
        .clear_login_attempts(ip, &body.email)
        .await
    {
        tracing::warn!("Failed to clear login attempts: {}", e);
    }

    let user_id = user.id.to_string();
    let access_token = create_token(&app_state, &user_id, app_state.env.jwt_maxage)?;
    let refresh_token = create_token(&app_state, &user_id, app_state.env.refresh_token_maxage)?;

    app_state
        .redis_client
        .save_refresh_token(&user_id, &refresh_token, app_state.env.refresh_token_maxage)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.id, "RedisDB error, saving refresh token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let jar = CookieJar::new()
        .add(token_cookie(
            "access_token",
            access_token.clone(),
            app_state.env.jwt_maxage,
        ))
        .add(token_cookie(
            "refresh_token",
            refresh_token,
            app_state.env.refresh_token_maxage,
        ));

    tracing::info!(user_id = %user.id, "Login successful");
    Ok((
        jar,
        Json(UserLoginResponseDto {
            status: "success".to_string(),
            access_token,
            user: FilterUserDto::filter_user(&user),
        }),
    ))
}

/// Check credentials; unknown email and wrong password look the same
async fn authenticate(app_state: &AppState, body: &LoginUserDto) -> Result<User, HttpError> {
    let user = app_state
        .db_client
        .get_user(None, Some(&body.email))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
    })?;

    if password_matched {
        Ok(user)
    } else {
        tracing::warn!(user_id = %user.id, "Password mismatch");
        Err(HttpError::unauthorized(
            ErrorMessage::WrongCredentials.to_string(),
        ))
    }
}

/// Issue a new access token from the refresh token cookie
#[instrument(skip(app_state, cookie_jar))]
pub async fn refresh(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let token = cookie_jar
        .get("refresh_token")
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| {
            tracing::error!("Refresh token not provided");
            HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string())
        })?;

    let user_id = token::decode_token(&token, app_state.env.jwt_secret.as_bytes())?;

    // Only the latest refresh token of a user is valid; logout deletes it
    let stored = app_state
        .redis_client
        .get_refresh_token(&user_id)
        .await
        .map_err(|e| {
            tracing::error!("RedisDB error, getting refresh token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;
    if stored.as_deref() != Some(token.as_str()) {
        tracing::error!("Refresh token mismatch or not found in Redis");
        return Err(HttpError::unauthorized(
            ErrorMessage::InvalidToken.to_string(),
        ));
    }

    let access_token = create_token(&app_state, &user_id, app_state.env.jwt_maxage)?;
    let jar = CookieJar::new().add(token_cookie(
        "access_token",
        access_token.clone(),
        app_state.env.jwt_maxage,
    ));

    tracing::info!("Access token refreshed successfully");
    Ok((
        jar,
        Json(RefreshResponseDto {
            status: "success".to_string(),
            access_token,
        }),
    ))
}

#[instrument(skip(app_state, user), fields(user_id = %user.user.id))]
pub async fn logout(
    Extension(user): Extension<JWTAuthMiddleware>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .redis_client
        .delete_refresh_token(&user.user.id.to_string())
        .await
        .map_err(|e| {
            tracing::error!("RedisDB error, deleting refresh token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let jar = CookieJar::new()
        .add(token_cookie("access_token", String::new(), 0))
        .add(token_cookie("refresh_token", String::new(), 0));

    tracing::info!("logout successful");
    Ok((
        jar,
        Json(Response {
            status: "success",
            message: "Logout successful".to_string(),
        }),
    ))
}

pub async fn get_me(Extension(user): Extension<JWTAuthMiddleware>) -> impl IntoResponse {
    Json(DataResponse::success(FilterUserDto::filter_user(&user.user)))
}
