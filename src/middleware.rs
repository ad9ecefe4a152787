use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};

use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    models::{User, UserRole},
    utils::token,
};

/// Authenticated user, inserted into request extensions by `auth`
///
/// ```
/// async fn my_handler(Extension(auth): Extension<JWTAuthMiddleware>) {
///     // Access auth.user here
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddleware {
    pub user: User,
}

impl JWTAuthMiddleware {
    pub fn is_admin(&self) -> bool {
        self.user.role == UserRole::Admin
    }
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
        .map(str::to_owned)
}

/// Resolve the user behind the request's access token
///
/// The token is read from the `access_token` cookie first, then from the
/// `Authorization: Bearer` header. The user it names must still exist.
async fn authenticate(
    cookie_jar: &CookieJar,
    headers: &HeaderMap,
    app_state: &AppState,
) -> Result<User, HttpError> {
    let token = cookie_jar
        .get("access_token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer_token(headers))
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let token_details = token::decode_token(token, app_state.env.jwt_secret.as_bytes())
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user_id = uuid::Uuid::parse_str(&token_details)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    app_state
        .db_client
        .get_user(Some(user_id), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user for token: {}", e);
            HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string())
        })?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))
}

/// Authentication middleware that validates JWT tokens
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - No token is provided
/// - Token is invalid or expired
/// - User no longer exists in database
pub async fn auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let user = authenticate(&cookie_jar, req.headers(), &app_state).await?;
    req.extensions_mut().insert(JWTAuthMiddleware { user });
    Ok(next.run(req).await)
}

/// Like `auth`, but anonymous requests pass through without a user
pub async fn optional_auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Ok(user) = authenticate(&cookie_jar, req.headers(), &app_state).await {
        req.extensions_mut().insert(JWTAuthMiddleware { user });
    }
    next.run(req).await
}

/// Role-based access control, layered after `auth`
///
/// # Errors
/// Returns 401 if user is not authenticated
/// Returns 403 if user doesn't have any of the required roles
pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&user.user.role) {
        tracing::warn!(user_id = %user.user.id, role = user.user.role.to_str(), "Role check failed");
        return Err(HttpError::new(
            ErrorMessage::PermissionDenied.to_string(),
            StatusCode::FORBIDDEN,
        ));
    }

    Ok(next.run(req).await)
}

/// Any signed-in user
pub fn signed_in(app_state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(app_state.clone(), auth))
}

/// Signed-in admins only
pub fn admin_only(app_state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route
        .route_layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .route_layer(middleware::from_fn_with_state(app_state.clone(), auth))
}

/// Public, with the caller's identity attached when a valid token is present
pub fn maybe_signed_in(
    app_state: &AppState,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        app_state.clone(),
        optional_auth,
    ))
}
