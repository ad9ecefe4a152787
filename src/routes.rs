use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        auth::auth_handler, courses::courses_handler, enrollments::enrollments_handler,
        lessons::lessons_handler, payments::payments_handler, progress::progress_handler,
        tests::tests_handler, users::users_handler, videos::videos_handler,
    },
};

pub fn create_router(app_state: AppState) -> Router {
    // each resource router attaches its own auth and role layers per route
    let api_route = Router::new()
        .nest("/auth", auth_handler(app_state.clone()))
        .nest("/users", users_handler(app_state.clone()))
        .nest("/courses", courses_handler(app_state.clone()))
        .nest("/lessons", lessons_handler(app_state.clone()))
        .nest("/videos", videos_handler(app_state.clone()))
        .nest("/enrollments", enrollments_handler(app_state.clone()))
        .nest("/progress", progress_handler(app_state.clone()))
        .nest("/tests", tests_handler(app_state.clone()))
        .nest("/payments", payments_handler(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route)
}
