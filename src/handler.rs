use crate::error::{ErrorMessage, HttpError};

pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod lessons;
pub mod payments;
pub mod progress;
pub mod users;
pub mod videos;

/// Log a database failure and hide it behind the generic server error
pub(crate) fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> HttpError {
    move |e| {
        tracing::error!("DB error, {}: {}", context, e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    }
}
