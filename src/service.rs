//! Domain rules shared by the HTTP handlers
//!
//! Every function is generic over the `db::*Ext` repository traits, so the same
//! code runs against `DBClient` in production and an in-memory store in tests.
//! Functions that depend on the current time take it as `now`.

use thiserror::Error;

pub mod enrollment;
pub mod grading;
pub mod lesson;
pub mod payment;
pub mod progress;
pub mod video;

#[cfg(test)]
pub(crate) mod memory;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    AccessDenied(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// True when the error is a PostgreSQL unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// True when a write referenced a row that does not exist
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}
