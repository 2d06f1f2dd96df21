//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("config load: {0}")]
    Load(String),
}

/// Errors surfaced to callers of the contract logic.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Fatal: startup must not continue past any of these.
#[derive(Error, Debug)]
pub enum SchemaBootstrapError {
    #[error("schema detection failed: {0}")]
    Detect(#[source] sqlx::Error),
    #[error("schema creation failed: {0}")]
    Create(#[source] sqlx::Error),
    #[error("reading migration history failed: {0}")]
    History(#[source] sqlx::Error),
    #[error("migration '{id}' failed: {source}")]
    Migration {
        id: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("migration id '{0}' is declared more than once")]
    DuplicateMigration(String),
}

/// Non-fatal: the service keeps serving, it is just not discoverable.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("no directory address configured")]
    MissingAddress,
    #[error("invalid directory address '{address}': {message}")]
    InvalidAddress { address: String, message: String },
    #[error("directory did not answer within {0:?}")]
    Timeout(Duration),
    #[error("directory transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("directory rejected registration ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Bootstrap(#[from] SchemaBootstrapError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
