use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid price: {0:?}")]
    InvalidPrice(String),

    #[error("No listings found for {0}")]
    NoListingsFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Fetch already in progress for {0}")]
    FetchInProgress(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NoListingsFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidPrice(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::FetchInProgress(_) => StatusCode::CONFLICT,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
