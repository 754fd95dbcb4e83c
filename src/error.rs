use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Unauthorized - Please login")]
    Unauthorized,

    #[error("Query timed out, retry later")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Clustering task failed: {0}")]
    Clustering(#[from] tokio::task::JoinError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidParam(message.into())
    }

    /// Whether the client may repeat the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Timeout)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidParam(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()).into_response(),
            AppError::Timeout => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, "1")],
                self.to_string(),
            )
                .into_response(),
            AppError::Database(ref e) => {
                warn!("Store query failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            AppError::Clustering(ref e) => {
                warn!("Clustering task failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
