// Error taxonomy shared by the parser, store, service and HTTP layers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Uploaded CSV could not be turned into equipment records.
    /// `row` is the 1-based line number in the file (the header is line 1).
    #[error("Malformed CSV at row {row}: {reason}")]
    MalformedInput { row: u64, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No active dataset")]
    NoActiveDataset,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Report rendering error: {0}")]
    Report(String),
}

impl AppError {
    pub fn malformed(row: u64, reason: impl Into<String>) -> Self {
        AppError::MalformedInput {
            row,
            reason: reason.into(),
        }
    }

    pub fn dataset_not_found(id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("dataset {} does not exist", id))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MalformedInput { .. } | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) | AppError::NoActiveDataset => StatusCode::NOT_FOUND,
            AppError::Persistence(_) | AppError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = match &self {
            AppError::MalformedInput { row, .. } => serde_json::json!({
                "error": self.to_string(),
                "row": row,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
