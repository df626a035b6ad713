//! Query error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors a grade query can end in
#[derive(Debug, Error)]
pub enum GradeError {
    /// No learners matched the requested scope
    #[error("not found: {0}")]
    NotFound(String),

    /// An identifier could not be read as an integer
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The grade store could not be reached or returned malformed data
    #[error("grade store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

impl GradeError {
    pub fn status(&self) -> StatusCode {
        match self {
            GradeError::NotFound(_) => StatusCode::NOT_FOUND,
            GradeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GradeError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GradeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GradeError::StoreUnavailable(source) => {
                tracing::error!(error = %source, "grade store query failed");
                "Error fetching statistics".to_string()
            }
            GradeError::NotFound(scope) => {
                tracing::debug!(scope = %scope, "no grade data for query");
                "No data found".to_string()
            }
            GradeError::InvalidInput(_) => self.to_string(),
        };
        (status, body).into_response()
    }
}

/// Parses a path identifier, rejecting anything that is not an `i32`.
pub fn parse_id(raw: &str, what: &str) -> Result<i32, GradeError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| GradeError::InvalidInput(format!("{what} must be an integer, got {raw:?}")))
}
