use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Caller-recoverable failures of the scheduling and attendance core.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidReference(String),

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidRange(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("export failed: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidReference(_)
            | AppError::InvalidFormat(_)
            | AppError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "Store failure");
                "Internal Server Error".to_string()
            }
            AppError::Export(e) => {
                tracing::error!(error = %e, "Report export failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(AppError::NotFound("course-division").status_code(), 404);
        assert_eq!(AppError::InvalidRange("x".into()).status_code(), 400);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), 403);
        assert_eq!(AppError::Conflict("x".into()).status_code(), 409);
        assert_eq!(
            AppError::Store(StoreError::Corrupt("bad day".into())).status_code(),
            500
        );
        assert_eq!(
            AppError::NotFound("course-division").to_string(),
            "course-division not found"
        );
    }
}
