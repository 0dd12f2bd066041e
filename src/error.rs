//! Error types for the discussion backend
//!
//! Provides unified error handling using thiserror. Cache-layer faults have
//! their own type (`cache::BackendError`) and never reach this enum.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == App Error Enum ==
/// Unified error type for request handling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Entity absent, or addressed to another site
    #[error("{0}")]
    NotFound(String),

    /// Caller input is malformed
    #[error("{0}")]
    Validation(String),

    /// Request collides with an existing resource
    #[error("{0}")]
    Conflict(String),

    /// The data store could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// One unit of a fan-out failed, so the whole page failed
    #[error("{source}")]
    AggregationFailed {
        /// Position of the failed unit in the input sequence
        seq: usize,
        /// Identifier the unit was hydrating
        id: i64,
        /// The unit's own error
        source: Box<AppError>,
    },
}

impl AppError {
    // == Aggregation ==
    /// Wraps a unit failure discovered during gather.
    pub fn aggregation(seq: usize, id: i64, source: AppError) -> Self {
        AppError::AggregationFailed {
            seq,
            id,
            source: Box::new(source),
        }
    }

    // == Status ==
    /// HTTP status this error maps to.
    ///
    /// Aggregation failures report the status of the unit that failed.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::AggregationFailed { source, .. } => source.status(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the backend.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::StoreUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_aggregation_takes_unit_status() {
        let err = AppError::aggregation(3, 42, AppError::NotFound("Profile 42 not found".into()));

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Profile 42 not found");
        assert!(matches!(err, AppError::AggregationFailed { seq: 3, id: 42, .. }));
    }
}
