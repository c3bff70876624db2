//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::ExecutionError;
use crate::store::StoreError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    DatabaseError(sqlx::Error),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<ExecutionError> for ApiError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::PipelineNotFound(_) => ApiError::NotFound(err.to_string()),
            ExecutionError::Pipeline(e) => ApiError::BadRequest(e.to_string()),
            ExecutionError::Validation(msg) => ApiError::BadRequest(msg),
            ExecutionError::Provider(e) => ApiError::InternalError(e.to_string()),
            ExecutionError::Store(StoreError::NotFound(_)) => ApiError::NotFound(err.to_string()),
            ExecutionError::Store(StoreError::Conflict(_))
            | ExecutionError::Store(StoreError::InvalidTransition(_))
            | ExecutionError::Interrupted(_) => ApiError::Conflict(err.to_string()),
            ExecutionError::Store(StoreError::Database(e)) => ApiError::DatabaseError(e),
            ExecutionError::Serialization(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use templatelab_core::domain::execution::{ExecutionStatus, TransitionError};
    use templatelab_core::domain::pipeline::PipelineError;
    use uuid::Uuid;

    fn status_of(err: ExecutionError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_execution_error_mapping() {
        assert_eq!(
            status_of(ExecutionError::PipelineNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ExecutionError::Store(StoreError::NotFound(Uuid::new_v4()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ExecutionError::Pipeline(PipelineError::CyclicDependency(vec![
                "a".to_string()
            ]))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ExecutionError::Store(StoreError::InvalidTransition(
                TransitionError {
                    from: ExecutionStatus::Completed,
                    to: ExecutionStatus::Cancelled,
                }
            ))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ExecutionError::Provider(ProviderError::analysis())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        let id = Uuid::nil();
        match ApiError::from(ExecutionError::Store(StoreError::NotFound(id))) {
            ApiError::NotFound(msg) => assert_eq!(msg, format!("Execution not found: {id}")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
