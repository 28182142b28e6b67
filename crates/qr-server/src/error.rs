//! Error types for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use qr_agents::AgentResponse;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The request was unusable; the message is returned verbatim.
    #[error("{0}")]
    BadRequest(String),

    /// The research pipeline failed upstream of normalization.
    #[error(transparent)]
    Pipeline(#[from] qr_core::Error),
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Body for client errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::BadRequest(message) => {
                tracing::warn!(status = %StatusCode::BAD_REQUEST, error = %message, "Client error");
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
            }
            ServerError::Pipeline(err) => {
                tracing::error!(
                    status = %StatusCode::INTERNAL_SERVER_ERROR,
                    error = %err,
                    decommissioned = err.is_model_decommissioned(),
                    "Server error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(AgentResponse::from_error(&err)),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request_shape() {
        let response = ServerError::BadRequest("No query provided".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "No query provided"})
        );
    }

    #[tokio::test]
    async fn test_pipeline_error_shape() {
        let response =
            ServerError::from(qr_core::Error::network("connection reset")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("connection reset"));
        assert_eq!(body["raw_response"], "Server error occurred");
    }
}
