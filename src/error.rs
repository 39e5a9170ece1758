//! Unified HTTP error taxonomy for axum request handlers.
//!
//! [`AppError`] gives every failure mode in the router's error design a
//! distinct variant with its own status code and JSON body, so handlers
//! propagate with `?` and the response shape is never an accident.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed JSON or a missing/empty required field → 400.
    #[error("{0}")]
    Validation(String),

    /// No backend under the cap, or a store failure while selecting one → 500.
    #[error("Error assigning backend: {0}")]
    Assignment(String),

    /// Stop for an unmapped clientID, or a store failure on lookup → 500.
    #[error("Error retrieving backend: {0}")]
    Lookup(String),

    /// Transport-level failure reaching a backend worker → 502.
    #[error("Failed to reach backend service: {0}")]
    UpstreamTransport(String),

    /// The backend responded but its body could not be read or parsed → 500.
    #[error("Error reading backend response: {0}")]
    UpstreamBody(String),

    /// Request `Origin` is not in the configured allow-list → 403.
    #[error("Origin not allowed")]
    CorsRejected,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        tracing::warn!(error = %self, "request failed");

        let (status, body) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Assignment(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Error assigning backend", "details": detail }),
            ),
            AppError::Lookup(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Error retrieving backend", "details": detail }),
            ),
            AppError::UpstreamTransport(detail) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "Failed to reach backend service", "details": detail }),
            ),
            AppError::UpstreamBody(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Error reading backend response", "details": detail }),
            ),
            AppError::CorsRejected => (StatusCode::FORBIDDEN, json!({ "error": "Origin not allowed" })),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_maps_to_400() {
        let resp = AppError::Validation("channel_name is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "channel_name is required");
    }

    #[tokio::test]
    async fn assignment_maps_to_500_with_details() {
        let resp = AppError::Assignment("no available backend".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Error assigning backend");
        assert_eq!(body["details"], "no available backend");
    }

    #[tokio::test]
    async fn lookup_maps_to_500_with_details() {
        let resp = AppError::Lookup("no mapping for client".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Error retrieving backend");
    }

    #[tokio::test]
    async fn upstream_transport_maps_to_502() {
        let resp = AppError::UpstreamTransport("connection refused".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn cors_rejected_maps_to_403() {
        let resp = AppError::CorsRejected.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Origin not allowed");
    }
}
