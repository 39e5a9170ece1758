//! `GET /ping` — bare liveness check, exempt from the header middleware.
//!
//! Used both by external load balancers and by `<bin> --healthcheck`, so it
//! must never depend on the coordination store or a configured origin.

use axum::{response::IntoResponse, Json};
use serde_json::json;

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "pong" }))
}
