//! `POST /stop_agent` — release a session from its backend.

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use serde_json::Value;

use crate::{
    error::AppError,
    proxy::{self, backend_base_url},
    routing::RoutingState,
};

use super::start::StartAgentBody;

pub async fn stop_agent(
    State(state): State<Arc<RoutingState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, AppError> {
    let parsed: StartAgentBody =
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(format!("invalid request body: {e}")))?;

    if parsed.channel_name.trim().is_empty() {
        return Err(AppError::Validation("channel_name is required".to_string()));
    }

    let client_id = RoutingState::derive_client_id(&headers);

    let backend = state
        .get_client_backend(&client_id)
        .await
        .map_err(AppError::Lookup)?;

    let body_json: Value =
        serde_json::to_value(&parsed).map_err(|e| AppError::Validation(e.to_string()))?;

    let upstream = proxy::forward(&state.http, &backend_base_url(&backend), "stop_agent", &body_json, &client_id).await?;

    if upstream.status.is_success() {
        if let Err(e) = state.clear_active_request(&backend, &client_id).await {
            tracing::warn!(error = %e, client_id, backend, "failed to clear active request");
        }
    }

    Ok((upstream.status, Json(upstream.body)))
}
