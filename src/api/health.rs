//! `GET /health` — per-backend liveness probe.
//!
//! Probes each configured backend's `/start_agent` endpoint with a plain
//! GET. The point is reachability, not protocol correctness — the result
//! has no effect on routing decisions.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::{Map, Value};

use crate::{
    proxy::{self, backend_base_url},
    routing::RoutingState,
};

pub async fn health(State(state): State<Arc<RoutingState>>) -> impl IntoResponse {
    let mut results = Map::new();
    for backend in &state.config.backend_ips {
        let report = proxy::probe(&state.http, &backend_base_url(backend)).await;
        results.insert(backend.clone(), Value::String(report));
    }
    Json(Value::Object(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllowOrigin, Config};
    use crate::store::memory::MemoryStore;
    use axum::{body::Body, body::to_bytes, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_one_entry_per_backend_and_has_no_routing_effect() {
        // Nothing listens on these addresses; each probe resolves to an
        // "Error: ..." entry. This endpoint's contract is the response
        // *shape*, not liveness of a real backend — that's covered by
        // `proxy::tests::probe_reports_status_line_on_reachable_backend`.
        let config = Arc::new(Config {
            backend_ips: vec!["127.0.0.1:1".to_string(), "127.0.0.1:2".to_string()],
            max_requests_per_backend: 2,
            redis_url: "rediss://localhost:6380".to_string(),
            port: 8080,
            mapping_ttl_secs: 3600,
            allow_origin: AllowOrigin::Any,
        });
        let state = Arc::new(RoutingState::new(Arc::new(MemoryStore::new()), config));

        let app = Router::new().route("/health", get(health)).with_state(state);
        let req = axum::http::Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);

        let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["127.0.0.1:1"].as_str().unwrap().starts_with("Error:"));
        assert!(json["127.0.0.1:2"].as_str().unwrap().starts_with("Error:"));
    }
}
