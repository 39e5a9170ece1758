//! Routing state manager.
//!
//! Owns the mapping between clientIDs and the fixed backend pool, backed
//! entirely by the [`CoordinationStore`]. The router itself keeps no
//! in-memory per-client state, so any number of router replicas can sit
//! behind a layer-4 balancer and share the same routing decisions.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::config::Config;
use crate::store::CoordinationStore;

/// Shared state passed to every request handler.
pub struct RoutingState {
    pub store: Arc<dyn CoordinationStore>,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
}

impl RoutingState {
    pub fn new(store: Arc<dyn CoordinationStore>, config: Arc<Config>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client with a fixed timeout always builds");
        Self { store, config, http }
    }

    fn mapping_key(client_id: &str) -> String {
        format!("client:{client_id}")
    }

    fn active_set_key(backend: &str) -> String {
        format!("backend:{backend}")
    }

    /// Returns the `X-Client-ID` header value if present and non-empty,
    /// otherwise mints a fresh UUID.
    ///
    /// A whitespace-only header is treated as absent, not as a literal
    /// client ID, so a caller that sends `X-Client-ID: " "` gets a freshly
    /// minted identifier rather than silently colliding with anyone else
    /// who does the same.
    pub fn derive_client_id(headers: &HeaderMap) -> String {
        headers
            .get("x-client-id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Sticky routing: returns the mapped backend if one exists, otherwise
    /// selects and does *not* persist a new one — callers call
    /// [`Self::record_active_request`] themselves after a successful start.
    pub async fn get_or_assign_backend(&self, client_id: &str) -> Result<String, String> {
        let key = Self::mapping_key(client_id);
        match self.store.get(&key).await {
            Ok(Some(backend)) => Ok(backend),
            Ok(None) => self.select_least_loaded().await,
            Err(e) => Err(e.to_string()),
        }
    }

    /// Used only on stop: absence of a mapping is itself an error.
    pub async fn get_client_backend(&self, client_id: &str) -> Result<String, String> {
        let key = Self::mapping_key(client_id);
        match self.store.get(&key).await {
            Ok(Some(backend)) => Ok(backend),
            Ok(None) => Err(format!("no mapping for client {client_id}")),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn select_least_loaded(&self) -> Result<String, String> {
        let now = now_millis();
        let window_start = now - (self.config.mapping_ttl_secs as f64 * 1000.0);

        let mut best: Option<(String, u64)> = None;
        for backend in &self.config.backend_ips {
            let set_key = Self::active_set_key(backend);
            let count = self
                .store
                .zcount(&set_key, window_start, now)
                .await
                .map_err(|e| e.to_string())?;

            if count < self.config.max_requests_per_backend {
                match &best {
                    Some((_, best_count)) if *best_count <= count => {}
                    _ => best = Some((backend.clone(), count)),
                }
            }
        }

        best.map(|(backend, _)| backend)
            .ok_or_else(|| "no available backend".to_string())
    }

    /// Pipelined write: forward mapping with TTL, plus an active-set entry
    /// scored by the current time in milliseconds.
    pub async fn record_active_request(&self, backend: &str, client_id: &str) -> Result<(), String> {
        let mapping_key = Self::mapping_key(client_id);
        let set_key = Self::active_set_key(backend);
        self.store
            .record_mapping(
                &mapping_key,
                backend,
                self.config.mapping_ttl_secs,
                &set_key,
                client_id,
                now_millis(),
            )
            .await
            .map_err(|e| e.to_string())
    }

    /// Removes `client_id` from `backend`'s active set. The forward mapping
    /// is left untouched — it expires via TTL.
    pub async fn clear_active_request(&self, backend: &str, client_id: &str) -> Result<(), String> {
        let set_key = Self::active_set_key(backend);
        self.store
            .zrem(&set_key, client_id)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_millis() as f64
}
