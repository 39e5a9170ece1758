//! Background reclamation workers.
//!
//! Two independent periodic tasks, each running until the shared
//! [`CancellationToken`] fires so shutdown stops them promptly instead of
//! waiting out their next sleep.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::routing::RoutingState;

const STALE_MAPPING_SWEEP_PERIOD: Duration = Duration::from_secs(5 * 60);
const EXPIRED_TOKEN_SWEEP_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Periodically removes active-set entries older than the mapping TTL.
///
/// Self-healing complement to [`RoutingState::select_least_loaded`]'s soft
/// cap: without this, a crashed client that never calls `/stop_agent` would
/// permanently occupy a slot in its backend's active set.
pub async fn stale_mapping_cleaner(state: Arc<RoutingState>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(STALE_MAPPING_SWEEP_PERIOD);
    interval.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {}
        }

        let now = now_millis();
        let cutoff = now - (state.config.mapping_ttl_secs as f64 * 1000.0);

        for backend in &state.config.backend_ips {
            let set_key = format!("backend:{backend}");
            if let Err(e) = state.store.zremrangebyscore(&set_key, 0.0, cutoff).await {
                warn!(error = %e, backend, "stale-mapping sweep failed for backend");
            }
        }
    }
}

/// Periodically removes expired entries from the `logout_tokens` sorted set.
///
/// Nothing in the core router populates `logout_tokens` — this sweep is kept
/// for compatibility with the existing coordination-store schema (an
/// acknowledged open question; see `DESIGN.md`).
pub async fn expired_token_cleaner(state: Arc<RoutingState>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(EXPIRED_TOKEN_SWEEP_PERIOD);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {}
        }

        let now_secs = now_millis() / 1000.0;
        if let Err(e) = state.store.zremrangebyscore("logout_tokens", 0.0, now_secs).await {
            warn!(error = %e, "expired-token sweep failed");
        }
    }
}

fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_millis() as f64
}
