use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod api;
mod config;
mod error;
mod proxy;
mod reclaim;
mod routing;
mod store;

pub use config::Config;
pub use error::AppError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // When invoked as a Docker HEALTHCHECK, hit /ping and exit immediately.
    // This avoids needing any external tool (curl/wget) in the container image.
    if std::env::args().nth(1).as_deref() == Some("--healthcheck") {
        return healthcheck().await;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_router=info,tower_http=warn".into()),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration from the environment")?;

    info!(
        backends = config.backend_ips.len(),
        max_requests_per_backend = config.max_requests_per_backend,
        port = config.port,
        "session-router starting"
    );

    let store = store::redis::RedisStore::connect(&config.redis_url)
        .await
        .context("failed to connect to coordination store")?;
    info!("coordination store reachable");

    let config = Arc::new(config);
    let port = config.port;
    let state = Arc::new(routing::RoutingState::new(Arc::new(store), Arc::clone(&config)));

    let cancel = CancellationToken::new();
    let reclaim_handles = vec![
        tokio::spawn(reclaim::stale_mapping_cleaner(Arc::clone(&state), cancel.clone())),
        tokio::spawn(reclaim::expired_token_cleaner(Arc::clone(&state), cancel.clone())),
    ];

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "router listening");

    let app = api::router(state).layer(
        tower_http::trace::TraceLayer::new_for_http()
            .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
            .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO)),
    );

    // The drain deadline must only start counting once a shutdown signal
    // actually arrives — not from process start. `signal_received` fires the
    // graceful-shutdown future axum drains against; `watchdog` waits for that
    // same signal and only then starts its 5-second countdown, so a server
    // that runs for days with no signal never trips it.
    let signal_received = Arc::new(tokio::sync::Notify::new());
    let watchdog_signal = Arc::clone(&signal_received);

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal_received.notify_one();
        });

    let watchdog = async move {
        watchdog_signal.notified().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    };

    let serve_result = tokio::select! {
        result = server => Some(result),
        _ = watchdog => None,
    };

    // Shutdown triggers context cancellation on the reclaimers too.
    cancel.cancel();
    let reclaimers_done = futures_join_all(reclaim_handles);
    let _ = tokio::time::timeout(Duration::from_secs(5), reclaimers_done).await;

    match serve_result {
        Some(result) => {
            result.context("server error")?;
            Ok(())
        }
        None => {
            warn!("graceful shutdown exceeded its deadline; exiting non-zero");
            std::process::exit(1);
        }
    }
}

async fn futures_join_all(handles: Vec<tokio::task::JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "reclamation worker task panicked");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

/// Lightweight healthcheck: GET /ping and exit 0 on 200, 1 otherwise.
/// Invoked via `session-router --healthcheck` from a Docker HEALTHCHECK.
async fn healthcheck() -> anyhow::Result<()> {
    let port = std::env::var("PORT").ok().and_then(|v| v.parse::<u16>().ok()).unwrap_or(8080);

    let url = format!("http://127.0.0.1:{port}/ping");
    let resp = reqwest::get(&url).await;

    match resp {
        Ok(r) if r.status().is_success() => std::process::exit(0),
        _ => std::process::exit(1),
    }
}
