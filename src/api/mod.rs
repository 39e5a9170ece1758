//! HTTP surface — route table and the middleware applied to it.
//!
//! [`router`] wires the four endpoints in `6. EXTERNAL INTERFACES` onto a
//! single axum [`Router`]: `/ping` is exempt from the header middleware,
//! everything else gets CORS + no-cache + timestamp via
//! [`middleware::headers_middleware`].

mod health;
mod middleware;
mod ping;
mod start;
mod stop;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::routing::RoutingState;

pub fn router(state: Arc<RoutingState>) -> Router {
    let routed = Router::new()
        .route("/start_agent", post(start::start_agent))
        .route("/stop_agent", post(stop::stop_agent))
        .route("/health", get(health::health))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::headers_middleware,
        ));

    Router::new()
        .route("/ping", get(ping::ping))
        .merge(routed)
        .with_state(state)
}
