//! Header middleware applied to every routed endpoint except `/ping`.
//!
//! Three concerns, applied in one layer so ordering between them is never a
//! question: CORS (with an explicit reject, not just an omitted header),
//! no-cache directives, and a response timestamp.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::{config::AllowOrigin, error::AppError, routing::RoutingState};

/// CORS + no-cache + timestamp, in that order.
///
/// An `OPTIONS` preflight is answered directly with 204 and never reaches
/// the handler. A non-matching `Origin` on any other method is rejected with
/// [`AppError::CorsRejected`] before the handler runs.
pub async fn headers_middleware(
    State(state): State<Arc<RoutingState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let origin = req
        .headers()
        .get(axum::http::header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(origin) = &origin {
        if !state.config.allow_origin.allows(origin) {
            return Err(AppError::CorsRejected);
        }
    }

    if req.method() == Method::OPTIONS {
        let mut resp = Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(axum::body::Body::empty())
            .expect("a 204 response with no headers always builds");
        apply_cors_headers(resp.headers_mut(), origin.as_deref(), &state.config.allow_origin);
        apply_no_cache_headers(resp.headers_mut());
        stamp_timestamp(resp.headers_mut());
        return Ok(resp);
    }

    let mut resp = next.run(req).await;
    apply_cors_headers(resp.headers_mut(), origin.as_deref(), &state.config.allow_origin);
    apply_no_cache_headers(resp.headers_mut());
    stamp_timestamp(resp.headers_mut());
    Ok(resp)
}

fn apply_cors_headers(headers: &mut axum::http::HeaderMap, origin: Option<&str>, allow: &AllowOrigin) {
    let reflected = match (origin, allow) {
        (Some(origin), _) => origin.to_string(),
        (None, AllowOrigin::Any) => "*".to_string(),
        (None, AllowOrigin::List(entries)) => entries.first().cloned().unwrap_or_default(),
    };

    if let Ok(value) = HeaderValue::from_str(&reflected) {
        headers.insert("access-control-allow-origin", value);
    }
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET, POST, DELETE, PATCH, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("X-Client-Id, Authorization, Content-Type"),
    );
    headers.insert("access-control-allow-credentials", HeaderValue::from_static("true"));
}

fn apply_no_cache_headers(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static("private, no-cache, no-store, must-revalidate"),
    );
    headers.insert(axum::http::header::EXPIRES, HeaderValue::from_static("-1"));
    headers.insert(axum::http::header::PRAGMA, HeaderValue::from_static("no-cache"));
}

fn stamp_timestamp(headers: &mut axum::http::HeaderMap) {
    let now = Utc::now().to_rfc3339();
    if let Ok(value) = HeaderValue::from_str(&now) {
        headers.insert("x-timestamp", value);
    }
}
