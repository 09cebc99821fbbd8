//! API token middleware.
//!
//! Reads `ingest.token` from config **once at startup** and caches the
//! SHA-256 digest in `AppState`. If the token is empty, the server logs
//! a warning once and allows unauthenticated access (dev mode).
//! Otherwise every request to `/events` must carry the configured token
//! in an `X-Collector-Token` header, compared in constant time.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

pub async fn require_ingest_token(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let expected_hash = match &state.token_hash {
        Some(h) => h,
        None => return next.run(req).await,
    };

    let provided = req
        .headers()
        .get("x-collector-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let provided_hash = Sha256::digest(provided.as_bytes());

    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        return (
            axum::http::StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": "invalid or missing collector token" })),
        )
            .into_response();
    }

    next.run(req).await
}
