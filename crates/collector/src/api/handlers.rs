//! `/health`, `/stats`, and `/events` handlers.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::runtime::bus::EnqueueError;
use crate::state::AppState;

pub async fn health() -> Response {
    (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
}

pub async fn stats(State(state): State<AppState>) -> Response {
    let db_size = state.store.get_db_size();
    (StatusCode::OK, Json(state.observability.snapshot(db_size))).into_response()
}

pub async fn post_events(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    if headers.get(axum::http::header::CONTENT_LENGTH).is_none() && body.is_empty() {
        return (
            StatusCode::LENGTH_REQUIRED,
            Json(json!({ "error": "content-length required" })),
        )
            .into_response();
    }

    let parsed: Result<Value, _> = serde_json::from_slice(&body);
    let value = match parsed {
        Ok(v) => v,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid JSON" }))).into_response();
        }
    };

    let events: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "event body must be a JSON object or array of objects" })),
            )
                .into_response();
        }
    };

    if events.iter().any(|e| !e.is_object()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "every event must be a JSON object" })),
        )
            .into_response();
    }

    let mut count = 0usize;
    for event in events {
        match state.bus.enqueue(event) {
            Ok(()) => count += 1,
            Err(EnqueueError::QueueFull) => {
                state.observability.record_drop("queue_full");
                return (StatusCode::TOO_MANY_REQUESTS, Json(json!({ "error": "queue full" }))).into_response();
            }
        }
    }

    (StatusCode::OK, Json(json!({ "status": "queued", "count": count }))).into_response()
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}
