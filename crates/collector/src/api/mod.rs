pub mod auth;
pub mod handlers;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the full API router: `/health` and `/stats` are open, `/events`
/// is gated behind the ingest token middleware, and every path answers
/// `OPTIONS` with permissive CORS for local-network sensor clients.
pub fn router(state: AppState) -> Router<AppState> {
    let events = Router::new()
        .route("/events", post(handlers::post_events))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_ingest_token));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .merge(events)
        .fallback(handlers::not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
