pub mod health;
pub mod investigations;
pub mod stream;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health probe
        .route("/healthz", get(health::healthz))
        // Investigations
        .route("/investigate", post(investigations::create))
        .route("/investigate/stream", get(stream::investigate_stream))
        .route("/investigations/:id", get(investigations::get_one))
        .route("/investigations/:id", delete(investigations::cancel))
        .route("/investigations/:id/logs", get(investigations::get_logs))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
