//! Theia Server - the collector's client-facing WebSocket endpoints
//!
//! Three paths terminate client message channels:
//!
//! | Path     | Payload direction                               | Close initiator |
//! |----------|-------------------------------------------------|-----------------|
//! | `/event` | client → server, many events                    | client          |
//! | `/find`  | one filter in, historical events out            | server          |
//! | `/live`  | one filter in, matching events out indefinitely | client          |
//!
//! plus `GET /health` for liveness probes. Each channel is owned by one
//! connection task; the push path relays into the store and broker
//! synchronously, so ingest throughput is bounded by storage rather than
//! broker scheduling.

mod error;
mod handlers;
mod state;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

pub use error::HandshakeError;
pub use state::{AppState, Ingest};

/// Build the collector router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/event", get(handlers::event_ws))
        .route("/find", get(handlers::find_ws))
        .route("/live", get(handlers::live_ws))
        .route("/health", get(handlers::health))
        .with_state(state)
}
