//! QuickBites scanner relay library.
//!
//! A scanner station posts the text read from a ticket's QR code here; the
//! relay forwards it to the canteen and returns the canteen's answer. It
//! holds no state and no database connection.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod relay;
pub mod routes;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::RelayError;
pub use relay::RelayClient;

/// Build the full application router.
pub fn build_router(relay: RelayClient) -> Router {
    routes::routes()
        .with_state(relay)
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
