//! QuickBites canteen library.
//!
//! Orders, QR tickets and the redemption API, packaged as a library so the
//! binary, the CLI and the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod ticket;

use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use state::AppState;

/// Build the full application router.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `session_store` - Session backend shared with the login flow
/// * `secure_cookies` - Mark the session cookie `Secure`
pub fn build_router<S>(state: AppState, session_store: S, secure_cookies: bool) -> Router
where
    S: SessionStore + Clone,
{
    routes::routes()
        .layer(middleware::create_session_layer(session_store, secure_cookies))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
