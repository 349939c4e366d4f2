//! HTTP middleware stack for the canteen.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is not a layer: handlers ask for it through the
//! [`RequireAuth`] and [`RequireStaff`] extractors.

pub mod auth;
pub mod session;

pub use auth::{AuthRejection, RequireAuth, RequireStaff, set_current_user};
pub use session::{SESSION_COOKIE_NAME, create_session_layer, postgres_session_store};
