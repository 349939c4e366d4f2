//! HTTP route handlers for the canteen.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (store ping)
//!
//! # Scanner API (no session; the token is the claim)
//! POST /api/redeem-ticket/            - Redeem a scanned ticket
//!
//! # Customer (requires auth)
//! GET  /cart                          - Cart with live total
//! POST /checkout                      - Mock payment, creates the order
//! GET  /orders                        - Order history, newest first
//! GET  /orders/{id}                   - Order detail with items and ticket
//! GET  /orders/{id}/ticket.png        - Ticket image
//!
//! # Staff (requires staff)
//! GET  /api/staff/orders/{id}         - Any order's detail
//! POST /api/staff/orders/{id}/status  - Change status
//! ```

pub mod cart;
pub mod health;
pub mod orders;
pub mod redeem;
pub mod staff;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/ticket.png", get(orders::ticket_png))
}

/// Create the staff API routes router.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}", get(staff::show))
        .route("/orders/{id}/status", post(staff::update_status))
}

/// Create all routes for the canteen.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .route(
            "/api/redeem-ticket/",
            post(redeem::redeem_ticket).fallback(redeem::invalid_method),
        )
        .route("/cart", get(cart::show))
        .route("/checkout", post(orders::checkout))
        .nest("/orders", order_routes())
        .nest("/api/staff", staff_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    //! Router harness: in-memory stores, in-memory sessions and a login
    //! route standing in for the external login flow.

    use std::sync::Arc;

    use axum::{
        Json, Router,
        body::{Body, to_bytes},
        http::{Request, Response, StatusCode, header},
        routing::post,
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use tower_sessions::Session;

    use super::routes;
    use crate::db::MemoryStore;
    use crate::middleware::{create_session_layer, set_current_user};
    use crate::models::CurrentUser;
    use crate::state::AppState;
    use crate::ticket::TicketRenderer;

    async fn login(session: Session, Json(user): Json<CurrentUser>) -> StatusCode {
        set_current_user(&session, &user).await.unwrap();
        StatusCode::NO_CONTENT
    }

    /// Full router over `store`.
    pub fn app(store: &MemoryStore) -> Router {
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            TicketRenderer::default(),
        );
        routes()
            .route("/test/login", post(login))
            .with_state(state)
            .layer(create_session_layer(
                tower_sessions::MemoryStore::default(),
                false,
            ))
    }

    /// Sign `user` in and return the `Cookie` header value.
    pub async fn login_cookie(app: &Router, user: &CurrentUser) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::post("/test/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(user).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Send a request, optionally with a session cookie.
    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(request.body(body).unwrap()).await.unwrap()
    }

    /// Read a response body as JSON.
    pub async fn json_body(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
