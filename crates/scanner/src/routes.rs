//! HTTP route handlers for the scanner.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health         - Liveness
//! GET  /health/ready   - Readiness (same as liveness; the canteen is not contacted)
//! POST /scan-ticket/   - Relay a scan to the canteen
//! ```

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tracing::instrument;

use crate::relay::RelayClient;

/// Create all routes for the scanner.
pub fn routes() -> Router<RelayClient> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(health))
        .route("/scan-ticket/", post(scan_ticket).fallback(invalid_request))
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

/// Relay a scan and hand back the canteen's answer unmodified.
#[instrument(skip(relay, body))]
pub async fn scan_ticket(State(relay): State<RelayClient>, body: Bytes) -> Response {
    match relay.forward(body).await {
        Ok(upstream) => (
            upstream.status,
            [(header::CONTENT_TYPE, "application/json")],
            upstream.body,
        )
            .into_response(),
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(
                error = %e,
                outcome_unknown = e.is_outcome_unknown(),
                sentry_event_id = %event_id,
                "Scan relay failed"
            );
            failure(StatusCode::BAD_GATEWAY, "Error processing scan")
        }
    }
}

/// Any method other than POST.
pub async fn invalid_request() -> Response {
    failure(StatusCode::METHOD_NOT_ALLOWED, "Invalid request")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use url::Url;

    use super::*;

    /// Upstream that echoes the received body inside its answer.
    async fn echo(body: Bytes) -> impl IntoResponse {
        let received = String::from_utf8(body.to_vec()).unwrap();
        (
            StatusCode::OK,
            Json(json!({ "success": false, "message": "Order not found", "received": received })),
        )
    }

    async fn spawn_upstream(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        addr
    }

    fn scanner(upstream: SocketAddr, timeout: Duration) -> Router {
        let url = Url::parse(&format!("http://{upstream}/api/redeem-ticket/")).unwrap();
        routes().with_state(RelayClient::new(url, timeout).unwrap())
    }

    async fn post_scan(app: Router, body: &'static str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post("/scan-ticket/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_body_is_forwarded_verbatim() {
        let upstream =
            spawn_upstream(Router::new().route("/api/redeem-ticket/", post(echo))).await;
        let raw = r#"{"qr_data":"ORDER:x:y",  "extra": [1, 2]}"#;

        let (status, body) = post_scan(scanner(upstream, Duration::from_secs(5)), raw).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["received"], raw);
        assert_eq!(body["message"], "Order not found");
    }

    #[tokio::test]
    async fn test_upstream_status_is_passed_through() {
        let upstream = spawn_upstream(Router::new().route(
            "/api/redeem-ticket/",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "message": "Error processing request" })),
                )
            }),
        ))
        .await;

        let (status, body) = post_scan(scanner(upstream, Duration::from_secs(5)), "{}").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error processing request");
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        // Bind and drop to get a port nobody listens on.
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let (status, body) = post_scan(scanner(addr, Duration::from_secs(5)), "{}").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body,
            json!({ "success": false, "message": "Error processing scan" })
        );
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let upstream = spawn_upstream(Router::new().route(
            "/api/redeem-ticket/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "success": true }))
            }),
        ))
        .await;

        let (status, body) = post_scan(scanner(upstream, Duration::from_millis(200)), "{}").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "Error processing scan");
    }

    #[tokio::test]
    async fn test_non_json_upstream_is_a_relay_failure() {
        let upstream = spawn_upstream(Router::new().route(
            "/api/redeem-ticket/",
            post(|| async { (StatusCode::BAD_GATEWAY, "<html>proxy error</html>") }),
        ))
        .await;

        let (status, body) = post_scan(scanner(upstream, Duration::from_secs(5)), "{}").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "Error processing scan");
    }

    #[tokio::test]
    async fn test_get_is_invalid_request() {
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let response = scanner(addr, Duration::from_secs(1))
            .oneshot(Request::get("/scan-ticket/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "success": false, "message": "Invalid request" }));
    }
}
