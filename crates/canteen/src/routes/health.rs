//! Health check handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::state::AppState;

/// Liveness: the process is up.
pub async fn health() -> impl IntoResponse {
    "ok"
}

/// Readiness: the order store answers.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.orders().ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use crate::db::MemoryStore;
    use crate::routes::test_support::{app, send};

    #[tokio::test]
    async fn test_health_and_readiness() {
        let store = MemoryStore::new();
        let app = app(&store);

        assert_eq!(send(&app, "GET", "/health", None, None).await.status(), StatusCode::OK);
        assert_eq!(
            send(&app, "GET", "/health/ready", None, None).await.status(),
            StatusCode::OK
        );

        store.set_unavailable(true);
        assert_eq!(
            send(&app, "GET", "/health/ready", None, None).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(send(&app, "GET", "/health", None, None).await.status(), StatusCode::OK);
    }
}
