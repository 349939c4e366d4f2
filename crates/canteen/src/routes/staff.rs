//! Staff API: look up any order and move it through the kitchen.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use quickbites_core::OrderStatus;

use super::orders::{OrderDetailView, OrderView, parse_order_id};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Any order, without the owner check.
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailView>> {
    let id = parse_order_id(&id)?;
    let detail = state.ledger().order_detail(id, None).await?;
    Ok(Json(OrderDetailView::from(&detail)))
}

/// Move an order to a new status.
#[instrument(skip(state, staff, update), fields(staff_id = %staff.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<OrderView>> {
    let id = parse_order_id(&id)?;
    let status: OrderStatus = update
        .status
        .parse()
        .map_err(|e: quickbites_core::StatusError| AppError::BadRequest(e.to_string()))?;

    let order = state.ledger().set_status(&staff, id, status).await?;
    Ok(Json(OrderView::from(&order)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::db::MemoryStore;
    use crate::models::CurrentUser;
    use crate::routes::test_support::{app, json_body, login_cookie, send};
    use quickbites_core::Uprn;

    struct Setup {
        app: axum::Router,
        customer: String,
        staff: String,
        order_id: String,
    }

    async fn setup() -> Setup {
        let store = MemoryStore::new();
        let app = app(&store);
        let user: CurrentUser = store
            .add_customer(Uprn::parse("2021CS042").unwrap(), "Asha Rao", false)
            .unwrap();
        let staff = store
            .add_customer(Uprn::parse("STAFF01").unwrap(), "Counter", true)
            .unwrap();
        let item = store.add_menu_item("Idli", "5.00".parse().unwrap()).unwrap();
        store.add_to_cart(user.id, item, 1).unwrap();

        let customer = login_cookie(&app, &user).await;
        let order = json_body(send(&app, "POST", "/checkout", Some(&customer), None).await).await;
        let staff = login_cookie(&app, &staff).await;

        Setup {
            app,
            customer,
            staff,
            order_id: order["id"].as_str().unwrap().to_string(),
        }
    }

    async fn set_status(s: &Setup, cookie: &str, status: &str) -> (StatusCode, Value) {
        let uri = format!("/api/staff/orders/{}/status", s.order_id);
        let response = send(&s.app, "POST", &uri, Some(cookie), Some(json!({ "status": status }))).await;
        (response.status(), json_body(response).await)
    }

    #[tokio::test]
    async fn test_staff_moves_order_forward() {
        let s = setup().await;

        let (status, body) = set_status(&s, &s.staff, "preparing").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "preparing");

        let (status, body) = set_status(&s, &s.staff, "ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_illegal_and_unknown_status() {
        let s = setup().await;

        let (status, _) = set_status(&s, &s.staff, "pending").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = set_status(&s, &s.staff, "shipped").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid order status: shipped");
    }

    #[tokio::test]
    async fn test_customers_cannot_use_staff_api() {
        let s = setup().await;

        let (status, _) = set_status(&s, &s.customer, "ready").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/api/staff/orders/{}", s.order_id);
        let response = send(&s.app, "GET", &uri, Some(&s.customer), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&s.app, "GET", &uri, None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&s.app, "GET", &uri, Some(&s.staff), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], s.order_id.as_str());
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_redeemed() {
        let s = setup().await;
        let (status, _) = set_status(&s, &s.staff, "cancelled").await;
        assert_eq!(status, StatusCode::OK);

        let response = send(
            &s.app,
            "POST",
            "/api/redeem-ticket/",
            None,
            Some(json!({ "qr_data": format!("ORDER:{}:2021CS042", s.order_id) })),
        )
        .await;
        assert_eq!(
            json_body(response).await,
            json!({ "success": false, "message": "Order has been cancelled" })
        );
    }
}
