//! Customer order handlers: checkout, history, detail and ticket image.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use quickbites_core::{MenuItemId, Money, OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderItem};
use crate::services::{LedgerError, OrderDetail};
use crate::state::AppState;
use crate::ticket;

/// Order summary for history lists.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub is_redeemed: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            status: order.status,
            total_amount: order.total_amount,
            created_at: order.created_at,
            is_redeemed: order.is_redeemed,
            redeemed_at: order.redeemed_at,
        }
    }
}

/// Order line as captured at checkout.
#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            menu_item_id: item.menu_item_id,
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// Order with items and the base64 ticket (the "show this at the counter" view).
#[derive(Debug, Serialize)]
pub struct OrderDetailView {
    #[serde(flatten)]
    pub order: OrderView,
    pub items: Vec<OrderItemView>,
    pub ticket: String,
}

impl From<&OrderDetail> for OrderDetailView {
    fn from(detail: &OrderDetail) -> Self {
        Self {
            order: OrderView::from(&detail.order),
            items: detail.items.iter().map(OrderItemView::from).collect(),
            ticket: detail.order.ticket.clone(),
        }
    }
}

/// Parse a path ID; anything malformed is simply not found.
pub(crate) fn parse_order_id(raw: &str) -> Result<OrderId> {
    OrderId::parse_canonical(raw).map_err(|_| AppError::Ledger(LedgerError::NotFound))
}

/// Pay (mock) and turn the cart into an order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let order = state.ledger().checkout(&user).await?;
    let detail = state.ledger().order_detail(order.id, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(OrderDetailView::from(&detail))))
}

/// The user's orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = state.ledger().list_orders(&user).await?;
    Ok(Json(orders.iter().map(OrderView::from).collect()))
}

/// One of the user's orders.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailView>> {
    let id = parse_order_id(&id)?;
    let detail = state.ledger().order_detail(id, Some(user.id)).await?;
    Ok(Json(OrderDetailView::from(&detail)))
}

/// The stored ticket as a PNG.
pub async fn ticket_png(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_order_id(&id)?;
    let order = state.ledger().get_order(id, Some(user.id)).await?;
    let png = ticket::from_portable_string(&order.ticket).map_err(LedgerError::from)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    use crate::db::MemoryStore;
    use crate::models::CurrentUser;
    use crate::routes::test_support::{app, json_body, login_cookie, send};
    use crate::ticket;
    use quickbites_core::Uprn;

    fn customer(store: &MemoryStore, uprn: &str) -> CurrentUser {
        store
            .add_customer(Uprn::parse(uprn).unwrap(), "Asha Rao", false)
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_creates_confirmed_order() {
        let store = MemoryStore::new();
        let app = app(&store);
        let user = customer(&store, "2021CS042");
        let a = store.add_menu_item("Idli", "5.00".parse().unwrap()).unwrap();
        let b = store.add_menu_item("Chai", "3.50".parse().unwrap()).unwrap();
        store.add_to_cart(user.id, a, 2).unwrap();
        store.add_to_cart(user.id, b, 1).unwrap();
        let cookie = login_cookie(&app, &user).await;

        let response = send(&app, "POST", "/checkout", Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["total_amount"], "13.50");
        assert_eq!(body["status"], "confirmed");
        assert_eq!(body["is_redeemed"], false);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert!(!body["ticket"].as_str().unwrap().is_empty());

        let cart = json_body(send(&app, "GET", "/cart", Some(&cookie), None).await).await;
        assert_eq!(cart["item_count"], 0);
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let store = MemoryStore::new();
        let app = app(&store);
        let user = customer(&store, "2021CS042");
        let cookie = login_cookie(&app, &user).await;

        let response = send(&app, "POST", "/checkout", Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Your cart is empty!");
    }

    #[tokio::test]
    async fn test_order_detail_is_owner_only() {
        let store = MemoryStore::new();
        let app = app(&store);
        let owner = customer(&store, "2021CS042");
        let other = customer(&store, "2021CS043");
        let item = store.add_menu_item("Idli", "5.00".parse().unwrap()).unwrap();
        store.add_to_cart(owner.id, item, 1).unwrap();

        let owner_cookie = login_cookie(&app, &owner).await;
        let order = json_body(send(&app, "POST", "/checkout", Some(&owner_cookie), None).await).await;
        let uri = format!("/orders/{}", order["id"].as_str().unwrap());

        let response = send(&app, "GET", &uri, Some(&owner_cookie), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let other_cookie = login_cookie(&app, &other).await;
        let response = send(&app, "GET", &uri, Some(&other_cookie), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, "GET", "/orders/42", Some(&owner_cookie), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_history_and_ticket_image() {
        let store = MemoryStore::new();
        let app = app(&store);
        let user = customer(&store, "2021CS042");
        let item = store.add_menu_item("Idli", "5.00".parse().unwrap()).unwrap();
        let cookie = login_cookie(&app, &user).await;

        store.add_to_cart(user.id, item, 1).unwrap();
        let first = json_body(send(&app, "POST", "/checkout", Some(&cookie), None).await).await;
        store.add_to_cart(user.id, item, 2).unwrap();
        let second = json_body(send(&app, "POST", "/checkout", Some(&cookie), None).await).await;

        let history = json_body(send(&app, "GET", "/orders", Some(&cookie), None).await).await;
        let ids: Vec<_> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["id"].clone())
            .collect();
        assert_eq!(ids, vec![second["id"].clone(), first["id"].clone()]);

        let uri = format!("/orders/{}/ticket.png", first["id"].as_str().unwrap());
        let response = send(&app, "GET", &uri, Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
        let png = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            ticket::read_png(&png).unwrap(),
            format!("ORDER:{}:2021CS042", first["id"].as_str().unwrap())
        );
    }
}
