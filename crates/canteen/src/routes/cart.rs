//! Cart view.

use axum::{Json, extract::State};
use serde::Serialize;

use quickbites_core::{MenuItemId, Money};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::CartSnapshot;
use crate::services::LedgerError;
use crate::state::AppState;

/// One cart line as shown to the customer.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// The cart with its live total.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: usize,
    pub total: Money,
}

impl CartView {
    fn empty() -> Self {
        Self {
            lines: Vec::new(),
            item_count: 0,
            total: Money::ZERO,
        }
    }

    fn from_snapshot(cart: &CartSnapshot) -> std::result::Result<Self, LedgerError> {
        let lines = cart
            .lines
            .iter()
            .map(|line| {
                Ok(CartLineView {
                    menu_item_id: line.menu_item_id,
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    subtotal: line.subtotal()?,
                })
            })
            .collect::<std::result::Result<Vec<_>, LedgerError>>()?;

        Ok(Self {
            item_count: cart.line_count(),
            total: cart.total()?,
            lines,
        })
    }
}

/// Show the signed-in user's cart, priced at current catalog prices.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let view = match state.ledger().cart(&user).await? {
        Some(cart) => CartView::from_snapshot(&cart)?,
        None => CartView::empty(),
    };
    Ok(Json(view))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::db::MemoryStore;
    use crate::routes::test_support::{app, json_body, login_cookie, send};
    use quickbites_core::Uprn;

    #[tokio::test]
    async fn test_cart_total_follows_catalog() {
        let store = MemoryStore::new();
        let app = app(&store);
        let user = store
            .add_customer(Uprn::parse("2021CS042").unwrap(), "Asha Rao", false)
            .unwrap();
        let item = store.add_menu_item("Poha", "4.00".parse().unwrap()).unwrap();
        store.add_to_cart(user.id, item, 3).unwrap();
        let cookie = login_cookie(&app, &user).await;

        let body = json_body(send(&app, "GET", "/cart", Some(&cookie), None).await).await;
        assert_eq!(body["total"], "12.00");
        assert_eq!(body["item_count"], 1);

        store.set_price(item, "4.50".parse().unwrap()).unwrap();
        let body = json_body(send(&app, "GET", "/cart", Some(&cookie), None).await).await;
        assert_eq!(body["total"], "13.50");
        assert_eq!(body["lines"][0]["subtotal"], "13.50");
    }

    #[tokio::test]
    async fn test_no_cart_is_empty_view() {
        let store = MemoryStore::new();
        let app = app(&store);
        let user = store
            .add_customer(Uprn::parse("2021CS042").unwrap(), "Asha Rao", false)
            .unwrap();
        let cookie = login_cookie(&app, &user).await;

        let body = json_body(send(&app, "GET", "/cart", Some(&cookie), None).await).await;
        assert_eq!(body, json!({ "lines": [], "item_count": 0, "total": "0.00" }));
    }

    #[tokio::test]
    async fn test_cart_requires_login() {
        let store = MemoryStore::new();
        let response = send(&app(&store), "GET", "/cart", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
