//! Integration test harness for QuickBites.
//!
//! [`TestStack`] serves the canteen (in-memory storage and sessions) and a
//! scanner relay pointed at it, each on its own `127.0.0.1:0` listener.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p quickbites-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quickbites_canteen::db::MemoryStore;
use quickbites_canteen::models::{CurrentUser, Order};
use quickbites_canteen::services::OrderLedger;
use quickbites_canteen::state::AppState;
use quickbites_canteen::ticket::TicketRenderer;
use quickbites_core::Uprn;
use quickbites_scanner::RelayClient;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use url::Url;

/// Canteen plus scanner, wired together.
pub struct TestStack {
    /// Shared storage behind the canteen.
    pub store: MemoryStore,
    /// Ledger over the same storage, for placing orders directly.
    pub ledger: OrderLedger,
    /// Canteen base URL.
    pub canteen_url: String,
    /// Scanner base URL.
    pub scanner_url: String,
    /// Plain HTTP client.
    pub client: Client,
}

async fn serve(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server error");
    });
    addr
}

/// Start a scanner relaying to `redeem_url`, returning its base URL.
pub async fn start_scanner(redeem_url: &str) -> String {
    let url = Url::parse(redeem_url).expect("Invalid redeem URL");
    let relay = RelayClient::new(url, Duration::from_secs(5)).expect("Failed to build relay");
    let addr = serve(quickbites_scanner::build_router(relay)).await;
    format!("http://{addr}")
}

impl TestStack {
    /// Start both services.
    pub async fn start() -> Self {
        let store = MemoryStore::new();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            TicketRenderer::default(),
        );
        let canteen = quickbites_canteen::build_router(
            state,
            tower_sessions::MemoryStore::default(),
            false,
        );
        let canteen_url = format!("http://{}", serve(canteen).await);
        let scanner_url = start_scanner(&format!("{canteen_url}/api/redeem-ticket/")).await;

        let ledger = OrderLedger::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            TicketRenderer::default(),
        );

        Self {
            store,
            ledger,
            canteen_url,
            scanner_url,
            client: Client::new(),
        }
    }

    /// Register a customer.
    pub fn customer(&self, uprn: &str, name: &str) -> CurrentUser {
        self.store
            .add_customer(Uprn::parse(uprn).expect("Invalid UPRN"), name, false)
            .expect("Failed to add customer")
    }

    /// Fill the customer's cart with `(name, price, quantity)` lines and check out.
    pub async fn place_order(&self, user: &CurrentUser, lines: &[(&str, &str, u32)]) -> Order {
        for (name, price, quantity) in lines {
            let price = price.parse().expect("Invalid price");
            let item = self
                .store
                .add_menu_item(name, price)
                .expect("Failed to add menu item");
            self.store
                .add_to_cart(user.id, item, *quantity)
                .expect("Failed to add to cart");
        }
        self.ledger.checkout(user).await.expect("Checkout failed")
    }

    /// Post a scan to the scanner relay.
    pub async fn scan(&self, qr_data: &str) -> (StatusCode, Value) {
        post_scan(&self.client, &self.scanner_url, qr_data).await
    }

    /// Re-read an order from storage.
    pub async fn reload(&self, order: &Order) -> Order {
        self.ledger
            .get_order(order.id, None)
            .await
            .expect("Order vanished")
    }
}

/// Post `{ "qr_data": ... }` to a scanner at `scanner_url`.
pub async fn post_scan(client: &Client, scanner_url: &str, qr_data: &str) -> (StatusCode, Value) {
    let response = client
        .post(format!("{scanner_url}/scan-ticket/"))
        .json(&json!({ "qr_data": qr_data }))
        .send()
        .await
        .expect("Scanner unreachable");
    let status = response.status();
    let body = response.json().await.expect("Scanner answered non-JSON");
    (status, body)
}
