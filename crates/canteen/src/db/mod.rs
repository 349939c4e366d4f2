//! Persistence for the canteen.
//!
//! # Database: `quickbites` (schema `canteen`)
//!
//! ## Tables
//!
//! - `customer` - Users (written by the registration flow, read here)
//! - `menu_item` - Catalog with live prices (written by catalog admin)
//! - `cart` / `cart_item` - Pre-checkout baskets (written by cart endpoints)
//! - `customer_order` - Finalized orders, ticket and redemption state
//! - `order_item` - Immutable line items with prices captured at checkout
//! - `tower_sessions.session` - Session storage
//!
//! # Stores
//!
//! Storage sits behind two traits so the ledger and redemption logic run
//! unchanged against [`PgStore`] in production and [`MemoryStore`] in tests.
//! Both implementations honour the same atomicity: checkout writes order,
//! items and cart deletion together, and redemption is a compare-and-set on
//! the redemption flag.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/canteen/migrations/` and run via:
//! ```bash
//! cargo run -p quickbites-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use quickbites_core::{OrderId, OrderStatus, Uprn, UserId};

use crate::models::{CartSnapshot, NewOrder, Order, OrderItem, RedemptionCandidate};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate order ID).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The cart being checked out no longer exists.
    #[error("cart is gone")]
    CartMissing,

    /// The cart's lines differ from the snapshot being checked out.
    #[error("cart lines changed")]
    CartChanged,
}

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Read side of the cart collaborator.
pub trait CartStore: Send + Sync {
    /// The user's cart with live catalog prices, if they have one.
    fn cart_for_user(&self, user_id: UserId) -> StoreFuture<'_, Option<CartSnapshot>>;
}

/// Order ledger storage.
pub trait OrderStore: Send + Sync {
    /// Cheap connectivity check for the readiness endpoint.
    fn ping(&self) -> StoreFuture<'_, ()>;

    /// Persist an order, its items and delete the source cart, atomically.
    ///
    /// The cart is locked and re-read inside the write. It must still belong
    /// to the order's user and hold exactly the snapshot's lines (menu item
    /// and quantity, in order), otherwise nothing is written and the result
    /// is `RepositoryError::CartMissing` or `RepositoryError::CartChanged`.
    fn insert_order<'a>(&'a self, new_order: &'a NewOrder) -> StoreFuture<'a, Order>;

    /// Load an order by ID.
    fn find_order(&self, id: OrderId) -> StoreFuture<'_, Option<Order>>;

    /// Line items of an order, by position.
    fn order_items(&self, id: OrderId) -> StoreFuture<'_, Vec<OrderItem>>;

    /// A user's orders, newest first.
    fn orders_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Order>>;

    /// Load an order only if its owner has the given UPRN.
    fn find_for_redemption<'a>(
        &'a self,
        id: OrderId,
        uprn: &'a Uprn,
    ) -> StoreFuture<'a, Option<RedemptionCandidate>>;

    /// UPRN of the order's owner.
    fn order_owner(&self, id: OrderId) -> StoreFuture<'_, Option<Uprn>>;

    /// Compare-and-set redemption.
    ///
    /// Sets the redemption flag, timestamp and `completed` status only if the
    /// order is not yet redeemed and not cancelled. Returns the stored
    /// timestamp when this call won, `None` when it did not.
    fn mark_redeemed(&self, id: OrderId, at: DateTime<Utc>)
    -> StoreFuture<'_, Option<DateTime<Utc>>>;

    /// Compare-and-set status change from `from` to `to`.
    ///
    /// Returns the updated order, or `None` if the order is missing or its
    /// status is no longer `from`.
    fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreFuture<'_, Option<Order>>;

    /// Replace the stored ticket image. Returns `false` if the order is missing.
    fn update_ticket<'a>(&'a self, id: OrderId, ticket: &'a str) -> StoreFuture<'a, bool>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
