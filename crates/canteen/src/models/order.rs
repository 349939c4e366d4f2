//! Order domain types.

use chrono::{DateTime, Utc};

use quickbites_core::{CartId, MenuItemId, Money, OrderId, OrderItemId, OrderStatus, UserId};

/// A finalized purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Random, non-sequential ID (also the ticket claim).
    pub id: OrderId,
    /// Owner.
    pub user_id: UserId,
    /// Total frozen at checkout.
    pub total_amount: Money,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// Base64-encoded QR ticket PNG.
    pub ticket: String,
    /// Whether the ticket has been consumed.
    pub is_redeemed: bool,
    /// When the ticket was consumed.
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Whether `user` owns this order.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == user
    }
}

/// A line item snapshotted at checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    /// Line ID.
    pub id: OrderItemId,
    /// Parent order.
    pub order_id: OrderId,
    /// Zero-based position within the order.
    pub position: u32,
    /// Menu item that was bought.
    pub menu_item_id: MenuItemId,
    /// Menu item name at checkout.
    pub name: String,
    /// Quantity.
    pub quantity: u32,
    /// Unit price at checkout. Later catalog changes never touch this.
    pub unit_price: Money,
}

/// Line item to be written together with a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub position: u32,
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Everything checkout persists in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The order row, ticket already rendered.
    pub order: Order,
    /// Its line items.
    pub items: Vec<NewOrderItem>,
    /// Cart to delete once the order is written.
    pub cart_id: CartId,
}

/// An order matched by both ID and owner UPRN, ready for redemption.
#[derive(Debug, Clone)]
pub struct RedemptionCandidate {
    pub order: Order,
    /// Owner display name.
    pub customer_name: String,
}

/// The result of a successful redemption write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemedOrder {
    pub order_id: OrderId,
    pub customer_name: String,
    pub total_amount: Money,
    pub redeemed_at: DateTime<Utc>,
}
