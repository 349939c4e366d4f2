//! Order ledger.
//!
//! Turns carts into orders, serves order history, and applies staff status
//! changes. Every operation takes the acting user explicitly.

mod error;

pub use error::LedgerError;

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use quickbites_core::{Money, OrderId, OrderStatus, RedemptionToken, UserId};

use crate::db::{CartStore, OrderStore, RepositoryError};
use crate::models::{CartSnapshot, CurrentUser, NewOrder, NewOrderItem, Order, OrderItem};
use crate::ticket::TicketRenderer;

/// Largest total `customer_order.total_amount` (`NUMERIC(8, 2)`) can hold.
fn max_order_total() -> Decimal {
    Decimal::new(99_999_999, 2)
}

/// An order with its line items.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order ledger service.
#[derive(Clone)]
pub struct OrderLedger {
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
    tickets: TicketRenderer,
}

impl OrderLedger {
    /// Create a new ledger.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        tickets: TicketRenderer,
    ) -> Self {
        Self {
            orders,
            carts,
            tickets,
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// The user's cart priced at current catalog prices.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` if the cart cannot be read.
    pub async fn cart(&self, user: &CurrentUser) -> Result<Option<CartSnapshot>, LedgerError> {
        Ok(self.carts.cart_for_user(user.id).await?)
    }

    /// Check out the user's current cart.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::EmptyCart` if the user has no cart or it has no
    /// lines, plus everything [`OrderLedger::create_order`] returns.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn checkout(&self, user: &CurrentUser) -> Result<Order, LedgerError> {
        let cart = self
            .carts
            .cart_for_user(user.id)
            .await?
            .ok_or(LedgerError::EmptyCart)?;
        self.create_order(user, &cart).await
    }

    /// Create an order from a cart snapshot.
    ///
    /// Unit prices are captured from the snapshot. The order starts in
    /// `confirmed` with its ticket already rendered, and the cart is deleted
    /// in the same write. The write only succeeds while the stored cart
    /// still matches the snapshot, so replaying a snapshot cannot produce a
    /// second order.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::EmptyCart` for a cart without lines,
    /// `LedgerError::Validation` if the cart belongs to someone else or has a
    /// zero quantity or a total too large to store, `LedgerError::EmptyCart`
    /// if the cart was already checked out, `LedgerError::CartChanged` if its
    /// lines changed since the snapshot, and `LedgerError::Ticket` /
    /// `LedgerError::Repository` if rendering or persisting fails. Nothing is
    /// written on error.
    #[instrument(skip(self, user, cart), fields(user_id = %user.id, cart_id = %cart.id))]
    pub async fn create_order(
        &self,
        user: &CurrentUser,
        cart: &CartSnapshot,
    ) -> Result<Order, LedgerError> {
        if cart.user_id != user.id {
            return Err(LedgerError::Validation(
                "cart does not belong to the signed-in user".into(),
            ));
        }
        if cart.is_empty() {
            return Err(LedgerError::EmptyCart);
        }

        let mut items = Vec::with_capacity(cart.line_count());
        for (line, position) in cart.lines.iter().zip(0_u32..) {
            if line.quantity == 0 {
                return Err(LedgerError::Validation(format!(
                    "quantity for {} must be positive",
                    line.name
                )));
            }
            items.push(NewOrderItem {
                position,
                menu_item_id: line.menu_item_id,
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        let subtotals = items
            .iter()
            .map(|item| item.unit_price.times(item.quantity))
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = Money::total(subtotals)?;
        if total_amount.amount() > max_order_total() {
            return Err(LedgerError::Validation(format!(
                "order total {total_amount} exceeds the maximum of {}",
                max_order_total()
            )));
        }

        let id = OrderId::generate();
        let token = RedemptionToken::new(id, user.uprn.clone());
        let ticket = self.tickets.render_token(&token)?;

        let new_order = NewOrder {
            order: Order {
                id,
                user_id: user.id,
                total_amount,
                status: OrderStatus::Confirmed,
                created_at: Utc::now(),
                ticket,
                is_redeemed: false,
                redeemed_at: None,
            },
            items,
            cart_id: cart.id,
        };

        let order = self
            .orders
            .insert_order(&new_order)
            .await
            .map_err(|e| match e {
                RepositoryError::CartMissing => LedgerError::EmptyCart,
                RepositoryError::CartChanged => LedgerError::CartChanged,
                other => LedgerError::Repository(other),
            })?;
        tracing::info!(order_id = %order.id, total = %order.total_amount, "Order created");
        Ok(order)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Load an order, optionally restricted to its owner.
    ///
    /// A failed owner check is reported exactly like a missing order.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound` or `LedgerError::Repository`.
    pub async fn get_order(
        &self,
        id: OrderId,
        owner: Option<UserId>,
    ) -> Result<Order, LedgerError> {
        let order = self
            .orders
            .find_order(id)
            .await?
            .ok_or(LedgerError::NotFound)?;

        match owner {
            Some(user) if !order.is_owned_by(user) => Err(LedgerError::NotFound),
            _ => Ok(order),
        }
    }

    /// Load an order together with its line items.
    ///
    /// # Errors
    ///
    /// Same as [`OrderLedger::get_order`].
    pub async fn order_detail(
        &self,
        id: OrderId,
        owner: Option<UserId>,
    ) -> Result<OrderDetail, LedgerError> {
        let order = self.get_order(id, owner).await?;
        let items = self.orders.order_items(id).await?;
        Ok(OrderDetail { order, items })
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Repository` if the query fails.
    pub async fn list_orders(&self, user: &CurrentUser) -> Result<Vec<Order>, LedgerError> {
        Ok(self.orders.orders_for_user(user.id).await?)
    }

    // =========================================================================
    // Staff
    // =========================================================================

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Forbidden` for non-staff, `LedgerError::NotFound`,
    /// `LedgerError::InvalidTransition` for a move the state machine rejects,
    /// and `LedgerError::ConcurrentUpdate` if the status changed underneath.
    #[instrument(skip(self, actor), fields(staff_id = %actor.id))]
    pub async fn set_status(
        &self,
        actor: &CurrentUser,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, LedgerError> {
        if !actor.is_staff {
            return Err(LedgerError::Forbidden);
        }

        let order = self.get_order(id, None).await?;
        order.status.transition_to(status)?;

        let updated = self
            .orders
            .update_status(id, order.status, status)
            .await?
            .ok_or(LedgerError::ConcurrentUpdate)?;

        tracing::info!(from = %order.status, to = %status, "Order status changed");
        Ok(updated)
    }

    /// Re-render and store an order's ticket from its ID and owner UPRN.
    ///
    /// Returns the new base64 ticket, which equals the old one unless the
    /// render parameters changed.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotFound`, `LedgerError::Ticket` or
    /// `LedgerError::Repository`.
    #[instrument(skip(self))]
    pub async fn regenerate_ticket(&self, id: OrderId) -> Result<String, LedgerError> {
        let uprn = self
            .orders
            .order_owner(id)
            .await?
            .ok_or(LedgerError::NotFound)?;

        let ticket = self
            .tickets
            .render_token(&RedemptionToken::new(id, uprn))?;

        if !self.orders.update_ticket(id, &ticket).await? {
            return Err(LedgerError::NotFound);
        }
        tracing::info!("Ticket regenerated");
        Ok(ticket)
    }
}
