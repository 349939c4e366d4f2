//! `PostgreSQL` implementation of the canteen stores.
//!
//! Queries are checked at runtime (`query_as::<_, Row>`) so the crate builds
//! without a live database or an offline query cache.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use quickbites_core::{
    CartId, CartItemId, MenuItemId, Money, OrderId, OrderItemId, OrderStatus, Uprn, UserId,
};

use super::{CartStore, OrderStore, RepositoryError, StoreFuture};
use crate::models::{CartLine, CartSnapshot, NewOrder, Order, OrderItem, RedemptionCandidate};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: i32,
    total_amount: Decimal,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    ticket: String,
    is_redeemed: bool,
    redeemed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::from_uuid(row.id),
            user_id: UserId::new(row.user_id),
            total_amount: money(row.total_amount, "customer_order.total_amount")?,
            status: row.status,
            created_at: row.created_at,
            ticket: row.ticket,
            is_redeemed: row.is_redeemed,
            redeemed_at: row.redeemed_at,
        })
    }
}

/// Internal row type for the redemption lookup.
#[derive(Debug, sqlx::FromRow)]
struct RedemptionRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: String,
}

/// Internal row type for order line items.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: Uuid,
    position: i32,
    menu_item_id: i32,
    name: String,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            position: unsigned(row.position, "order_item.position")?,
            menu_item_id: MenuItemId::new(row.menu_item_id),
            name: row.name,
            quantity: unsigned(row.quantity, "order_item.quantity")?,
            unit_price: money(row.unit_price, "order_item.unit_price")?,
        })
    }
}

/// Internal row type for cart lines joined with live catalog prices.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i32,
    menu_item_id: i32,
    name: String,
    quantity: i32,
    price: Decimal,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CartItemId::new(row.id),
            menu_item_id: MenuItemId::new(row.menu_item_id),
            name: row.name,
            quantity: unsigned(row.quantity, "cart_item.quantity")?,
            unit_price: money(row.price, "menu_item.price")?,
        })
    }
}

fn money(value: Decimal, column: &str) -> Result<Money, RepositoryError> {
    Money::new(value).map_err(|e| RepositoryError::DataCorruption(format!("{column}: {e}")))
}

fn unsigned(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("{column}: negative value {value}")))
}

fn signed(value: u32, what: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value).map_err(|_| RepositoryError::Conflict(format!("{what} out of range")))
}

const ORDER_COLUMNS: &str =
    "id, user_id, total_amount, status, created_at, ticket, is_redeemed, redeemed_at";

// =============================================================================
// Store
// =============================================================================

/// Store backed by the `canteen` schema.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_cart(&self, user_id: UserId) -> Result<Option<CartSnapshot>, RepositoryError> {
        let cart_id: Option<i32> =
            sqlx::query_scalar("SELECT id FROM canteen.cart WHERE user_id = $1")
                .bind(user_id.as_i32())
                .fetch_optional(&self.pool)
                .await?;

        let Some(cart_id) = cart_id else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.id, ci.menu_item_id, m.name, ci.quantity, m.price
            FROM canteen.cart_item ci
            JOIN canteen.menu_item m ON m.id = ci.menu_item_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CartSnapshot {
            id: CartId::new(cart_id),
            user_id,
            lines,
        }))
    }

    async fn write_order(&self, new_order: &NewOrder) -> Result<Order, RepositoryError> {
        let order = &new_order.order;
        let mut tx = self.pool.begin().await?;

        // Locking the cart row also blocks cart_item inserts (their foreign
        // key check needs a share lock on it) until this transaction ends.
        let locked: Option<i32> = sqlx::query_scalar(
            "SELECT id FROM canteen.cart WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(new_order.cart_id.as_i32())
        .bind(order.user_id.as_i32())
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(RepositoryError::CartMissing);
        }

        let current: Vec<(i32, i32)> = sqlx::query_as(
            "SELECT menu_item_id, quantity FROM canteen.cart_item WHERE cart_id = $1 ORDER BY id",
        )
        .bind(new_order.cart_id.as_i32())
        .fetch_all(&mut *tx)
        .await?;
        let expected = new_order
            .items
            .iter()
            .map(|item| Ok((item.menu_item_id.as_i32(), signed(item.quantity, "quantity")?)))
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        if current != expected {
            return Err(RepositoryError::CartChanged);
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO canteen.customer_order (
                id, user_id, total_amount, status, created_at,
                ticket, is_redeemed, redeemed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_i32())
        .bind(order.total_amount.amount())
        .bind(order.status)
        .bind(order.created_at)
        .bind(&order.ticket)
        .bind(order.is_redeemed)
        .bind(order.redeemed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("order {} already exists", order.id))
            }
            other => RepositoryError::Database(other),
        })?;

        for item in &new_order.items {
            sqlx::query(
                r"
                INSERT INTO canteen.order_item (
                    order_id, position, menu_item_id, name, quantity, unit_price
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order.id.as_uuid())
            .bind(signed(item.position, "position")?)
            .bind(item.menu_item_id.as_i32())
            .bind(&item.name)
            .bind(signed(item.quantity, "quantity")?)
            .bind(item.unit_price.amount())
            .execute(&mut *tx)
            .await?;
        }

        // Cart items cascade.
        sqlx::query("DELETE FROM canteen.cart WHERE id = $1")
            .bind(new_order.cart_id.as_i32())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Order::try_from(row)
    }

    async fn load_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM canteen.customer_order WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn load_items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, position, menu_item_id, name, quantity, unit_price
            FROM canteen.order_item
            WHERE order_id = $1
            ORDER BY position
            ",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(OrderItem::try_from)
        .collect()
    }

    async fn load_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM canteen.customer_order
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "
        ))
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Order::try_from)
        .collect()
    }

    async fn load_for_redemption(
        &self,
        id: OrderId,
        uprn: &Uprn,
    ) -> Result<Option<RedemptionCandidate>, RepositoryError> {
        let row = sqlx::query_as::<_, RedemptionRow>(
            r"
            SELECT
                o.id, o.user_id, o.total_amount, o.status, o.created_at,
                o.ticket, o.is_redeemed, o.redeemed_at,
                c.name AS customer_name
            FROM canteen.customer_order o
            JOIN canteen.customer c ON c.id = o.user_id
            WHERE o.id = $1 AND c.uprn = $2
            ",
        )
        .bind(id.as_uuid())
        .bind(uprn.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(RedemptionCandidate {
            order: Order::try_from(row.order)?,
            customer_name: row.customer_name,
        }))
    }

    async fn load_owner(&self, id: OrderId) -> Result<Option<Uprn>, RepositoryError> {
        let uprn: Option<String> = sqlx::query_scalar(
            r"
            SELECT c.uprn
            FROM canteen.customer_order o
            JOIN canteen.customer c ON c.id = o.user_id
            WHERE o.id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        uprn.map(|raw| {
            Uprn::parse(&raw)
                .map_err(|e| RepositoryError::DataCorruption(format!("customer.uprn: {e}")))
        })
        .transpose()
    }

    async fn compare_and_redeem(
        &self,
        id: OrderId,
        at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        // The row lock taken by UPDATE serializes concurrent attempts; the
        // loser re-evaluates the WHERE clause and matches nothing.
        let redeemed_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r"
            UPDATE canteen.customer_order
            SET is_redeemed = TRUE, redeemed_at = $2, status = 'completed'
            WHERE id = $1 AND is_redeemed = FALSE AND status <> 'cancelled'
            RETURNING redeemed_at
            ",
        )
        .bind(id.as_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(redeemed_at)
    }

    async fn compare_and_set_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE canteen.customer_order
            SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn replace_ticket(&self, id: OrderId, ticket: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE canteen.customer_order SET ticket = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(ticket)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl CartStore for PgStore {
    fn cart_for_user(&self, user_id: UserId) -> StoreFuture<'_, Option<CartSnapshot>> {
        Box::pin(self.load_cart(user_id))
    }
}

impl OrderStore for PgStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }

    fn insert_order<'a>(&'a self, new_order: &'a NewOrder) -> StoreFuture<'a, Order> {
        Box::pin(self.write_order(new_order))
    }

    fn find_order(&self, id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(self.load_order(id))
    }

    fn order_items(&self, id: OrderId) -> StoreFuture<'_, Vec<OrderItem>> {
        Box::pin(self.load_items(id))
    }

    fn orders_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Order>> {
        Box::pin(self.load_orders_for_user(user_id))
    }

    fn find_for_redemption<'a>(
        &'a self,
        id: OrderId,
        uprn: &'a Uprn,
    ) -> StoreFuture<'a, Option<RedemptionCandidate>> {
        Box::pin(self.load_for_redemption(id, uprn))
    }

    fn order_owner(&self, id: OrderId) -> StoreFuture<'_, Option<Uprn>> {
        Box::pin(self.load_owner(id))
    }

    fn mark_redeemed(
        &self,
        id: OrderId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<DateTime<Utc>>> {
        Box::pin(self.compare_and_redeem(id, at))
    }

    fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreFuture<'_, Option<Order>> {
        Box::pin(self.compare_and_set_status(id, from, to))
    }

    fn update_ticket<'a>(&'a self, id: OrderId, ticket: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(self.replace_ticket(id, ticket))
    }
}
