//! In-memory store for tests and local demos.
//!
//! Every operation runs under a single mutex, which gives the same
//! all-or-nothing checkout and compare-and-set redemption that the
//! `PostgreSQL` store gets from transactions and row locks.
//!
//! The seeding methods stand in for the collaborators that own customers,
//! the menu and carts in production.

use std::collections::HashMap;
use std::future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use quickbites_core::{
    CartId, CartItemId, MenuItemId, Money, OrderId, OrderItemId, OrderStatus, Uprn, UserId,
};

use super::{CartStore, OrderStore, RepositoryError, StoreFuture};
use crate::models::{
    CartLine, CartSnapshot, CurrentUser, NewOrder, Order, OrderItem, RedemptionCandidate,
};

#[derive(Debug)]
struct Customer {
    uprn: Uprn,
    name: String,
}

#[derive(Debug)]
struct MenuEntry {
    name: String,
    price: Money,
}

#[derive(Debug)]
struct Cart {
    id: CartId,
    lines: Vec<(CartItemId, MenuItemId, u32)>,
}

#[derive(Debug, Default)]
struct State {
    next_id: i32,
    unavailable: bool,
    customers: HashMap<UserId, Customer>,
    menu: HashMap<MenuItemId, MenuEntry>,
    carts: HashMap<UserId, Cart>,
    /// Insertion order doubles as a tie-breaker for equal timestamps.
    orders: Vec<Order>,
    items: HashMap<OrderId, Vec<OrderItem>>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn order_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|order| order.id == id)
    }

    fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == id)
    }
}

/// Mutex-backed implementation of [`CartStore`] and [`OrderStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| RepositoryError::DataCorruption("memory store lock poisoned".into()))?;
        if state.unavailable {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        f(&mut state)
    }

    /// Simulate a database outage: every call fails until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = unavailable;
        }
    }

    /// Register a customer and return the identity a login would store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the UPRN is taken.
    pub fn add_customer(
        &self,
        uprn: Uprn,
        name: &str,
        is_staff: bool,
    ) -> Result<CurrentUser, RepositoryError> {
        self.with_state(|state| {
            if state.customers.values().any(|c| c.uprn == uprn) {
                return Err(RepositoryError::Conflict(format!("uprn {uprn} is taken")));
            }
            let id = UserId::new(state.next_id());
            state.customers.insert(
                id,
                Customer {
                    uprn: uprn.clone(),
                    name: name.to_owned(),
                },
            );
            Ok(CurrentUser {
                id,
                uprn,
                name: name.to_owned(),
                is_staff,
            })
        })
    }

    /// Add a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store is unavailable.
    pub fn add_menu_item(&self, name: &str, price: Money) -> Result<MenuItemId, RepositoryError> {
        self.with_state(|state| {
            let id = MenuItemId::new(state.next_id());
            state.menu.insert(
                id,
                MenuEntry {
                    name: name.to_owned(),
                    price,
                },
            );
            Ok(id)
        })
    }

    /// Change a catalog price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown item.
    pub fn set_price(&self, id: MenuItemId, price: Money) -> Result<(), RepositoryError> {
        self.with_state(|state| {
            let entry = state.menu.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            entry.price = price;
            Ok(())
        })
    }

    /// Put an item in a user's cart, creating the cart on first use.
    ///
    /// Adding an item already in the cart increases its quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown user or item, and
    /// `RepositoryError::Conflict` for a zero quantity.
    pub fn add_to_cart(
        &self,
        user_id: UserId,
        menu_item_id: MenuItemId,
        quantity: u32,
    ) -> Result<CartItemId, RepositoryError> {
        self.with_state(|state| {
            if quantity == 0 {
                return Err(RepositoryError::Conflict("quantity must be positive".into()));
            }
            if !state.customers.contains_key(&user_id) || !state.menu.contains_key(&menu_item_id)
            {
                return Err(RepositoryError::NotFound);
            }

            if !state.carts.contains_key(&user_id) {
                let id = CartId::new(state.next_id());
                state.carts.insert(
                    user_id,
                    Cart {
                        id,
                        lines: Vec::new(),
                    },
                );
            }
            let line_id = CartItemId::new(state.next_id());
            let cart = state.carts.get_mut(&user_id).ok_or(RepositoryError::NotFound)?;

            if let Some(line) = cart.lines.iter_mut().find(|line| line.1 == menu_item_id) {
                line.2 = line.2.saturating_add(quantity);
                return Ok(line.0);
            }
            cart.lines.push((line_id, menu_item_id, quantity));
            Ok(line_id)
        })
    }
}

impl CartStore for MemoryStore {
    fn cart_for_user(&self, user_id: UserId) -> StoreFuture<'_, Option<CartSnapshot>> {
        Box::pin(future::ready(self.with_state(|state| {
            let Some(cart) = state.carts.get(&user_id) else {
                return Ok(None);
            };
            let lines = cart
                .lines
                .iter()
                .map(|&(id, menu_item_id, quantity)| {
                    let entry = state.menu.get(&menu_item_id).ok_or_else(|| {
                        RepositoryError::DataCorruption(format!(
                            "cart references missing menu item {menu_item_id}"
                        ))
                    })?;
                    Ok(CartLine {
                        id,
                        menu_item_id,
                        name: entry.name.clone(),
                        quantity,
                        unit_price: entry.price,
                    })
                })
                .collect::<Result<Vec<_>, RepositoryError>>()?;

            Ok(Some(CartSnapshot {
                id: cart.id,
                user_id,
                lines,
            }))
        })))
    }
}

impl OrderStore for MemoryStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(future::ready(self.with_state(|_| Ok(()))))
    }

    fn insert_order<'a>(&'a self, new_order: &'a NewOrder) -> StoreFuture<'a, Order> {
        Box::pin(future::ready(self.with_state(|state| {
            let order = &new_order.order;
            if state.order(order.id).is_some() {
                return Err(RepositoryError::Conflict(format!(
                    "order {} already exists",
                    order.id
                )));
            }
            if !state.customers.contains_key(&order.user_id) {
                return Err(RepositoryError::NotFound);
            }

            let cart = state
                .carts
                .get(&order.user_id)
                .filter(|cart| cart.id == new_order.cart_id)
                .ok_or(RepositoryError::CartMissing)?;
            let current = cart
                .lines
                .iter()
                .map(|&(_, menu_item_id, quantity)| (menu_item_id, quantity));
            let expected = new_order
                .items
                .iter()
                .map(|item| (item.menu_item_id, item.quantity));
            if !current.eq(expected) {
                return Err(RepositoryError::CartChanged);
            }

            let mut items = Vec::with_capacity(new_order.items.len());
            for item in &new_order.items {
                items.push(OrderItem {
                    id: OrderItemId::new(state.next_id()),
                    order_id: order.id,
                    position: item.position,
                    menu_item_id: item.menu_item_id,
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                });
            }

            state.carts.remove(&order.user_id);
            state.items.insert(order.id, items);
            state.orders.push(order.clone());
            Ok(order.clone())
        })))
    }

    fn find_order(&self, id: OrderId) -> StoreFuture<'_, Option<Order>> {
        Box::pin(future::ready(
            self.with_state(|state| Ok(state.order(id).cloned())),
        ))
    }

    fn order_items(&self, id: OrderId) -> StoreFuture<'_, Vec<OrderItem>> {
        Box::pin(future::ready(self.with_state(|state| {
            Ok(state.items.get(&id).cloned().unwrap_or_default())
        })))
    }

    fn orders_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Order>> {
        Box::pin(future::ready(self.with_state(|state| {
            let mut orders: Vec<Order> = state
                .orders
                .iter()
                .rev()
                .filter(|order| order.user_id == user_id)
                .cloned()
                .collect();
            // Stable: equal timestamps keep newest-inserted first.
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(orders)
        })))
    }

    fn find_for_redemption<'a>(
        &'a self,
        id: OrderId,
        uprn: &'a Uprn,
    ) -> StoreFuture<'a, Option<RedemptionCandidate>> {
        Box::pin(future::ready(self.with_state(|state| {
            let Some(order) = state.order(id) else {
                return Ok(None);
            };
            Ok(state
                .customers
                .get(&order.user_id)
                .filter(|customer| &customer.uprn == uprn)
                .map(|customer| RedemptionCandidate {
                    order: order.clone(),
                    customer_name: customer.name.clone(),
                }))
        })))
    }

    fn order_owner(&self, id: OrderId) -> StoreFuture<'_, Option<Uprn>> {
        Box::pin(future::ready(self.with_state(|state| {
            Ok(state
                .order(id)
                .and_then(|order| state.customers.get(&order.user_id))
                .map(|customer| customer.uprn.clone()))
        })))
    }

    fn mark_redeemed(
        &self,
        id: OrderId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<DateTime<Utc>>> {
        Box::pin(future::ready(self.with_state(|state| {
            let Some(order) = state.order_mut(id) else {
                return Ok(None);
            };
            if order.is_redeemed || order.status == OrderStatus::Cancelled {
                return Ok(None);
            }
            order.is_redeemed = true;
            order.redeemed_at = Some(at);
            order.status = OrderStatus::Completed;
            Ok(Some(at))
        })))
    }

    fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreFuture<'_, Option<Order>> {
        Box::pin(future::ready(self.with_state(|state| {
            Ok(state
                .order_mut(id)
                .filter(|order| order.status == from)
                .map(|order| {
                    order.status = to;
                    order.clone()
                }))
        })))
    }

    fn update_ticket<'a>(&'a self, id: OrderId, ticket: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(future::ready(self.with_state(|state| {
            Ok(state.order_mut(id).is_some_and(|order| {
                order.ticket = ticket.to_owned();
                true
            }))
        })))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::NewOrderItem;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn seeded() -> (MemoryStore, CurrentUser, MenuItemId) {
        let store = MemoryStore::new();
        let user = store
            .add_customer(Uprn::parse("2021CS042").unwrap(), "Asha", false)
            .unwrap();
        let item = store.add_menu_item("Samosa", money("5.00")).unwrap();
        (store, user, item)
    }

    fn new_order(user: &CurrentUser, cart: &CartSnapshot) -> NewOrder {
        NewOrder {
            order: Order {
                id: OrderId::generate(),
                user_id: user.id,
                total_amount: cart.total().unwrap(),
                status: OrderStatus::Confirmed,
                created_at: Utc::now(),
                ticket: String::new(),
                is_redeemed: false,
                redeemed_at: None,
            },
            items: cart
                .lines
                .iter()
                .zip(0_u32..)
                .map(|(line, position)| NewOrderItem {
                    position,
                    menu_item_id: line.menu_item_id,
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            cart_id: cart.id,
        }
    }

    /// A stored order for `user`, checked out from a fresh cart.
    async fn placed_order(store: &MemoryStore, user: &CurrentUser, item: MenuItemId) -> Order {
        store.add_to_cart(user.id, item, 2).unwrap();
        let cart = store.cart_for_user(user.id).await.unwrap().unwrap();
        store.insert_order(&new_order(user, &cart)).await.unwrap()
    }

    #[tokio::test]
    async fn test_cart_reads_live_prices() {
        let (store, user, item) = seeded();
        store.add_to_cart(user.id, item, 2).unwrap();
        store.add_to_cart(user.id, item, 1).unwrap();
        store.set_price(item, money("6.00")).unwrap();

        let cart = store.cart_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines[0].quantity, 3);
        assert_eq!(cart.total().unwrap(), money("18.00"));
    }

    #[tokio::test]
    async fn test_insert_order_clears_cart() {
        let (store, user, item) = seeded();
        store.add_to_cart(user.id, item, 2).unwrap();
        let cart = store.cart_for_user(user.id).await.unwrap().unwrap();

        let order = store.insert_order(&new_order(&user, &cart)).await.unwrap();

        assert!(store.cart_for_user(user.id).await.unwrap().is_none());
        assert_eq!(store.order_items(order.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replayed_cart_snapshot_is_rejected() {
        let (store, user, item) = seeded();
        store.add_to_cart(user.id, item, 2).unwrap();
        let cart = store.cart_for_user(user.id).await.unwrap().unwrap();

        store.insert_order(&new_order(&user, &cart)).await.unwrap();
        let err = store.insert_order(&new_order(&user, &cart)).await.unwrap_err();

        assert!(matches!(err, RepositoryError::CartMissing));
        assert_eq!(store.orders_for_user(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lines_added_after_snapshot_block_the_write() {
        let (store, user, item) = seeded();
        let chai = store.add_menu_item("Chai", money("1.50")).unwrap();
        store.add_to_cart(user.id, item, 1).unwrap();
        let cart = store.cart_for_user(user.id).await.unwrap().unwrap();
        store.add_to_cart(user.id, chai, 3).unwrap();

        let err = store.insert_order(&new_order(&user, &cart)).await.unwrap_err();

        assert!(matches!(err, RepositoryError::CartChanged));
        assert!(store.orders_for_user(user.id).await.unwrap().is_empty());
        let kept = store.cart_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(kept.line_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_order_id_conflicts_without_side_effects() {
        let (store, user, item) = seeded();
        let first = placed_order(&store, &user, item).await;

        store.add_to_cart(user.id, item, 1).unwrap();
        let cart = store.cart_for_user(user.id).await.unwrap().unwrap();
        let mut second = new_order(&user, &cart);
        second.order.id = first.id;
        let err = store.insert_order(&second).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert!(store.cart_for_user(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mark_redeemed_only_once() {
        let (store, user, item) = seeded();
        let order = placed_order(&store, &user, item).await;

        let now = Utc::now();
        assert_eq!(store.mark_redeemed(order.id, now).await.unwrap(), Some(now));
        assert_eq!(store.mark_redeemed(order.id, Utc::now()).await.unwrap(), None);

        let stored = store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.redeemed_at, Some(now));
        assert_eq!(stored.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_redemption_lookup_requires_matching_uprn() {
        let (store, user, item) = seeded();
        let order = placed_order(&store, &user, item).await;

        let other = Uprn::parse("2021CS099").unwrap();
        assert!(
            store
                .find_for_redemption(order.id, &other)
                .await
                .unwrap()
                .is_none()
        );
        let found = store
            .find_for_redemption(order.id, &user.uprn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.customer_name, "Asha");
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let (store, user, _) = seeded();
        store.set_unavailable(true);
        assert!(matches!(
            store.ping().await,
            Err(RepositoryError::Database(_))
        ));
        assert!(store.orders_for_user(user.id).await.is_err());
    }
}
