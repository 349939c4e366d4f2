//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::{CartStore, OrderStore};
use crate::services::{OrderLedger, RedemptionService};
use crate::ticket::TicketRenderer;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// stores and the services built on them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    orders: Arc<dyn OrderStore>,
    ledger: OrderLedger,
    redemption: RedemptionService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `orders` - Order storage
    /// * `carts` - Cart storage (read side)
    /// * `tickets` - Ticket renderer used at checkout
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        tickets: TicketRenderer,
    ) -> Self {
        let ledger = OrderLedger::new(Arc::clone(&orders), carts, tickets);
        let redemption = RedemptionService::new(Arc::clone(&orders));

        Self {
            inner: Arc::new(AppStateInner {
                orders,
                ledger,
                redemption,
            }),
        }
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Get a reference to the order ledger.
    #[must_use]
    pub fn ledger(&self) -> &OrderLedger {
        &self.inner.ledger
    }

    /// Get a reference to the redemption service.
    #[must_use]
    pub fn redemption(&self) -> &RedemptionService {
        &self.inner.redemption
    }
}
