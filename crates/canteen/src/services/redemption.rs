//! Ticket redemption.
//!
//! The one place an order's redemption flag is set. A scan decodes the
//! token, matches the order by ID *and* owner UPRN, then flips the flag with
//! a compare-and-set so concurrent scans of one ticket redeem it exactly once.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use quickbites_core::{OrderStatus, RedemptionToken};

use crate::db::{OrderStore, RepositoryError};
use crate::models::{Order, RedeemedOrder};

/// Result of a redemption attempt.
///
/// Only `Redeemed` mutates the order. The others are normal answers for the
/// scanner, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// This call consumed the ticket.
    Redeemed(RedeemedOrder),
    /// The ticket was consumed earlier.
    AlreadyRedeemed,
    /// No order matches the token's ID and UPRN.
    NotFound,
    /// The scanned text is not a redemption token.
    InvalidToken,
    /// The order was cancelled before pickup.
    Cancelled,
}

impl RedemptionOutcome {
    /// Whether the ticket was consumed by this call.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Redeemed(_))
    }
}

/// Redemption service.
#[derive(Clone)]
pub struct RedemptionService {
    orders: Arc<dyn OrderStore>,
}

impl RedemptionService {
    /// Create a new redemption service.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Redeem the ticket carrying `qr_data`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` only for storage failures; every business
    /// outcome is an `Ok` variant.
    #[instrument(skip(self, qr_data))]
    pub async fn redeem(&self, qr_data: &str) -> Result<RedemptionOutcome, RepositoryError> {
        let Ok(token) = RedemptionToken::decode(qr_data) else {
            tracing::info!("Rejected malformed ticket");
            return Ok(RedemptionOutcome::InvalidToken);
        };
        let order_id = token.order_id();

        let Some(candidate) = self
            .orders
            .find_for_redemption(order_id, token.uprn())
            .await?
        else {
            tracing::info!(%order_id, "No order matches ticket");
            return Ok(RedemptionOutcome::NotFound);
        };

        if let Some(outcome) = Self::refusal(&candidate.order) {
            tracing::info!(%order_id, ?outcome, "Ticket refused");
            return Ok(outcome);
        }

        match self.orders.mark_redeemed(order_id, Utc::now()).await? {
            Some(redeemed_at) => {
                tracing::info!(%order_id, "Ticket redeemed");
                Ok(RedemptionOutcome::Redeemed(RedeemedOrder {
                    order_id,
                    customer_name: candidate.customer_name,
                    total_amount: candidate.order.total_amount,
                    redeemed_at,
                }))
            }
            // Lost the race; report whatever state won.
            None => {
                let current = self.orders.find_order(order_id).await?;
                let outcome = current
                    .as_ref()
                    .and_then(Self::refusal)
                    .unwrap_or(RedemptionOutcome::AlreadyRedeemed);
                tracing::info!(%order_id, ?outcome, "Ticket redeemed concurrently");
                Ok(outcome)
            }
        }
    }

    fn refusal(order: &Order) -> Option<RedemptionOutcome> {
        if order.is_redeemed {
            Some(RedemptionOutcome::AlreadyRedeemed)
        } else if order.status == OrderStatus::Cancelled {
            Some(RedemptionOutcome::Cancelled)
        } else {
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::CurrentUser;
    use crate::services::OrderLedger;
    use crate::ticket::TicketRenderer;
    use quickbites_core::{Money, Uprn};

    struct Fixture {
        store: MemoryStore,
        ledger: OrderLedger,
        service: RedemptionService,
        user: CurrentUser,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let user = store
            .add_customer(Uprn::parse("2021CS042").unwrap(), "Asha Rao", false)
            .unwrap();
        let ledger = OrderLedger::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            TicketRenderer::default(),
        );
        let service = RedemptionService::new(Arc::new(store.clone()));
        Fixture {
            store,
            ledger,
            service,
            user,
        }
    }

    async fn place_order(fx: &Fixture) -> Order {
        let item = fx
            .store
            .add_menu_item("Vada Pav", "5.00".parse::<Money>().unwrap())
            .unwrap();
        fx.store.add_to_cart(fx.user.id, item, 2).unwrap();
        fx.ledger.checkout(&fx.user).await.unwrap()
    }

    fn token_for(order: &Order, uprn: &str) -> String {
        RedemptionToken::encode(&order.id.to_string(), uprn).unwrap()
    }

    #[tokio::test]
    async fn test_redeem_once_then_already_redeemed() {
        let fx = fixture();
        let order = place_order(&fx).await;
        let token = token_for(&order, "2021CS042");

        let RedemptionOutcome::Redeemed(redeemed) = fx.service.redeem(&token).await.unwrap() else {
            panic!("first scan should redeem");
        };
        assert_eq!(redeemed.customer_name, "Asha Rao");
        assert_eq!(redeemed.total_amount.to_string(), "10.00");

        let stored = fx.store.find_order(order.id).await.unwrap().unwrap();
        assert!(stored.is_redeemed);
        assert_eq!(stored.status, OrderStatus::Completed);
        assert_eq!(stored.redeemed_at, Some(redeemed.redeemed_at));

        assert_eq!(
            fx.service.redeem(&token).await.unwrap(),
            RedemptionOutcome::AlreadyRedeemed
        );
        let again = fx.store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(again.redeemed_at, Some(redeemed.redeemed_at));
    }

    #[tokio::test]
    async fn test_uprn_mismatch_is_not_found() {
        let fx = fixture();
        let order = place_order(&fx).await;

        assert_eq!(
            fx.service
                .redeem(&token_for(&order, "2021CS999"))
                .await
                .unwrap(),
            RedemptionOutcome::NotFound
        );
        let stored = fx.store.find_order(order.id).await.unwrap().unwrap();
        assert!(!stored.is_redeemed);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let fx = fixture();
        let token = format!("ORDER:{}:2021CS042", quickbites_core::OrderId::generate());
        assert_eq!(
            fx.service.redeem(&token).await.unwrap(),
            RedemptionOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_malformed_tokens_are_invalid() {
        let fx = fixture();
        let order = place_order(&fx).await;
        for bad in [
            String::new(),
            "hello".to_string(),
            format!("TICKET:{}:2021CS042", order.id),
            format!("ORDER:{}:2021CS042:x", order.id),
            "ORDER:12:2021CS042".to_string(),
        ] {
            assert_eq!(
                fx.service.redeem(&bad).await.unwrap(),
                RedemptionOutcome::InvalidToken,
                "{bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_cancelled_order_is_refused_without_mutation() {
        let fx = fixture();
        let order = place_order(&fx).await;
        fx.store
            .update_status(order.id, OrderStatus::Confirmed, OrderStatus::Cancelled)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            fx.service
                .redeem(&token_for(&order, "2021CS042"))
                .await
                .unwrap(),
            RedemptionOutcome::Cancelled
        );
        let stored = fx.store.find_order(order.id).await.unwrap().unwrap();
        assert!(!stored.is_redeemed);
        assert_eq!(stored.status, OrderStatus::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redeems_succeed_exactly_once() {
        let fx = fixture();
        let order = place_order(&fx).await;
        let token = token_for(&order, "2021CS042");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = fx.service.clone();
                let token = token.clone();
                tokio::spawn(async move { service.redeem(&token).await.unwrap() })
            })
            .collect();

        let mut successes = 0;
        let mut already = 0;
        for handle in handles {
            match handle.await.unwrap() {
                RedemptionOutcome::Redeemed(_) => successes += 1,
                RedemptionOutcome::AlreadyRedeemed => already += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(already, 15);
    }

    #[tokio::test]
    async fn test_storage_failure_is_an_error() {
        let fx = fixture();
        let order = place_order(&fx).await;
        fx.store.set_unavailable(true);
        assert!(
            fx.service
                .redeem(&token_for(&order, "2021CS042"))
                .await
                .is_err()
        );
    }
}
