//! Ticket maintenance commands.

use std::path::Path;
use std::sync::Arc;

use quickbites_canteen::config::CanteenConfig;
use quickbites_canteen::db::{self, PgStore};
use quickbites_canteen::services::OrderLedger;
use quickbites_canteen::ticket::{self, TicketRenderer};
use quickbites_core::{OrderId, RedemptionToken};

use super::CommandError;

/// Re-render an order's ticket with the configured parameters and store it.
///
/// # Errors
///
/// Returns an error if the id is malformed, the order does not exist or the
/// database is unreachable.
pub async fn regenerate(order_id: &str) -> Result<(), CommandError> {
    let id = OrderId::parse_canonical(order_id)
        .map_err(|_| CommandError::OrderId(order_id.to_string()))?;
    let config = CanteenConfig::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(pool));
    let ledger = OrderLedger::new(store.clone(), store, TicketRenderer::new(config.ticket));

    let ticket = ledger.regenerate_ticket(id).await?;
    tracing::info!(order_id = %id, bytes = ticket.len(), "Ticket stored");
    Ok(())
}

/// Read a ticket image and print the token it carries.
///
/// # Errors
///
/// Returns an error if the file cannot be read, holds no QR code, or the
/// code is not a redemption token.
pub fn decode(path: &Path) -> Result<(), CommandError> {
    let png = std::fs::read(path).map_err(|source| CommandError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let payload = ticket::read_png(&png)?;
    let token = RedemptionToken::decode(&payload)?;

    #[allow(clippy::print_stdout)]
    {
        println!("token:    {payload}");
        println!("order id: {}", token.order_id());
        println!("uprn:     {}", token.uprn());
    }
    Ok(())
}
