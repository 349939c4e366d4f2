//! Order ledger error types.

use thiserror::Error;

use quickbites_core::{MoneyError, StatusError};

use crate::db::RepositoryError;
use crate::ticket::TicketError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Checkout was attempted with no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Order does not exist, or the caller may not see it.
    #[error("order not found")]
    NotFound,

    /// Caller lacks the staff role.
    #[error("staff access required")]
    Forbidden,

    /// Status change not allowed from the current status.
    #[error(transparent)]
    InvalidTransition(#[from] StatusError),

    /// Order status changed between read and write.
    #[error("order was modified concurrently")]
    ConcurrentUpdate,

    /// Cart lines changed between reading the cart and writing the order.
    #[error("cart changed during checkout")]
    CartChanged,

    /// Ticket rendering failed.
    #[error("ticket error: {0}")]
    Ticket(#[from] TicketError),

    /// Amount arithmetic failed.
    #[error("amount error: {0}")]
    Money(#[from] MoneyError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
