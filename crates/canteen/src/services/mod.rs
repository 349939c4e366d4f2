//! Business logic services for the canteen.
//!
//! # Services
//!
//! - `ledger` - Checkout, order queries, staff status changes, ticket regeneration
//! - `redemption` - Exactly-once ticket redemption

pub mod ledger;
pub mod redemption;

pub use ledger::{LedgerError, OrderDetail, OrderLedger};
pub use redemption::{RedemptionOutcome, RedemptionService};
