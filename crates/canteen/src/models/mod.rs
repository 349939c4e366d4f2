//! Domain models for the canteen.
//!
//! These are validated domain types, separate from the database row types in
//! [`crate::db`] and the JSON view types in [`crate::routes`].

pub mod cart;
pub mod order;
pub mod session;

pub use cart::{CartLine, CartSnapshot};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, RedeemedOrder, RedemptionCandidate};
pub use session::{CurrentUser, keys as session_keys};
