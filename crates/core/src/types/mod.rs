//! Core types for QuickBites.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod status;
pub mod token;
pub mod uprn;

pub use id::*;
pub use money::{Money, MoneyError};
pub use status::{OrderStatus, StatusError};
pub use token::{RedemptionToken, TokenError};
pub use uprn::{Uprn, UprnError};
