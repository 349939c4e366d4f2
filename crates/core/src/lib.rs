//! QuickBites Core - Shared domain types.
//!
//! This crate provides the types used by every QuickBites component:
//! - `canteen` - Main ordering service (orders, tickets, redemption API)
//! - `scanner` - Staff scanner relay (separate deployment)
//! - `cli` - Command-line tools for migrations and ticket maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The redemption token codec lives here because both
//! deployments must agree on its wire format byte for byte.
//!
//! # Modules
//!
//! - [`types`] - IDs, UPRNs, money, order status and the redemption token

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
