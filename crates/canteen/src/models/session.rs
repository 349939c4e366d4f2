//! Session-related types.
//!
//! The login flow lives outside this service. It writes a [`CurrentUser`]
//! into the shared session store; everything here only reads it.

use serde::{Deserialize, Serialize};

use quickbites_core::{Uprn, UserId};

/// Session-stored user identity.
///
/// Handlers receive this explicitly through the auth extractors and pass it
/// on to the ledger; nothing reads "the current user" from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's UPRN (login name, embedded in tickets).
    pub uprn: Uprn,
    /// Display name shown to staff on redemption.
    pub name: String,
    /// Canteen staff may edit order status.
    pub is_staff: bool,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
