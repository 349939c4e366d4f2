//! Order lifecycle status.
//!
//! ```text
//! pending → confirmed → preparing → ready → completed
//!    └─────────┴────────────┴─────────┴──→ cancelled
//! ```
//!
//! Checkout creates orders directly in `confirmed` (the mock payment has
//! already succeeded). Redemption is a separate flag on the order, but it
//! always drives the status to `completed`.

use serde::{Deserialize, Serialize};

/// Errors for status parsing and transitions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// The text is not a known status.
    #[error("invalid order status: {0}")]
    Unknown(String),
    /// The requested move is not allowed from the current status.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "canteen.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Position along the forward path. `None` for `cancelled`.
    const fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Confirmed => Some(1),
            Self::Preparing => Some(2),
            Self::Ready => Some(3),
            Self::Completed => Some(4),
            Self::Cancelled => None,
        }
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether staff may move an order from `self` to `next`.
    ///
    /// Forward moves may skip steps (a kitchen can mark a confirmed order
    /// ready straight away). Cancellation is allowed from any non-terminal
    /// status. Nothing leaves a terminal status, and staying put is not a
    /// transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::InvalidTransition` if the move is not allowed.
    pub fn transition_to(self, next: Self) -> Result<Self, StatusError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Stable lowercase name, as stored in the database and sent over JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusError::Unknown(s.to_owned()))
    }
}
