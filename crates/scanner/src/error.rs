//! Relay errors.

use thiserror::Error;

/// Errors that can occur when relaying a scan to the canteen.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Building the HTTP client failed.
    #[error("Relay client error: {0}")]
    Client(String),

    /// The request did not complete (connection refused, timeout, ...).
    #[error("Relay request failed: {0}")]
    Request(String),

    /// The canteen answered with something that is not JSON.
    #[error("Relay response error: {0}")]
    Response(String),
}

impl RelayError {
    /// Whether the canteen may or may not have processed the scan.
    ///
    /// A retry is always safe: redemption is idempotent and a repeat scan
    /// answers "Ticket already redeemed".
    #[must_use]
    pub const fn is_outcome_unknown(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response(_))
    }
}
