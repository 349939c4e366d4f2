//! Redemption token: the text carried inside a ticket's QR code.
//!
//! Wire format, shared by the canteen and every scanner deployment:
//!
//! ```text
//! ORDER:<order id, hyphenated UUID>:<uprn>
//! ```
//!
//! The token is a pure function of the order ID and the owner's UPRN, so a
//! lost ticket image can always be regenerated from the order row.

use core::fmt;

use crate::types::id::OrderId;
use crate::types::uprn::Uprn;

/// Errors from encoding or decoding a redemption token.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// A field was empty at encode time.
    #[error("cannot encode token: {field} is empty")]
    EmptyField {
        /// Name of the empty field.
        field: &'static str,
    },
    /// A field contained the `:` delimiter at encode time.
    #[error("cannot encode token: {field} contains the ':' delimiter")]
    DelimiterInField {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The text is not `ORDER:<id>:<uprn>`.
    #[error("invalid token format: {0}")]
    InvalidFormat(&'static str),
}

impl TokenError {
    /// True for failures produced while encoding (as opposed to decoding).
    #[must_use]
    pub const fn is_encoding_error(&self) -> bool {
        matches!(self, Self::EmptyField { .. } | Self::DelimiterInField { .. })
    }
}

/// A decoded `(order id, uprn)` claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedemptionToken {
    order_id: OrderId,
    uprn: Uprn,
}

impl RedemptionToken {
    /// Literal first segment.
    pub const PREFIX: &'static str = "ORDER";

    /// Segment delimiter.
    pub const DELIMITER: char = ':';

    /// Build a token from already-validated parts.
    #[must_use]
    pub const fn new(order_id: OrderId, uprn: Uprn) -> Self {
        Self { order_id, uprn }
    }

    /// Encode raw field text into the wire format.
    ///
    /// This is the lenient entry point used when the fields come from outside
    /// the type system (CLI arguments, legacy rows). Typed callers can use
    /// [`RedemptionToken::new`] and `to_string()` instead.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::EmptyField` or `TokenError::DelimiterInField`.
    pub fn encode(order_id: &str, uprn: &str) -> Result<String, TokenError> {
        for (field, value) in [("order id", order_id), ("uprn", uprn)] {
            if value.is_empty() {
                return Err(TokenError::EmptyField { field });
            }
            if value.contains(Self::DELIMITER) {
                return Err(TokenError::DelimiterInField { field });
            }
        }
        Ok(format!(
            "{prefix}{d}{order_id}{d}{uprn}",
            prefix = Self::PREFIX,
            d = Self::DELIMITER
        ))
    }

    /// Decode wire text into a typed claim.
    ///
    /// Requires exactly three `:`-separated segments, the first being the
    /// literal `ORDER`, the second a canonical order ID and the third a
    /// valid UPRN.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidFormat` describing the first problem found.
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let mut segments = token.split(Self::DELIMITER);
        let (Some(prefix), Some(order_id), Some(uprn), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::InvalidFormat("expected exactly 3 segments"));
        };

        if prefix != Self::PREFIX {
            return Err(TokenError::InvalidFormat("missing ORDER prefix"));
        }
        if order_id.is_empty() {
            return Err(TokenError::InvalidFormat("empty order id"));
        }
        if uprn.is_empty() {
            return Err(TokenError::InvalidFormat("empty uprn"));
        }

        let order_id = OrderId::parse_canonical(order_id)
            .map_err(|_| TokenError::InvalidFormat("order id is not a UUID"))?;
        let uprn =
            Uprn::parse(uprn).map_err(|_| TokenError::InvalidFormat("uprn is not valid"))?;

        Ok(Self { order_id, uprn })
    }

    /// The order this token claims.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// The UPRN of the order's owner, as asserted by the token.
    #[must_use]
    pub const fn uprn(&self) -> &Uprn {
        &self.uprn
    }
}

impl fmt::Display for RedemptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{prefix}{d}{order_id}{d}{uprn}",
            prefix = Self::PREFIX,
            d = Self::DELIMITER,
            order_id = self.order_id,
            uprn = self.uprn
        )
    }
}

impl std::str::FromStr for RedemptionToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
