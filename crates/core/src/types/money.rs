//! Fixed-point money amounts.
//!
//! Canteen prices are stored as `NUMERIC(_, 2)` and every total is computed
//! with `rust_decimal`, never with floats: `2 × 45.50 + 12.25` is exactly
//! `103.25`, and it stays that way through the database and the JSON API.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing or combining [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount is below zero.
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    /// Amount has more fractional digits than the currency allows.
    #[error("amount {0} has more than {scale} decimal places", scale = Money::SCALE)]
    TooPrecise(Decimal),
    /// Text is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// Arithmetic exceeded the representable range.
    #[error("amount overflow")]
    Overflow,
}

/// A non-negative amount with exactly two fractional digits.
///
/// Always displayed and serialized with two decimals (`"13.50"`, not
/// `"13.5"`), which is the format the redemption API promises to scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Number of fractional digits.
    pub const SCALE: u32 = 2;

    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal.
    ///
    /// Trailing zeros beyond two places are accepted (`1.500`), real extra
    /// precision is not (`1.505`). Nothing is ever rounded silently.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` or `MoneyError::TooPrecise`.
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }

        let mut normalized = amount.normalize();
        if normalized.scale() > Self::SCALE {
            return Err(MoneyError::TooPrecise(amount));
        }
        normalized.rescale(Self::SCALE);
        Ok(Self(normalized))
    }

    /// Create an amount from a count of minor units (paise, cents).
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` for negative input.
    pub fn from_minor_units(units: i64) -> Result<Self, MoneyError> {
        Self::new(Decimal::new(units, Self::SCALE))
    }

    /// Get the underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line subtotal: this unit price multiplied by a quantity.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the product is not representable.
    pub fn times(self, quantity: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self::rescaled)
            .ok_or(MoneyError::Overflow)
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the sum is not representable.
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self::rescaled)
            .ok_or(MoneyError::Overflow)
    }

    /// Sum a sequence of amounts.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the running total overflows.
    pub fn total<I>(amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }

    fn rescaled(mut value: Decimal) -> Self {
        value.rescale(Self::SCALE);
        Self(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = self.0;
        value.rescale(Self::SCALE);
        write!(f, "{value}")
    }
}

impl std::str::FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str_exact(s).map_err(|_| MoneyError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
