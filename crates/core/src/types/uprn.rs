//! University Personal Registration Number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Uprn`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UprnError {
    /// The input string is empty.
    #[error("UPRN cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("UPRN must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains something other than ASCII letters and digits.
    #[error("UPRN must contain only ASCII letters and digits (found {found:?})")]
    InvalidCharacter {
        /// First offending character.
        found: char,
    },
}

/// A user's institutional identifier, also used as their login name.
///
/// UPRNs are embedded verbatim in redemption tokens, so the alphabet is kept
/// strictly alphanumeric: in particular a UPRN can never contain the token
/// delimiter `:`.
///
/// ## Constraints
///
/// - Length: 1-20 characters
/// - ASCII letters and digits only
///
/// ## Examples
///
/// ```
/// use quickbites_core::Uprn;
///
/// assert!(Uprn::parse("2021CS042").is_ok());
///
/// assert!(Uprn::parse("").is_err());
/// assert!(Uprn::parse("2021:CS").is_err());
/// assert!(Uprn::parse("2021 CS").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Uprn(String);

impl Uprn {
    /// Maximum length of a UPRN.
    pub const MAX_LENGTH: usize = 20;

    /// Parse a `Uprn` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 20 characters,
    /// or contains anything other than ASCII letters and digits.
    pub fn parse(s: &str) -> Result<Self, UprnError> {
        if s.is_empty() {
            return Err(UprnError::Empty);
        }

        if let Some(found) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(UprnError::InvalidCharacter { found });
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(UprnError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the UPRN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Uprn` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Uprn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Uprn {
    type Err = UprnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uprn {
    type Error = UprnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Uprn> for String {
    fn from(uprn: Uprn) -> Self {
        uprn.0
    }
}

impl AsRef<str> for Uprn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Uprn {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Uprn {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Uprn {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
