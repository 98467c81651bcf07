//! Brazilian postal code (CEP).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ZipCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ZipCodeError {
    /// Fewer or more than eight digits remained after stripping separators.
    #[error("zip code must have {expected} digits (got {actual})")]
    Length {
        /// Required digit count.
        expected: usize,
        /// Digits found in the input.
        actual: usize,
    },
}

/// An eight-digit postal code, stored without separators.
///
/// ```
/// use vitrine_core::ZipCode;
///
/// let zip = ZipCode::parse("01310-100").unwrap();
/// assert_eq!(zip.as_str(), "01310100");
/// assert_eq!(zip.to_string(), "01310-100");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZipCode(String);

impl ZipCode {
    /// Number of digits in a complete zip code.
    pub const LENGTH: usize = 8;

    /// Keep only the ASCII digits of `raw`.
    #[must_use]
    pub fn digits_of(raw: &str) -> String {
        raw.chars().filter(char::is_ascii_digit).collect()
    }

    /// Parse a zip code, ignoring any non-digit characters.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly eight digits remain.
    pub fn parse(raw: &str) -> Result<Self, ZipCodeError> {
        let digits = Self::digits_of(raw);
        if digits.len() != Self::LENGTH {
            return Err(ZipCodeError::Length {
                expected: Self::LENGTH,
                actual: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    /// The eight digits, no separator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, tail) = self.0.split_at(5);
        write!(f, "{head}-{tail}")
    }
}

impl std::str::FromStr for ZipCode {
    type Err = ZipCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ZipCode {
    type Error = ZipCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ZipCode> for String {
    fn from(zip: ZipCode) -> Self {
        zip.0
    }
}
