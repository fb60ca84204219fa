//! Currency and provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217 currency code.
///
/// Codes are normalized to upper case on construction so that `usd`, `Usd`
/// and `USD` address the same cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a new currency from code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    pub fn jpy() -> Self {
        Self::new("JPY")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}

/// Identifier of a rate provider (e.g. `frankfurter`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a new provider ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the provider ID format.
    pub fn is_valid(&self) -> bool {
        // Must not contain the cache key separator
        !self.0.is_empty()
            && self.0.len() <= 64
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_normalized_to_upper_case() {
        assert_eq!(Currency::new("usd"), Currency::usd());
        assert_eq!(Currency::new(" eUr "), Currency::eur());
        assert_eq!(Currency::new("gbp").code(), "GBP");
    }

    #[test]
    fn test_currency_deserialize_normalizes() {
        let c: Currency = serde_json::from_str("\"jpy\"").unwrap();
        assert_eq!(c, Currency::jpy());
    }

    #[test]
    fn test_provider_id_validity() {
        assert!(ProviderId::new("frankfurter").is_valid());
        assert!(ProviderId::new("ecb_daily-2").is_valid());
        assert!(!ProviderId::new("bad:id").is_valid());
        assert!(!ProviderId::new("").is_valid());
    }
}
