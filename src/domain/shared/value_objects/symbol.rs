//! Symbol value object for traded assets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A bare internal asset ticker (e.g. "BTC", "ETH").
///
/// Internal symbols never carry an exchange prefix or quote suffix; see
/// [`crate::domain::market_data::convert_symbol_str`] for the boundary
/// mapping to/from exchange-prefixed forms like `tBTCUSD`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol, normalized to uppercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Validate the symbol for order submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol is empty, too long, or contains
    /// characters other than ASCII letters/digits.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "symbol cannot be empty".to_string(),
            });
        }

        if self.0.len() > 15 {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "symbol exceeds maximum length".to_string(),
            });
        }

        if !self.0.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "symbol contains invalid characters".to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_new_normalizes_case() {
        let s = Symbol::new("btc");
        assert_eq!(s.as_str(), "BTC");
    }

    #[test]
    fn symbol_display() {
        let s = Symbol::new("ETH");
        assert_eq!(format!("{s}"), "ETH");
    }

    #[test]
    fn symbol_validate_empty() {
        assert!(Symbol::new("").validate().is_err());
    }

    #[test]
    fn symbol_validate_too_long() {
        assert!(Symbol::new("A".repeat(20)).validate().is_err());
    }

    #[test]
    fn symbol_validate_invalid_chars() {
        assert!(Symbol::new("BTC!").validate().is_err());
        assert!(Symbol::new("BT C").validate().is_err());
    }

    #[test]
    fn symbol_validate_valid() {
        assert!(Symbol::new("BTC").validate().is_ok());
    }

    #[test]
    fn symbol_from_conversions() {
        let s1: Symbol = "btc".into();
        assert_eq!(s1.as_str(), "BTC");

        let s2: Symbol = String::from("eth").into();
        assert_eq!(s2.as_str(), "ETH");
    }

    #[test]
    fn symbol_serde_roundtrip() {
        let s = Symbol::new("BTC");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"BTC\"");

        let parsed: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn symbol_hash_works() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Symbol::new("BTC"));
        set.insert(Symbol::new("ETH"));
        set.insert(Symbol::new("btc")); // same as BTC

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn symbol_into_inner() {
        let s = Symbol::new("BTC");
        assert_eq!(s.into_inner(), "BTC");
    }
}
