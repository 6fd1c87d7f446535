//! Instrument identifier.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated exchange instrument symbol.
///
/// Symbols follow the `QUOTE-BASE` convention (e.g., "KRW-BTC").
/// Validation happens once at construction so request builders can
/// interpolate the symbol without further escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Instrument(String);

impl Instrument {
    /// Parse and validate a symbol.
    ///
    /// Accepts `[A-Z]+-[A-Z0-9]+` only.
    pub fn parse(symbol: impl Into<String>) -> Result<Self> {
        let symbol = symbol.into();
        if Self::is_valid(&symbol) {
            Ok(Self(symbol))
        } else {
            Err(CoreError::InvalidInstrument(symbol))
        }
    }

    fn is_valid(symbol: &str) -> bool {
        let Some((quote, base)) = symbol.split_once('-') else {
            return false;
        };
        !quote.is_empty()
            && !base.is_empty()
            && quote.chars().all(|c| c.is_ascii_uppercase())
            && base.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }

    /// The raw symbol string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Instrument {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Instrument> for String {
    fn from(value: Instrument) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_symbols() {
        assert!(Instrument::parse("KRW-BTC").is_ok());
        assert!(Instrument::parse("KRW-1INCH").is_ok());
        assert!(Instrument::parse("USDT-ETH").is_ok());
    }

    #[test]
    fn test_invalid_symbols() {
        assert!(Instrument::parse("KRW").is_err());
        assert!(Instrument::parse("krw-btc").is_err());
        assert!(Instrument::parse("KRW-").is_err());
        assert!(Instrument::parse("-BTC").is_err());
        assert!(Instrument::parse("KRW-BTC?x=1").is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let inst = Instrument::parse("KRW-BTC").unwrap();
        let json = serde_json::to_string(&inst).unwrap();
        assert_eq!(json, "\"KRW-BTC\"");
        let back: Instrument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inst);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let result: std::result::Result<Instrument, _> = serde_json::from_str("\"bad symbol\"");
        assert!(result.is_err());
    }
}
