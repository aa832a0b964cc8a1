//! Universe configuration — named ticker lists with display names.
//!
//! Stored as TOML:
//!
//! ```toml
//! name = "kr_large_cap"
//!
//! [[tickers]]
//! symbol = "005930.KS"
//! display_name = "Samsung Electronics"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::provider::DataError;

/// One universe member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A named list of tickers to screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    pub name: String,
    pub tickers: Vec<UniverseEntry>,
}

impl Universe {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DataError::Other(format!("read universe file: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        toml::from_str(content).map_err(|e| DataError::Other(format!("parse universe TOML: {e}")))
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self)
            .map_err(|e| DataError::Other(format!("serialize universe: {e}")))
    }

    /// All symbols, in file order.
    pub fn symbols(&self) -> Vec<&str> {
        self.tickers.iter().map(|t| t.symbol.as_str()).collect()
    }

    /// Display name for a symbol; falls back to the symbol itself.
    pub fn display_name<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.tickers
            .iter()
            .find(|t| t.symbol == symbol)
            .and_then(|t| t.display_name.as_deref())
            .unwrap_or(symbol)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Built-in KOSPI large-cap universe.
    pub fn default_kr() -> Self {
        let entries = [
            ("005930.KS", "Samsung Electronics"),
            ("000660.KS", "SK Hynix"),
            ("373220.KS", "LG Energy Solution"),
            ("207940.KS", "Samsung Biologics"),
            ("005380.KS", "Hyundai Motor"),
            ("000270.KS", "Kia"),
            ("068270.KS", "Celltrion"),
            ("035420.KS", "NAVER"),
            ("105560.KS", "KB Financial Group"),
            ("055550.KS", "Shinhan Financial Group"),
            ("005490.KS", "POSCO Holdings"),
            ("051910.KS", "LG Chem"),
            ("035720.KS", "Kakao"),
            ("012330.KS", "Hyundai Mobis"),
            ("028260.KS", "Samsung C&T"),
        ];
        Self {
            name: "kr_large_cap".to_string(),
            tickers: entries
                .iter()
                .map(|(symbol, display)| UniverseEntry {
                    symbol: symbol.to_string(),
                    display_name: Some(display.to_string()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_universe_is_nonempty() {
        let u = Universe::default_kr();
        assert!(u.len() >= 10);
        assert!(u.symbols().contains(&"005930.KS"));
    }

    #[test]
    fn toml_roundtrip() {
        let u = Universe::default_kr();
        let text = u.to_toml().unwrap();
        let parsed = Universe::from_toml(&text).unwrap();
        assert_eq!(u.len(), parsed.len());
        assert_eq!(parsed.display_name("005930.KS"), "Samsung Electronics");
    }

    #[test]
    fn display_name_falls_back_to_symbol() {
        let u = Universe::from_toml(
            r#"
            name = "minimal"

            [[tickers]]
            symbol = "SPY"
        "#,
        )
        .unwrap();
        assert_eq!(u.display_name("SPY"), "SPY");
        assert_eq!(u.display_name("UNLISTED"), "UNLISTED");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Universe::from_toml("tickers = 3").is_err());
    }
}
