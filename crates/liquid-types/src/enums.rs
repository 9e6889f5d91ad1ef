//! Side enum shared between channel names and payloads

use serde::{Deserialize, Serialize};

/// Order-book side
///
/// The wire representation is lower-case (`"buy"` / `"sell"`), both in
/// JSON payloads and in channel names such as `price_ladders_cash_btcusd_buy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side of the book
    Buy,
    /// Sell side of the book
    Sell,
}

impl Side {
    /// Returns the side as used in channel names and JSON
    ///
    /// Must stay consistent with the serde representation; channel names
    /// are built from this value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_serde() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"sell\"");

        let parsed: Side = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(parsed, Side::Sell);
    }

    #[test]
    fn test_as_str_matches_serde() {
        // Channel names are rendered from as_str(); it must agree with
        // the JSON representation used on the REST side.
        for side in [Side::Buy, Side::Sell] {
            let json = serde_json::to_string(&side).unwrap();
            assert_eq!(json, format!("\"{}\"", side.as_str()));
        }
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }
}
