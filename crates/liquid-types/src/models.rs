//! Domain events delivered over Tap channels

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::Side;

/// Single entry of a price ladder
///
/// The wire format is a two-element array of decimal strings:
/// `["412.22", "0.75"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Decimal, Decimal)", into = "(Decimal, Decimal)")]
pub struct OrderBookLevel {
    /// Price of this ladder entry
    pub price: Decimal,
    /// Quantity available at this price
    pub quantity: Decimal,
}

impl From<(Decimal, Decimal)> for OrderBookLevel {
    fn from((price, quantity): (Decimal, Decimal)) -> Self {
        Self { price, quantity }
    }
}

impl From<OrderBookLevel> for (Decimal, Decimal) {
    fn from(level: OrderBookLevel) -> Self {
        (level.price, level.quantity)
    }
}

/// A trade execution as delivered on `executions_*` channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Exchange-assigned execution id
    pub id: u64,
    /// Executed quantity
    pub quantity: Decimal,
    /// Execution price
    pub price: Decimal,
    /// Side of the taker order
    pub taker_side: Side,
    /// Execution timestamp (unix seconds on the wire)
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

/// Account balance update as delivered on `user_*_account_*` channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// Currency code (e.g. "eth")
    pub currency: String,
    /// New total balance
    pub balance: Decimal,
}

/// Product ticker update as delivered on `product_cash_*` channels
///
/// The exchange sends the full product model; only the commonly used
/// fields are typed, everything else is retained in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    /// Product id
    #[serde(default)]
    pub id: Option<u64>,
    /// Currency pair code (e.g. "ETHUSD")
    #[serde(default)]
    pub currency_pair_code: Option<String>,
    /// Best ask
    #[serde(default)]
    pub market_ask: Option<Decimal>,
    /// Best bid
    #[serde(default)]
    pub market_bid: Option<Decimal>,
    /// Last traded price
    #[serde(default)]
    pub last_traded_price: Option<Decimal>,
    /// 24h volume
    #[serde(default)]
    pub volume_24h: Option<Decimal>,
    /// Remaining fields of the product model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// User model update as delivered on `user_{id}` channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdate {
    /// User id
    #[serde(default)]
    pub id: Option<u64>,
    /// Remaining fields of the user model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_book_level_from_wire() {
        let levels: Vec<OrderBookLevel> =
            serde_json::from_str(r#"[["412.22","0.75"],["412.10","1.5"]]"#).unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price, dec!(412.22));
        assert_eq!(levels[0].quantity, dec!(0.75));
        assert_eq!(levels[1].price, dec!(412.10));
    }

    #[test]
    fn test_execution_from_wire() {
        let raw = r#"{
            "id": 97563201,
            "quantity": "0.2",
            "price": "230.51",
            "taker_side": "sell",
            "created_at": 1561445672
        }"#;
        let exec: Execution = serde_json::from_str(raw).unwrap();
        assert_eq!(exec.id, 97563201);
        assert_eq!(exec.quantity, dec!(0.2));
        assert_eq!(exec.price, dec!(230.51));
        assert_eq!(exec.taker_side, Side::Sell);
        assert_eq!(exec.created_at.timestamp(), 1561445672);
    }

    #[test]
    fn test_account_update_from_wire() {
        let raw = r#"{"currency":"eth","balance":"12.40051"}"#;
        let update: AccountUpdate = serde_json::from_str(raw).unwrap();
        assert_eq!(update.currency, "eth");
        assert_eq!(update.balance, dec!(12.40051));
    }

    #[test]
    fn test_product_update_keeps_unknown_fields() {
        let raw = r#"{
            "id": 27,
            "currency_pair_code": "ETHUSD",
            "market_ask": "230.6",
            "market_bid": "230.4",
            "cfd_enabled": false
        }"#;
        let update: ProductUpdate = serde_json::from_str(raw).unwrap();
        assert_eq!(update.id, Some(27));
        assert_eq!(update.currency_pair_code.as_deref(), Some("ETHUSD"));
        assert_eq!(update.market_ask, Some(dec!(230.6)));
        assert!(update.extra.contains_key("cfd_enabled"));
    }
}
