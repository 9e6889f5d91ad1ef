//! Tap channel kinds and name rendering
//!
//! Channel names are rendered from fixed templates. The templates are a
//! wire contract and must match the exchange exactly; symbol parameters
//! are lower-cased where the exchange requires it (channel names are
//! case-sensitive and lower-case only).

use liquid_types::Side;

/// Logical channel kinds exposed by the Tap endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// User model updates: `user_{userId}`
    UserInfo,
    /// Product ticker updates: `product_cash_{pair}_{pairId}`
    MarketInfo,
    /// All market executions: `executions_cash_{symbol}`
    AllExecutions,
    /// Executions of one user: `executions_{userId}_cash_{symbol}`
    UserExecutions,
    /// Account currency updates: `user_{userId}_account_{currency}`
    UserCurrency,
    /// One side of the price ladder: `price_ladders_cash_{symbol}_{side}`
    OrderBookSide,
}

impl ChannelKind {
    /// Name of the event the exchange publishes on channels of this kind
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::AllExecutions | Self::UserExecutions => "created",
            Self::UserInfo | Self::MarketInfo | Self::UserCurrency | Self::OrderBookSide => {
                "updated"
            }
        }
    }

    /// Returns true if channels of this kind require authentication
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            Self::UserInfo | Self::UserExecutions | Self::UserCurrency
        )
    }
}

/// A fully rendered channel name
///
/// Constructed through per-kind constructors so every template receives
/// exactly the parameters it declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName {
    kind: ChannelKind,
    name: String,
}

impl ChannelName {
    /// `user_{userId}`
    pub fn user_info(user_id: &str) -> Self {
        Self {
            kind: ChannelKind::UserInfo,
            name: format!("user_{user_id}"),
        }
    }

    /// `product_cash_{pair}_{pairId}`
    pub fn market_info(pair: &str, pair_id: u64) -> Self {
        Self {
            kind: ChannelKind::MarketInfo,
            name: format!("product_cash_{pair}_{pair_id}"),
        }
    }

    /// `executions_cash_{symbol}`, symbol lower-cased
    pub fn all_executions(symbol: &str) -> Self {
        Self {
            kind: ChannelKind::AllExecutions,
            name: format!("executions_cash_{}", symbol.to_lowercase()),
        }
    }

    /// `executions_{userId}_cash_{symbol}`
    pub fn user_executions(user_id: &str, symbol: &str) -> Self {
        Self {
            kind: ChannelKind::UserExecutions,
            name: format!("executions_{user_id}_cash_{symbol}"),
        }
    }

    /// `user_{userId}_account_{currency}`
    pub fn user_currency(user_id: &str, currency: &str) -> Self {
        Self {
            kind: ChannelKind::UserCurrency,
            name: format!("user_{user_id}_account_{currency}"),
        }
    }

    /// `price_ladders_cash_{symbol}_{side}`, symbol lower-cased, side
    /// rendered with the same representation the REST side serializes
    pub fn order_book_side(symbol: &str, side: Side) -> Self {
        Self {
            kind: ChannelKind::OrderBookSide,
            name: format!(
                "price_ladders_cash_{}_{}",
                symbol.to_lowercase(),
                side.as_str()
            ),
        }
    }

    /// The channel kind this name was rendered for
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// The rendered name
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Consume into the rendered name
    pub fn into_string(self) -> String {
        self.name
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_info_template() {
        assert_eq!(ChannelName::user_info("651514").as_str(), "user_651514");
    }

    #[test]
    fn test_market_info_template() {
        assert_eq!(
            ChannelName::market_info("ethusd", 27).as_str(),
            "product_cash_ethusd_27"
        );
    }

    #[test]
    fn test_all_executions_template_lowercases_symbol() {
        assert_eq!(
            ChannelName::all_executions("ETHUSD").as_str(),
            "executions_cash_ethusd"
        );
    }

    #[test]
    fn test_user_executions_template() {
        assert_eq!(
            ChannelName::user_executions("651514", "ethusd").as_str(),
            "executions_651514_cash_ethusd"
        );
    }

    #[test]
    fn test_user_currency_template() {
        assert_eq!(
            ChannelName::user_currency("651514", "eth").as_str(),
            "user_651514_account_eth"
        );
    }

    #[test]
    fn test_order_book_side_template() {
        assert_eq!(
            ChannelName::order_book_side("ETHUSD", Side::Buy).as_str(),
            "price_ladders_cash_ethusd_buy"
        );
        assert_eq!(
            ChannelName::order_book_side("btcusd", Side::Sell).as_str(),
            "price_ladders_cash_btcusd_sell"
        );
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ChannelKind::AllExecutions.event_name(), "created");
        assert_eq!(ChannelKind::UserExecutions.event_name(), "created");
        assert_eq!(ChannelKind::OrderBookSide.event_name(), "updated");
        assert_eq!(ChannelKind::UserCurrency.event_name(), "updated");
    }

    #[test]
    fn test_private_kinds() {
        assert!(ChannelKind::UserInfo.is_private());
        assert!(ChannelKind::UserExecutions.is_private());
        assert!(ChannelKind::UserCurrency.is_private());
        assert!(!ChannelKind::MarketInfo.is_private());
        assert!(!ChannelKind::AllExecutions.is_private());
        assert!(!ChannelKind::OrderBookSide.is_private());
    }
}
