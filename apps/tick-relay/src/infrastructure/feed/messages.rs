//! Upstream Feed Wire Types
//!
//! Wire format types for the upstream streaming feed. The feed accepts JSON
//! control frames and emits JSON data frames; every frame carries a `type`
//! discriminator.
//!
//! # Wire Format (inbound)
//!
//! ```json
//! {"type":"trade","data":[{"s":"BINANCE:BTCUSDT","p":65000.5},{"s":"AAPL","p":150.0}]}
//! {"type":"ping"}
//! ```
//!
//! Frame types other than `trade` are ignored.
//!
//! # Wire Format (outbound)
//!
//! ```json
//! {"type":"subscribe","symbol":"BINANCE:BTCUSDT"}
//! {"type":"unsubscribe","symbol":"BINANCE:BTCUSDT"}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::pricing::Tick;
use crate::domain::subscription::Symbol;

// =============================================================================
// Inbound Frames
// =============================================================================

/// One traded price inside a `trade` data frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeData {
    /// Exchange-qualified symbol.
    #[serde(rename = "s")]
    pub symbol: Symbol,

    /// Traded price.
    #[serde(rename = "p")]
    pub price: f64,
}

impl From<TradeData> for Tick {
    fn from(trade: TradeData) -> Self {
        Self {
            symbol: trade.symbol,
            price: trade.price,
        }
    }
}

/// A decoded frame from the upstream feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedFrame {
    /// A batch of traded prices, in wire order.
    Trade {
        /// The traded prices.
        data: Vec<TradeData>,
    },

    /// Any other frame type; ignored by the relay.
    #[serde(other)]
    Other,
}

// =============================================================================
// Outbound Frames
// =============================================================================

/// Subscription control frame sent to the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlFrame {
    /// Start streaming trades for a symbol.
    Subscribe {
        /// Exchange-qualified symbol.
        symbol: Symbol,
    },
    /// Stop streaming trades for a symbol.
    Unsubscribe {
        /// Exchange-qualified symbol.
        symbol: Symbol,
    },
}

impl ControlFrame {
    /// Build a subscribe frame.
    #[must_use]
    pub fn subscribe(symbol: impl Into<Symbol>) -> Self {
        Self::Subscribe {
            symbol: symbol.into(),
        }
    }

    /// Build an unsubscribe frame.
    #[must_use]
    pub fn unsubscribe(symbol: impl Into<Symbol>) -> Self {
        Self::Unsubscribe {
            symbol: symbol.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn trade_frame_parses_batch() {
        let text = r#"{"type":"trade","data":[{"s":"BINANCE:BTCUSDT","p":65000.5},{"s":"AAPL","p":150.0}]}"#;
        let frame: FeedFrame = serde_json::from_str(text).unwrap();

        let FeedFrame::Trade { data } = frame else {
            panic!("expected trade frame");
        };
        assert_eq!(data.len(), 2);
        assert_eq!(data[0].symbol, "BINANCE:BTCUSDT");
        assert!((data[0].price - 65000.5).abs() < f64::EPSILON);
    }

    #[test_case(r#"{"type":"ping"}"#; "ping frame")]
    #[test_case(r#"{"type":"news","data":{"headline":"x"}}"#; "unknown data frame")]
    fn non_trade_frames_are_other(text: &str) {
        let frame: FeedFrame = serde_json::from_str(text).unwrap();
        assert_eq!(frame, FeedFrame::Other);
    }

    #[test]
    fn trade_data_converts_to_tick() {
        let trade = TradeData {
            symbol: "AAPL".to_string(),
            price: 150.0,
        };

        let tick: Tick = trade.into();
        assert_eq!(tick.symbol, "AAPL");
        assert!((tick.price - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn subscribe_frame_wire_format() {
        let json = serde_json::to_value(ControlFrame::subscribe("AAPL")).unwrap();

        assert_eq!(json["type"], "subscribe");
        assert_eq!(json["symbol"], "AAPL");
    }

    #[test]
    fn unsubscribe_frame_wire_format() {
        let json = serde_json::to_value(ControlFrame::unsubscribe("AAPL")).unwrap();

        assert_eq!(json["type"], "unsubscribe");
        assert_eq!(json["symbol"], "AAPL");
    }
}
