//! Downstream Wire Messages
//!
//! Wire format types for the downstream client protocol. The server pushes
//! an `initial` snapshot on connect and an `update` per relayed tick; clients
//! send subscribe/unsubscribe actions.
//!
//! # Wire Format (server → client)
//!
//! ```json
//! {"type":"initial","data":[{"ticker":"AAPL","name":"Apple Inc.","quantity":3,"buyPrice":150.0,"livePrice":151.2}]}
//! {"type":"update","data":{"symbol":"AAPL","price":151.2}}
//! ```
//!
//! # Wire Format (client → server)
//!
//! ```json
//! {"action":"subscribe","symbol":"AAPL"}
//! {"action":"unsubscribe","symbol":"AAPL"}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::ledger::Holding;
use crate::domain::pricing::Tick;
use crate::domain::subscription::Symbol;

// =============================================================================
// Server → Client
// =============================================================================

/// A relayed price for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    /// Exchange-qualified symbol.
    pub symbol: Symbol,
    /// Most recent price.
    pub price: f64,
}

impl From<Tick> for PriceUpdate {
    fn from(tick: Tick) -> Self {
        Self {
            symbol: tick.symbol,
            price: tick.price,
        }
    }
}

/// A ledger holding merged with its cached live price, as delivered in the
/// initial snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSnapshot {
    /// Exchange-qualified ticker.
    pub ticker: Symbol,
    /// Display name of the instrument.
    pub name: String,
    /// Held quantity.
    pub quantity: u32,
    /// Cost basis recorded when the instrument was first tracked.
    #[serde(rename = "buyPrice")]
    pub buy_price: f64,
    /// Most recent observed price, `null` until a tick has been seen.
    #[serde(rename = "livePrice")]
    pub live_price: Option<f64>,
}

impl HoldingSnapshot {
    /// Merge a ledger holding with its cached live price.
    #[must_use]
    pub fn from_holding(holding: Holding, live_price: Option<f64>) -> Self {
        Self {
            ticker: holding.ticker,
            name: holding.name,
            quantity: holding.quantity,
            buy_price: holding.buy_price,
            live_price,
        }
    }
}

/// Message pushed to downstream subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Full snapshot, delivered once on connect.
    Initial {
        /// Tracked holdings with live prices.
        data: Vec<HoldingSnapshot>,
    },
    /// A relayed tick.
    Update {
        /// The updated symbol and price.
        data: PriceUpdate,
    },
}

impl ServerMessage {
    /// Build the update message for a tick.
    #[must_use]
    pub fn update(tick: Tick) -> Self {
        Self::Update { data: tick.into() }
    }

    /// Build the initial snapshot message.
    #[must_use]
    pub const fn initial(data: Vec<HoldingSnapshot>) -> Self {
        Self::Initial { data }
    }
}

// =============================================================================
// Client → Server
// =============================================================================

/// Subscription intent sent by a downstream client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientRequest {
    /// Start receiving updates for a symbol.
    Subscribe {
        /// Exchange-qualified symbol.
        symbol: Symbol,
    },
    /// Stop receiving updates for a symbol.
    Unsubscribe {
        /// Exchange-qualified symbol.
        symbol: Symbol,
    },
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn update_wire_format() {
        let msg = ServerMessage::update(Tick::new("BINANCE:BTCUSDT", 65000.5));
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "update");
        assert_eq!(json["data"]["symbol"], "BINANCE:BTCUSDT");
        assert!((json["data"]["price"].as_f64().unwrap() - 65000.5).abs() < f64::EPSILON);
    }

    #[test]
    fn initial_wire_format() {
        let holding = Holding::new("AAPL", "Apple Inc.", 3, 150.0);
        let msg = ServerMessage::initial(vec![HoldingSnapshot::from_holding(holding, Some(151.2))]);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "initial");
        assert_eq!(json["data"][0]["ticker"], "AAPL");
        assert_eq!(json["data"][0]["quantity"], 3);
        assert!(json["data"][0].get("buyPrice").is_some());
        assert!(json["data"][0].get("livePrice").is_some());
    }

    #[test]
    fn snapshot_without_live_price_is_null() {
        let holding = Holding::new("AAPL", "Apple Inc.", 3, 150.0);
        let snapshot = HoldingSnapshot::from_holding(holding, None);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert!(json["livePrice"].is_null());
    }

    #[test_case(r#"{"action":"subscribe","symbol":"AAPL"}"# => ClientRequest::Subscribe { symbol: "AAPL".to_string() }; "subscribe")]
    #[test_case(r#"{"action":"unsubscribe","symbol":"AAPL"}"# => ClientRequest::Unsubscribe { symbol: "AAPL".to_string() }; "unsubscribe")]
    fn client_request_parses(text: &str) -> ClientRequest {
        serde_json::from_str(text).unwrap()
    }

    #[test_case(r#"{"action":"watch","symbol":"AAPL"}"#; "unknown action")]
    #[test_case(r#"{"symbol":"AAPL"}"#; "missing action")]
    #[test_case("not json"; "not json")]
    fn malformed_client_request_is_rejected(text: &str) {
        assert!(serde_json::from_str::<ClientRequest>(text).is_err());
    }
}
