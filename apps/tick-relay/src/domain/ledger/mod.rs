//! Tracked-Instrument Ledger
//!
//! The persisted record of instruments the service tracks, with held
//! quantity and cost basis, and the repository port its adapters implement.
//! Ledger state is independent of feed state: a store failure never touches
//! the in-memory relay (cache, subscriptions).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::subscription::Symbol;

// =============================================================================
// Holding
// =============================================================================

/// A tracked instrument with held quantity and cost basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Exchange-qualified ticker. Primary key of the ledger.
    pub ticker: Symbol,
    /// Display name of the instrument.
    pub name: String,
    /// Held quantity.
    pub quantity: u32,
    /// Cost basis recorded when the instrument was first tracked.
    #[serde(rename = "buyPrice")]
    pub buy_price: f64,
}

impl Holding {
    /// Create a new holding.
    #[must_use]
    pub fn new(ticker: impl Into<Symbol>, name: impl Into<String>, quantity: u32, buy_price: f64) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
            quantity,
            buy_price,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Ledger operation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// No holding exists for the ticker.
    #[error("holding not found: {0}")]
    NotFound(Symbol),

    /// A holding already exists for the ticker.
    #[error("holding already exists: {0}")]
    AlreadyExists(Symbol),

    /// A sell asked for more than is held.
    #[error("insufficient quantity for {ticker}: held {held}, requested {requested}")]
    InsufficientQuantity {
        /// Ticker of the holding.
        ticker: Symbol,
        /// Quantity currently held.
        held: u32,
        /// Quantity the caller asked to remove.
        requested: u32,
    },

    /// The underlying store failed.
    #[error("ledger store failure: {0}")]
    Store(String),
}

// =============================================================================
// Repository Port
// =============================================================================

/// Persistence port for holdings.
///
/// Every call is atomic with respect to the record it touches. In particular
/// `adjust_quantity` is a single read-modify-write: concurrent buys and sells
/// on the same instrument cannot lose updates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HoldingRepository: Send + Sync {
    /// All holdings in the ledger.
    async fn find_all(&self) -> Result<Vec<Holding>, LedgerError>;

    /// Holding for a ticker, or `None`.
    async fn find_by_ticker(&self, ticker: &str) -> Result<Option<Holding>, LedgerError>;

    /// Insert a new holding. Fails with `AlreadyExists` on a duplicate ticker.
    async fn create(&self, holding: Holding) -> Result<(), LedgerError>;

    /// Overwrite a holding's quantity. Fails with `NotFound` for an unknown
    /// ticker.
    async fn update_quantity(&self, ticker: &str, quantity: u32) -> Result<(), LedgerError>;

    /// Atomically add `delta` to a holding's quantity and return the new
    /// value.
    ///
    /// Fails with `NotFound` for an unknown ticker and with
    /// `InsufficientQuantity` when a negative delta exceeds the held amount;
    /// on failure the stored quantity is unchanged.
    async fn adjust_quantity(&self, ticker: &str, delta: i64) -> Result<u32, LedgerError>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holding_serializes_with_camel_case_cost_basis() {
        let holding = Holding::new("AAPL", "Apple Inc.", 3, 150.0);
        let json = serde_json::to_value(&holding).unwrap();

        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["name"], "Apple Inc.");
        assert_eq!(json["quantity"], 3);
        assert!(json.get("buyPrice").is_some());
        assert!(json.get("buy_price").is_none());
    }

    #[test]
    fn insufficient_quantity_message_names_amounts() {
        let err = LedgerError::InsufficientQuantity {
            ticker: "AAPL".to_string(),
            held: 3,
            requested: 5,
        };

        let msg = err.to_string();
        assert!(msg.contains("AAPL"));
        assert!(msg.contains('3'));
        assert!(msg.contains('5'));
    }
}
