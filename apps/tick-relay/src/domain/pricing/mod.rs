//! Live Price Types
//!
//! The tick as it flows through the relay, and the last-write-wins cache of
//! the most recent price per symbol. Ticks are ephemeral: nothing here is
//! persisted, and only the latest value per symbol is retained.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::domain::subscription::Symbol;

// =============================================================================
// Tick
// =============================================================================

/// A single observed price for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Exchange-qualified symbol (e.g. "BINANCE:BTCUSDT").
    pub symbol: Symbol,
    /// Observed price.
    pub price: f64,
}

impl Tick {
    /// Create a new tick.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

// =============================================================================
// Price Cache
// =============================================================================

/// Last-write-wins map from symbol to most recently observed price.
///
/// Written by the tick-handling path, read by both the broadcast path and the
/// REST snapshot path. No eviction, no TTL; entries live for the process
/// lifetime.
#[derive(Debug, Default)]
pub struct PriceCache {
    prices: RwLock<HashMap<Symbol, f64>>,
}

impl PriceCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Most recent price for a symbol, or `None` if never observed.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.prices.read().get(symbol).copied()
    }

    /// Record an observed price, overwriting unconditionally.
    pub fn set(&self, symbol: &str, price: f64) {
        self.prices.write().insert(symbol.to_owned(), price);
    }

    /// Copy of the full cache content.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<Symbol, f64> {
        self.prices.read().clone()
    }

    /// Number of symbols observed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.read().len()
    }

    /// Whether any price has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unobserved_symbol_has_no_price() {
        let cache = PriceCache::new();
        assert_eq!(cache.get("AAPL"), None);
    }

    #[test]
    fn observed_tick_is_readable() {
        let cache = PriceCache::new();

        cache.set("BINANCE:BTCUSDT", 65000.5);

        assert_eq!(cache.get("BINANCE:BTCUSDT"), Some(65000.5));
    }

    #[test]
    fn later_write_overwrites() {
        let cache = PriceCache::new();

        cache.set("AAPL", 150.0);
        cache.set("AAPL", 151.25);

        assert_eq!(cache.get("AAPL"), Some(151.25));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn symbols_are_independent() {
        let cache = PriceCache::new();

        cache.set("AAPL", 150.0);
        cache.set("MSFT", 410.0);

        assert_eq!(cache.get("AAPL"), Some(150.0));
        assert_eq!(cache.get("MSFT"), Some(410.0));
    }

    #[test]
    fn snapshot_copies_current_content() {
        let cache = PriceCache::new();

        cache.set("AAPL", 150.0);
        let snapshot = cache.snapshot();
        cache.set("AAPL", 999.0);

        assert_eq!(snapshot.get("AAPL"), Some(&150.0));
    }

    #[test]
    fn tick_serializes_symbol_and_price() {
        let tick = Tick::new("AAPL", 150.5);
        let json = serde_json::to_value(&tick).unwrap();

        assert_eq!(json["symbol"], "AAPL");
        assert!((json["price"].as_f64().unwrap() - 150.5).abs() < f64::EPSILON);
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::PriceCache;

        proptest! {
            /// After any sequence of ticks for one symbol, the cache holds
            /// the price of the last tick in the sequence.
            #[test]
            fn last_write_wins(prices in proptest::collection::vec(-1e9_f64..1e9, 1..100)) {
                let cache = PriceCache::new();

                for price in &prices {
                    cache.set("X", *price);
                }

                prop_assert_eq!(cache.get("X"), prices.last().copied());
            }
        }
    }
}
