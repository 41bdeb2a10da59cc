//! Subscription Reference Counting
//!
//! Tracks which downstream subscribers want updates for which symbols,
//! and reports the exact moments the upstream feed must be told about it.
//!
//! # Design
//!
//! Many subscribers can watch the same symbol while the upstream feed holds
//! a single subscription for it. The book keeps a per-symbol reference count
//! and reports transitions:
//!
//! - a subscriber adding interest returns `true` only on the 0→1 transition
//!   (the upstream subscribe must be sent)
//! - a subscriber removing interest returns `true` only on the 1→0 transition
//!   (the upstream unsubscribe must be sent)
//!
//! All mutations take a single write lock, so two concurrent intents for the
//! same symbol can never both observe the same transition.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a downstream subscriber channel.
pub type SubscriberId = u64;

/// A symbol string (exchange-qualified ticker). Case-sensitive.
pub type Symbol = String;

// =============================================================================
// Book State
// =============================================================================

#[derive(Debug, Default)]
struct BookState {
    /// Map from subscriber ID to the symbols it has expressed interest in.
    subscriber_symbols: HashMap<SubscriberId, HashSet<Symbol>>,
    /// Map from symbol to interested-subscriber count.
    symbol_refcount: HashMap<Symbol, usize>,
}

impl BookState {
    /// Record interest. Returns `true` if the refcount went 0→1.
    fn add(&mut self, subscriber: SubscriberId, symbol: &str) -> bool {
        let symbols = self.subscriber_symbols.entry(subscriber).or_default();

        // Duplicate intent from the same subscriber is a no-op.
        if !symbols.insert(symbol.to_owned()) {
            return false;
        }

        let refcount = self.symbol_refcount.entry(symbol.to_owned()).or_insert(0);
        *refcount += 1;
        *refcount == 1
    }

    /// Drop interest. Returns `true` if the refcount went 1→0.
    fn remove(&mut self, subscriber: SubscriberId, symbol: &str) -> bool {
        let Some(symbols) = self.subscriber_symbols.get_mut(&subscriber) else {
            return false;
        };

        // Unsubscribing from a symbol never subscribed to is a no-op.
        if !symbols.remove(symbol) {
            return false;
        }

        if symbols.is_empty() {
            self.subscriber_symbols.remove(&subscriber);
        }

        self.release(symbol)
    }

    /// Drop all interest held by a subscriber.
    ///
    /// Returns the symbols whose refcount went 1→0.
    fn remove_subscriber(&mut self, subscriber: SubscriberId) -> Vec<Symbol> {
        let Some(symbols) = self.subscriber_symbols.remove(&subscriber) else {
            return vec![];
        };

        symbols
            .into_iter()
            .filter(|symbol| self.release(symbol))
            .collect()
    }

    /// Decrement a symbol's refcount. Returns `true` on the 1→0 transition.
    fn release(&mut self, symbol: &str) -> bool {
        let Some(refcount) = self.symbol_refcount.get_mut(symbol) else {
            return false;
        };

        *refcount = refcount.saturating_sub(1);
        if *refcount == 0 {
            self.symbol_refcount.remove(symbol);
            return true;
        }
        false
    }
}

// =============================================================================
// Subscription Book
// =============================================================================

/// Thread-safe per-symbol subscriber reference count.
///
/// # Example
///
/// ```rust
/// use tick_relay::domain::subscription::SubscriptionBook;
///
/// let book = SubscriptionBook::new();
///
/// // First watcher of a symbol: upstream subscribe needed.
/// assert!(book.add(1, "BINANCE:BTCUSDT"));
///
/// // Second watcher: upstream already subscribed.
/// assert!(!book.add(2, "BINANCE:BTCUSDT"));
///
/// // First watcher leaves: still one left.
/// assert!(!book.remove(1, "BINANCE:BTCUSDT"));
///
/// // Last watcher leaves: upstream unsubscribe needed.
/// assert!(book.remove(2, "BINANCE:BTCUSDT"));
/// ```
#[derive(Debug, Default)]
pub struct SubscriptionBook {
    state: RwLock<BookState>,
}

impl SubscriptionBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BookState::default()),
        }
    }

    /// Record a subscriber's interest in a symbol.
    ///
    /// Returns `true` exactly when the symbol's count transitions 0→1, i.e.
    /// when an upstream subscribe must be issued.
    pub fn add(&self, subscriber: SubscriberId, symbol: &str) -> bool {
        self.state.write().add(subscriber, symbol)
    }

    /// Drop a subscriber's interest in a symbol.
    ///
    /// Returns `true` exactly when the symbol's count transitions 1→0, i.e.
    /// when an upstream unsubscribe must be issued.
    pub fn remove(&self, subscriber: SubscriberId, symbol: &str) -> bool {
        self.state.write().remove(subscriber, symbol)
    }

    /// Drop all interest held by a subscriber (disconnect cleanup).
    ///
    /// Returns the symbols that now need an upstream unsubscribe.
    pub fn remove_subscriber(&self, subscriber: SubscriberId) -> Vec<Symbol> {
        self.state.write().remove_subscriber(subscriber)
    }

    /// All symbols with at least one interested subscriber.
    #[must_use]
    pub fn active_symbols(&self) -> Vec<Symbol> {
        self.state.read().symbol_refcount.keys().cloned().collect()
    }

    /// Symbols a specific subscriber has expressed interest in.
    #[must_use]
    pub fn subscriber_symbols(&self, subscriber: SubscriberId) -> Vec<Symbol> {
        self.state
            .read()
            .subscriber_symbols
            .get(&subscriber)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> BookStats {
        let state = self.state.read();
        BookStats {
            symbol_count: state.symbol_refcount.len(),
            subscriber_count: state.subscriber_symbols.len(),
        }
    }
}

/// Snapshot of book statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookStats {
    /// Number of symbols with at least one interested subscriber.
    pub symbol_count: usize,
    /// Number of subscribers with at least one interest.
    pub subscriber_count: usize,
}

// =============================================================================
// Tests
// =============================================================================
