//! Relay Broker
//!
//! The coordination point of the relay: every decoded tick passes through
//! here on its way from the upstream feed to the downstream subscribers, and
//! every downstream subscription intent passes through here on its way to
//! the upstream feed.
//!
//! # Responsibilities
//!
//! - Apply each tick to the [`PriceCache`] and broadcast it to the
//!   [`SubscriberRegistry`].
//! - Fold subscribe/unsubscribe intents into the [`SubscriptionBook`] and
//!   issue a [`FeedCommand`] only on the 0→1 / 1→0 refcount transitions.
//! - Clean up all interest held by a subscriber when it disconnects or its
//!   channel fails mid-broadcast.
//! - Build the initial snapshot (ledger holdings merged with live prices)
//!   for newly connected subscribers.
//!
//! The broker is plain owned state behind an `Arc`; multiple independent
//! brokers can coexist in one process, which is how the tests run.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::ports::FeedCommand;
use crate::domain::ledger::{HoldingRepository, LedgerError};
use crate::domain::pricing::{PriceCache, Tick};
use crate::domain::subscription::{SubscriberId, SubscriptionBook};

pub mod messages;
pub mod registry;

pub use messages::{ClientRequest, HoldingSnapshot, PriceUpdate, ServerMessage};
pub use registry::{BroadcastOutcome, SubscriberRegistry};

/// Reserved subscriber ID for the ledger's own upstream interest.
///
/// A bought holding keeps its symbol subscribed upstream until the position
/// is sold down to zero; that interest goes through the same reference count
/// as live subscribers, under this ID.
pub const LEDGER_SUBSCRIBER_ID: SubscriberId = 0;

// =============================================================================
// Relay Broker
// =============================================================================

/// Coordinates the price cache, subscription book, and subscriber registry.
pub struct RelayBroker {
    cache: PriceCache,
    book: SubscriptionBook,
    registry: SubscriberRegistry,
    feed_tx: mpsc::Sender<FeedCommand>,
    ledger: Arc<dyn HoldingRepository>,
}

impl RelayBroker {
    /// Create a broker issuing feed commands on `feed_tx` and reading
    /// snapshots from `ledger`.
    #[must_use]
    pub fn new(feed_tx: mpsc::Sender<FeedCommand>, ledger: Arc<dyn HoldingRepository>) -> Self {
        Self {
            cache: PriceCache::new(),
            book: SubscriptionBook::new(),
            registry: SubscriberRegistry::new(),
            feed_tx,
            ledger,
        }
    }

    /// Apply a tick: update the cache, then broadcast the update message.
    ///
    /// Subscribers whose channel fails are removed and their upstream
    /// interest released, exactly as if they had disconnected.
    pub async fn handle_tick(&self, tick: Tick) -> BroadcastOutcome {
        self.cache.set(&tick.symbol, tick.price);

        let outcome = self.registry.broadcast(&ServerMessage::update(tick));

        for subscriber in &outcome.dropped {
            tracing::debug!(subscriber, "dropping unresponsive subscriber");
            self.release_interest(*subscriber).await;
        }

        outcome
    }

    /// Record a subscriber's interest in a symbol; subscribe upstream on the
    /// 0→1 transition.
    pub async fn handle_subscribe_intent(&self, subscriber: SubscriberId, symbol: &str) {
        if self.book.add(subscriber, symbol) {
            self.send_command(FeedCommand::Subscribe(symbol.to_owned()))
                .await;
        }
    }

    /// Drop a subscriber's interest in a symbol; unsubscribe upstream on the
    /// 1→0 transition.
    pub async fn handle_unsubscribe_intent(&self, subscriber: SubscriberId, symbol: &str) {
        if self.book.remove(subscriber, symbol) {
            self.send_command(FeedCommand::Unsubscribe(symbol.to_owned()))
                .await;
        }
    }

    /// Remove a disconnected subscriber and release all its interest.
    ///
    /// Equivalent to an unsubscribe intent for every symbol the subscriber
    /// was watching.
    pub async fn handle_subscriber_disconnect(&self, subscriber: SubscriberId) {
        self.registry.remove(subscriber);
        self.release_interest(subscriber).await;
    }

    /// Register a connected subscriber's outbound channel.
    pub fn register_subscriber(&self, subscriber: SubscriberId, sender: mpsc::Sender<ServerMessage>) {
        self.registry.add(subscriber, sender);
    }

    /// Ledger holdings merged with cached live prices, for initial delivery
    /// to a newly connected subscriber.
    ///
    /// # Errors
    ///
    /// Returns the ledger's error if the store read fails.
    pub async fn snapshot(&self) -> Result<Vec<HoldingSnapshot>, LedgerError> {
        let holdings = self.ledger.find_all().await?;
        let prices = self.cache.snapshot();

        Ok(holdings
            .into_iter()
            .map(|holding| {
                let live_price = prices.get(&holding.ticker).copied();
                HoldingSnapshot::from_holding(holding, live_price)
            })
            .collect())
    }

    /// The live price cache.
    #[must_use]
    pub const fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// The subscription book.
    #[must_use]
    pub const fn book(&self) -> &SubscriptionBook {
        &self.book
    }

    /// The subscriber registry.
    #[must_use]
    pub const fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    async fn release_interest(&self, subscriber: SubscriberId) {
        for symbol in self.book.remove_subscriber(subscriber) {
            self.send_command(FeedCommand::Unsubscribe(symbol)).await;
        }
    }

    async fn send_command(&self, command: FeedCommand) {
        // The connector only goes away at shutdown; nothing to recover here.
        if let Err(e) = self.feed_tx.send(command).await {
            tracing::warn!(error = %e, "feed command channel closed");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::domain::ledger::{Holding, MockHoldingRepository};

    use super::*;

    fn broker_with_commands() -> (RelayBroker, mpsc::Receiver<FeedCommand>) {
        let (feed_tx, feed_rx) = mpsc::channel(16);
        let mut ledger = MockHoldingRepository::new();
        ledger.expect_find_all().returning(|| Ok(vec![]));
        (RelayBroker::new(feed_tx, Arc::new(ledger)), feed_rx)
    }

    #[tokio::test]
    async fn tick_updates_cache_and_broadcasts() {
        let (broker, _feed_rx) = broker_with_commands();
        let (tx, mut rx) = mpsc::channel(4);
        broker.register_subscriber(1, tx);

        let outcome = broker
            .handle_tick(Tick::new("BINANCE:BTCUSDT", 65000.5))
            .await;

        assert_eq!(outcome.delivered, 1);
        assert_eq!(broker.cache().get("BINANCE:BTCUSDT"), Some(65000.5));

        let msg = rx.recv().await.unwrap();
        assert_eq!(
            msg,
            ServerMessage::update(Tick::new("BINANCE:BTCUSDT", 65000.5))
        );
    }

    #[tokio::test]
    async fn subscribe_commands_follow_refcount_transitions() {
        let (broker, mut feed_rx) = broker_with_commands();

        // S1 first: 0→1, upstream subscribe.
        broker.handle_subscribe_intent(1, "X").await;
        assert_eq!(
            feed_rx.recv().await,
            Some(FeedCommand::Subscribe("X".to_string()))
        );

        // S2 joins: 1→2, silence.
        broker.handle_subscribe_intent(2, "X").await;

        // S1 disconnects: 2→1, silence.
        broker.handle_subscriber_disconnect(1).await;

        // S2 leaves: 1→0, upstream unsubscribe.
        broker.handle_unsubscribe_intent(2, "X").await;
        assert_eq!(
            feed_rx.recv().await,
            Some(FeedCommand::Unsubscribe("X".to_string()))
        );

        // Exactly the two transition commands, nothing in between.
        assert!(feed_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_releases_every_symbol() {
        let (broker, mut feed_rx) = broker_with_commands();

        broker.handle_subscribe_intent(1, "A").await;
        broker.handle_subscribe_intent(1, "B").await;
        feed_rx.recv().await;
        feed_rx.recv().await;

        broker.handle_subscriber_disconnect(1).await;

        let mut released = vec![feed_rx.recv().await, feed_rx.recv().await];
        released.sort_by_key(|c| format!("{c:?}"));

        assert_eq!(
            released,
            vec![
                Some(FeedCommand::Unsubscribe("A".to_string())),
                Some(FeedCommand::Unsubscribe("B".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn failed_subscriber_is_dropped_and_interest_released() {
        let (broker, mut feed_rx) = broker_with_commands();

        let (tx1, rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        broker.register_subscriber(1, tx1);
        broker.register_subscriber(2, tx2);
        broker.handle_subscribe_intent(1, "AAPL").await;
        feed_rx.recv().await;

        // Subscriber 1's channel dies.
        drop(rx1);

        let outcome = broker.handle_tick(Tick::new("AAPL", 150.0)).await;

        // Delivery to subscriber 2 is unaffected.
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.dropped, vec![1]);
        assert!(rx2.recv().await.is_some());
        assert_eq!(broker.registry().len(), 1);

        // The dropped subscriber's last interest triggers the unsubscribe.
        assert_eq!(
            feed_rx.recv().await,
            Some(FeedCommand::Unsubscribe("AAPL".to_string()))
        );
    }

    #[tokio::test]
    async fn snapshot_merges_ledger_with_cache() {
        let (feed_tx, _feed_rx) = mpsc::channel(16);
        let mut ledger = MockHoldingRepository::new();
        ledger.expect_find_all().returning(|| {
            Ok(vec![
                Holding::new("AAPL", "Apple Inc.", 3, 150.0),
                Holding::new("MSFT", "Microsoft Corporation", 1, 400.0),
            ])
        });

        let broker = RelayBroker::new(feed_tx, Arc::new(ledger));
        broker.cache().set("AAPL", 151.2);

        let mut snapshot = broker.snapshot().await.unwrap();
        snapshot.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].live_price, Some(151.2));
        assert_eq!(snapshot[1].live_price, None);
    }

    #[tokio::test]
    async fn snapshot_propagates_ledger_failure() {
        let (feed_tx, _feed_rx) = mpsc::channel(16);
        let mut ledger = MockHoldingRepository::new();
        ledger
            .expect_find_all()
            .returning(|| Err(LedgerError::Store("disk on fire".to_string())));

        let broker = RelayBroker::new(feed_tx, Arc::new(ledger));

        assert!(matches!(
            broker.snapshot().await,
            Err(LedgerError::Store(_))
        ));
    }
}
