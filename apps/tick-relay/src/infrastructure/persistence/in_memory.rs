//! In-memory holding repository.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::ledger::{Holding, HoldingRepository, LedgerError};
use crate::domain::subscription::Symbol;

/// In-memory implementation of [`HoldingRepository`].
///
/// Every method takes the map lock once, so each call is atomic with respect
/// to the record it touches; `adjust_quantity` in particular is a single
/// locked read-modify-write.
#[derive(Debug, Default)]
pub struct InMemoryHoldingRepository {
    holdings: RwLock<HashMap<Symbol, Holding>>,
}

impl InMemoryHoldingRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            holdings: RwLock::new(HashMap::new()),
        }
    }

    /// Number of holdings in the repository.
    #[must_use]
    pub fn len(&self) -> usize {
        self.holdings.read().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holdings.read().is_empty()
    }
}

#[async_trait]
impl HoldingRepository for InMemoryHoldingRepository {
    async fn find_all(&self) -> Result<Vec<Holding>, LedgerError> {
        Ok(self.holdings.read().values().cloned().collect())
    }

    async fn find_by_ticker(&self, ticker: &str) -> Result<Option<Holding>, LedgerError> {
        Ok(self.holdings.read().get(ticker).cloned())
    }

    async fn create(&self, holding: Holding) -> Result<(), LedgerError> {
        let mut holdings = self.holdings.write();
        if holdings.contains_key(&holding.ticker) {
            return Err(LedgerError::AlreadyExists(holding.ticker));
        }
        holdings.insert(holding.ticker.clone(), holding);
        Ok(())
    }

    async fn update_quantity(&self, ticker: &str, quantity: u32) -> Result<(), LedgerError> {
        let mut holdings = self.holdings.write();
        let holding = holdings
            .get_mut(ticker)
            .ok_or_else(|| LedgerError::NotFound(ticker.to_owned()))?;
        holding.quantity = quantity;
        Ok(())
    }

    async fn adjust_quantity(&self, ticker: &str, delta: i64) -> Result<u32, LedgerError> {
        let mut holdings = self.holdings.write();
        let holding = holdings
            .get_mut(ticker)
            .ok_or_else(|| LedgerError::NotFound(ticker.to_owned()))?;

        let adjusted = i64::from(holding.quantity) + delta;
        let new_quantity = u32::try_from(adjusted).map_err(|_| {
            LedgerError::InsufficientQuantity {
                ticker: ticker.to_owned(),
                held: holding.quantity,
                requested: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
            }
        })?;

        holding.quantity = new_quantity;
        Ok(new_quantity)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn apple(quantity: u32) -> Holding {
        Holding::new("AAPL", "Apple Inc.", quantity, 150.0)
    }

    #[tokio::test]
    async fn create_and_find_by_ticker() {
        let repo = InMemoryHoldingRepository::new();

        tokio_test::assert_ok!(repo.create(apple(3)).await);

        let found = repo.find_by_ticker("AAPL").await.unwrap();
        assert_eq!(found, Some(apple(3)));
    }

    #[tokio::test]
    async fn find_unknown_ticker_is_none() {
        let repo = InMemoryHoldingRepository::new();

        assert_eq!(repo.find_by_ticker("AAPL").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let repo = InMemoryHoldingRepository::new();

        repo.create(apple(3)).await.unwrap();

        assert_eq!(
            repo.create(apple(1)).await,
            Err(LedgerError::AlreadyExists("AAPL".to_string()))
        );
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn find_all_returns_every_holding() {
        let repo = InMemoryHoldingRepository::new();

        repo.create(apple(3)).await.unwrap();
        repo.create(Holding::new("MSFT", "Microsoft Corporation", 1, 400.0))
            .await
            .unwrap();

        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_quantity_overwrites() {
        let repo = InMemoryHoldingRepository::new();
        repo.create(apple(3)).await.unwrap();

        repo.update_quantity("AAPL", 7).await.unwrap();

        assert_eq!(repo.find_by_ticker("AAPL").await.unwrap().unwrap().quantity, 7);
    }

    #[tokio::test]
    async fn update_quantity_unknown_ticker_fails() {
        let repo = InMemoryHoldingRepository::new();

        assert_eq!(
            repo.update_quantity("AAPL", 7).await,
            Err(LedgerError::NotFound("AAPL".to_string()))
        );
    }

    #[tokio::test]
    async fn adjust_quantity_buys_and_sells() {
        let repo = InMemoryHoldingRepository::new();
        repo.create(apple(3)).await.unwrap();

        assert_eq!(repo.adjust_quantity("AAPL", 2).await.unwrap(), 5);
        assert_eq!(repo.adjust_quantity("AAPL", -5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn oversell_is_rejected_without_mutation() {
        let repo = InMemoryHoldingRepository::new();
        repo.create(apple(3)).await.unwrap();

        let err = repo.adjust_quantity("AAPL", -5).await.unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientQuantity {
                ticker: "AAPL".to_string(),
                held: 3,
                requested: 5,
            }
        );
        assert_eq!(repo.find_by_ticker("AAPL").await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn concurrent_adjustments_lose_no_updates() {
        use std::sync::Arc;

        let repo = Arc::new(InMemoryHoldingRepository::new());
        repo.create(apple(0)).await.unwrap();

        let mut handles = vec![];
        for _ in 0..50 {
            let r = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                r.adjust_quantity("AAPL", 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(
            repo.find_by_ticker("AAPL").await.unwrap().unwrap().quantity,
            50
        );
    }
}
