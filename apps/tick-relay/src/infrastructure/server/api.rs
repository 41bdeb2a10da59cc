//! Holdings REST Surface
//!
//! Thin request/response wrappers over the ledger. Feed and ledger state are
//! independent: a ledger failure here never touches the relay's cache or
//! subscriptions.

use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use crate::application::relay::{HoldingSnapshot, LEDGER_SUBSCRIBER_ID};
use crate::domain::ledger::{Holding, LedgerError};
use crate::infrastructure::server::{ApiError, AppState};

/// Instruments seeded into a sparse ledger, with display names.
const DEFAULT_INSTRUMENTS: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("AMZN", "Amazon.com Inc."),
    ("GOOGL", "Alphabet Inc."),
    ("TSLA", "Tesla Inc."),
];

/// Quantity payload for buy/sell requests.
#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    /// Number of units to buy or sell.
    pub quantity: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/holdings` - list holdings merged with live prices.
///
/// Seeds the default instrument set first when the ledger is below the
/// configured minimum.
pub async fn list_holdings(
    State(state): State<AppState>,
) -> Result<Json<Vec<HoldingSnapshot>>, ApiError> {
    seed_if_sparse(&state).await?;
    Ok(Json(state.broker.snapshot().await?))
}

/// `POST /api/holdings/{symbol}/buy` - increment quantity and ensure the
/// symbol stays subscribed upstream.
pub async fn buy(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(request): Json<TradeRequest>,
) -> Result<Json<HoldingSnapshot>, ApiError> {
    validate_quantity(request.quantity)?;

    state
        .ledger
        .adjust_quantity(&symbol, i64::from(request.quantity))
        .await?;

    // Held positions keep their symbol subscribed upstream.
    state
        .broker
        .handle_subscribe_intent(LEDGER_SUBSCRIBER_ID, &symbol)
        .await;

    snapshot_of(&state, &symbol).await.map(Json)
}

/// `POST /api/holdings/{symbol}/sell` - decrement quantity, rejecting an
/// oversell; the last unit sold drops the upstream subscription.
pub async fn sell(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(request): Json<TradeRequest>,
) -> Result<Json<HoldingSnapshot>, ApiError> {
    validate_quantity(request.quantity)?;

    let remaining = state
        .ledger
        .adjust_quantity(&symbol, -i64::from(request.quantity))
        .await?;

    if remaining == 0 {
        state
            .broker
            .handle_unsubscribe_intent(LEDGER_SUBSCRIBER_ID, &symbol)
            .await;
    }

    snapshot_of(&state, &symbol).await.map(Json)
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_quantity(quantity: u32) -> Result<(), ApiError> {
    if quantity == 0 {
        return Err(ApiError::InvalidRequest(
            "quantity must be positive".to_string(),
        ));
    }
    Ok(())
}

async fn snapshot_of(state: &AppState, symbol: &str) -> Result<HoldingSnapshot, ApiError> {
    let holding = state
        .ledger
        .find_by_ticker(symbol)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("holding not found: {symbol}")))?;

    let live_price = state.broker.cache().get(symbol);
    Ok(HoldingSnapshot::from_holding(holding, live_price))
}

/// Seed the default instrument set when the ledger is sparse.
///
/// Cost basis comes from the live price cache; a symbol with no observed
/// price yet cannot be costed and is skipped until one arrives.
async fn seed_if_sparse(state: &AppState) -> Result<(), ApiError> {
    let holdings = state.ledger.find_all().await?;
    if holdings.len() >= state.settings.min_tracked_holdings {
        return Ok(());
    }

    let existing: HashSet<&str> = holdings.iter().map(|h| h.ticker.as_str()).collect();

    for (ticker, name) in DEFAULT_INSTRUMENTS {
        if existing.contains(ticker) {
            continue;
        }
        let Some(price) = state.broker.cache().get(ticker) else {
            continue;
        };

        match state
            .ledger
            .create(Holding::new(*ticker, *name, 1, price))
            .await
        {
            Ok(()) => {
                tracing::info!(ticker, price, "seeded default holding");
                state
                    .broker
                    .handle_subscribe_intent(LEDGER_SUBSCRIBER_ID, ticker)
                    .await;
            }
            // A concurrent request seeded it first.
            Err(LedgerError::AlreadyExists(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
