//! Market data collaborator.
//!
//! The orchestrator fetches one [`MarketSnapshot`] per epoch and resolves
//! predictions against it and the previous snapshot. A failed fetch aborts
//! the epoch before any state changes.

use std::collections::BTreeMap;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt as _};
use hexarena_types::{Asset, MarketSnapshot};

/// Errors raised by a market source.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// The feed could not produce prices.
    #[error("market data unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

/// A source of asset prices.
pub trait MarketSource: Send + Sync {
    /// Fetch the current prices of every tracked asset.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError`] when no snapshot can be produced.
    fn fetch_prices(&self) -> BoxFuture<'_, Result<MarketSnapshot, MarketError>>;
}

/// A market that never moves. Every prediction against it is flat.
#[derive(Debug, Clone)]
pub struct StaticMarket {
    prices: BTreeMap<Asset, f64>,
}

impl StaticMarket {
    /// A static market with the given prices.
    pub const fn new(prices: BTreeMap<Asset, f64>) -> Self {
        Self { prices }
    }
}

impl Default for StaticMarket {
    fn default() -> Self {
        Self::new(default_prices())
    }
}

impl MarketSource for StaticMarket {
    fn fetch_prices(&self) -> BoxFuture<'_, Result<MarketSnapshot, MarketError>> {
        futures::future::ready(Ok(MarketSnapshot {
            prices: self.prices.clone(),
            timestamp: Utc::now(),
        }))
        .boxed()
    }
}

/// Reference starting prices for the tracked assets.
pub fn default_prices() -> BTreeMap<Asset, f64> {
    BTreeMap::from([
        (Asset::Eth, 3_200.0),
        (Asset::Btc, 64_000.0),
        (Asset::Sol, 150.0),
        (Asset::Mon, 1.25),
    ])
}
