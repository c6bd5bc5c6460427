//! Simulated price feed.
//!
//! Each fetch moves every asset by a uniform random step of up to
//! `volatility_percent` in either direction. Prices never drop below a
//! small floor.

use std::collections::BTreeMap;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt as _};
use hexarena_core::market::{MarketError, MarketSource, default_prices};
use hexarena_types::{Asset, MarketSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::debug;

const PRICE_FLOOR: f64 = 0.0001;

struct WalkState {
    rng: StdRng,
    prices: BTreeMap<Asset, f64>,
}

/// A seeded random-walk market.
pub struct RandomWalkMarket {
    state: Mutex<WalkState>,
    volatility_percent: f64,
}

impl RandomWalkMarket {
    /// A walk starting from the reference prices.
    pub fn new(seed: u64, volatility_percent: f64) -> Self {
        Self {
            state: Mutex::new(WalkState {
                rng: StdRng::seed_from_u64(seed),
                prices: default_prices(),
            }),
            volatility_percent: volatility_percent.abs(),
        }
    }
}

impl MarketSource for RandomWalkMarket {
    fn fetch_prices(&self) -> BoxFuture<'_, Result<MarketSnapshot, MarketError>> {
        async move {
            let mut state = self.state.lock().await;
            let WalkState { rng, prices } = &mut *state;
            for price in prices.values_mut() {
                let step = if self.volatility_percent > 0.0 {
                    rng.random_range(-self.volatility_percent..=self.volatility_percent)
                } else {
                    0.0
                };
                *price = (*price * (1.0 + step / 100.0)).max(PRICE_FLOOR);
            }
            debug!(prices = ?prices, "Market moved");
            Ok(MarketSnapshot {
                prices: prices.clone(),
                timestamp: Utc::now(),
            })
        }
        .boxed()
    }
}
