//! Battle engine binary for the Hexarena simulation.
//!
//! Wires a roster of scripted agents, a simulated market feed, and the
//! epoch orchestrator together and runs one battle to completion.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `hexarena-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Spawn the roster and place it on the grid
//! 4. Walk the battle through `PENDING -> BETTING_OPEN -> ACTIVE`
//! 5. Run epochs until a winner is decided or the epoch cap is hit
//! 6. Log the result

mod error;
mod log_callback;
mod market_feed;
mod spawner;
mod timed_decision;

use std::path::Path;
use std::time::Duration;

use hexarena_core::arena::Battle;
use hexarena_core::config::{ArenaConfig, LogFormat, LoggingConfig};
use hexarena_core::decision::ScriptedDecisionSource;
use hexarena_core::epoch::Collaborators;
use hexarena_core::runner;
use hexarena_core::sponsor::NoSponsors;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::log_callback::LogCallback;
use crate::market_feed::RandomWalkMarket;
use crate::spawner::SpawnerConfig;
use crate::timed_decision::TimeoutDecisionSource;

const CONFIG_PATH: &str = "hexarena-config.yaml";

/// Engine-only settings that live next to the arena rules in the config
/// file.
#[derive(Debug, Clone, Default, Deserialize)]
struct EngineSettings {
    #[serde(default)]
    agents: SpawnerConfig,
    #[serde(default)]
    market: MarketFeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct MarketFeedConfig {
    /// Largest per-epoch price move, in percent.
    #[serde(default = "default_volatility_percent")]
    volatility_percent: f64,
}

impl Default for MarketFeedConfig {
    fn default() -> Self {
        Self {
            volatility_percent: default_volatility_percent(),
        }
    }
}

const fn default_volatility_percent() -> f64 {
    0.5
}

/// Application entry point for the battle engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the battle itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, settings) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!("hexarena-engine starting");
    info!(
        grid_radius = config.arena.grid_radius,
        seed = config.arena.seed,
        epoch_interval_ms = config.arena.epoch_interval_ms,
        decision_timeout_ms = config.arena.decision_timeout_ms,
        max_epochs = config.arena.max_epochs,
        "Configuration loaded"
    );

    // 3. Spawn the roster.
    let mut rng = StdRng::seed_from_u64(config.arena.seed);
    let roster = spawner::spawn_roster(&settings.agents, &mut rng)?;

    // 4. Open and start the battle.
    let mut battle = Battle::new(config.arena.grid_radius, config.arena.seed);
    battle.spawn_agents(roster)?;
    battle.open_betting()?;
    battle.start_battle()?;

    // 5. Run the battle.
    let market = RandomWalkMarket::new(
        config.arena.seed.wrapping_add(1),
        settings.market.volatility_percent,
    );
    let decisions = TimeoutDecisionSource::new(
        ScriptedDecisionSource::new(config.arena.seed),
        Duration::from_millis(config.arena.decision_timeout_ms),
    );
    let collaborators = Collaborators {
        market: &market,
        decisions: &decisions,
        final_words: None,
    };
    let mut callback = LogCallback::new();
    let outcome = runner::run_battle(
        &mut battle,
        &collaborators,
        &mut NoSponsors,
        &config,
        &mut callback,
    )
    .await
    .map_err(EngineError::from)?;

    // 6. Log results.
    runner::log_battle_end(&battle, &outcome);
    info!(
        end_reason = ?outcome.end_reason,
        epochs_reported = callback.epochs_seen(),
        "hexarena-engine shutdown complete"
    );

    Ok(())
}

/// Load arena rules and engine settings from `hexarena-config.yaml`.
///
/// Missing file means defaults for both.
fn load_config() -> Result<(ArenaConfig, EngineSettings), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if !config_path.exists() {
        return Ok((ArenaConfig::parse("")?, EngineSettings::default()));
    }

    let config = ArenaConfig::from_file(config_path)?;
    let contents = std::fs::read_to_string(config_path).map_err(|e| EngineError::Spawner {
        message: format!("failed to read config file: {e}"),
    })?;
    let settings: EngineSettings = if contents.trim().is_empty() {
        EngineSettings::default()
    } else {
        serde_yml::from_str(&contents).map_err(|e| EngineError::Spawner {
            message: format!("failed to parse engine settings: {e}"),
        })?
    };
    Ok((config, settings))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let installed = match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}
