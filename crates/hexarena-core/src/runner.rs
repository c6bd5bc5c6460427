//! Multi-epoch battle runner.
//!
//! [`run_battle`] drives [`process_epoch`] on a fixed interval until the
//! battle has a winner or the epoch cap is hit. Between epochs it carries
//! the market snapshot forward, pulls sponsor effects, and notifies an
//! [`EpochCallback`]. Market outages are ridden out; any other epoch
//! error ends the run.
//!
//! [`process_epoch`]: crate::epoch::process_epoch

use std::collections::BTreeMap;

use hexarena_types::{
    AgentId, BattleStatus, EpochResult, MarketSnapshot, SponsorEffect, WinnerRecord,
};
use tracing::{info, warn};

use crate::arena::{ArenaError, Battle};
use crate::config::ArenaConfig;
use crate::epoch::{self, Collaborators, EpochError};
use crate::sponsor::SponsorFeed;

/// Errors that can occur during a battle run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// An epoch failed.
    #[error("epoch error: {source}")]
    Epoch {
        /// The underlying epoch error.
        #[from]
        source: EpochError,
    },

    /// The battle could not be completed.
    #[error("arena error: {source}")]
    Arena {
        /// The underlying lifecycle error.
        #[from]
        source: ArenaError,
    },
}

/// Why a battle run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleEndReason {
    /// One agent survived, or a winner was picked among the last to fall.
    WinnerDecided,
    /// `max_epochs` was reached with several agents still alive.
    EpochLimit,
}

/// Outcome of a battle run.
#[derive(Debug, Clone)]
pub struct BattleOutcome {
    /// The reason the run ended.
    pub end_reason: BattleEndReason,
    /// The winner, if any agent was left to win.
    pub winner: Option<WinnerRecord>,
    /// Epochs processed by this run.
    pub epochs: u64,
}

/// Callback invoked after each epoch completes.
///
/// Implementations can broadcast results to spectators or persist them.
pub trait EpochCallback: Send {
    /// Called after an epoch completes successfully.
    fn on_epoch(&mut self, result: &EpochResult, battle: &Battle);
}

/// A no-op epoch callback for testing.
pub struct NoOpCallback;

impl EpochCallback for NoOpCallback {
    fn on_epoch(&mut self, _result: &EpochResult, _battle: &Battle) {}
}

/// Run an active battle to completion.
///
/// A market outage skips the interval and retries the same epoch, with
/// the same sponsor effects, up to `max_market_failures` times in a row.
///
/// # Errors
///
/// Returns [`RunnerError`] if an epoch fails for any other reason, or the
/// market stays down past the retry limit. The battle keeps the state of
/// the last successful epoch.
pub async fn run_battle(
    battle: &mut Battle,
    collaborators: &Collaborators<'_>,
    sponsors: &mut dyn SponsorFeed,
    config: &ArenaConfig,
    callback: &mut dyn EpochCallback,
) -> Result<BattleOutcome, RunnerError> {
    let mut previous_market: Option<MarketSnapshot> = None;
    let mut pending_effects: Option<BTreeMap<AgentId, SponsorEffect>> = None;
    let mut market_failures: u32 = 0;
    let mut epochs: u64 = 0;
    let max_epochs = config.arena.max_epochs;

    info!(
        battle_id = %battle.id(),
        agents = battle.roster().len(),
        total_epochs = battle.phase_config().map(|p| p.total_epochs),
        max_epochs,
        epoch_interval_ms = config.arena.epoch_interval_ms,
        "Battle starting"
    );

    loop {
        if battle.status() == BattleStatus::Completed {
            return Ok(outcome(battle, BattleEndReason::WinnerDecided, epochs));
        }

        // --- Check epoch cap (before epoch) ---
        if battle.epoch() >= max_epochs {
            info!(epoch = battle.epoch(), max_epochs, "Epoch limit reached");
            battle.complete()?;
            return Ok(outcome(battle, BattleEndReason::EpochLimit, epochs));
        }

        // --- Execute epoch ---
        let effects = pending_effects
            .take()
            .unwrap_or_else(|| sponsors.take_effects(battle.epoch().saturating_add(1)));
        let result = match epoch::process_epoch(
            battle,
            collaborators,
            previous_market.as_ref(),
            &effects,
            config,
        )
        .await
        {
            Ok(result) => result,
            Err(EpochError::Market { source }) => {
                // The epoch left no trace; hold the sponsor effects for the retry.
                market_failures = market_failures.saturating_add(1);
                if market_failures > config.arena.max_market_failures {
                    return Err(EpochError::Market { source }.into());
                }
                warn!(
                    epoch = battle.epoch().saturating_add(1),
                    failures = market_failures,
                    error = %source,
                    "Market unavailable, retrying next interval"
                );
                pending_effects = Some(effects);
                sleep_interval(config).await;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        market_failures = 0;
        epochs = epochs.saturating_add(1);

        // --- Notify callback ---
        callback.on_epoch(&result, battle);

        if result.is_complete {
            info!(epoch = result.epoch, "Battle decided");
            return Ok(outcome(battle, BattleEndReason::WinnerDecided, epochs));
        }
        previous_market = Some(result.market);

        // --- Sleep for epoch interval ---
        sleep_interval(config).await;
    }
}

async fn sleep_interval(config: &ArenaConfig) {
    let interval_ms = config.arena.epoch_interval_ms;
    if interval_ms > 0 {
        tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
    }
}

fn outcome(battle: &Battle, end_reason: BattleEndReason, epochs: u64) -> BattleOutcome {
    BattleOutcome {
        end_reason,
        winner: battle.winner().cloned(),
        epochs,
    }
}

/// Log the end of a battle run.
pub fn log_battle_end(battle: &Battle, outcome: &BattleOutcome) {
    info!(
        battle_id = %battle.id(),
        reason = ?outcome.end_reason,
        epochs = outcome.epochs,
        final_epoch = battle.epoch(),
        eliminated = battle.eliminations().len(),
        "Battle ended"
    );
    if let Some(winner) = &outcome.winner {
        info!(
            winner = %winner.agent_name,
            class = ?winner.class,
            hp = winner.hp,
            kills = winner.kills,
            "Winner"
        );
    } else {
        warn!("Battle ended without a winner");
    }
}
