//! Epoch callback that reports battle progress through `tracing`.
//!
//! Each epoch produces one `info` line with the headline numbers and, at
//! `debug`, the full [`EpochResult`] as JSON for the rendering layer.

use hexarena_core::arena::Battle;
use hexarena_core::runner::EpochCallback;
use hexarena_types::EpochResult;
use tracing::{debug, info, warn};

/// Logs every epoch result.
#[derive(Debug, Default)]
pub struct LogCallback {
    epochs_seen: u64,
}

impl LogCallback {
    /// Create a new logging callback.
    pub const fn new() -> Self {
        Self { epochs_seen: 0 }
    }

    /// Epochs reported so far.
    pub const fn epochs_seen(&self) -> u64 {
        self.epochs_seen
    }
}

impl EpochCallback for LogCallback {
    fn on_epoch(&mut self, result: &EpochResult, battle: &Battle) {
        self.epochs_seen = self.epochs_seen.saturating_add(1);

        if let Some(transition) = &result.phase_transition {
            info!(
                epoch = result.epoch,
                from = ?transition.from,
                to = ?transition.to,
                ends_at = transition.new_phase.end_epoch,
                "Phase changed"
            );
        }

        info!(
            epoch = result.epoch,
            phase = ?result.phase,
            alive = battle.roster().living_count(),
            moves = result.moves.iter().filter(|m| m.success).count(),
            attacks = result.combat.len(),
            deaths = result.deaths.len(),
            "Epoch complete"
        );

        for death in &result.deaths {
            info!(
                agent = %death.agent_name,
                cause = %death.cause,
                placement = death.placement,
                final_words = %death.final_words,
                "Eliminated"
            );
        }

        match serde_json::to_string(result) {
            Ok(json) => debug!(epoch = result.epoch, result = %json, "Epoch result"),
            Err(e) => warn!(error = %e, "failed to serialize epoch result"),
        }
    }
}
