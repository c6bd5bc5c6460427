//! Inputs to an epoch: agent actions, market snapshots and sponsor effects.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Asset, Direction};
use crate::structs::HexCoord;

/// A market-direction bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PredictionIntent {
    /// Asset the bet is on.
    pub asset: Asset,
    /// Predicted direction.
    pub direction: Direction,
    /// Percentage of current HP at stake. Clamped to the configured range.
    pub stake_percent: u32,
}

/// An attack on another agent, addressed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AttackIntent {
    /// Name of the target agent.
    pub target_name: String,
    /// HP put at stake. Clamped to the attacker's HP.
    pub stake: u32,
}

/// An alliance request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum AllianceIntent {
    /// Propose an alliance to the named agent.
    Propose {
        /// Name of the agent to ally with.
        target_name: String,
    },
    /// Break the current alliance.
    Break,
}

/// Everything an agent decides for one epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentActions {
    /// Adjacent tile to move to.
    pub movement: Option<HexCoord>,
    /// Market bet.
    pub prediction: Option<PredictionIntent>,
    /// Attack on another agent.
    pub attack: Option<AttackIntent>,
    /// Whether the agent defends this epoch.
    pub defend: bool,
    /// Whether the agent activates its class skill.
    pub use_skill: bool,
    /// Alliance request.
    pub alliance: Option<AllianceIntent>,
    /// Free-form reasoning for spectators.
    pub reasoning: String,
}

impl AgentActions {
    /// The action set used when an agent's decision fails: stand still,
    /// bet nothing, fight nobody.
    pub fn fallback(reason: &str) -> Self {
        Self {
            reasoning: format!("[fallback] {reason}"),
            ..Self::default()
        }
    }
}

/// Prices of all tracked assets at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MarketSnapshot {
    /// Price per asset.
    pub prices: BTreeMap<Asset, f64>,
    /// When the prices were sampled.
    pub timestamp: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Price of an asset, if tracked.
    pub fn price(&self, asset: Asset) -> Option<f64> {
        self.prices.get(&asset).copied()
    }
}

/// A one-epoch sponsor effect for a single agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SponsorEffect {
    /// HP added before predictions, capped at max HP.
    pub hp_boost: u32,
    /// Defend this epoch without paying the defend cost.
    pub free_defend: bool,
    /// Percentage added to this epoch's attack stake.
    pub attack_boost: u32,
    /// Sponsorship tier label.
    pub tier: String,
    /// External sponsorship reference.
    pub sponsorship_id: String,
    /// Message shown to spectators.
    pub message: Option<String>,
}
