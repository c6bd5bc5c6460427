//! Per-epoch event records and the snapshots handed to transport,
//! persistence and rendering layers.
//!
//! [`EpochResult`] and [`BattleState`] are the only contract between the
//! simulation core and the outside world.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::actions::MarketSnapshot;
use crate::enums::{
    AllianceEventKind, Asset, BattleStatus, Direction, ItemType, MoveRejection, PhaseName,
    SkillKind,
};
use crate::ids::{AgentId, BattleId, ItemId};
use crate::structs::{
    AgentSnapshot, EliminationRecord, HexCoord, Item, ItemBuff, PhaseConfig, PhaseEntry,
    SerializedGrid, WinnerRecord,
};

/// Outcome of one movement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MoveResult {
    /// The moving agent.
    pub agent_id: AgentId,
    /// Position before the move.
    pub from: Option<HexCoord>,
    /// Requested target.
    pub to: HexCoord,
    /// Whether the agent now stands on `to`.
    pub success: bool,
    /// Why the move failed.
    pub reason: Option<MoveRejection>,
}

/// An item picked up by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ItemPickup {
    /// The agent.
    pub agent_id: AgentId,
    /// The item.
    pub item_id: ItemId,
    /// Kind of item.
    pub item_type: ItemType,
    /// Where it was picked up.
    pub coord: HexCoord,
    /// Instant HP change.
    pub hp_change: i64,
    /// Buff granted, if any.
    pub buff: Option<ItemBuff>,
}

/// A trap that went off under an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrapTrigger {
    /// The victim.
    pub agent_id: AgentId,
    /// The trap.
    pub item_id: ItemId,
    /// Where it went off.
    pub coord: HexCoord,
    /// HP lost.
    pub damage: u32,
}

/// A buff decremented at the end of an epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BuffTick {
    /// Buff holder.
    pub agent_id: AgentId,
    /// Buff kind.
    pub buff_type: ItemType,
    /// Epochs left after the tick.
    pub remaining_epochs: u32,
    /// Whether the buff was evicted.
    pub expired: bool,
}

/// A sponsor HP boost that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SponsorBoost {
    /// The sponsored agent.
    pub agent_id: AgentId,
    /// Boost requested by the sponsor.
    pub requested: u32,
    /// Boost actually applied after the max HP cap.
    pub applied: u32,
    /// HP after the boost.
    pub hp_after: u32,
    /// Whether a free defend was granted.
    pub free_defend: bool,
    /// Attack stake boost percentage.
    pub attack_boost: u32,
    /// Sponsorship tier.
    pub tier: String,
    /// External sponsorship reference.
    pub sponsorship_id: String,
    /// Spectator message.
    pub message: Option<String>,
}

/// A skill that was activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SkillActivation {
    /// The agent.
    pub agent_id: AgentId,
    /// The skill.
    pub skill: SkillKind,
    /// Target of a targeted skill.
    pub target_id: Option<AgentId>,
    /// HP moved by the skill itself (siphon), from the user's perspective.
    pub hp_change: i64,
}

/// An alliance lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AllianceEvent {
    /// What happened.
    pub kind: AllianceEventKind,
    /// The initiating side (proposer, breaker, betrayer).
    pub agent_a: AgentId,
    /// The other side.
    pub agent_b: AgentId,
    /// Epoch of the event.
    pub epoch: u64,
}

/// Resolution of one market prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PredictionResult {
    /// Predicting agent.
    pub agent_id: AgentId,
    /// Asset bet on.
    pub asset: Asset,
    /// Predicted direction.
    pub direction: Direction,
    /// Absolute HP staked.
    pub stake: u32,
    /// Percentage change of the asset price.
    pub change_percent: f64,
    /// Whether the prediction matched the market.
    pub correct: bool,
    /// Whether the market was flat (no HP change).
    pub flat: bool,
    /// HP delta applied.
    pub hp_change: i64,
}

/// Resolution of one attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CombatResult {
    /// Attacker.
    pub attacker_id: AgentId,
    /// Target.
    pub target_id: AgentId,
    /// Effective stake after clamping and modifiers.
    pub stake: u32,
    /// Whether the target was defending.
    pub defended: bool,
    /// Whether the attacker was allied with the target.
    pub betrayal: bool,
    /// HP delta of the attacker.
    pub attacker_hp_change: i64,
    /// HP delta of the target.
    pub target_hp_change: i64,
}

/// HP paid by a defending agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DefendCost {
    /// Defending agent.
    pub agent_id: AgentId,
    /// HP paid.
    pub cost: u32,
}

/// Passive attrition applied to one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BleedResult {
    /// The agent.
    pub agent_id: AgentId,
    /// HP before attrition.
    pub hp_before: u32,
    /// Bleed damage.
    pub bleed: u32,
    /// Storm damage.
    pub storm_damage: u32,
    /// HP after attrition.
    pub hp_after: u32,
}

/// A phase change detected between two epochs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PhaseTransition {
    /// Phase left.
    pub from: PhaseName,
    /// Phase entered.
    pub to: PhaseName,
    /// The full entry of the new phase.
    pub new_phase: PhaseEntry,
}

/// Everything that happened in one epoch, plus the resulting state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EpochResult {
    /// Battle the epoch belongs to.
    pub battle_id: BattleId,
    /// Epoch number (1-based).
    pub epoch: u64,
    /// Phase the epoch ran in.
    pub phase: PhaseName,
    /// Phase change relative to the previous epoch.
    pub phase_transition: Option<PhaseTransition>,
    /// Market snapshot the predictions resolved against.
    pub market: MarketSnapshot,
    /// Movement outcomes.
    pub moves: Vec<MoveResult>,
    /// Item pickups.
    pub pickups: Vec<ItemPickup>,
    /// Trap triggers.
    pub traps: Vec<TrapTrigger>,
    /// Items spawned this epoch.
    pub spawned_items: Vec<Item>,
    /// Buff decrements.
    pub buff_ticks: Vec<BuffTick>,
    /// Sponsor boosts.
    pub sponsor_boosts: Vec<SponsorBoost>,
    /// Skill activations.
    pub skill_activations: Vec<SkillActivation>,
    /// Alliance events, including expirations.
    pub alliance_events: Vec<AllianceEvent>,
    /// Prediction outcomes.
    pub predictions: Vec<PredictionResult>,
    /// Defend costs paid.
    pub defend_costs: Vec<DefendCost>,
    /// Attack outcomes.
    pub combat: Vec<CombatResult>,
    /// Attrition.
    pub bleed: Vec<BleedResult>,
    /// Agents eliminated this epoch.
    pub deaths: Vec<EliminationRecord>,
    /// Every agent after the epoch.
    pub agents: Vec<AgentSnapshot>,
    /// The grid after the epoch.
    pub grid: SerializedGrid,
    /// Whether the battle is over.
    pub is_complete: bool,
    /// The winner, once decided.
    pub winner: Option<WinnerRecord>,
}

/// Serializable snapshot of a whole battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BattleState {
    /// Battle identifier.
    pub battle_id: BattleId,
    /// Lifecycle state.
    pub status: BattleStatus,
    /// Epochs processed so far.
    pub epoch: u64,
    /// Current phase, once started.
    pub phase: Option<PhaseName>,
    /// Phase windows, once started.
    pub phase_config: Option<PhaseConfig>,
    /// All agents.
    pub agents: Vec<AgentSnapshot>,
    /// The grid.
    pub grid: SerializedGrid,
    /// Eliminations in order.
    pub eliminations: Vec<EliminationRecord>,
    /// The winner, once decided.
    pub winner: Option<WinnerRecord>,
}
