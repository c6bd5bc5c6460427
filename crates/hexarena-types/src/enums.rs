//! Enumeration types for the Hexarena simulation.
//!
//! All enums serialize in `SCREAMING_SNAKE_CASE` so the snapshot consumed
//! by the rendering and transport layers uses the same names as the game
//! rules (`CORNUCOPIA`, `FINAL_STAND`, `BETTING_OPEN`, ...).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Classification of a tile, fixed at grid creation from its distance to
/// the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum TileType {
    /// The center tile and its ring. Initial loot concentrates here.
    Cornucopia,
    /// Interior tiles between the cornucopia and the edge.
    Normal,
    /// The outermost ring. Agents spawn here.
    Edge,
}

/// The kind of an item lying on a tile or granting a buff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum ItemType {
    /// Heals a random amount on pickup.
    Ration,
    /// Boosts attack stakes for a few epochs. Stacks.
    Weapon,
    /// Acts as a free defend for a few epochs.
    Shield,
    /// Damages whoever steps on it. Consumed on trigger.
    Trap,
    /// Forces the next prediction to resolve as a win.
    Oracle,
}

impl ItemType {
    /// All item types in distribution order.
    pub const ALL: [Self; 5] = [
        Self::Ration,
        Self::Weapon,
        Self::Shield,
        Self::Trap,
        Self::Oracle,
    ];
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// The five fixed agent archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum AgentClass {
    /// Aggressive fighter. Skill: [`SkillKind::Berserk`].
    Warrior,
    /// Market specialist. Skill: [`SkillKind::InsiderInfo`].
    Trader,
    /// Defensive endurer. Skill: [`SkillKind::Fortify`].
    Survivor,
    /// Opportunist that feeds on others. Skill: [`SkillKind::Siphon`].
    Parasite,
    /// High-variance bettor. Skill: [`SkillKind::AllIn`].
    Gambler,
}

impl AgentClass {
    /// All classes in roster order.
    pub const ALL: [Self; 5] = [
        Self::Warrior,
        Self::Trader,
        Self::Survivor,
        Self::Parasite,
        Self::Gambler,
    ];

    /// The signature skill of this class.
    pub const fn skill(self) -> SkillKind {
        match self {
            Self::Warrior => SkillKind::Berserk,
            Self::Trader => SkillKind::InsiderInfo,
            Self::Survivor => SkillKind::Fortify,
            Self::Parasite => SkillKind::Siphon,
            Self::Gambler => SkillKind::AllIn,
        }
    }
}

impl core::fmt::Display for AgentClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Warrior => "WARRIOR",
            Self::Trader => "TRADER",
            Self::Survivor => "SURVIVOR",
            Self::Parasite => "PARASITE",
            Self::Gambler => "GAMBLER",
        };
        f.write_str(name)
    }
}

/// Class skills. Each is effective only during the epoch it is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum SkillKind {
    /// Attack stake is multiplied by two.
    Berserk,
    /// The prediction resolves as a win regardless of the market.
    InsiderInfo,
    /// Immune to HP loss from predictions and combat.
    Fortify,
    /// Steals a share of the attack target's HP.
    Siphon,
    /// Prediction stake is multiplied by two.
    AllIn,
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// A tradable asset agents predict on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Asset {
    /// Ether.
    Eth,
    /// Bitcoin.
    Btc,
    /// Solana.
    Sol,
    /// Monad.
    Mon,
}

impl Asset {
    /// All assets.
    pub const ALL: [Self; 4] = [Self::Eth, Self::Btc, Self::Sol, Self::Mon];
}

/// Predicted direction of a price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Direction {
    /// Price goes up.
    Up,
    /// Price goes down.
    Down,
}

// ---------------------------------------------------------------------------
// Battle lifecycle
// ---------------------------------------------------------------------------

/// Name of a battle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum PhaseName {
    /// Opening phase. No combat, no storm.
    Loot,
    /// Combat opens, the storm reaches ring 3.
    Hunt,
    /// The storm reaches ring 2.
    Blood,
    /// The storm reaches ring 1. Only the center tile is safe.
    FinalStand,
}

/// Lifecycle state of a battle.
///
/// Classic flow: `Pending -> BettingOpen -> Active -> Completed`.
/// Multiplayer flow: `Lobby -> Countdown -> Active -> Completed`, with
/// `Lobby`/`Countdown -> Cancelled` as the alternate terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum BattleStatus {
    /// Created, waiting for agents to be spawned.
    Pending,
    /// Agents spawned, spectators may bet.
    BettingOpen,
    /// Multiplayer lobby accepting players.
    Lobby,
    /// Multiplayer lobby locked, counting down to start.
    Countdown,
    /// Epochs are being processed.
    Active,
    /// A winner has been decided.
    Completed,
    /// The lobby was abandoned before the battle started.
    Cancelled,
}

impl BattleStatus {
    /// Whether the battle can no longer change state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl core::fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::BettingOpen => "BETTING_OPEN",
            Self::Lobby => "LOBBY",
            Self::Countdown => "COUNTDOWN",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// What killed an agent. Keys the final-words fallback pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DeathCause {
    /// A lost market prediction.
    Prediction,
    /// An attack or a failed attack.
    Combat,
    /// Passive attrition, including storm damage.
    Bleed,
    /// More than one of the above in the same epoch.
    Multi,
}

impl core::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Prediction => "prediction",
            Self::Combat => "combat",
            Self::Bleed => "bleed",
            Self::Multi => "multi",
        };
        f.write_str(name)
    }
}

/// Why a movement request was not carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum MoveRejection {
    /// The target is outside the grid.
    OutOfBounds,
    /// The target is not adjacent to the current position.
    NotAdjacent,
    /// Another agent already stands on the target.
    Occupied,
    /// Two or more agents requested the same target this epoch.
    Collision,
    /// The agent has no position on the grid.
    NotPlaced,
}

/// Kind of an alliance lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum AllianceEventKind {
    /// Two agents formed an alliance.
    Formed,
    /// One side broke the alliance voluntarily.
    Broken,
    /// One side attacked its ally.
    Betrayed,
    /// The alliance ran out of epochs.
    Expired,
    /// One side was eliminated.
    Dissolved,
}
