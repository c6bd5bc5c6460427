//! Core entity structs: hex coordinates, tiles, items, buffs, phases and
//! agent snapshots.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AgentClass, DeathCause, ItemType, PhaseName, SkillKind, TileType};
use crate::ids::{AgentId, ItemId};

// ---------------------------------------------------------------------------
// Hex coordinates
// ---------------------------------------------------------------------------

/// Axial offsets of the six neighbors of a hex, clockwise from east.
pub const HEX_DIRECTIONS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Axial hex coordinate `(q, r)`. The third cube coordinate `s = -q - r`
/// is derived on demand.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct HexCoord {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

impl HexCoord {
    /// The arena center.
    pub const ORIGIN: Self = Self { q: 0, r: 0 };

    /// Create a coordinate from its axial components.
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The derived cube coordinate `s = -q - r`.
    pub const fn s(self) -> i32 {
        self.q.saturating_neg().saturating_sub(self.r)
    }

    /// Hex distance: `max(|dq|, |dr|, |ds|)`.
    pub const fn distance(self, other: Self) -> u32 {
        let dq = self.q.abs_diff(other.q);
        let dr = self.r.abs_diff(other.r);
        let ds = self.s().abs_diff(other.s());
        let max_qr = if dq > dr { dq } else { dr };
        if max_qr > ds { max_qr } else { ds }
    }

    /// Distance from the arena center.
    pub const fn ring(self) -> u32 {
        self.distance(Self::ORIGIN)
    }

    /// The six neighboring coordinates, whether or not they lie on a grid.
    pub fn neighbors(self) -> [Self; 6] {
        HEX_DIRECTIONS.map(|(dq, dr)| Self {
            q: self.q.saturating_add(dq),
            r: self.r.saturating_add(dr),
        })
    }

    /// The `"q,r"` key used by serialized grids.
    pub fn key(self) -> String {
        format!("{},{}", self.q, self.r)
    }
}

impl core::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

// ---------------------------------------------------------------------------
// Tiles and items
// ---------------------------------------------------------------------------

/// An item lying on a tile until it is picked up or triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Item {
    /// Item identifier.
    pub id: ItemId,
    /// What the item does.
    pub item_type: ItemType,
    /// Where the item lies.
    pub coord: HexCoord,
    /// Epoch the item appeared in (0 for cornucopia seeding).
    pub spawned_at_epoch: u64,
    /// Whether the item was seeded on the cornucopia at battle start.
    pub is_cornucopia: bool,
}

/// A single hex tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tile {
    /// Position of the tile.
    pub coord: HexCoord,
    /// Classification, fixed for the grid's lifetime.
    pub tile_type: TileType,
    /// Loot value level in `1..=4`, fixed for the grid's lifetime.
    pub level: u8,
    /// The agent standing on the tile, if any.
    pub occupant_id: Option<AgentId>,
    /// Items lying on the tile.
    pub items: Vec<Item>,
}

/// A tile in the serialized grid, keyed by its `"q,r"` coordinate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SerializedTile {
    /// Coordinate key, `"q,r"`.
    pub key: String,
    /// Tile classification.
    pub tile_type: TileType,
    /// Tile level.
    pub level: u8,
    /// Occupying agent.
    pub occupant_id: Option<AgentId>,
    /// Items on the tile.
    pub items: Vec<Item>,
}

/// Wire form of a grid, ordered by coordinate key for stable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SerializedGrid {
    /// Grid radius.
    pub radius: u32,
    /// Every tile of the grid.
    pub tiles: Vec<SerializedTile>,
}

/// A timed modifier granted by an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ItemBuff {
    /// The item kind that granted the buff.
    pub buff_type: ItemType,
    /// Epochs left before the buff is evicted.
    pub remaining_epochs: u32,
    /// The item that granted the buff.
    pub source_item_id: ItemId,
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// One phase window of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PhaseEntry {
    /// Phase name.
    pub name: PhaseName,
    /// First epoch of the window (inclusive).
    pub start_epoch: u64,
    /// Last epoch of the window (inclusive).
    pub end_epoch: u64,
    /// Whether attacks resolve during this phase.
    pub combat_enabled: bool,
    /// Tiles at or beyond this ring are storm tiles. `-1` disables the storm.
    pub storm_ring: i32,
}

/// Phase windows for a battle, computed once at battle start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PhaseConfig {
    /// Contiguous windows in order.
    pub phases: Vec<PhaseEntry>,
    /// Sum of all window lengths.
    pub total_epochs: u64,
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Skill state of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SkillState {
    /// The class skill.
    pub kind: SkillKind,
    /// Epochs until the skill can be used again.
    pub cooldown_remaining: u32,
    /// Whether the skill is in effect this epoch.
    pub active: bool,
}

/// Serializable view of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentSnapshot {
    /// Agent identifier.
    pub id: AgentId,
    /// Display name, unique within the battle.
    pub name: String,
    /// Archetype.
    pub class: AgentClass,
    /// Current HP.
    pub hp: u32,
    /// HP ceiling.
    pub max_hp: u32,
    /// Whether the agent is still in the battle.
    pub is_alive: bool,
    /// Current tile, if placed.
    pub position: Option<HexCoord>,
    /// Agents this agent has eliminated.
    pub kills: u32,
    /// Epochs survived so far.
    pub epochs_survived: u64,
    /// Skill state.
    pub skill: SkillState,
    /// Current ally, if any.
    pub ally_id: Option<AgentId>,
    /// Epochs left on the current alliance.
    pub alliance_epochs_remaining: u32,
    /// Active item buffs.
    pub buffs: Vec<ItemBuff>,
}

/// One elimination. Written exactly once per agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EliminationRecord {
    /// The eliminated agent.
    pub agent_id: AgentId,
    /// Its name.
    pub agent_name: String,
    /// Its class.
    pub class: AgentClass,
    /// Epoch of the elimination.
    pub epoch: u64,
    /// What killed it.
    pub cause: DeathCause,
    /// The agent credited with the kill, if any.
    pub killer_id: Option<AgentId>,
    /// Flavor text.
    pub final_words: String,
    /// Finishing place (1 is the winner, so eliminations start at 2).
    pub placement: u32,
}

/// The battle's winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WinnerRecord {
    /// Winning agent.
    pub agent_id: AgentId,
    /// Its name.
    pub agent_name: String,
    /// Its class.
    pub class: AgentClass,
    /// HP at the end of the battle.
    pub hp: u32,
    /// Kill count.
    pub kills: u32,
}
