//! Shared type definitions for the Hexarena battle simulation.
//!
//! This crate is the single source of truth for all types that cross crate
//! boundaries or leave the simulation core. Types defined here flow
//! downstream to `TypeScript` via `ts-rs` for the arena dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers for agents, battles and items
//! - [`enums`] -- Enumeration types (tiles, items, classes, phases, status)
//! - [`structs`] -- Hex coordinates, tiles, items, buffs, phases, agent snapshots
//! - [`actions`] -- Agent actions, market snapshots, sponsor effects
//! - [`events`] -- Per-epoch event records, [`EpochResult`] and [`BattleState`]

pub mod actions;
pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use actions::{
    AgentActions, AllianceIntent, AttackIntent, MarketSnapshot, PredictionIntent, SponsorEffect,
};
pub use enums::{
    AgentClass, AllianceEventKind, Asset, BattleStatus, DeathCause, Direction, ItemType,
    MoveRejection, PhaseName, SkillKind, TileType,
};
pub use events::{
    AllianceEvent, BattleState, BleedResult, BuffTick, CombatResult, DefendCost, EpochResult,
    ItemPickup, MoveResult, PhaseTransition, PredictionResult, SkillActivation, SponsorBoost,
    TrapTrigger,
};
pub use ids::{AgentId, BattleId, ItemId};
pub use structs::{
    AgentSnapshot, EliminationRecord, HEX_DIRECTIONS, HexCoord, Item, ItemBuff, PhaseConfig,
    PhaseEntry, SerializedGrid, SerializedTile, SkillState, Tile, WinnerRecord,
};
