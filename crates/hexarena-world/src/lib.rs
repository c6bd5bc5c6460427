//! Hex grid, storm rings, and loot for the Hexarena battle simulation.
//!
//! This crate models the physical arena: a hexagonal grid of tiles in
//! axial coordinates, the phase-dependent storm that shrinks the safe
//! interior, and the items that spawn on empty tiles.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid decoding.
//! - [`grid`] -- The immutable [`Grid`]: classification, adjacency, BFS
//!   pathfinding, occupancy and item mutations, storm queries, and the
//!   `"q,r"`-keyed wire form.
//! - [`items`] -- Weighted item spawning, cornucopia seeding, pickups,
//!   traps and timed buffs.
//! - [`storm`] -- Storm ring per phase.

pub mod error;
pub mod grid;
pub mod items;
pub mod storm;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use grid::{Grid, MAX_GRID_RADIUS, deserialize_grid, parse_key, serialize_grid};
pub use items::{
    ItemConfig, ItemIdAllocator, PickupOutcome, buff_count, check_traps, has_buff, pickup_item,
    spawn_cornucopia_items, spawn_items, tick_item_buffs,
};
pub use storm::{in_storm, storm_ring};
