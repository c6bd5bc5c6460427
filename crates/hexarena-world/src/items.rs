//! Loot: item spawning, pickups, traps, and timed buffs.
//!
//! # Spawn distributions
//!
//! | Item   | Epoch spawn | Cornucopia |
//! |--------|-------------|------------|
//! | Ration | 40%         | 15%        |
//! | Weapon | 25%         | 35%        |
//! | Shield | 20%         | 35%        |
//! | Trap   | 10%         | 5%         |
//! | Oracle | 5%          | 10%        |
//!
//! The cornucopia table favors weapons and shields to force early contested
//! fights, and keeps traps rare so the first movers are not punished.
//!
//! Items never spawn on occupied tiles or on tiles that already hold an
//! item. Item ids come from an [`ItemIdAllocator`] owned by the battle, so
//! spawning is reproducible under a seeded RNG.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use hexarena_types::{
    AgentId, BuffTick, HexCoord, Item, ItemBuff, ItemId, ItemType, TileType, TrapTrigger,
};

use crate::grid::Grid;

/// Weighted entries for the per-epoch spawn roll.
pub const EPOCH_SPAWN_WEIGHTS: [(ItemType, u32); 5] = [
    (ItemType::Ration, 40),
    (ItemType::Weapon, 25),
    (ItemType::Shield, 20),
    (ItemType::Trap, 10),
    (ItemType::Oracle, 5),
];

/// Weighted entries for seeding the cornucopia at battle start.
pub const CORNUCOPIA_WEIGHTS: [(ItemType, u32); 5] = [
    (ItemType::Ration, 15),
    (ItemType::Weapon, 35),
    (ItemType::Shield, 35),
    (ItemType::Trap, 5),
    (ItemType::Oracle, 10),
];

/// Tunables for the loot subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemConfig {
    /// Smallest ration heal.
    pub ration_heal_min: u32,
    /// Largest ration heal.
    pub ration_heal_max: u32,
    /// Damage dealt by a trap.
    pub trap_damage: u32,
    /// Fewest items spawned per epoch.
    pub min_spawn: u32,
    /// Most items spawned per epoch.
    pub max_spawn: u32,
    /// Epochs a weapon buff lasts.
    pub weapon_epochs: u32,
    /// Epochs a shield buff lasts.
    pub shield_epochs: u32,
    /// Epochs an oracle buff lasts.
    pub oracle_epochs: u32,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            ration_heal_min: 50,
            ration_heal_max: 150,
            trap_damage: 100,
            min_spawn: 1,
            max_spawn: 3,
            weapon_epochs: 3,
            shield_epochs: 2,
            oracle_epochs: 1,
        }
    }
}

/// Hands out sequential item ids for one battle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemIdAllocator {
    next: u64,
}

impl ItemIdAllocator {
    /// Start allocating from 1.
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next id.
    pub const fn allocate(&mut self) -> ItemId {
        let id = ItemId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Pick an entry from a weight table given a roll in `[0, total)`.
fn select_weighted(table: &[(ItemType, u32)], roll: u32) -> ItemType {
    let mut cumulative: u32 = 0;
    for &(item_type, weight) in table {
        cumulative = cumulative.saturating_add(weight);
        if roll < cumulative {
            return item_type;
        }
    }
    ItemType::Ration
}

/// Roll an item type from a weight table.
pub fn roll_item_type(table: &[(ItemType, u32)], rng: &mut impl Rng) -> ItemType {
    let total = table
        .iter()
        .fold(0_u32, |acc, &(_, weight)| acc.saturating_add(weight));
    if total == 0 {
        return ItemType::Ration;
    }
    select_weighted(table, rng.random_range(0..total))
}

/// Spawn between `min_spawn` and `max_spawn` items on empty tiles.
///
/// A tile is eligible when nobody stands on it and it holds no item.
/// Returns the new grid and the spawned items.
pub fn spawn_items(
    grid: &Grid,
    epoch: u64,
    config: &ItemConfig,
    ids: &mut ItemIdAllocator,
    rng: &mut impl Rng,
) -> (Grid, Vec<Item>) {
    let mut candidates: Vec<HexCoord> = grid
        .tiles()
        .filter(|t| t.occupant_id.is_none() && t.items.is_empty())
        .map(|t| t.coord)
        .collect();
    candidates.shuffle(rng);

    let low = config.min_spawn.min(config.max_spawn);
    let count = rng.random_range(low..=config.max_spawn);
    let count = usize::try_from(count).unwrap_or(0);

    let mut next = grid.clone();
    let mut spawned = Vec::new();
    for coord in candidates.into_iter().take(count) {
        let item = Item {
            id: ids.allocate(),
            item_type: roll_item_type(&EPOCH_SPAWN_WEIGHTS, rng),
            coord,
            spawned_at_epoch: epoch,
            is_cornucopia: false,
        };
        next = next.add_item(item.clone());
        spawned.push(item);
    }

    debug!(epoch, count = spawned.len(), "Items spawned");
    (next, spawned)
}

/// Seed one item on every vacant cornucopia tile at battle start.
///
/// On small grids the spawn ring overlaps the cornucopia; tiles already
/// holding an agent stay empty.
pub fn spawn_cornucopia_items(
    grid: &Grid,
    ids: &mut ItemIdAllocator,
    rng: &mut impl Rng,
) -> (Grid, Vec<Item>) {
    let mut next = grid.clone();
    let mut spawned = Vec::new();
    for coord in grid
        .tiles_of_type(TileType::Cornucopia)
        .into_iter()
        .filter(|c| grid.occupant(*c).is_none())
    {
        let item = Item {
            id: ids.allocate(),
            item_type: roll_item_type(&CORNUCOPIA_WEIGHTS, rng),
            coord,
            spawned_at_epoch: 0,
            is_cornucopia: true,
        };
        next = next.add_item(item.clone());
        spawned.push(item);
    }
    (next, spawned)
}

/// The effect of picking up one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupOutcome {
    /// Instant HP change, already clamped to `[0, max_hp]`.
    pub hp_change: i64,
    /// Buff to attach to the agent.
    pub buff: Option<ItemBuff>,
}

/// Resolve a pickup.
///
/// Rations heal a uniform amount in the configured range, capped at the
/// missing HP. Weapons, shields and oracles grant a timed buff. A trap
/// reached through this path still deals its damage, capped at current HP.
pub fn pickup_item(
    item: &Item,
    hp: u32,
    max_hp: u32,
    config: &ItemConfig,
    rng: &mut impl Rng,
) -> PickupOutcome {
    let buff = |epochs: u32| {
        Some(ItemBuff {
            buff_type: item.item_type,
            remaining_epochs: epochs,
            source_item_id: item.id,
        })
    };

    match item.item_type {
        ItemType::Ration => {
            let low = config.ration_heal_min.min(config.ration_heal_max);
            let roll = rng.random_range(low..=config.ration_heal_max);
            let heal = roll.min(max_hp.saturating_sub(hp));
            PickupOutcome {
                hp_change: i64::from(heal),
                buff: None,
            }
        }
        ItemType::Weapon => PickupOutcome {
            hp_change: 0,
            buff: buff(config.weapon_epochs),
        },
        ItemType::Shield => PickupOutcome {
            hp_change: 0,
            buff: buff(config.shield_epochs),
        },
        ItemType::Oracle => PickupOutcome {
            hp_change: 0,
            buff: buff(config.oracle_epochs),
        },
        ItemType::Trap => PickupOutcome {
            hp_change: -i64::from(config.trap_damage.min(hp)),
            buff: None,
        },
    }
}

/// Fire every trap on the tile an agent just entered.
///
/// Each trap is removed from the grid as it fires, so it can only fire
/// once. Damage is reported uncapped; the caller clamps HP.
pub fn check_traps(
    grid: &Grid,
    agent: AgentId,
    coord: HexCoord,
    config: &ItemConfig,
) -> (Grid, Vec<TrapTrigger>) {
    let traps: Vec<ItemId> = grid
        .tile(coord)
        .map(|t| {
            t.items
                .iter()
                .filter(|i| i.item_type == ItemType::Trap)
                .map(|i| i.id)
                .collect()
        })
        .unwrap_or_default();

    let mut next = grid.clone();
    let mut triggers = Vec::new();
    for item_id in traps {
        next = next.remove_item(coord, item_id);
        triggers.push(TrapTrigger {
            agent_id: agent,
            item_id,
            coord,
            damage: config.trap_damage,
        });
    }
    (next, triggers)
}

/// Decrement every buff by one epoch and evict the expired ones.
///
/// Pure: the input is not modified. Agents whose buffs all expire are
/// dropped from the returned map.
pub fn tick_item_buffs(
    buffs: &BTreeMap<AgentId, Vec<ItemBuff>>,
) -> (BTreeMap<AgentId, Vec<ItemBuff>>, Vec<BuffTick>) {
    let mut next = BTreeMap::new();
    let mut ticks = Vec::new();

    for (&agent_id, agent_buffs) in buffs {
        let mut kept = Vec::new();
        for buff in agent_buffs {
            let remaining = buff.remaining_epochs.saturating_sub(1);
            let expired = remaining == 0;
            ticks.push(BuffTick {
                agent_id,
                buff_type: buff.buff_type,
                remaining_epochs: remaining,
                expired,
            });
            if !expired {
                kept.push(ItemBuff {
                    remaining_epochs: remaining,
                    ..buff.clone()
                });
            }
        }
        if !kept.is_empty() {
            next.insert(agent_id, kept);
        }
    }

    (next, ticks)
}

/// Number of active buffs of a type.
pub fn buff_count(buffs: &[ItemBuff], buff_type: ItemType) -> u32 {
    let count = buffs
        .iter()
        .filter(|b| b.buff_type == buff_type && b.remaining_epochs > 0)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Whether at least one buff of a type is active.
pub fn has_buff(buffs: &[ItemBuff], buff_type: ItemType) -> bool {
    buff_count(buffs, buff_type) > 0
}
