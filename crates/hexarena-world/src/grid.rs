//! The hexagonal arena grid.
//!
//! A [`Grid`] is a flat array of [`Tile`]s indexed by a coordinate-to-index
//! function over axial coordinates. Tile type and level are pure functions
//! of the distance from the center and never change after creation.
//!
//! Every mutation (`place_agent`, `remove_agent`, `move_agent`, `add_item`,
//! `remove_item`) takes `&self` and returns a new grid, so the previous
//! epoch's grid stays intact for diffing. Mutations do not validate game
//! rules: callers check vacancy and adjacency before moving agents.
//!
//! Queries never fail. Coordinates outside the grid yield `None`, `false`
//! or an empty collection.

use std::collections::{BTreeMap, VecDeque};

use hexarena_types::{
    AgentId, HexCoord, Item, ItemId, PhaseName, SerializedGrid, SerializedTile, Tile, TileType,
};

use crate::error::WorldError;
use crate::storm;

/// Largest radius a grid may have.
pub const MAX_GRID_RADIUS: u32 = 64;

/// Classify a tile by its distance from the center.
///
/// Rings 0 and 1 are the cornucopia (levels 4 and 3), the outermost ring is
/// the edge (level 1), everything between is normal (level 2).
pub const fn classify(distance: u32, radius: u32) -> (TileType, u8) {
    match distance {
        0 => (TileType::Cornucopia, 4),
        1 => (TileType::Cornucopia, 3),
        d if d >= radius => (TileType::Edge, 1),
        _ => (TileType::Normal, 2),
    }
}

/// The arena grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// Maximum distance from the center.
    radius: u32,
    /// Tiles in `(q, r)` order.
    tiles: Vec<Tile>,
    /// Index of the first tile of each `q` column, offset by `radius`.
    column_offsets: Vec<usize>,
}

impl Grid {
    /// Create a grid of the given radius with no occupants and no items.
    ///
    /// Radii above [`MAX_GRID_RADIUS`] are clamped.
    pub fn new(radius: u32) -> Self {
        let radius = radius.min(MAX_GRID_RADIUS);
        let r = i32::try_from(radius).unwrap_or(0);

        let mut tiles = Vec::new();
        let mut column_offsets = Vec::new();
        for q in -r..=r {
            column_offsets.push(tiles.len());
            let (r_min, r_max) = column_bounds(q, r);
            for row in r_min..=r_max {
                let coord = HexCoord::new(q, row);
                let (tile_type, level) = classify(coord.ring(), radius);
                tiles.push(Tile {
                    coord,
                    tile_type,
                    level,
                    occupant_id: None,
                    items: Vec::new(),
                });
            }
        }

        Self {
            radius,
            tiles,
            column_offsets,
        }
    }

    /// The grid radius.
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Number of tiles (`3r² + 3r + 1`).
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Iterate over all tiles in `(q, r)` order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Whether the coordinate lies on the grid.
    pub fn contains(&self, coord: HexCoord) -> bool {
        self.index_of(coord).is_some()
    }

    /// Look up a tile.
    pub fn tile(&self, coord: HexCoord) -> Option<&Tile> {
        self.index_of(coord).and_then(|i| self.tiles.get(i))
    }

    /// The agent standing on a tile.
    pub fn occupant(&self, coord: HexCoord) -> Option<AgentId> {
        self.tile(coord).and_then(|t| t.occupant_id)
    }

    /// Where an agent currently stands.
    pub fn position_of(&self, agent: AgentId) -> Option<HexCoord> {
        self.tiles
            .iter()
            .find(|t| t.occupant_id == Some(agent))
            .map(|t| t.coord)
    }

    /// On-grid neighbors of a coordinate.
    pub fn neighbors(&self, coord: HexCoord) -> Vec<HexCoord> {
        if !self.contains(coord) {
            return Vec::new();
        }
        coord
            .neighbors()
            .into_iter()
            .filter(|n| self.contains(*n))
            .collect()
    }

    /// Whether two coordinates are exactly one step apart.
    pub const fn is_adjacent(a: HexCoord, b: HexCoord) -> bool {
        a.distance(b) == 1
    }

    /// Hex distance between two coordinates.
    pub const fn distance(a: HexCoord, b: HexCoord) -> u32 {
        a.distance(b)
    }

    /// Breadth-first shortest path from `start` to `end`, both inclusive.
    ///
    /// With `avoid_occupied`, tiles holding an agent are not traversed,
    /// except `end` itself. Returns `None` when either endpoint is off the
    /// grid or no path exists.
    pub fn find_path(
        &self,
        start: HexCoord,
        end: HexCoord,
        avoid_occupied: bool,
    ) -> Option<Vec<HexCoord>> {
        if !self.contains(start) || !self.contains(end) {
            return None;
        }
        if start == end {
            return Some(vec![start]);
        }

        let mut prev: BTreeMap<HexCoord, HexCoord> = BTreeMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);

        'search: while let Some(current) = queue.pop_front() {
            for next in self.neighbors(current) {
                if next == start || prev.contains_key(&next) {
                    continue;
                }
                if avoid_occupied && next != end && self.occupant(next).is_some() {
                    continue;
                }
                prev.insert(next, current);
                if next == end {
                    break 'search;
                }
                queue.push_back(next);
            }
        }

        if !prev.contains_key(&end) {
            return None;
        }

        let mut path = VecDeque::new();
        let mut current = end;
        path.push_front(current);
        while let Some(&predecessor) = prev.get(&current) {
            path.push_front(predecessor);
            current = predecessor;
            if current == start {
                break;
            }
        }
        Some(path.into_iter().collect())
    }

    // -------------------------------------------------------------------
    // Mutations (each returns a new grid)
    // -------------------------------------------------------------------

    /// Put an agent on a tile, replacing any occupant.
    #[must_use]
    pub fn place_agent(&self, agent: AgentId, coord: HexCoord) -> Self {
        self.with_tile(coord, |tile| tile.occupant_id = Some(agent))
    }

    /// Clear every tile the agent occupies.
    #[must_use]
    pub fn remove_agent(&self, agent: AgentId) -> Self {
        let mut next = self.clone();
        for tile in &mut next.tiles {
            if tile.occupant_id == Some(agent) {
                tile.occupant_id = None;
            }
        }
        next
    }

    /// Move an agent from `from` to `to`.
    ///
    /// The source tile is cleared and the destination gets the agent. If
    /// either coordinate is off the grid the grid is returned unchanged.
    #[must_use]
    pub fn move_agent(&self, agent: AgentId, from: HexCoord, to: HexCoord) -> Self {
        if !self.contains(from) || !self.contains(to) {
            return self.clone();
        }
        self.with_tile(from, |tile| tile.occupant_id = None)
            .with_tile(to, |tile| tile.occupant_id = Some(agent))
    }

    /// Add an item to the tile at `item.coord`.
    #[must_use]
    pub fn add_item(&self, item: Item) -> Self {
        let coord = item.coord;
        self.with_tile(coord, move |tile| tile.items.push(item))
    }

    /// Remove an item from a tile.
    #[must_use]
    pub fn remove_item(&self, coord: HexCoord, item: ItemId) -> Self {
        self.with_tile(coord, |tile| tile.items.retain(|i| i.id != item))
    }

    // -------------------------------------------------------------------
    // Storm and spawn queries
    // -------------------------------------------------------------------

    /// Tiles covered by the storm during `phase`.
    pub fn storm_tiles(&self, phase: PhaseName) -> Vec<HexCoord> {
        self.tiles
            .iter()
            .map(|t| t.coord)
            .filter(|c| storm::in_storm(*c, storm::storm_ring(phase)))
            .collect()
    }

    /// Whether a coordinate is a storm tile during `phase`. Off-grid
    /// coordinates are never storm tiles.
    pub fn is_storm_tile(&self, coord: HexCoord, phase: PhaseName) -> bool {
        self.contains(coord) && storm::in_storm(coord, storm::storm_ring(phase))
    }

    /// Tiles outside the storm during `phase`.
    pub fn safe_tiles(&self, phase: PhaseName) -> Vec<HexCoord> {
        self.tiles
            .iter()
            .map(|t| t.coord)
            .filter(|c| !storm::in_storm(*c, storm::storm_ring(phase)))
            .collect()
    }

    /// The outermost ring, lowest level. Spawn candidates.
    pub fn outer_ring_tiles(&self) -> Vec<HexCoord> {
        self.tiles
            .iter()
            .filter(|t| t.coord.ring() == self.radius)
            .map(|t| t.coord)
            .collect()
    }

    /// Coordinates of all tiles of a given type.
    pub fn tiles_of_type(&self, tile_type: TileType) -> Vec<HexCoord> {
        self.tiles
            .iter()
            .filter(|t| t.tile_type == tile_type)
            .map(|t| t.coord)
            .collect()
    }

    /// The candidate nearest to `from`; the first one wins ties.
    pub fn closest_to(from: HexCoord, candidates: &[HexCoord]) -> Option<HexCoord> {
        candidates.iter().copied().min_by_key(|c| from.distance(*c))
    }

    /// The nearest tile holding at least one item.
    pub fn find_nearest_item_tile(&self, from: HexCoord) -> Option<HexCoord> {
        let stocked: Vec<HexCoord> = self
            .tiles
            .iter()
            .filter(|t| !t.items.is_empty())
            .map(|t| t.coord)
            .collect();
        Self::closest_to(from, &stocked)
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn index_of(&self, coord: HexCoord) -> Option<usize> {
        if coord.ring() > self.radius {
            return None;
        }
        let r = i32::try_from(self.radius).ok()?;
        let column = usize::try_from(coord.q.checked_add(r)?).ok()?;
        let offset = *self.column_offsets.get(column)?;
        let (r_min, _) = column_bounds(coord.q, r);
        let row = usize::try_from(coord.r.checked_sub(r_min)?).ok()?;
        offset.checked_add(row)
    }

    fn with_tile(&self, coord: HexCoord, f: impl FnOnce(&mut Tile)) -> Self {
        let mut next = self.clone();
        if let Some(tile) = next.index_of(coord).and_then(|i| next.tiles.get_mut(i)) {
            f(tile);
        }
        next
    }
}

/// Row bounds `(r_min, r_max)` of column `q` in a grid of radius `r`.
fn column_bounds(q: i32, r: i32) -> (i32, i32) {
    let neg_r = r.saturating_neg();
    let r_min = neg_r.max(neg_r.saturating_sub(q));
    let r_max = r.min(r.saturating_sub(q));
    (r_min, r_max)
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Parse a `"q,r"` coordinate key.
pub fn parse_key(key: &str) -> Result<HexCoord, WorldError> {
    let malformed = || WorldError::MalformedKey(key.to_owned());
    let (q, r) = key.split_once(',').ok_or_else(malformed)?;
    let q = q.trim().parse::<i32>().map_err(|_err| malformed())?;
    let r = r.trim().parse::<i32>().map_err(|_err| malformed())?;
    Ok(HexCoord::new(q, r))
}

/// Convert a grid to its wire form, tiles in `(q, r)` order.
pub fn serialize_grid(grid: &Grid) -> SerializedGrid {
    SerializedGrid {
        radius: grid.radius,
        tiles: grid
            .tiles
            .iter()
            .map(|t| SerializedTile {
                key: t.coord.key(),
                tile_type: t.tile_type,
                level: t.level,
                occupant_id: t.occupant_id,
                items: t.items.clone(),
            })
            .collect(),
    }
}

/// Rebuild a grid from its wire form.
///
/// Type and level are recomputed from the coordinate; occupants and items
/// are restored. Tiles missing from the input come back empty.
pub fn deserialize_grid(data: &SerializedGrid) -> Result<Grid, WorldError> {
    if data.radius > MAX_GRID_RADIUS {
        return Err(WorldError::RadiusTooLarge(data.radius));
    }
    let mut grid = Grid::new(data.radius);
    for st in &data.tiles {
        let coord = parse_key(&st.key)?;
        let Some(tile) = grid.index_of(coord).and_then(|i| grid.tiles.get_mut(i)) else {
            return Err(WorldError::OutOfBounds {
                coord,
                radius: data.radius,
            });
        };
        tile.occupant_id = st.occupant_id;
        tile.items.clone_from(&st.items);
    }
    Ok(grid)
}
