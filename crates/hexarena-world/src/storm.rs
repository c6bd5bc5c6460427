//! Storm rings.
//!
//! The storm covers every tile whose distance from the center is at least
//! the phase's storm ring. A negative ring means no storm. Rings shrink
//! phase by phase, pushing survivors toward the cornucopia.

use hexarena_types::{HexCoord, PhaseName};

/// Storm ring for each phase: LOOT has none, then 3, 2, 1.
pub const fn storm_ring(phase: PhaseName) -> i32 {
    match phase {
        PhaseName::Loot => -1,
        PhaseName::Hunt => 3,
        PhaseName::Blood => 2,
        PhaseName::FinalStand => 1,
    }
}

/// Whether a coordinate is inside the storm for the given ring.
pub fn in_storm(coord: HexCoord, ring: i32) -> bool {
    u32::try_from(ring).is_ok_and(|ring| coord.ring() >= ring)
}
