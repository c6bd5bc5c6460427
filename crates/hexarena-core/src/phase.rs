//! Phase scheduling: epoch number to named phase.
//!
//! A battle runs through four phases in order. The window lengths are
//! computed once from the player count at battle start:
//!
//! | Phase       | Base | extra >= 1 | extra >= 2 | extra >= 3 | Combat | Storm ring |
//! |-------------|------|------------|------------|------------|--------|------------|
//! | LOOT        | 3    |            |            | +2         | no     | none       |
//! | HUNT        | 4    | +2         |            |            | yes    | 3          |
//! | BLOOD       | 5    | +2         |            | +2         | yes    | 2          |
//! | FINAL_STAND | 4    |            | +4         |            | yes    | 1          |
//!
//! where `extra = clamp(players, 5, 8) - 5`. Five players get 16 epochs,
//! eight get 28.

use hexarena_types::{PhaseConfig, PhaseEntry, PhaseName, PhaseTransition};
use hexarena_world::storm_ring;

/// Fewest players the schedule is scaled for.
pub const MIN_SCHEDULED_PLAYERS: usize = 5;

/// Most players the schedule is scaled for.
pub const MAX_SCHEDULED_PLAYERS: usize = 8;

const PHASE_ORDER: [PhaseName; 4] = [
    PhaseName::Loot,
    PhaseName::Hunt,
    PhaseName::Blood,
    PhaseName::FinalStand,
];

/// Window lengths in [`PHASE_ORDER`] for a player count.
fn window_lengths(player_count: usize) -> [u64; 4] {
    let extra = player_count.clamp(MIN_SCHEDULED_PLAYERS, MAX_SCHEDULED_PLAYERS)
        .saturating_sub(MIN_SCHEDULED_PLAYERS);
    let (mut loot, mut hunt, mut blood, mut final_stand) = (3_u64, 4_u64, 5_u64, 4_u64);
    if extra >= 1 {
        hunt = hunt.saturating_add(2);
        blood = blood.saturating_add(2);
    }
    if extra >= 2 {
        final_stand = final_stand.saturating_add(4);
    }
    if extra >= 3 {
        loot = loot.saturating_add(2);
        blood = blood.saturating_add(2);
    }
    [loot, hunt, blood, final_stand]
}

/// Compute the phase windows for a battle.
pub fn compute_phase_config(player_count: usize) -> PhaseConfig {
    let lengths = window_lengths(player_count);
    let mut phases = Vec::with_capacity(PHASE_ORDER.len());
    let mut start: u64 = 1;
    for (name, length) in PHASE_ORDER.into_iter().zip(lengths) {
        let end = start.saturating_add(length).saturating_sub(1);
        phases.push(PhaseEntry {
            name,
            start_epoch: start,
            end_epoch: end,
            combat_enabled: name != PhaseName::Loot,
            storm_ring: storm_ring(name),
        });
        start = end.saturating_add(1);
    }
    PhaseConfig {
        phases,
        total_epochs: lengths.iter().sum(),
    }
}

/// The phase containing `epoch`.
///
/// Epochs past the end stay in the final phase. Epoch 0 and earlier
/// resolve to the first phase.
pub fn get_current_phase(epoch: u64, config: &PhaseConfig) -> Option<&PhaseEntry> {
    config
        .phases
        .iter()
        .find(|p| (p.start_epoch..=p.end_epoch).contains(&epoch))
        .or_else(|| {
            let first = config.phases.first()?;
            if epoch < first.start_epoch {
                Some(first)
            } else {
                config.phases.last()
            }
        })
}

/// The phase change between two consecutive epochs, if any.
///
/// Returns `None` on the very first epoch (`previous_epoch == 0`).
pub fn detect_phase_transition(
    previous_epoch: u64,
    current_epoch: u64,
    config: &PhaseConfig,
) -> Option<PhaseTransition> {
    if previous_epoch == 0 {
        return None;
    }
    let from = get_current_phase(previous_epoch, config)?;
    let to = get_current_phase(current_epoch, config)?;
    (from.name != to.name).then(|| PhaseTransition {
        from: from.name,
        to: to.name,
        new_phase: to.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn totals_scale_with_players() {
        assert_eq!(compute_phase_config(5).total_epochs, 16);
        assert_eq!(compute_phase_config(6).total_epochs, 20);
        assert_eq!(compute_phase_config(7).total_epochs, 24);
        assert_eq!(compute_phase_config(8).total_epochs, 28);
    }

    #[test]
    fn player_count_is_clamped() {
        assert_eq!(compute_phase_config(2), compute_phase_config(5));
        assert_eq!(compute_phase_config(20), compute_phase_config(8));
    }

    #[test]
    fn windows_are_contiguous() {
        for players in 5..=8 {
            let config = compute_phase_config(players);
            assert_eq!(config.phases[0].start_epoch, 1);
            for pair in config.phases.windows(2) {
                assert_eq!(pair[1].start_epoch, pair[0].end_epoch.saturating_add(1));
                assert!(pair[0].start_epoch <= pair[0].end_epoch);
            }
            assert_eq!(config.phases.last().unwrap().end_epoch, config.total_epochs);
        }
    }

    #[test]
    fn phase_flags() {
        let config = compute_phase_config(5);
        let loot = &config.phases[0];
        assert!(!loot.combat_enabled);
        assert_eq!(loot.storm_ring, -1);
        let rings: Vec<i32> = config.phases.iter().map(|p| p.storm_ring).collect();
        assert_eq!(rings, vec![-1, 3, 2, 1]);
    }

    #[test]
    fn current_phase_lookup() {
        let config = compute_phase_config(5);
        assert_eq!(get_current_phase(1, &config).unwrap().name, PhaseName::Loot);
        assert_eq!(get_current_phase(3, &config).unwrap().name, PhaseName::Loot);
        assert_eq!(get_current_phase(4, &config).unwrap().name, PhaseName::Hunt);
        assert_eq!(get_current_phase(16, &config).unwrap().name, PhaseName::FinalStand);
        assert_eq!(get_current_phase(99, &config).unwrap().name, PhaseName::FinalStand);
    }

    #[test]
    fn transitions() {
        let config = compute_phase_config(5);
        assert!(detect_phase_transition(0, 1, &config).is_none());
        assert!(detect_phase_transition(1, 2, &config).is_none());
        let t = detect_phase_transition(3, 4, &config).unwrap();
        assert_eq!(t.from, PhaseName::Loot);
        assert_eq!(t.to, PhaseName::Hunt);
        assert_eq!(t.new_phase.start_epoch, 4);
        assert!(detect_phase_transition(16, 17, &config).is_none());
    }
}
