//! Market prediction resolution.
//!
//! Pure: resolving never touches agent state. Stakes arrive as absolute
//! HP amounts already clamped by the caller; the resolver only compares
//! the predicted direction with the sign of the price change.

use hexarena_types::{AgentId, Asset, Direction, MarketSnapshot, PredictionResult};

/// Changes smaller than this many percent count as a flat market.
pub const FLAT_THRESHOLD_PERCENT: f64 = 0.01;

/// A prediction ready for resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionInput {
    /// Predicting agent.
    pub agent_id: AgentId,
    /// Asset bet on.
    pub asset: Asset,
    /// Predicted direction.
    pub direction: Direction,
    /// Absolute HP at stake.
    pub stake: u32,
}

/// Modifiers applied on top of a resolved prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictionModifiers {
    /// The prediction resolves as a win regardless of the market.
    pub force_win: bool,
    /// Losses are cancelled.
    pub loss_immunity: bool,
}

/// Percentage change between two prices. Zero if the previous price is
/// not positive.
pub fn change_percent(previous: f64, current: f64) -> f64 {
    if previous <= 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Convert a stake percentage into absolute HP.
///
/// The percentage is clamped to `[min_percent, max_percent]`, and the
/// result never exceeds `hp`.
pub fn stake_from_percent(hp: u32, percent: u32, min_percent: u32, max_percent: u32) -> u32 {
    let percent = percent.clamp(min_percent.min(max_percent), max_percent);
    let stake = u64::from(hp).saturating_mul(u64::from(percent)) / 100;
    u32::try_from(stake).unwrap_or(hp).min(hp)
}

/// Resolve a batch of predictions against two market snapshots.
///
/// An asset missing from either snapshot resolves as flat.
pub fn resolve_predictions(
    predictions: &[PredictionInput],
    current: &MarketSnapshot,
    previous: &MarketSnapshot,
) -> Vec<PredictionResult> {
    predictions
        .iter()
        .map(|p| {
            let change = match (previous.price(p.asset), current.price(p.asset)) {
                (Some(prev), Some(curr)) => change_percent(prev, curr),
                _ => 0.0,
            };
            let flat = change.abs() < FLAT_THRESHOLD_PERCENT;
            let correct = !flat
                && match p.direction {
                    Direction::Up => change > 0.0,
                    Direction::Down => change < 0.0,
                };
            let hp_change = if flat {
                0
            } else if correct {
                i64::from(p.stake)
            } else {
                -i64::from(p.stake)
            };
            PredictionResult {
                agent_id: p.agent_id,
                asset: p.asset,
                direction: p.direction,
                stake: p.stake,
                change_percent: change,
                correct,
                flat,
                hp_change,
            }
        })
        .collect()
}

/// Apply skill and item modifiers to a resolved prediction.
///
/// A forced win pays the full stake even on a flat market.
pub fn apply_modifiers(
    mut result: PredictionResult,
    modifiers: PredictionModifiers,
) -> PredictionResult {
    if modifiers.force_win {
        result.correct = true;
        result.hp_change = i64::from(result.stake);
    }
    if modifiers.loss_immunity && result.hp_change < 0 {
        result.hp_change = 0;
    }
    result
}
