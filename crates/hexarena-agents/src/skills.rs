//! Class skills: activation, cooldowns, and per-epoch effects.
//!
//! A skill can be activated only when its cooldown is zero. It is in
//! effect for the epoch it is activated in; the end-of-epoch tick clears
//! the active flag and counts the cooldown down.

use hexarena_types::{SkillKind, SkillState};

/// Epochs a skill stays unavailable after use.
pub const SKILL_COOLDOWN_EPOCHS: u32 = 5;

/// Share of the target's HP drained by [`SkillKind::Siphon`], in percent.
pub const SIPHON_PERCENT: u32 = 10;

/// Whether the skill can be activated now.
pub const fn is_ready(state: &SkillState) -> bool {
    state.cooldown_remaining == 0 && !state.active
}

/// Activate the skill if ready. Returns whether it activated.
pub const fn try_activate(state: &mut SkillState, cooldown: u32) -> bool {
    if !is_ready(state) {
        return false;
    }
    state.active = true;
    state.cooldown_remaining = cooldown;
    true
}

/// End-of-epoch bookkeeping: deactivate and count the cooldown down.
///
/// A skill activated this epoch keeps its full cooldown through this tick,
/// so it stays unavailable for the `cooldown` epochs after the activation
/// epoch and is ready again in the one after that.
pub const fn tick_skill(state: &mut SkillState) {
    if state.active {
        state.active = false;
    } else {
        state.cooldown_remaining = state.cooldown_remaining.saturating_sub(1);
    }
}

/// HP drained from a target by a siphon.
pub const fn siphon_amount(target_hp: u32) -> u32 {
    target_hp.saturating_mul(SIPHON_PERCENT) / 100
}

/// The resolution modifiers granted by an agent's active skill this epoch.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkillEffects {
    /// Attack stake doubled.
    pub double_attack_stake: bool,
    /// Prediction resolves as a win.
    pub force_prediction_win: bool,
    /// No HP loss from predictions or combat.
    pub loss_immunity: bool,
    /// Prediction stake doubled.
    pub double_prediction_stake: bool,
}

impl SkillEffects {
    /// Effects of a skill state, empty unless the skill is active.
    pub const fn of(state: &SkillState) -> Self {
        let mut effects = Self {
            double_attack_stake: false,
            force_prediction_win: false,
            loss_immunity: false,
            double_prediction_stake: false,
        };
        if !state.active {
            return effects;
        }
        match state.kind {
            SkillKind::Berserk => effects.double_attack_stake = true,
            SkillKind::InsiderInfo => effects.force_prediction_win = true,
            SkillKind::Fortify => effects.loss_immunity = true,
            SkillKind::AllIn => effects.double_prediction_stake = true,
            SkillKind::Siphon => {}
        }
        effects
    }
}
