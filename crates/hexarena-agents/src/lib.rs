//! Agent state, classes, and per-epoch resolvers for the Hexarena battle
//! simulation.
//!
//! This crate contains the logic layer for agents: everything that
//! operates on agent state without touching I/O or scheduling. It sits
//! between `hexarena-types`/`hexarena-world` and the orchestration in
//! `hexarena-core`.
//!
//! # Modules
//!
//! - [`agent`] -- [`ArenaAgent`] state and the battle [`Roster`]
//! - [`alliance`] -- Pact formation, breaking, betrayal and expiry
//! - [`combat`] -- Attack, defend and bleed resolution
//! - [`death`] -- Cause attribution, kill credit, fallback final words
//! - [`error`] -- Error types for roster operations ([`AgentError`])
//! - [`prediction`] -- Market prediction resolution
//! - [`skills`] -- Skill activation, cooldowns and effects
//! - [`strategy`] -- Scripted per-class decision strategies

pub mod agent;
pub mod alliance;
pub mod combat;
pub mod death;
pub mod error;
pub mod prediction;
pub mod skills;
pub mod strategy;

// Re-export primary types at crate root for convenience.
pub use agent::{ArenaAgent, DEFAULT_MAX_HP, MAX_AGENTS, Roster};
pub use combat::{
    Attack, BleedInput, CombatResolution, Combatant, StakeModifiers, apply_bleed, bleed_amount,
    effective_attack_stake, resolve_combat,
};
pub use death::{DamageLedger, DamageSource, fallback_final_words, final_words_pool};
pub use error::AgentError;
pub use prediction::{
    PredictionInput, PredictionModifiers, apply_modifiers, resolve_predictions, stake_from_percent,
};
pub use skills::{SKILL_COOLDOWN_EPOCHS, SkillEffects};
pub use strategy::{ArenaView, scripted_actions};
