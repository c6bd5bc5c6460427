//! Phase scheduling, battle lifecycle, and the epoch orchestrator for the
//! Hexarena battle simulation.
//!
//! # Modules
//!
//! - [`arena`] -- [`Battle`] state machine, spawning, eliminations, and
//!   winner selection.
//! - [`config`] -- Configuration loading from `hexarena-config.yaml`.
//! - [`decision`] -- [`DecisionSource`] trait, [`StubDecisionSource`], and
//!   [`ScriptedDecisionSource`].
//! - [`epoch`] -- [`process_epoch`], the fixed-order epoch pipeline.
//! - [`final_words`] -- Last-words generator trait.
//! - [`market`] -- [`MarketSource`] trait and [`StaticMarket`].
//! - [`phase`] -- Phase windows scaled by player count.
//! - [`runner`] -- [`run_battle`], the multi-epoch loop.
//! - [`sponsor`] -- Per-epoch sponsor effect feeds.
//!
//! [`Battle`]: arena::Battle
//! [`DecisionSource`]: decision::DecisionSource
//! [`StubDecisionSource`]: decision::StubDecisionSource
//! [`ScriptedDecisionSource`]: decision::ScriptedDecisionSource
//! [`process_epoch`]: epoch::process_epoch
//! [`MarketSource`]: market::MarketSource
//! [`StaticMarket`]: market::StaticMarket
//! [`run_battle`]: runner::run_battle

pub mod arena;
pub mod config;
pub mod decision;
pub mod epoch;
pub mod final_words;
pub mod market;
pub mod phase;
pub mod runner;
pub mod sponsor;
