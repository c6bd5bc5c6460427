//! Death causes, kill credit, and fallback final words.
//!
//! During an epoch the orchestrator records every HP loss in a
//! [`DamageLedger`]. When an agent is found dead after bleed, the ledger
//! names the cause (one source, or `multi` for several) and the agent
//! credited with the kill.

use std::collections::BTreeMap;

use hexarena_types::{AgentId, DeathCause};
use rand::Rng;
use rand::seq::IndexedRandom;

/// Where an HP loss came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DamageSource {
    /// A lost prediction.
    Prediction,
    /// An attack, a failed attack, or a defend cost.
    Combat,
    /// Bleed, storm or a trap.
    Environment,
}

impl DamageSource {
    const fn cause(self) -> DeathCause {
        match self {
            Self::Prediction => DeathCause::Prediction,
            Self::Combat => DeathCause::Combat,
            Self::Environment => DeathCause::Bleed,
        }
    }
}

/// Per-epoch record of HP losses.
#[derive(Debug, Clone, Default)]
pub struct DamageLedger {
    sources: BTreeMap<AgentId, Vec<DamageSource>>,
    /// Combat damage per victim, in the order it was dealt.
    combat: BTreeMap<AgentId, Vec<(AgentId, u32)>>,
}

impl DamageLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a loss. Zero amounts are ignored.
    pub fn record(&mut self, victim: AgentId, source: DamageSource, amount: u32) {
        if amount == 0 {
            return;
        }
        let sources = self.sources.entry(victim).or_default();
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    /// Record combat damage dealt by `dealer` to `victim`.
    pub fn record_combat(&mut self, victim: AgentId, dealer: AgentId, amount: u32) {
        if amount == 0 {
            return;
        }
        self.record(victim, DamageSource::Combat, amount);
        let dealt = self.combat.entry(victim).or_default();
        if let Some(entry) = dealt.iter_mut().find(|(id, _)| *id == dealer) {
            entry.1 = entry.1.saturating_add(amount);
        } else {
            dealt.push((dealer, amount));
        }
    }

    /// Cause of death for an agent. Falls back to bleed if nothing was
    /// recorded.
    pub fn cause_of(&self, victim: AgentId) -> DeathCause {
        match self.sources.get(&victim).map(Vec::as_slice) {
            Some([single]) => single.cause(),
            Some([_, _, ..]) => DeathCause::Multi,
            _ => DeathCause::Bleed,
        }
    }

    /// The agent that dealt the most combat damage to `victim` this epoch.
    ///
    /// Ties go to whoever dealt damage first.
    pub fn killer_of(&self, victim: AgentId) -> Option<AgentId> {
        let dealt = self.combat.get(&victim)?;
        let mut best: Option<(AgentId, u32)> = None;
        for &(dealer, amount) in dealt {
            if best.is_none_or(|(_, top)| amount > top) {
                best = Some((dealer, amount));
            }
        }
        best.map(|(id, _)| id)
    }
}

const PREDICTION_WORDS: &[&str] = &[
    "The chart said up. The chart lied.",
    "I should have hedged.",
    "Buy the dip, they said.",
];

const COMBAT_WORDS: &[&str] = &[
    "Well fought. Remember me.",
    "I never saw the blade coming.",
    "Tell them I went down swinging.",
];

const BLEED_WORDS: &[&str] = &[
    "Death by a thousand cuts.",
    "The storm takes us all in the end.",
    "I just ran out of time.",
];

const MULTI_WORDS: &[&str] = &[
    "Everything went wrong at once.",
    "The market, the blade, the storm. All of it.",
    "Nothing left to give.",
];

/// Every canned last line for `cause`.
pub const fn final_words_pool(cause: DeathCause) -> &'static [&'static str] {
    match cause {
        DeathCause::Prediction => PREDICTION_WORDS,
        DeathCause::Combat => COMBAT_WORDS,
        DeathCause::Bleed => BLEED_WORDS,
        DeathCause::Multi => MULTI_WORDS,
    }
}

/// A canned last line for an agent killed by `cause`.
pub fn fallback_final_words(cause: DeathCause, rng: &mut impl Rng) -> &'static str {
    final_words_pool(cause).choose(rng).copied().unwrap_or("...")
}
