//! Sponsor effect feed.
//!
//! Spectators can sponsor agents between epochs. The feed hands the
//! orchestrator this epoch's effects, at most one per agent.

use std::collections::BTreeMap;

use hexarena_types::{AgentId, SponsorEffect};

/// A source of per-epoch sponsor effects.
pub trait SponsorFeed: Send {
    /// Take the effects queued for `epoch`.
    fn take_effects(&mut self, epoch: u64) -> BTreeMap<AgentId, SponsorEffect>;
}

/// A feed with no sponsors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSponsors;

impl SponsorFeed for NoSponsors {
    fn take_effects(&mut self, _epoch: u64) -> BTreeMap<AgentId, SponsorEffect> {
        BTreeMap::new()
    }
}

/// A feed backed by effects queued per epoch.
#[derive(Debug, Clone, Default)]
pub struct QueuedSponsors {
    queued: BTreeMap<u64, BTreeMap<AgentId, SponsorEffect>>,
}

impl QueuedSponsors {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an effect for an agent in a given epoch, replacing any
    /// earlier one for the same agent and epoch.
    pub fn queue(&mut self, epoch: u64, agent: AgentId, effect: SponsorEffect) {
        self.queued.entry(epoch).or_default().insert(agent, effect);
    }
}

impl SponsorFeed for QueuedSponsors {
    fn take_effects(&mut self, epoch: u64) -> BTreeMap<AgentId, SponsorEffect> {
        self.queued.remove(&epoch).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_effects_are_taken_once() {
        let mut feed = QueuedSponsors::new();
        let agent = AgentId::new();
        feed.queue(2, agent, SponsorEffect {
            hp_boost: 100,
            ..SponsorEffect::default()
        });
        assert!(feed.take_effects(1).is_empty());
        assert_eq!(feed.take_effects(2).len(), 1);
        assert!(feed.take_effects(2).is_empty());
    }
}
