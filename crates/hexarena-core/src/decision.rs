//! Decision source trait and built-in implementations.
//!
//! At the start of every epoch the orchestrator presents each living
//! agent with an [`ArenaView`] and awaits an [`AgentActions`] set. The
//! [`DecisionSource`] trait abstracts how that decision is produced: an
//! LLM backend, a remote player, the scripted class strategies, or a test
//! stub.
//!
//! Calls for different agents run concurrently. A failed call only
//! affects its own agent, which falls back to
//! [`AgentActions::fallback`].

use futures::future::{BoxFuture, FutureExt as _};
use hexarena_agents::{ArenaView, scripted_actions};
use hexarena_types::{AgentActions, AgentId};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Errors that can occur while deciding for one agent.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// The agent did not respond within the deadline.
    #[error("agent {agent_id} timed out (deadline: {deadline_ms}ms)")]
    Timeout {
        /// The agent that timed out.
        agent_id: AgentId,
        /// The deadline in milliseconds.
        deadline_ms: u64,
    },

    /// An internal error in the decision source.
    #[error("decision source error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// A source of agent decisions.
///
/// `decide` receives an owned view so implementations can move it into a
/// spawned task or serialize it for a remote provider.
pub trait DecisionSource: Send + Sync {
    /// Decide one agent's actions for the epoch in `view`.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError`] when no decision could be produced. The
    /// orchestrator replaces the actions with a passive fallback.
    fn decide(&self, view: ArenaView) -> BoxFuture<'_, Result<AgentActions, DecisionError>>;
}

/// A decision source that holds position every epoch.
#[derive(Debug, Clone, Default)]
pub struct StubDecisionSource;

impl StubDecisionSource {
    /// Create a new stub decision source.
    pub const fn new() -> Self {
        Self
    }
}

impl DecisionSource for StubDecisionSource {
    fn decide(&self, _view: ArenaView) -> BoxFuture<'_, Result<AgentActions, DecisionError>> {
        futures::future::ready(Ok(AgentActions {
            reasoning: String::from("Holding position."),
            ..AgentActions::default()
        }))
        .boxed()
    }
}

/// Runs each agent's built-in class strategy.
///
/// Randomness is derived from the seed, the epoch and the agent name, so
/// the same battle replays identically.
#[derive(Debug, Clone)]
pub struct ScriptedDecisionSource {
    seed: u64,
}

impl ScriptedDecisionSource {
    /// Create a scripted source with a base seed.
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, view: &ArenaView) -> StdRng {
        let name_hash = view
            .me
            .name
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        StdRng::seed_from_u64(self.seed ^ name_hash ^ view.epoch.rotate_left(32))
    }
}

impl DecisionSource for ScriptedDecisionSource {
    fn decide(&self, view: ArenaView) -> BoxFuture<'_, Result<AgentActions, DecisionError>> {
        let mut rng = self.rng_for(&view);
        let actions = scripted_actions(&view, &mut rng);
        futures::future::ready(Ok(actions)).boxed()
    }
}
