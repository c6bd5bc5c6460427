//! Deadline wrapper around a [`DecisionSource`].
//!
//! A decision that does not arrive within the configured timeout becomes
//! a [`DecisionError::Timeout`], which the orchestrator turns into a
//! passive fallback for that agent only.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt as _};
use hexarena_agents::ArenaView;
use hexarena_core::decision::{DecisionError, DecisionSource};
use hexarena_types::AgentActions;

/// Applies a per-agent deadline to an inner decision source.
pub struct TimeoutDecisionSource<D> {
    inner: D,
    timeout: Duration,
}

impl<D: DecisionSource> TimeoutDecisionSource<D> {
    /// Wrap `inner` with a deadline of `timeout`.
    pub const fn new(inner: D, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl<D: DecisionSource> DecisionSource for TimeoutDecisionSource<D> {
    fn decide(&self, view: ArenaView) -> BoxFuture<'_, Result<AgentActions, DecisionError>> {
        let agent_id = view.me.id;
        let deadline_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let pending = self.inner.decide(view);
        async move {
            tokio::time::timeout(self.timeout, pending)
                .await
                .unwrap_or(Err(DecisionError::Timeout {
                    agent_id,
                    deadline_ms,
                }))
        }
        .boxed()
    }
}
