//! Final-words collaborator.
//!
//! Last lines are flavor text only. When the generator fails, or none is
//! configured, a canned line keyed by the death cause is used.

use futures::future::BoxFuture;
use hexarena_types::{AgentSnapshot, DeathCause};

/// Errors raised by a final-words generator.
#[derive(Debug, thiserror::Error)]
#[error("final words unavailable: {message}")]
pub struct FinalWordsError {
    /// Description of the failure.
    pub message: String,
}

/// Generates an eliminated agent's last line.
pub trait FinalWords: Send + Sync {
    /// Produce the last line of `agent`, killed by `cause`.
    ///
    /// # Errors
    ///
    /// Returns [`FinalWordsError`] when no line can be produced.
    fn final_words<'a>(
        &'a self,
        agent: &'a AgentSnapshot,
        cause: DeathCause,
    ) -> BoxFuture<'a, Result<String, FinalWordsError>>;
}
