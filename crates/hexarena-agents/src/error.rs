//! Error types for the hexarena-agents crate.
//!
//! Roster operations return typed errors. The per-epoch resolvers never
//! fail: invalid targets are dropped before resolution.

use hexarena_types::AgentId;

/// Errors that can occur during roster operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Agent with the given ID is not on the roster.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// No agent on the roster carries this name.
    #[error("no agent named {0:?}")]
    UnknownName(String),

    /// Agent name already exists on the roster.
    #[error("duplicate agent name: {0}")]
    DuplicateName(String),

    /// The roster already holds the maximum number of agents.
    #[error("roster full: at most {max} agents")]
    RosterFull {
        /// The roster capacity.
        max: usize,
    },
}
