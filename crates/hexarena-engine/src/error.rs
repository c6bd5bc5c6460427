//! Error types for the battle engine binary.
//!
//! [`EngineError`] wraps every failure mode of engine startup and the
//! battle run so `main` can propagate with `?`.

/// Top-level error for the battle engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hexarena_core::config::ConfigError,
    },

    /// A battle lifecycle step failed.
    #[error("arena error: {source}")]
    Arena {
        /// The underlying lifecycle error.
        #[from]
        source: hexarena_core::arena::ArenaError,
    },

    /// The battle runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: hexarena_core::runner::RunnerError,
    },

    /// Agent spawning failed.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
