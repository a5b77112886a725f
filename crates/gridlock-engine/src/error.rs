//! Error types for the Gridlock binary.

/// Top-level error for the Gridlock binary.
///
/// Each variant wraps a specific subsystem error so `main` can propagate
/// any startup or run failure with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: gridlock_core::config::ConfigError,
    },

    /// Starting grid construction failed.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: gridlock_world::GridError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: gridlock_core::runner::RunnerError,
    },
}
