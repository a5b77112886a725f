//! Configuration loading and typed config structures for the Gridlock simulation.
//!
//! The configuration lives in an optional `gridlock-config.yaml` next to the
//! binary's working directory. Every field has a default matching the
//! reference behaviour (a 3x3 grid, three movers, one-second pauses), so an
//! empty or missing file yields a runnable simulation.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but cannot drive a simulation.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Grid dimensions and actor parameters.
    #[serde(default)]
    pub grid: GridConfig,

    /// Mover pool settings.
    #[serde(default)]
    pub movers: MoverConfig,

    /// Pauses and polling intervals.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Run boundaries.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Terminal output.
    #[serde(default)]
    pub render: RenderConfig,
}

impl SimulationConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot drive a simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero grid size or an empty
    /// mover pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.size == 0 {
            return Err(ConfigError::Invalid {
                reason: String::from("grid.size must be at least 1"),
            });
        }
        if self.movers.workers == 0 {
            return Err(ConfigError::Invalid {
                reason: String::from("movers.workers must be at least 1"),
            });
        }
        Ok(())
    }
}

/// Grid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Side length of the square grid.
    #[serde(default = "default_grid_size")]
    pub size: usize,

    /// Vitality every actor starts with.
    #[serde(default = "default_initial_vitality")]
    pub initial_vitality: u32,

    /// Remove an actor from the grid once its vitality reaches zero.
    #[serde(default)]
    pub eliminate_exhausted: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: default_grid_size(),
            initial_vitality: default_initial_vitality(),
            eliminate_exhausted: false,
        }
    }
}

/// Mover pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MoverConfig {
    /// Number of concurrent mover workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Fixed seed for reproducible runs. Each worker derives its own stream.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            seed: None,
        }
    }
}

/// Delays between the steps of the simulation, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Pause after each mover iteration, outside the lock.
    #[serde(default = "default_iteration_pause_ms")]
    pub iteration_pause_ms: u64,

    /// Time a move spends in flight while its destination is claimed.
    #[serde(default = "default_commit_latency_ms")]
    pub commit_latency_ms: u64,

    /// Pause after a commit is published.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Delay between termination scans.
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    /// Delay between rendered frames.
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
}

impl TimingConfig {
    /// Pause after each mover iteration.
    pub const fn iteration_pause(&self) -> Duration {
        Duration::from_millis(self.iteration_pause_ms)
    }

    /// In-flight time of a claimed move.
    pub const fn commit_latency(&self) -> Duration {
        Duration::from_millis(self.commit_latency_ms)
    }

    /// Pause after a commit.
    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Delay between termination scans.
    pub const fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    /// Delay between frames.
    pub const fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    /// All delays set to zero. Handy for tests.
    pub const fn immediate() -> Self {
        Self {
            iteration_pause_ms: 0,
            commit_latency_ms: 0,
            settle_ms: 0,
            monitor_interval_ms: 0,
            render_interval_ms: 0,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            iteration_pause_ms: default_iteration_pause_ms(),
            commit_latency_ms: default_commit_latency_ms(),
            settle_ms: default_settle_ms(),
            monitor_interval_ms: default_monitor_interval_ms(),
            render_interval_ms: default_render_interval_ms(),
        }
    }
}

/// Simulation boundary configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum wall-clock seconds (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderConfig {
    /// Whether frames are drawn at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Redraw over the previous frame instead of appending.
    #[serde(default = "default_true")]
    pub in_place: bool,

    /// Terminal row the frame is drawn at when `in_place` is set.
    #[serde(default = "default_origin_row")]
    pub origin_row: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            in_place: true,
            origin_row: default_origin_row(),
        }
    }
}

const fn default_grid_size() -> usize {
    3
}

const fn default_initial_vitality() -> u32 {
    gridlock_world::DEFAULT_VITALITY
}

const fn default_workers() -> usize {
    3
}

const fn default_iteration_pause_ms() -> u64 {
    1000
}

const fn default_commit_latency_ms() -> u64 {
    5
}

const fn default_settle_ms() -> u64 {
    5
}

const fn default_monitor_interval_ms() -> u64 {
    1000
}

const fn default_render_interval_ms() -> u64 {
    10
}

const fn default_origin_row() -> u16 {
    4
}

const fn default_true() -> bool {
    true
}
