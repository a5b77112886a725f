//! Gridlock binary.
//!
//! Wires the starting grid, the mover pool, the termination monitor, and
//! the renderer together, then runs until at most one actor is left.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing, on stderr)
//! 2. Load configuration from `gridlock-config.yaml`
//! 3. Create the starting grid
//! 4. Install the Ctrl-C handler
//! 5. Run the simulation, drawing frames to stdout
//! 6. Log the result

mod error;

use std::path::Path;

use gridlock_core::config::SimulationConfig;
use gridlock_core::control::EndReason;
use gridlock_core::runner::{self, Simulation};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Name of the optional configuration file in the working directory.
const CONFIG_FILE: &str = "gridlock-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the grid cannot be
/// built, or a worker task fails to join.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Logs go to stderr so frames on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("gridlock-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        size = config.grid.size,
        workers = config.movers.workers,
        seed = ?config.movers.seed,
        iteration_pause_ms = config.timing.iteration_pause_ms,
        max_real_time_seconds = config.simulation.max_real_time_seconds,
        "Configuration loaded"
    );

    // 3. Create the starting grid.
    let mut rng = match config.movers.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_rng(&mut rand::rng()),
    };
    let grid = gridlock_world::create_starting_grid(
        config.grid.size,
        config.grid.initial_vitality,
        &mut rng,
    )?;
    info!(
        size = grid.size(),
        occupied = grid.occupied_count(),
        "Starting grid created"
    );

    // 4. Ctrl-C ends the run like any other stop.
    let simulation = Simulation::new(config, grid);
    let control = simulation.control();
    let interrupt = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping");
                control.stop(EndReason::Requested);
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    // 5. Run the simulation.
    let result = simulation.run(Some(std::io::stdout())).await?;
    interrupt.abort();

    // 6. Log results.
    runner::log_simulation_end(&result);
    info!(
        end_reason = ?result.end_reason,
        elapsed_ms = result.elapsed_ms,
        "gridlock-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration from `gridlock-config.yaml`.
///
/// Looks for the file relative to the current working directory and falls
/// back to defaults when it is absent.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        let config = SimulationConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        Ok(SimulationConfig::default())
    }
}
