//! Simulation runner.
//!
//! [`Simulation`] wires a populated grid to its workers and drives a run to
//! completion:
//!
//! - **Movers**: `movers.workers` blocking workers on tokio's blocking pool.
//!   They park on the board's condition variable, so they must not run on
//!   the async worker threads.
//! - **Termination monitor**: async task scanning for convergence and the
//!   wall-clock limit.
//! - **Renderer**: optional async task drawing frames to a sink.
//!
//! The controlling task parks on [`RunControl::wait_stopped`], wakes every
//! parked mover, joins all tasks, and reports a [`SimulationResult`].
//! A worker that hits a coordination error logs it and ends the run with
//! [`EndReason::Fault`].

use std::io::Write;
use std::sync::Arc;

use gridlock_world::Grid;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::board::{CoordinationError, SharedBoard};
use crate::config::SimulationConfig;
use crate::control::{EndReason, RunControl, Survivor};
use crate::monitor::TerminationMonitor;
use crate::mover::{MoveStats, MoveStatsSnapshot, Mover};
use crate::render::Renderer;

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The final grid could not be read.
    #[error("coordination error: {source}")]
    Coordination {
        /// The underlying coordination error.
        #[from]
        source: CoordinationError,
    },

    /// A worker task panicked or was cancelled.
    #[error("task join error: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}

/// Result of the simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: EndReason,
    /// The last actor standing, if the run converged on one.
    pub survivor: Option<Survivor>,
    /// Occupied cells at the end of the run.
    pub occupied: usize,
    /// Final grid, one string per row.
    pub final_rows: Vec<String>,
    /// Move counters across all workers.
    pub stats: MoveStatsSnapshot,
    /// Wall-clock duration of the run.
    pub elapsed_ms: u64,
}

/// A simulation ready to run.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    board: Arc<SharedBoard>,
    control: Arc<RunControl>,
    stats: Arc<MoveStats>,
    initial_occupied: usize,
}

impl Simulation {
    /// Prepare a run over `grid`.
    pub fn new(config: SimulationConfig, grid: Grid) -> Self {
        let control = Arc::new(RunControl::new(&config.simulation));
        let initial_occupied = grid.occupied_count();
        Self {
            config,
            board: Arc::new(SharedBoard::new(grid)),
            control,
            stats: Arc::new(MoveStats::default()),
            initial_occupied,
        }
    }

    /// Shared run control, for stopping the run from outside.
    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    /// Shared board, for observing the grid from outside.
    pub fn board(&self) -> Arc<SharedBoard> {
        Arc::clone(&self.board)
    }

    fn mover_rng(&self, worker: usize) -> SmallRng {
        match self.config.movers.seed {
            Some(seed) => {
                let offset = u64::try_from(worker).unwrap_or(u64::MAX);
                SmallRng::seed_from_u64(seed.wrapping_add(offset))
            }
            None => SmallRng::from_rng(&mut rand::rng()),
        }
    }

    /// Run until the grid converges or another end condition fires.
    ///
    /// Frames are written to `sink` when one is given and rendering is
    /// enabled in the configuration.
    pub async fn run<W>(self, sink: Option<W>) -> Result<SimulationResult, RunnerError>
    where
        W: Write + Send + 'static,
    {
        let timing = self.config.timing.clone();
        info!(
            size = self.config.grid.size,
            workers = self.config.movers.workers,
            seed = ?self.config.movers.seed,
            eliminate_exhausted = self.config.grid.eliminate_exhausted,
            occupied = self.initial_occupied,
            "Simulation starting"
        );

        let mut movers = Vec::with_capacity(self.config.movers.workers);
        for worker in 0..self.config.movers.workers {
            let mover = Mover::new(
                worker,
                Arc::clone(&self.board),
                Arc::clone(&self.control),
                Arc::clone(&self.stats),
                timing.clone(),
                self.config.grid.eliminate_exhausted,
                self.mover_rng(worker),
            );
            let board = Arc::clone(&self.board);
            let control = Arc::clone(&self.control);
            movers.push(tokio::task::spawn_blocking(move || {
                if let Err(e) = mover.run() {
                    error!(worker, error = %e, "Mover failed");
                    control.stop(EndReason::Fault {
                        message: e.to_string(),
                    });
                    board.interrupt();
                }
            }));
        }

        let monitor = {
            let monitor = TerminationMonitor::new(
                Arc::clone(&self.board),
                Arc::clone(&self.control),
                timing.monitor_interval(),
            );
            let board = Arc::clone(&self.board);
            let control = Arc::clone(&self.control);
            tokio::spawn(async move {
                if let Err(e) = monitor.run().await {
                    error!(error = %e, "Termination monitor failed");
                    control.stop(EndReason::Fault {
                        message: e.to_string(),
                    });
                    board.interrupt();
                }
            })
        };

        let renderer = match sink {
            Some(sink) if self.config.render.enabled => {
                let renderer = Renderer::new(
                    Arc::clone(&self.board),
                    Arc::clone(&self.control),
                    self.config.render.clone(),
                    timing.render_interval(),
                    sink,
                );
                Some(tokio::spawn(renderer.run()))
            }
            _ => None,
        };

        self.control.wait_stopped().await;
        self.board.interrupt();

        for handle in movers {
            handle.await?;
        }
        monitor.await?;
        if let Some(handle) = renderer {
            drop(handle.await?);
        }

        let grid = self.board.snapshot()?;
        let end_reason = self.control.end_reason().unwrap_or(EndReason::Requested);
        Ok(SimulationResult {
            end_reason,
            survivor: self.control.survivor(),
            occupied: grid.occupied_count(),
            final_rows: grid.render_rows(),
            stats: self.stats.snapshot(),
            elapsed_ms: self.control.elapsed_ms(),
        })
    }
}

/// Run a simulation over `grid` with the given configuration.
pub async fn run_simulation<W>(
    config: SimulationConfig,
    grid: Grid,
    sink: Option<W>,
) -> Result<SimulationResult, RunnerError>
where
    W: Write + Send + 'static,
{
    Simulation::new(config, grid).run(sink).await
}

/// Log the end of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        occupied = result.occupied,
        elapsed_ms = result.elapsed_ms,
        iterations = result.stats.iterations,
        relocations = result.stats.relocations,
        captures = result.stats.captures,
        eliminations = result.stats.eliminations,
        aborted = result.stats.aborted,
        "Simulation ended"
    );

    match (&result.end_reason, &result.survivor) {
        (EndReason::Converged, Some(survivor)) => info!(
            symbol = %survivor.actor.symbol,
            actor = %survivor.actor.id,
            position = %survivor.position,
            vitality = survivor.actor.vitality,
            "Survivor"
        ),
        (EndReason::Converged, None) => info!("No actors left"),
        (EndReason::Fault { message }, _) => warn!(fault = %message, "Simulation ended on a fault"),
        _ => {}
    }
}
