//! Termination monitor.
//!
//! Scans the grid under the board lock every `monitor_interval`. Once at
//! most one occupied cell remains, the run moves from
//! [`RunState::Running`] to [`RunState::Stopped`], the survivor (if any) is
//! recorded, and every parked mover is woken so it can exit. The monitor
//! also enforces the optional wall-clock limit.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::board::{CoordinationError, SharedBoard};
use crate::control::{EndReason, RunControl, RunState, Survivor};

/// Result of one grid scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// More than one actor is still on the grid.
    Contested {
        /// Number of occupied cells.
        occupied: usize,
    },
    /// At most one actor is left.
    Converged(Option<Survivor>),
}

/// Count occupied cells and pick out the survivor, under the board lock.
pub fn scan(board: &SharedBoard) -> Result<Scan, CoordinationError> {
    let guard = board.lock()?;
    let grid = guard.grid();
    let occupied = grid.occupied_count();
    if occupied > 1 {
        return Ok(Scan::Contested { occupied });
    }
    let survivor = grid.survivor().map(|(position, actor)| Survivor {
        position,
        actor: actor.clone(),
    });
    Ok(Scan::Converged(survivor))
}

/// Periodic convergence check.
#[derive(Debug)]
pub struct TerminationMonitor {
    board: Arc<SharedBoard>,
    control: Arc<RunControl>,
    interval: Duration,
}

impl TerminationMonitor {
    /// Create a monitor polling every `interval`.
    pub const fn new(board: Arc<SharedBoard>, control: Arc<RunControl>, interval: Duration) -> Self {
        Self {
            board,
            control,
            interval,
        }
    }

    /// Run one scan and apply any resulting transition.
    pub fn check_once(&self) -> Result<RunState, CoordinationError> {
        if !self.control.is_running() {
            return Ok(RunState::Stopped);
        }

        match scan(&self.board)? {
            Scan::Contested { occupied } => {
                debug!(occupied, "Grid still contested");
            }
            Scan::Converged(survivor) => {
                info!(
                    survivor = ?survivor.as_ref().map(|s| s.actor.symbol),
                    position = ?survivor.as_ref().map(|s| s.position),
                    "Grid converged"
                );
                self.control.converge(survivor);
                self.board.interrupt();
                return Ok(RunState::Stopped);
            }
        }

        if self.control.time_limit_reached() {
            info!(
                elapsed_seconds = self.control.elapsed_seconds(),
                "Real-time limit reached"
            );
            self.control.stop(EndReason::MaxRealTimeReached);
            self.board.interrupt();
            return Ok(RunState::Stopped);
        }

        Ok(RunState::Running)
    }

    /// Poll until the run stops.
    pub async fn run(self) -> Result<(), CoordinationError> {
        debug!(interval_ms = self.interval.as_millis(), "Termination monitor started");
        while self.check_once()? == RunState::Running {
            if self.interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.interval).await;
            }
        }
        debug!("Termination monitor stopped");
        Ok(())
    }
}
