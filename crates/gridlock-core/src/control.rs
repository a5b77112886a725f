//! Run control shared by every task of a simulation.
//!
//! [`RunControl`] carries the `Running -> Stopped` state machine. Movers and
//! the renderer poll [`RunControl::is_running`] once per loop iteration; the
//! controlling task parks in [`RunControl::wait_stopped`] until somebody calls
//! [`RunControl::stop`]. There is no transition back to running.
//!
//! # Architecture
//!
//! The running flag is an [`AtomicBool`] so the hot loops never take a lock
//! to read it. The end reason and survivor are written once under a
//! [`std::sync::Mutex`], and a [`Notify`] wakes the controlling task.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use gridlock_world::{Actor, Position};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::config::SimulationBoundsConfig;

/// Lifecycle state of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Movers are active.
    Running,
    /// The run has ended; every loop exits at its next check.
    Stopped,
}

/// Reason why the simulation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// At most one occupied cell remains.
    Converged,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// A worker hit a fatal coordination error.
    Fault {
        /// Description of the failure.
        message: String,
    },
    /// Stopped from outside the simulation.
    Requested,
}

/// The last actor standing, with where it stood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survivor {
    /// Final position.
    pub position: Position,
    /// The actor itself.
    pub actor: Actor,
}

#[derive(Debug, Default)]
struct Outcome {
    reason: Option<EndReason>,
    survivor: Option<Survivor>,
}

/// Shared run state.
#[derive(Debug)]
pub struct RunControl {
    /// Whether the simulation is still running.
    running: AtomicBool,

    /// Wakes the controlling task once the run stops.
    stopped_notify: Notify,

    /// Why the run ended and who survived.
    outcome: Mutex<Outcome>,

    /// Wall-clock time when the simulation started.
    started_at: DateTime<Utc>,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,
}

impl RunControl {
    /// Create a running control from the simulation bounds.
    pub fn new(bounds: &SimulationBoundsConfig) -> Self {
        Self {
            running: AtomicBool::new(true),
            stopped_notify: Notify::new(),
            outcome: Mutex::new(Outcome::default()),
            started_at: Utc::now(),
            max_real_time_seconds: bounds.max_real_time_seconds,
        }
    }

    /// Check whether the simulation is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current state of the run.
    pub fn state(&self) -> RunState {
        if self.is_running() {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    /// Stop the run.
    ///
    /// Only the first call has any effect; it records `reason` and returns
    /// `true`. Later calls return `false` and leave the recorded reason alone.
    pub fn stop(&self, reason: EndReason) -> bool {
        self.finish(reason, None)
    }

    /// Stop the run because one actor (or none) is left.
    pub fn converge(&self, survivor: Option<Survivor>) -> bool {
        self.finish(EndReason::Converged, survivor)
    }

    fn finish(&self, reason: EndReason, survivor: Option<Survivor>) -> bool {
        // Hold the outcome lock across the swap so reason and survivor are
        // written by the same caller that flipped the flag.
        let guard = self.outcome.lock();
        let was_running = self.running.swap(false, Ordering::AcqRel);
        if was_running {
            if let Ok(mut outcome) = guard {
                outcome.reason = Some(reason);
                outcome.survivor = survivor;
            }
            self.stopped_notify.notify_one();
        }
        was_running
    }

    /// Wait until the run has stopped.
    ///
    /// Returns immediately if already stopped.
    pub async fn wait_stopped(&self) {
        while self.is_running() {
            self.stopped_notify.notified().await;
        }
    }

    /// The reason the run ended, if it has.
    pub fn end_reason(&self) -> Option<EndReason> {
        self.outcome.lock().ok().and_then(|o| o.reason.clone())
    }

    /// The survivor recorded at convergence, if any.
    pub fn survivor(&self) -> Option<Survivor> {
        self.outcome.lock().ok().and_then(|o| o.survivor.clone())
    }

    /// Check whether the wall-clock time limit has been reached.
    ///
    /// Returns `true` if `max_real_time_seconds > 0` and the elapsed
    /// seconds since start exceed the limit.
    pub fn time_limit_reached(&self) -> bool {
        if self.max_real_time_seconds == 0 {
            return false;
        }
        self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return elapsed seconds since simulation start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if clocks are weird; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Return elapsed milliseconds since simulation start.
    pub fn elapsed_ms(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}
