//! The shared board: grid plus in-flight selection set behind one lock.
//!
//! [`SharedBoard`] is the only synchronization point of the simulation. A
//! single [`Mutex`] guards both the [`Grid`] and the set of source cells
//! currently being processed, and a single [`Condvar`] carries every
//! wait/notify between movers. Waiting always goes through
//! [`SharedBoard::wait_while`], which re-tests its condition after every
//! wake-up, so a spurious or early wake never lets a mover proceed on a
//! stale check.
//!
//! [`commit_move`] is the one place a cell changes hands. It runs with the
//! lock held and relocates exactly one actor per successful call.

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use gridlock_world::{ActorId, Cell, Grid, GridError, Position};
use serde::{Deserialize, Serialize};

use crate::control::RunControl;

/// Errors raised by the coordination protocol. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    /// A thread panicked while holding the board lock.
    #[error("board lock poisoned: {message}")]
    Poisoned {
        /// Description of the poisoned lock.
        message: String,
    },

    /// A grid operation failed while the lock was held.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },
}

impl<T> From<PoisonError<T>> for CoordinationError {
    fn from(err: PoisonError<T>) -> Self {
        Self::Poisoned {
            message: err.to_string(),
        }
    }
}

/// Grid plus the set of source cells claimed by active mover iterations.
#[derive(Debug)]
pub struct Board {
    grid: Grid,
    in_flight: BTreeSet<Position>,
}

impl Board {
    /// Wrap a populated grid with an empty in-flight set.
    pub const fn new(grid: Grid) -> Self {
        Self {
            grid,
            in_flight: BTreeSet::new(),
        }
    }

    /// The grid.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable access to the grid.
    pub const fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// Whether `pos` is the source of an active iteration.
    pub fn is_in_flight(&self, pos: Position) -> bool {
        self.in_flight.contains(&pos)
    }

    /// Claim `pos` as a source. Returns `false` if it was already claimed.
    pub fn mark_in_flight(&mut self, pos: Position) -> bool {
        self.in_flight.insert(pos)
    }

    /// Release a source claim. Returns `false` if `pos` was not claimed.
    pub fn release_in_flight(&mut self, pos: Position) -> bool {
        self.in_flight.remove(&pos)
    }

    /// Number of sources currently claimed.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

/// The board behind the simulation-wide lock and condition variable.
#[derive(Debug)]
pub struct SharedBoard {
    state: Mutex<Board>,
    changed: Condvar,
}

impl SharedBoard {
    /// Share a populated grid.
    pub fn new(grid: Grid) -> Self {
        Self {
            state: Mutex::new(Board::new(grid)),
            changed: Condvar::new(),
        }
    }

    /// Acquire the board lock.
    pub fn lock(&self) -> Result<MutexGuard<'_, Board>, CoordinationError> {
        Ok(self.state.lock()?)
    }

    /// Park on the condition variable while `condition` holds and the run
    /// is active.
    ///
    /// The lock is released while parked and re-acquired before the
    /// condition is tested again. When this returns, either the condition
    /// is false or the run has stopped; callers check
    /// [`RunControl::is_running`] to tell which.
    pub fn wait_while<'a, F>(
        &self,
        guard: MutexGuard<'a, Board>,
        control: &RunControl,
        mut condition: F,
    ) -> Result<MutexGuard<'a, Board>, CoordinationError>
    where
        F: FnMut(&Board) -> bool,
    {
        Ok(self
            .changed
            .wait_while(guard, |board| control.is_running() && condition(board))?)
    }

    /// Wake every parked mover. Call after changing the in-flight set or a
    /// claim, while still holding the lock.
    pub fn notify_all(&self) {
        self.changed.notify_all();
    }

    /// Wake every parked mover so it can observe that the run stopped.
    ///
    /// Takes the lock first so a mover that has just tested the running
    /// flag cannot miss the wake-up.
    pub fn interrupt(&self) {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.changed.notify_all();
        drop(guard);
    }

    /// Clone the current grid.
    pub fn snapshot(&self) -> Result<Grid, CoordinationError> {
        Ok(self.lock()?.grid().clone())
    }

    /// Render the current grid rows.
    pub fn render_rows(&self) -> Result<Vec<String>, CoordinationError> {
        Ok(self.lock()?.grid().render_rows())
    }

    /// Count occupied cells.
    pub fn occupied_count(&self) -> Result<usize, CoordinationError> {
        Ok(self.lock()?.grid().occupied_count())
    }
}

/// A completed relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    /// The actor that moved.
    pub actor: ActorId,
    /// Where it came from.
    pub from: Position,
    /// Where it went.
    pub to: Position,
    /// Vitality after the move.
    pub vitality: u32,
    /// The actor that was standing on the destination, if any.
    pub displaced: Option<ActorId>,
    /// The moving actor ran out of vitality and was removed.
    pub eliminated: bool,
}

/// Why a commit was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// The source slot is the destination of another move in flight.
    SourceClaimed,
    /// The source slot no longer holds the actor that was selected.
    SourceChanged,
}

/// Result of [`commit_move`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
    /// Exactly one actor moved.
    Committed(Relocation),
    /// Nothing changed.
    Aborted(AbortReason),
}

/// Move the actor at `from` into `to`. Must run under the board lock.
///
/// The move is abandoned if `from` is claimed as the destination of another
/// move, or if it no longer holds `expected`. Otherwise the actor is taken
/// out of `from` (leaving a fresh empty cell), loses one point of vitality,
/// and replaces whatever stood on `to`. With `eliminate_exhausted`, an actor
/// whose vitality reaches zero is removed after arriving.
pub fn commit_move(
    grid: &mut Grid,
    from: Position,
    to: Position,
    expected: ActorId,
    eliminate_exhausted: bool,
) -> Result<CommitOutcome, GridError> {
    if grid.is_claimed(from) {
        return Ok(CommitOutcome::Aborted(AbortReason::SourceClaimed));
    }
    if grid.get(from).and_then(Cell::actor_id) != Some(expected) {
        return Ok(CommitOutcome::Aborted(AbortReason::SourceChanged));
    }
    // Validate the destination before touching the source.
    if !grid.contains(to) {
        return Err(GridError::OutOfBounds {
            position: to,
            size: grid.size(),
        });
    }

    let Cell::Occupied(mut actor) = grid.take(from)? else {
        return Ok(CommitOutcome::Aborted(AbortReason::SourceChanged));
    };
    let vitality = actor.spend_vitality();
    let eliminated = eliminate_exhausted && actor.is_exhausted();
    let id = actor.id;

    let arriving = if eliminated {
        Cell::Empty
    } else {
        Cell::Occupied(actor)
    };
    let displaced = grid.set(to, arriving)?.actor_id();
    grid.set_claim(from, false)?;

    Ok(CommitOutcome::Committed(Relocation {
        actor: id,
        from,
        to,
        vitality,
        displaced,
        eliminated,
    }))
}
