//! Mover workers: the concurrent core of the simulation.
//!
//! Each [`Mover`] runs the same loop on its own thread:
//!
//! 1. Under the board lock, draw a random source cell. If another worker
//!    is already processing that cell, wait until it is released.
//! 2. Add the cell to the in-flight set and plan the occupant's moves.
//! 3. Empty cell or nowhere to go: nothing to do.
//! 4. Otherwise pick a destination and run [`Mover::lock_destination`]:
//!    wait for the destination claim to clear, claim it, let the move sit
//!    in flight for `commit_latency`, then commit and release the claim.
//! 5. Release the source, notify every waiter, and pause outside the lock.
//!
//! Every wait re-tests its condition after each wake and gives up as soon
//! as the run stops, so a stopped simulation never leaves a mover parked.

use std::sync::{Arc, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gridlock_world::{ActorId, Cell, Position, choose_destination, plan_moves};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::board::{
    AbortReason, Board, CommitOutcome, CoordinationError, Relocation, SharedBoard, commit_move,
};
use crate::config::TimingConfig;
use crate::control::RunControl;

/// Counters shared by every mover of a run.
#[derive(Debug, Default)]
pub struct MoveStats {
    iterations: AtomicU64,
    empty_selections: AtomicU64,
    no_valid_moves: AtomicU64,
    relocations: AtomicU64,
    captures: AtomicU64,
    eliminations: AtomicU64,
    aborted: AtomicU64,
}

/// Point-in-time copy of [`MoveStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStatsSnapshot {
    /// Completed loop iterations.
    pub iterations: u64,
    /// Iterations whose source cell was empty.
    pub empty_selections: u64,
    /// Iterations whose actor had no in-bounds neighbour.
    pub no_valid_moves: u64,
    /// Successful commits.
    pub relocations: u64,
    /// Commits that displaced another actor.
    pub captures: u64,
    /// Actors removed for running out of vitality.
    pub eliminations: u64,
    /// Commits abandoned because the source changed or was claimed.
    pub aborted: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl MoveStats {
    /// Record the outcome of one iteration.
    pub fn record(&self, outcome: &IterationOutcome) {
        bump(&self.iterations);
        match outcome {
            IterationOutcome::Interrupted => {}
            IterationOutcome::EmptySource { .. } => bump(&self.empty_selections),
            IterationOutcome::NoValidMove { .. } => bump(&self.no_valid_moves),
            IterationOutcome::Aborted { .. } => bump(&self.aborted),
            IterationOutcome::Committed(r) => {
                bump(&self.relocations);
                if r.displaced.is_some() {
                    bump(&self.captures);
                }
                if r.eliminated {
                    bump(&self.eliminations);
                }
            }
        }
    }

    /// Read every counter.
    pub fn snapshot(&self) -> MoveStatsSnapshot {
        MoveStatsSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            empty_selections: self.empty_selections.load(Ordering::Relaxed),
            no_valid_moves: self.no_valid_moves.load(Ordering::Relaxed),
            relocations: self.relocations.load(Ordering::Relaxed),
            captures: self.captures.load(Ordering::Relaxed),
            eliminations: self.eliminations.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
        }
    }
}

/// A source cell a mover has added to the in-flight set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceClaim {
    /// The claimed cell.
    pub position: Position,
    /// The actor found there, if any.
    pub actor: Option<ActorId>,
    /// In-bounds destinations planned for that actor.
    pub moves: Vec<Position>,
}

/// What one iteration of the mover loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The run stopped while this mover was waiting.
    Interrupted,
    /// The selected cell was empty.
    EmptySource {
        /// The selected cell.
        position: Position,
    },
    /// The selected actor had nowhere to go.
    NoValidMove {
        /// The selected cell.
        position: Position,
    },
    /// A relocation was committed.
    Committed(Relocation),
    /// The commit was abandoned.
    Aborted {
        /// The selected cell.
        from: Position,
        /// The chosen destination.
        to: Position,
        /// Why nothing moved.
        reason: AbortReason,
    },
}

/// One mover worker.
#[derive(Debug)]
pub struct Mover<R> {
    id: usize,
    board: Arc<SharedBoard>,
    control: Arc<RunControl>,
    stats: Arc<MoveStats>,
    timing: TimingConfig,
    eliminate_exhausted: bool,
    rng: R,
}

impl<R: Rng> Mover<R> {
    /// Create a mover with its own random stream.
    pub const fn new(
        id: usize,
        board: Arc<SharedBoard>,
        control: Arc<RunControl>,
        stats: Arc<MoveStats>,
        timing: TimingConfig,
        eliminate_exhausted: bool,
        rng: R,
    ) -> Self {
        Self {
            id,
            board,
            control,
            stats,
            timing,
            eliminate_exhausted,
            rng,
        }
    }

    /// Run iterations until the run stops.
    ///
    /// Blocks the calling thread. Returns the first fatal coordination
    /// error; the caller is expected to stop the run when that happens.
    pub fn run(mut self) -> Result<(), CoordinationError> {
        debug!(worker = self.id, "Mover started");
        while self.control.is_running() {
            let outcome = self.run_iteration()?;
            trace!(worker = self.id, ?outcome, "Mover iteration");
            pause(self.timing.iteration_pause());
        }
        debug!(worker = self.id, "Mover stopped");
        Ok(())
    }

    /// One pass of the loop body, without the trailing pause.
    pub fn run_iteration(&mut self) -> Result<IterationOutcome, CoordinationError> {
        let outcome = match self.pick_source()? {
            Some(claim) => self.process_source(claim)?,
            None => IterationOutcome::Interrupted,
        };
        self.stats.record(&outcome);
        Ok(outcome)
    }

    /// Draw a random source cell and claim it.
    ///
    /// Returns `None` if the run stopped while waiting for the cell.
    pub fn pick_source(&mut self) -> Result<Option<SourceClaim>, CoordinationError> {
        let guard = self.board.lock()?;
        let size = guard.grid().size();
        let position = Position::new(self.rng.random_range(0..size), self.rng.random_range(0..size));
        self.claim_locked(guard, position)
    }

    /// Claim `position` as this mover's source cell.
    ///
    /// Waits while another mover is processing the same cell. On success
    /// the cell is in the in-flight set and, if occupied, its actor's
    /// valid moves have been planned. Returns `None` if the run stopped
    /// while waiting.
    pub fn claim_source(&self, position: Position) -> Result<Option<SourceClaim>, CoordinationError> {
        let guard = self.board.lock()?;
        self.claim_locked(guard, position)
    }

    fn claim_locked(
        &self,
        guard: MutexGuard<'_, Board>,
        position: Position,
    ) -> Result<Option<SourceClaim>, CoordinationError> {
        let mut guard = self
            .board
            .wait_while(guard, &self.control, |b| b.is_in_flight(position))?;
        if !self.control.is_running() {
            return Ok(None);
        }
        guard.mark_in_flight(position);

        let grid = guard.grid_mut();
        let size = grid.size();
        let claim = match grid.get_mut(position) {
            Some(Cell::Occupied(actor)) => {
                actor.valid_moves = plan_moves(position, size);
                SourceClaim {
                    position,
                    actor: Some(actor.id),
                    moves: actor.valid_moves.clone(),
                }
            }
            Some(Cell::Empty) | None => SourceClaim {
                position,
                actor: None,
                moves: Vec::new(),
            },
        };
        Ok(Some(claim))
    }

    /// Attempt the move for a claimed source, then release the claim.
    ///
    /// The source leaves the in-flight set and every waiter is notified
    /// whatever the attempt did.
    pub fn process_source(&mut self, claim: SourceClaim) -> Result<IterationOutcome, CoordinationError> {
        let attempted = self.attempt_move(&claim);
        let released = self.release_source(claim.position);
        let outcome = attempted?;
        released?;
        Ok(outcome)
    }

    fn attempt_move(&mut self, claim: &SourceClaim) -> Result<IterationOutcome, CoordinationError> {
        let Some(actor) = claim.actor else {
            return Ok(IterationOutcome::EmptySource {
                position: claim.position,
            });
        };
        let Some(to) = choose_destination(&claim.moves, &mut self.rng) else {
            return Ok(IterationOutcome::NoValidMove {
                position: claim.position,
            });
        };
        let outcome = match self.lock_destination(claim.position, to, actor)? {
            None => IterationOutcome::Interrupted,
            Some(CommitOutcome::Committed(relocation)) => IterationOutcome::Committed(relocation),
            Some(CommitOutcome::Aborted(reason)) => IterationOutcome::Aborted {
                from: claim.position,
                to,
                reason,
            },
        };
        Ok(outcome)
    }

    fn release_source(&self, position: Position) -> Result<(), CoordinationError> {
        let mut guard = self.board.lock()?;
        guard.release_in_flight(position);
        self.board.notify_all();
        drop(guard);
        Ok(())
    }

    /// Claim `to`, hold the move in flight, then commit it.
    ///
    /// Waits while another move into `to` is in flight. The claim is always
    /// released after the commit, whether or not anything moved. Returns
    /// `None` if the run stopped before the claim could be taken.
    pub fn lock_destination(
        &self,
        from: Position,
        to: Position,
        expected: ActorId,
    ) -> Result<Option<CommitOutcome>, CoordinationError> {
        let guard = self.board.lock()?;
        let mut guard = self
            .board
            .wait_while(guard, &self.control, |b| b.grid().is_claimed(to))?;
        if !self.control.is_running() {
            return Ok(None);
        }
        guard.grid_mut().set_claim(to, true)?;
        drop(guard);

        pause(self.timing.commit_latency());

        let mut guard = self.board.lock()?;
        let grid = guard.grid_mut();
        let committed = commit_move(grid, from, to, expected, self.eliminate_exhausted);
        let released = grid.set_claim(to, false);
        self.board.notify_all();
        drop(guard);
        let outcome = committed?;
        released?;

        match &outcome {
            CommitOutcome::Committed(r) => debug!(
                worker = self.id,
                actor = %r.actor,
                from = %r.from,
                to = %r.to,
                vitality = r.vitality,
                displaced = ?r.displaced,
                eliminated = r.eliminated,
                "Move committed"
            ),
            CommitOutcome::Aborted(reason) => debug!(
                worker = self.id,
                from = %from,
                to = %to,
                ?reason,
                "Move aborted"
            ),
        }

        pause(self.timing.settle());
        Ok(Some(outcome))
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use gridlock_world::{Actor, Grid};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::config::SimulationBoundsConfig;
    use crate::control::EndReason;

    struct Fixture {
        board: Arc<SharedBoard>,
        control: Arc<RunControl>,
        stats: Arc<MoveStats>,
    }

    impl Fixture {
        fn new(grid: Grid) -> Self {
            Self {
                board: Arc::new(SharedBoard::new(grid)),
                control: Arc::new(RunControl::new(&SimulationBoundsConfig::default())),
                stats: Arc::new(MoveStats::default()),
            }
        }

        fn mover(&self, id: usize, seed: u64) -> Mover<SmallRng> {
            Mover::new(
                id,
                Arc::clone(&self.board),
                Arc::clone(&self.control),
                Arc::clone(&self.stats),
                TimingConfig::immediate(),
                false,
                SmallRng::seed_from_u64(seed),
            )
        }
    }

    fn full_grid(size: usize) -> Grid {
        let mut grid = Grid::new(size).unwrap();
        let mut id: u32 = 0;
        for pos in grid.positions() {
            grid.set(pos, Cell::Occupied(Actor::new(ActorId(id), 'A', 5))).unwrap();
            id = id.saturating_add(1);
        }
        grid
    }

    #[test]
    fn empty_source_performs_no_move() {
        let mut grid = full_grid(2);
        let hole = Position::new(1, 1);
        grid.set(hole, Cell::Empty).unwrap();
        let fx = Fixture::new(grid);
        let mut mover = fx.mover(0, 42);

        let claim = mover.claim_source(hole).unwrap().unwrap();
        assert_eq!(claim.actor, None);
        let outcome = mover.process_source(claim).unwrap();

        assert_eq!(outcome, IterationOutcome::EmptySource { position: hole });
        let board = fx.board.lock().unwrap();
        assert_eq!(board.grid().occupied_count(), 3);
        assert_eq!(board.in_flight_len(), 0);
    }

    #[test]
    fn claim_plans_valid_moves_on_the_actor() {
        let fx = Fixture::new(full_grid(3));
        let mover = fx.mover(0, 1);
        let corner = Position::new(0, 0);
        let claim = mover.claim_source(corner).unwrap().unwrap();

        assert_eq!(claim.moves, vec![Position::new(1, 0), Position::new(0, 1)]);
        let board = fx.board.lock().unwrap();
        assert!(board.is_in_flight(corner));
        let actor = board.grid().get(corner).unwrap().actor().unwrap();
        assert_eq!(actor.valid_moves, claim.moves);
    }

    #[test]
    fn single_cell_actor_has_no_valid_move() {
        let mut grid = Grid::new(1).unwrap();
        grid.set(Position::new(0, 0), Cell::Occupied(Actor::new(ActorId(0), 'S', 5)))
            .unwrap();
        let fx = Fixture::new(grid);
        let mut mover = fx.mover(0, 3);
        let outcome = mover.run_iteration().unwrap();
        assert_eq!(
            outcome,
            IterationOutcome::NoValidMove {
                position: Position::new(0, 0)
            }
        );
        assert_eq!(fx.stats.snapshot().no_valid_moves, 1);
    }

    #[test]
    fn lone_actor_relocates_into_a_neighbour() {
        let mut grid = Grid::new(2).unwrap();
        let start = Position::new(0, 0);
        grid.set(start, Cell::Occupied(Actor::new(ActorId(7), 'L', 5))).unwrap();
        let fx = Fixture::new(grid);
        let mut mover = fx.mover(0, 11);

        let claim = mover.claim_source(start).unwrap().unwrap();
        let outcome = mover.process_source(claim).unwrap();

        let IterationOutcome::Committed(r) = outcome else {
            panic!("expected a commit, got {outcome:?}");
        };
        assert_eq!(r.actor, ActorId(7));
        assert_eq!(r.from, start);
        assert!(r.to == Position::new(1, 0) || r.to == Position::new(0, 1));
        assert_eq!(r.vitality, 4);

        let board = fx.board.lock().unwrap();
        assert!(board.grid().get(start).unwrap().is_empty());
        assert_eq!(board.grid().get(r.to).unwrap().actor_id(), Some(ActorId(7)));
        assert_eq!(board.grid().claimed_count(), 0);
        assert_eq!(board.in_flight_len(), 0);
    }

    #[test]
    fn lock_destination_aborts_when_source_changed() {
        let fx = Fixture::new(full_grid(2));
        let mover = fx.mover(0, 5);
        let outcome = mover
            .lock_destination(Position::new(0, 0), Position::new(0, 1), ActorId(99))
            .unwrap();
        assert_eq!(outcome, Some(CommitOutcome::Aborted(AbortReason::SourceChanged)));
        assert_eq!(fx.board.lock().unwrap().grid().claimed_count(), 0);
    }

    #[test]
    fn lock_destination_returns_none_after_stop() {
        let fx = Fixture::new(full_grid(2));
        let to = Position::new(0, 1);
        fx.board.lock().unwrap().grid_mut().set_claim(to, true).unwrap();
        fx.control.stop(EndReason::Requested);
        let mover = fx.mover(0, 5);
        let outcome = mover.lock_destination(Position::new(0, 0), to, ActorId(0)).unwrap();
        assert_eq!(outcome, None);
    }

    #[test]
    fn claim_source_returns_none_after_stop() {
        let fx = Fixture::new(full_grid(2));
        let pos = Position::new(1, 0);
        fx.board.lock().unwrap().mark_in_flight(pos);
        fx.control.stop(EndReason::Requested);
        let mover = fx.mover(0, 5);
        assert_eq!(mover.claim_source(pos).unwrap(), None);
    }

    #[test]
    fn run_exits_once_stopped() {
        let fx = Fixture::new(full_grid(2));
        fx.control.stop(EndReason::Requested);
        fx.mover(0, 9).run().unwrap();
        assert_eq!(fx.stats.snapshot().iterations, 0);
    }

    #[test]
    fn stats_count_each_outcome() {
        let stats = MoveStats::default();
        let pos = Position::new(0, 0);
        stats.record(&IterationOutcome::EmptySource { position: pos });
        stats.record(&IterationOutcome::Committed(Relocation {
            actor: ActorId(1),
            from: pos,
            to: Position::new(0, 1),
            vitality: 0,
            displaced: Some(ActorId(2)),
            eliminated: true,
        }));
        stats.record(&IterationOutcome::Aborted {
            from: pos,
            to: Position::new(1, 0),
            reason: AbortReason::SourceClaimed,
        });
        let s = stats.snapshot();
        assert_eq!(s.iterations, 3);
        assert_eq!(s.empty_selections, 1);
        assert_eq!(s.relocations, 1);
        assert_eq!(s.captures, 1);
        assert_eq!(s.eliminations, 1);
        assert_eq!(s.aborted, 1);
    }
}
