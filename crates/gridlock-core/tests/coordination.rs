//! Concurrency tests for the mover protocol.
//!
//! These drive several real mover threads against one shared board with
//! every delay set to zero, while the test thread repeatedly checks the
//! grid invariants under the board lock.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gridlock_core::board::SharedBoard;
use gridlock_core::config::{SimulationBoundsConfig, TimingConfig};
use gridlock_core::control::{EndReason, RunControl};
use gridlock_core::mover::{IterationOutcome, MoveStats, Mover};
use gridlock_world::{Actor, ActorId, Cell, Grid, Position, create_starting_grid};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn spawn_movers(
    board: &Arc<SharedBoard>,
    control: &Arc<RunControl>,
    stats: &Arc<MoveStats>,
    timing: &TimingConfig,
    workers: u64,
) -> Vec<thread::JoinHandle<()>> {
    (0..workers)
        .map(|seed| {
            let mover = Mover::new(
                usize::try_from(seed).unwrap(),
                Arc::clone(board),
                Arc::clone(control),
                Arc::clone(stats),
                timing.clone(),
                false,
                SmallRng::seed_from_u64(seed),
            );
            thread::spawn(move || mover.run().unwrap())
        })
        .collect()
}

#[test]
fn invariants_hold_under_contention() {
    let mut rng = SmallRng::seed_from_u64(1234);
    let grid = create_starting_grid(4, 1000, &mut rng).unwrap();
    let initial_ids: BTreeSet<ActorId> = grid.iter().filter_map(|(_, c)| c.actor_id()).collect();
    let board = Arc::new(SharedBoard::new(grid));
    let control = Arc::new(RunControl::new(&SimulationBoundsConfig::default()));
    let stats = Arc::new(MoveStats::default());
    let workers = 6;
    let handles = spawn_movers(&board, &control, &stats, &TimingConfig::immediate(), workers);

    let mut last_occupied = initial_ids.len();
    for _ in 0..2_000 {
        {
            let guard = board.lock().unwrap();
            let grid = guard.grid();
            let occupied = grid.occupied_count();

            // Conservation: never more actors than before.
            assert!(occupied <= last_occupied, "occupied grew from {last_occupied} to {occupied}");
            last_occupied = occupied;

            // No actor is ever duplicated or invented.
            let ids: Vec<ActorId> = grid.iter().filter_map(|(_, c)| c.actor_id()).collect();
            let unique: BTreeSet<ActorId> = ids.iter().copied().collect();
            assert_eq!(ids.len(), unique.len(), "an actor appears twice");
            assert!(unique.is_subset(&initial_ids));

            // Claims and in-flight sources are bounded by the worker count.
            assert!(grid.claimed_count() <= usize::try_from(workers).unwrap());
            assert!(guard.in_flight_len() <= usize::try_from(workers).unwrap());
        }
        thread::yield_now();
    }

    control.stop(EndReason::Requested);
    board.interrupt();
    for handle in handles {
        handle.join().unwrap();
    }

    let guard = board.lock().unwrap();
    assert_eq!(guard.grid().claimed_count(), 0);
    assert_eq!(guard.in_flight_len(), 0);
    assert!(stats.snapshot().iterations > 0);
}

#[test]
fn destination_claim_is_exclusive() {
    // One actor at each end of a row of three, both aiming at the middle.
    let mut grid = Grid::new(3).unwrap();
    let left = Position::new(0, 0);
    let right = Position::new(0, 2);
    let middle = Position::new(0, 1);
    grid.set(left, Cell::Occupied(Actor::new(ActorId(0), 'L', 5))).unwrap();
    grid.set(right, Cell::Occupied(Actor::new(ActorId(1), 'R', 5))).unwrap();

    let board = Arc::new(SharedBoard::new(grid));
    let control = Arc::new(RunControl::new(&SimulationBoundsConfig::default()));
    let stats = Arc::new(MoveStats::default());
    let mut timing = TimingConfig::immediate();
    timing.commit_latency_ms = 50;

    // Pre-claim the middle so both movers have to wait on it.
    board.lock().unwrap().grid_mut().set_claim(middle, true).unwrap();

    let spawn = |id: usize, from: Position, actor: ActorId| {
        let mover = Mover::new(
            id,
            Arc::clone(&board),
            Arc::clone(&control),
            Arc::clone(&stats),
            timing.clone(),
            false,
            SmallRng::seed_from_u64(0),
        );
        thread::spawn(move || mover.lock_destination(from, middle, actor).unwrap())
    };
    let a = spawn(0, left, ActorId(0));
    let b = spawn(1, right, ActorId(1));

    thread::sleep(Duration::from_millis(20));
    {
        let mut guard = board.lock().unwrap();
        guard.grid_mut().set_claim(middle, false).unwrap();
        board.notify_all();
    }

    // While one move is in flight, exactly one claim is held.
    thread::sleep(Duration::from_millis(20));
    assert_eq!(board.lock().unwrap().grid().claimed_count(), 1);

    let a = a.join().unwrap().unwrap();
    let b = b.join().unwrap().unwrap();

    // Both commits went through one after the other: the second mover
    // landed on the first and displaced it.
    let guard = board.lock().unwrap();
    let grid = guard.grid();
    assert_eq!(grid.occupied_count(), 1);
    assert_eq!(grid.claimed_count(), 0);
    let survivor = grid.get(middle).unwrap().actor_id().unwrap();
    assert!(survivor == ActorId(0) || survivor == ActorId(1));
    assert!(grid.get(left).unwrap().is_empty());
    assert!(grid.get(right).unwrap().is_empty());
    drop(guard);
    assert_ne!(a, b);
}

#[test]
fn stop_releases_movers_parked_on_a_source() {
    let mut grid = Grid::new(1).unwrap();
    let only = Position::new(0, 0);
    grid.set(only, Cell::Occupied(Actor::new(ActorId(0), 'P', 5))).unwrap();
    let board = Arc::new(SharedBoard::new(grid));
    let control = Arc::new(RunControl::new(&SimulationBoundsConfig::default()));
    let stats = Arc::new(MoveStats::default());

    // The only cell is already being processed, so every pick parks.
    assert!(board.lock().unwrap().mark_in_flight(only));
    let handles = spawn_movers(&board, &control, &stats, &TimingConfig::immediate(), 3);

    thread::sleep(Duration::from_millis(30));
    control.stop(EndReason::Requested);
    board.interrupt();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(stats.snapshot().relocations, 0);
}

#[test]
fn two_by_two_empty_source_scenario() {
    let mut grid = Grid::new(2).unwrap();
    let mut next: u32 = 0;
    for pos in grid.positions() {
        grid.set(pos, Cell::Occupied(Actor::new(ActorId(next), 'X', 5))).unwrap();
        next = next.saturating_add(1);
    }
    let hole = Position::new(0, 1);
    grid.set(hole, Cell::Empty).unwrap();

    let board = Arc::new(SharedBoard::new(grid));
    let control = Arc::new(RunControl::new(&SimulationBoundsConfig::default()));
    let stats = Arc::new(MoveStats::default());
    let mut mover = Mover::new(
        0,
        Arc::clone(&board),
        Arc::clone(&control),
        Arc::clone(&stats),
        TimingConfig::immediate(),
        false,
        SmallRng::seed_from_u64(42),
    );

    let claim = mover.claim_source(hole).unwrap().unwrap();
    let outcome = mover.process_source(claim).unwrap();

    assert_eq!(outcome, IterationOutcome::EmptySource { position: hole });
    assert_eq!(board.occupied_count().unwrap(), 3);
}
