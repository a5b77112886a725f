//! Starting grid population.
//!
//! Every slot receives an actor with a random uppercase letter, then one
//! slot chosen uniformly at random is overwritten with an empty cell so the
//! first movers have somewhere to go.

use rand::Rng;
use tracing::debug;

use crate::cell::{Actor, ActorId, Cell};
use crate::error::GridError;
use crate::grid::{Grid, Position};

/// Alphabet actor symbols are drawn from.
const SYMBOLS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Draw a random actor symbol.
pub fn random_symbol<R: Rng + ?Sized>(rng: &mut R) -> char {
    SYMBOLS
        .get(rng.random_range(0..SYMBOLS.len()))
        .map_or('A', |b| char::from(*b))
}

/// Build a populated `size x size` grid with exactly one empty slot.
///
/// Actors are numbered in row-major order starting at zero and all start
/// with `vitality`.
pub fn create_starting_grid<R: Rng + ?Sized>(
    size: usize,
    vitality: u32,
    rng: &mut R,
) -> Result<Grid, GridError> {
    let mut grid = Grid::new(size)?;
    let mut next_id: u32 = 0;
    for pos in grid.positions() {
        let actor = Actor::new(ActorId(next_id), random_symbol(rng), vitality);
        grid.set(pos, Cell::Occupied(actor))?;
        next_id = next_id.checked_add(1).ok_or(GridError::ArithmeticOverflow)?;
    }

    let hole = Position::new(rng.random_range(0..size), rng.random_range(0..size));
    grid.set(hole, Cell::Empty)?;

    debug!(
        size,
        vitality,
        empty = %hole,
        actors = grid.occupied_count(),
        "Starting grid populated"
    );
    Ok(grid)
}
