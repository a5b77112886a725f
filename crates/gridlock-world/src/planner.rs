//! Move planning: which cells an actor may step into.
//!
//! Planning is two pure steps. [`candidate_destinations`] lists the four
//! orthogonal neighbours with signed coordinates, so cells past the top or
//! left edge show up as negative values. [`filter_valid`] then keeps only
//! the candidates that land on the grid. Picking one of the survivors is a
//! single uniform draw in [`choose_destination`].

use rand::Rng;

use crate::grid::Position;

/// Row and column offsets for up, down, left and right, in that order.
pub const ORTHOGONAL_OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// An unfiltered destination that may lie off the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Signed row.
    pub row: isize,
    /// Signed column.
    pub col: isize,
}

impl Candidate {
    /// Convert to a grid position if the candidate lies in `[0, size)` on
    /// both axes.
    pub fn to_position(self, size: usize) -> Option<Position> {
        let row = usize::try_from(self.row).ok().filter(|r| *r < size)?;
        let col = usize::try_from(self.col).ok().filter(|c| *c < size)?;
        Some(Position::new(row, col))
    }
}

/// The four orthogonal neighbours of `origin`, unfiltered.
pub fn candidate_destinations(origin: Position) -> [Candidate; 4] {
    let row = isize::try_from(origin.row).unwrap_or(isize::MAX);
    let col = isize::try_from(origin.col).unwrap_or(isize::MAX);
    ORTHOGONAL_OFFSETS.map(|(dr, dc)| Candidate {
        row: row.saturating_add(dr),
        col: col.saturating_add(dc),
    })
}

/// Drop every candidate outside a `size x size` grid.
pub fn filter_valid(candidates: &[Candidate], size: usize) -> Vec<Position> {
    candidates
        .iter()
        .filter_map(|c| c.to_position(size))
        .collect()
}

/// In-bounds orthogonal neighbours of `origin`.
pub fn plan_moves(origin: Position, size: usize) -> Vec<Position> {
    filter_valid(&candidate_destinations(origin), size)
}

/// Pick one destination uniformly at random. `None` if there is nowhere to go.
pub fn choose_destination<R: Rng + ?Sized>(moves: &[Position], rng: &mut R) -> Option<Position> {
    if moves.is_empty() {
        return None;
    }
    moves.get(rng.random_range(0..moves.len())).copied()
}
