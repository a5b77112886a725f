//! The square grid that owns every cell.
//!
//! [`Grid`] stores `size * size` cells in row-major order together with one
//! occupancy claim per slot. It does no locking of its own: the coordinator
//! wraps it in a single shared lock and every read or write goes through
//! that lock.
//!
//! Cells change kind by replacement. [`Grid::set`] and [`Grid::take`] swap
//! the entity in a slot and hand back the previous one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::{Actor, Cell};
use crate::error::GridError;

/// A coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Zero-based row.
    pub row: usize,
    /// Zero-based column.
    pub col: usize,
}

impl Position {
    /// Create a position.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Fixed-size square grid of cells.
///
/// Only [`Grid::new`] builds one, so `size >= 1` and both vectors are always
/// `size * size` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// Side length.
    size: usize,
    /// Row-major cells, `size * size` long.
    cells: Vec<Cell>,
    /// Per-slot occupancy claims, parallel to `cells`.
    claims: Vec<bool>,
}

impl Grid {
    /// Create an all-empty grid of `size x size` cells.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::EmptyGrid`] for `size == 0` and
    /// [`GridError::ArithmeticOverflow`] if the cell count does not fit in
    /// `usize`.
    pub fn new(size: usize) -> Result<Self, GridError> {
        if size == 0 {
            return Err(GridError::EmptyGrid);
        }
        let len = size.checked_mul(size).ok_or(GridError::ArithmeticOverflow)?;
        Ok(Self {
            size,
            cells: vec![Cell::Empty; len],
            claims: vec![false; len],
        })
    }

    /// Side length of the grid.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Whether `pos` lies on the grid.
    pub const fn contains(&self, pos: Position) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    fn index(&self, pos: Position) -> Result<usize, GridError> {
        if !self.contains(pos) {
            return Err(GridError::OutOfBounds {
                position: pos,
                size: self.size,
            });
        }
        pos.row
            .checked_mul(self.size)
            .and_then(|base| base.checked_add(pos.col))
            .ok_or(GridError::ArithmeticOverflow)
    }

    /// The cell at `pos`, or `None` when off the grid.
    pub fn get(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).ok().and_then(|i| self.cells.get(i))
    }

    /// Mutable access to the cell at `pos`.
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        let i = self.index(pos).ok()?;
        self.cells.get_mut(i)
    }

    /// Replace the cell at `pos`, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if `pos` is off the grid.
    pub fn set(&mut self, pos: Position, cell: Cell) -> Result<Cell, GridError> {
        let i = self.index(pos)?;
        let slot = self.cells.get_mut(i).ok_or(GridError::OutOfBounds {
            position: pos,
            size: self.size,
        })?;
        Ok(std::mem::replace(slot, cell))
    }

    /// Take the cell at `pos`, leaving a fresh [`Cell::Empty`] behind.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if `pos` is off the grid.
    pub fn take(&mut self, pos: Position) -> Result<Cell, GridError> {
        self.set(pos, Cell::Empty)
    }

    /// Whether a move into `pos` is currently being committed.
    ///
    /// Positions off the grid are never claimed.
    pub fn is_claimed(&self, pos: Position) -> bool {
        self.index(pos)
            .ok()
            .and_then(|i| self.claims.get(i).copied())
            .unwrap_or(false)
    }

    /// Set or clear the occupancy claim on `pos`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if `pos` is off the grid.
    pub fn set_claim(&mut self, pos: Position, claimed: bool) -> Result<(), GridError> {
        let i = self.index(pos)?;
        if let Some(flag) = self.claims.get_mut(i) {
            *flag = claimed;
        }
        Ok(())
    }

    /// Number of claims currently held.
    pub fn claimed_count(&self) -> usize {
        self.claims.iter().filter(|c| **c).count()
    }

    /// Iterate over every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let size = self.size;
        (0..size).flat_map(move |row| (0..size).map(move |col| Position::new(row, col)))
    }

    /// Iterate over `(position, cell)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> {
        self.positions().zip(self.cells.iter())
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// The sole remaining actor, if exactly one cell is occupied.
    pub fn survivor(&self) -> Option<(Position, &Actor)> {
        let mut occupied = self
            .iter()
            .filter_map(|(pos, cell)| cell.actor().map(|actor| (pos, actor)));
        let first = occupied.next()?;
        if occupied.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Render each row as the cell symbols, each followed by a space.
    pub fn render_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.size)
            .map(|row| {
                let mut line = String::with_capacity(row.len().saturating_mul(2));
                for cell in row {
                    line.push(cell.symbol());
                    line.push(' ');
                }
                line
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cell::ActorId;

    fn actor(id: u32, symbol: char) -> Cell {
        Cell::Occupied(Actor::new(ActorId(id), symbol, 5))
    }

    #[test]
    fn zero_size_is_rejected() {
        assert_eq!(Grid::new(0), Err(GridError::EmptyGrid));
    }

    #[test]
    fn new_grid_is_all_empty() {
        let grid = Grid::new(3).unwrap();
        assert_eq!(grid.size(), 3);
        assert_eq!(grid.occupied_count(), 0);
        assert!(grid.iter().all(|(_, cell)| cell.is_empty()));
        assert_eq!(grid.positions().count(), 9);
    }

    #[test]
    fn set_returns_previous_cell() {
        let mut grid = Grid::new(2).unwrap();
        let pos = Position::new(1, 0);
        let prev = grid.set(pos, actor(1, 'A')).unwrap();
        assert!(prev.is_empty());
        let prev = grid.set(pos, Cell::Empty).unwrap();
        assert_eq!(prev.actor_id(), Some(ActorId(1)));
    }

    #[test]
    fn take_leaves_empty_behind() {
        let mut grid = Grid::new(2).unwrap();
        let pos = Position::new(0, 1);
        grid.set(pos, actor(4, 'D')).unwrap();
        let taken = grid.take(pos).unwrap();
        assert_eq!(taken.actor_id(), Some(ActorId(4)));
        assert!(grid.get(pos).unwrap().is_empty());
    }

    #[test]
    fn out_of_bounds_access() {
        let mut grid = Grid::new(2).unwrap();
        let off = Position::new(2, 0);
        assert!(grid.get(off).is_none());
        assert!(!grid.is_claimed(off));
        assert_eq!(
            grid.set(off, Cell::Empty),
            Err(GridError::OutOfBounds { position: off, size: 2 })
        );
        assert!(grid.set_claim(off, true).is_err());
    }

    #[test]
    fn claims_are_per_slot() {
        let mut grid = Grid::new(2).unwrap();
        let pos = Position::new(1, 1);
        grid.set_claim(pos, true).unwrap();
        assert!(grid.is_claimed(pos));
        assert!(!grid.is_claimed(Position::new(0, 0)));
        // Replacing the entity does not drop the claim.
        grid.set(pos, actor(2, 'B')).unwrap();
        assert!(grid.is_claimed(pos));
        assert_eq!(grid.claimed_count(), 1);
    }

    #[test]
    fn survivor_requires_exactly_one_actor() {
        let mut grid = Grid::new(2).unwrap();
        assert!(grid.survivor().is_none());
        grid.set(Position::new(1, 0), actor(3, 'C')).unwrap();
        let (pos, survivor) = grid.survivor().unwrap();
        assert_eq!(pos, Position::new(1, 0));
        assert_eq!(survivor.id, ActorId(3));
        grid.set(Position::new(0, 0), actor(4, 'D')).unwrap();
        assert!(grid.survivor().is_none());
    }

    #[test]
    fn render_rows_matches_layout() {
        let mut grid = Grid::new(2).unwrap();
        grid.set(Position::new(0, 0), actor(1, 'A')).unwrap();
        grid.set(Position::new(1, 1), actor(2, 'Z')).unwrap();
        assert_eq!(grid.render_rows(), vec!["A * ".to_owned(), "* Z ".to_owned()]);
    }
}
