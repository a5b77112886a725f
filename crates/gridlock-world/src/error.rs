//! Error types for the `gridlock-world` crate.
//!
//! All fallible operations in this crate return [`GridError`] through the
//! standard [`Result`] type alias.

use crate::grid::Position;

/// Errors that can occur during grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// A position lies outside the grid.
    #[error("position {position} is outside a {size}x{size} grid")]
    OutOfBounds {
        /// The offending position.
        position: Position,
        /// Side length of the grid.
        size: usize,
    },

    /// A grid with zero cells was requested where at least one is required.
    #[error("grid size must be at least 1")]
    EmptyGrid,

    /// Arithmetic overflow while sizing the grid.
    #[error("arithmetic overflow in grid calculation")]
    ArithmeticOverflow,
}
