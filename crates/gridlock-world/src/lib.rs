//! Grid, cell entities, and move planning for the Gridlock simulation.
//!
//! This crate models the board itself and nothing about threads: a square
//! grid whose slots each hold exactly one [`Cell`], the [`Actor`]s that move
//! between slots, and the pure functions that decide where an actor may go.
//! Synchronization lives in `gridlock-core`.
//!
//! # Modules
//!
//! - [`cell`] -- [`Cell`] sum type, [`Actor`] and [`ActorId`].
//! - [`error`] -- Error types for grid operations.
//! - [`grid`] -- [`Grid`] storage with per-slot occupancy claims.
//! - [`planner`] -- Orthogonal neighbour candidates, bounds filtering and
//!   uniform destination choice.
//! - [`starting_grid`] -- Random population with a single empty slot.

pub mod cell;
pub mod error;
pub mod grid;
pub mod planner;
pub mod starting_grid;

// Re-export primary types at crate root.
pub use cell::{Actor, ActorId, Cell, DEFAULT_VITALITY};
pub use error::GridError;
pub use grid::{Grid, Position};
pub use planner::{Candidate, candidate_destinations, choose_destination, filter_valid, plan_moves};
pub use starting_grid::create_starting_grid;
