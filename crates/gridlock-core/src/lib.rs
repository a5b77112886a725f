//! Shared-grid coordination, termination monitor, and run loop for the
//! Gridlock simulation.
//!
//! Several mover workers share one grid behind a single lock. Each worker
//! repeatedly claims a random source cell, claims a neighbouring
//! destination, and commits the move, parking on a shared condition
//! variable whenever another worker holds the cell it needs. A monitor ends
//! the run once at most one actor is left.
//!
//! # Modules
//!
//! - [`board`] -- [`SharedBoard`]: grid and in-flight set behind one
//!   mutex/condvar pair, plus [`commit_move`].
//! - [`config`] -- Configuration loading from `gridlock-config.yaml` into
//!   strongly-typed structs.
//! - [`control`] -- [`RunControl`]: running flag, end reason, stop signal.
//! - [`monitor`] -- Periodic convergence check.
//! - [`mover`] -- The mover worker loop and move statistics.
//! - [`render`] -- Frame formatting and the periodic renderer.
//! - [`runner`] -- Spawns every task and reports the result.
//!
//! [`SharedBoard`]: board::SharedBoard
//! [`commit_move`]: board::commit_move
//! [`RunControl`]: control::RunControl

pub mod board;
pub mod config;
pub mod control;
pub mod monitor;
pub mod mover;
pub mod render;
pub mod runner;
