//! Cell entities: the empty marker and the actors that move between cells.
//!
//! Every grid slot always holds exactly one [`Cell`]. An empty slot is the
//! [`Cell::Empty`] variant rather than the absence of a value, so a reader
//! never has to handle a missing entity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::Position;

/// Vitality an actor starts with unless configured otherwise.
pub const DEFAULT_VITALITY: u32 = 5;

/// Symbol printed for an empty cell.
pub const EMPTY_SYMBOL: char = '*';

/// Identity of an actor, assigned once when the grid is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0)
    }
}

/// A mobile occupant of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identity used to detect that a slot changed hands.
    pub id: ActorId,
    /// Display symbol.
    pub symbol: char,
    /// Remaining vitality. Decremented per relocation, never below zero.
    pub vitality: u32,
    /// Destinations last planned for this actor.
    pub valid_moves: Vec<Position>,
}

impl Actor {
    /// Create an actor with no planned moves.
    pub const fn new(id: ActorId, symbol: char, vitality: u32) -> Self {
        Self {
            id,
            symbol,
            vitality,
            valid_moves: Vec::new(),
        }
    }

    /// Spend one point of vitality for a relocation.
    ///
    /// Saturates at zero. Returns the remaining vitality.
    pub const fn spend_vitality(&mut self) -> u32 {
        self.vitality = self.vitality.saturating_sub(1);
        self.vitality
    }

    /// Whether the actor has no vitality left.
    pub const fn is_exhausted(&self) -> bool {
        self.vitality == 0
    }
}

/// The entity held by one grid slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// Nobody is here.
    #[default]
    Empty,
    /// An actor occupies the slot.
    Occupied(Actor),
}

impl Cell {
    /// Whether the slot is empty.
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The occupying actor, if any.
    pub const fn actor(&self) -> Option<&Actor> {
        match self {
            Self::Empty => None,
            Self::Occupied(actor) => Some(actor),
        }
    }

    /// Identity of the occupying actor, if any.
    pub fn actor_id(&self) -> Option<ActorId> {
        self.actor().map(|a| a.id)
    }

    /// Symbol shown when the grid is rendered.
    pub const fn symbol(&self) -> char {
        match self {
            Self::Empty => EMPTY_SYMBOL,
            Self::Occupied(actor) => actor.symbol,
        }
    }
}
