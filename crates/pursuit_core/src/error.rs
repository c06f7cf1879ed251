use thiserror::Error;

use crate::grid::Cell;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid grid dimensions: {width}x{height}")]
    InvalidGrid { width: i32, height: i32 },

    #[error("Cell {cell} is outside the {width}x{height} grid")]
    OutOfBounds { cell: Cell, width: i32, height: i32 },

    #[error("Invalid solve parameter: {0}")]
    InvalidParameter(String),

    #[error("Policies have not been computed yet; call solve() first")]
    NotSolved,

    #[error("Traps and goals are fixed once solve() has run; build a new game instead")]
    AlreadySolved,

    #[error("No candidate move for the {player} at product state {state}")]
    EmptyPolicy { player: String, state: String },

    #[error("Solver inconsistency: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
