//! Policy types shared by the three solvers and the step arbitrator.

use std::collections::BTreeSet;
use std::fmt;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::grid::Move;
use crate::product::ProductState;

/// Tie-preserving move choice at one state. `BTreeSet` keeps the moves in a
/// fixed order so uniform sampling is reproducible under a fixed seed.
pub type MoveSet = BTreeSet<Move>;

/// Map from product state to the moves a solver allows there.
pub type Policy = FxHashMap<ProductState, MoveSet>;

/// Which policy the arbitrator applied for an agent on its last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Safety-compatible almost-sure reachability policy.
    AlmostSure,
    /// Discounted-reward value-iteration fallback.
    MaxSat,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::AlmostSure => f.write_str("Almost Sure"),
            PolicyKind::MaxSat => f.write_str("MaxSat"),
        }
    }
}
