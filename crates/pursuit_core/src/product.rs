//! Product transition system over ordered (self, other) cell pairs.
//!
//! One shared relation serves both agents: an edge carries the move of the
//! "self" coordinate and the disturbance probability of the "other"
//! coordinate making the matching move. Each player queries the same graph
//! by swapping which coordinate is "self" ([`Player::product_state`]).
//!
//! State-keyed maps use `fxhash`: a version-stable hasher keeps iteration
//! behavior reproducible across toolchains, which matters for seeded runs.

use std::collections::VecDeque;
use std::fmt;

use fxhash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Grid, Move, MoveGraph};
use crate::policy::MoveSet;

/// The two agents of the pursuit game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Evader,
    Pursuer,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::Evader => Player::Pursuer,
            Player::Pursuer => Player::Evader,
        }
    }

    /// Thin typed view onto the shared product relation: the player's own
    /// cell goes into the first coordinate.
    pub fn product_state(self, evader: Cell, pursuer: Cell) -> ProductState {
        match self {
            Player::Evader => ProductState::new(evader, pursuer),
            Player::Pursuer => ProductState::new(pursuer, evader),
        }
    }

    /// The evader's cell as seen from this player's perspective of `state`.
    pub fn evader_cell(self, state: ProductState) -> Cell {
        match self {
            Player::Evader => state.own,
            Player::Pursuer => state.other,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Evader => f.write_str("evader"),
            Player::Pursuer => f.write_str("pursuer"),
        }
    }
}

/// Ordered joint position: (self cell, opponent cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductState {
    pub own: Cell,
    pub other: Cell,
}

impl ProductState {
    pub const fn new(own: Cell, other: Cell) -> Self {
        ProductState { own, other }
    }
}

impl fmt::Display for ProductState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} | {}]", self.own, self.other)
    }
}

/// Labeled product edge: self takes `mv`, the opponent makes the matching
/// move with probability `prob`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductEdge {
    pub to: ProductState,
    pub mv: Move,
    pub prob: f64,
}

/// The full (or restricted) product transition system.
#[derive(Debug, Clone, Default)]
pub struct ProductSystem {
    /// States in discovery order; drives deterministic fixed-point sweeps.
    states: Vec<ProductState>,
    succ: FxHashMap<ProductState, Vec<ProductEdge>>,
    pred: FxHashMap<ProductState, Vec<(ProductState, Move)>>,
}

impl ProductSystem {
    /// Exhaustive reachable-state expansion from `start`: worklist plus
    /// visited set. For connected grids this covers all (W*H)^2 states.
    pub fn build(grid: &Grid, graph: &MoveGraph, start: ProductState) -> Self {
        let mut sys = ProductSystem::default();
        let mut visited: FxHashSet<ProductState> = FxHashSet::default();
        let mut queue: VecDeque<ProductState> = VecDeque::new();

        visited.insert(start);
        queue.push_back(start);

        while let Some(state) = queue.pop_front() {
            sys.states.push(state);
            let mut edges = Vec::new();
            for &(own_mv, own_dest) in graph.successors(state.own) {
                for &(other_mv, other_dest) in graph.successors(state.other) {
                    let dest = ProductState::new(own_dest, other_dest);
                    edges.push(ProductEdge {
                        to: dest,
                        mv: own_mv,
                        prob: grid.disturbance_prob(state.other, other_mv),
                    });
                    if visited.insert(dest) {
                        queue.push_back(dest);
                    }
                }
            }
            sys.succ.insert(state, edges);
        }

        sys.rebuild_predecessors();
        sys
    }

    /// Test scaffolding: assemble a system from explicit edges. States are
    /// registered in first-appearance order.
    #[cfg(test)]
    pub(crate) fn from_edges(edges: &[(ProductState, Move, f64, ProductState)]) -> Self {
        let mut sys = ProductSystem::default();
        for &(from, mv, prob, to) in edges {
            for s in [from, to] {
                if !sys.succ.contains_key(&s) {
                    sys.states.push(s);
                    sys.succ.insert(s, Vec::new());
                }
            }
            sys.succ
                .get_mut(&from)
                .expect("registered above")
                .push(ProductEdge { to, mv, prob });
        }
        sys.rebuild_predecessors();
        sys
    }

    fn rebuild_predecessors(&mut self) {
        self.pred.clear();
        for &state in &self.states {
            self.pred.insert(state, Vec::new());
        }
        for &state in &self.states {
            for edge in &self.succ[&state] {
                if let Some(preds) = self.pred.get_mut(&edge.to) {
                    preds.push((state, edge.mv));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[ProductState] {
        &self.states
    }

    pub fn contains(&self, state: ProductState) -> bool {
        self.succ.contains_key(&state)
    }

    pub fn edges(&self, state: ProductState) -> &[ProductEdge] {
        self.succ.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges of `state` that stay inside the system (the expansion can
    /// record edges into states a restriction later dropped; those carry no
    /// guarantee and are skipped here).
    pub fn internal_edges(&self, state: ProductState) -> impl Iterator<Item = &ProductEdge> {
        self.edges(state).iter().filter(|e| self.contains(e.to))
    }

    pub fn predecessors(&self, state: ProductState) -> &[(ProductState, Move)] {
        self.pred.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Moves available at `state` (labels of its outgoing edges).
    pub fn available_moves(&self, state: ProductState) -> MoveSet {
        self.internal_edges(state).map(|e| e.mv).collect()
    }

    /// Subsystem induced by `keep`: surviving states keep their order,
    /// edges with both endpoints kept.
    pub fn restrict(&self, keep: &FxHashSet<ProductState>) -> ProductSystem {
        let mut sys = ProductSystem::default();
        for &state in &self.states {
            if !keep.contains(&state) {
                continue;
            }
            sys.states.push(state);
            let edges = self.succ[&state]
                .iter()
                .filter(|e| keep.contains(&e.to))
                .copied()
                .collect();
            sys.succ.insert(state, edges);
        }
        sys.rebuild_predecessors();
        sys
    }

    /// Human-readable edge listing for debugging.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for &state in &self.states {
            out.push_str(&format!("{state}:\n"));
            for edge in &self.succ[&state] {
                out.push_str(&format!("  --{} p={:.3}--> {}\n", edge.mv, edge.prob, edge.to));
            }
        }
        out
    }
}
