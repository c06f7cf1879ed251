//! Discounted value iteration ("MaxSat" fallback policy).
//!
//! Terminal states hold their reward as a fixed value. Non-terminal states
//! take the max over available moves of
//! `Q(s,a) = sum over successors s' of prob * (reward(s') + gamma * V(s'))`.
//! Synchronous sweeps run until the largest state-wise change drops below
//! the tolerance. The greedy policy keeps every move whose Q ties the
//! maximum; terminal states get an empty move set.

use fxhash::{FxHashMap, FxHashSet};

use crate::grid::Move;
use crate::policy::{MoveSet, Policy};
use crate::product::{ProductState, ProductSystem};

/// Q values within this distance of the maximum count as tied. Terminal
/// payoffs are integer-scale, so this only merges genuine ties.
const TIE_TOLERANCE: f64 = 1e-9;

pub struct ValueIterationResult {
    pub values: FxHashMap<ProductState, f64>,
    pub policy: Policy,
}

pub fn value_iteration(
    sys: &ProductSystem,
    rewards: &FxHashMap<ProductState, f64>,
    terminal: &FxHashSet<ProductState>,
    gamma: f64,
    epsilon: f64,
) -> ValueIterationResult {
    let mut values: FxHashMap<ProductState, f64> =
        sys.states().iter().map(|&s| (s, 0.0)).collect();

    loop {
        let mut next = FxHashMap::default();
        let mut max_delta: f64 = 0.0;
        for &state in sys.states() {
            let v = if terminal.contains(&state) {
                rewards[&state]
            } else {
                best_q(sys, rewards, &values, gamma, state).1
            };
            max_delta = max_delta.max((v - values[&state]).abs());
            next.insert(state, v);
        }
        values = next;
        if max_delta < epsilon {
            break;
        }
    }

    let mut policy = Policy::default();
    for &state in sys.states() {
        if terminal.contains(&state) {
            policy.insert(state, MoveSet::new());
            continue;
        }
        let (qs, best) = best_q(sys, rewards, &values, gamma, state);
        let ties: MoveSet = qs
            .into_iter()
            .filter(|&(_, q)| (best - q).abs() <= TIE_TOLERANCE)
            .map(|(mv, _)| mv)
            .collect();
        policy.insert(state, ties);
    }

    ValueIterationResult { values, policy }
}

/// Q value of every available move at `state`, plus the maximum.
fn best_q(
    sys: &ProductSystem,
    rewards: &FxHashMap<ProductState, f64>,
    values: &FxHashMap<ProductState, f64>,
    gamma: f64,
    state: ProductState,
) -> (Vec<(Move, f64)>, f64) {
    let qs: Vec<(Move, f64)> = sys
        .available_moves(state)
        .into_iter()
        .map(|mv| {
            let q: f64 = sys
                .internal_edges(state)
                .filter(|e| e.mv == mv)
                .map(|e| e.prob * (rewards[&e.to] + gamma * values[&e.to]))
                .sum();
            (mv, q)
        })
        .collect();
    let best = qs.iter().map(|&(_, q)| q).fold(f64::NEG_INFINITY, f64::max);
    (qs, best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;

    fn state(x: i32) -> ProductState {
        ProductState::new(Cell::new(x, 0), Cell::new(9, 9))
    }

    /// Two-state acyclic chain A -> B, B terminal with reward R. The
    /// converged predecessor value is the one-step Bellman backup
    /// R + gamma * R: the arrival reward plus the discounted pinned value.
    #[test]
    fn acyclic_chain_converges_to_the_discounted_terminal_value() {
        let a = state(0);
        let b = state(1);
        let r = 1_000.0;
        let gamma = 0.9;
        let epsilon = 0.05;

        let sys = ProductSystem::from_edges(&[
            (a, Move::East, 1.0, b),
            (b, Move::Stay, 1.0, b),
        ]);
        let rewards: FxHashMap<ProductState, f64> = [(a, 0.0), (b, r)].into_iter().collect();
        let terminal: FxHashSet<ProductState> = [b].into_iter().collect();

        let result = value_iteration(&sys, &rewards, &terminal, gamma, epsilon);
        assert!((result.values[&b] - r).abs() < 1e-9, "terminal value pinned to its reward");
        assert!(
            (result.values[&a] - (r + gamma * r)).abs() < epsilon,
            "got {}",
            result.values[&a]
        );
        assert_eq!(result.policy[&a], [Move::East].into_iter().collect::<MoveSet>());
        assert!(result.policy[&b].is_empty(), "terminal states carry no policy moves");
    }

    #[test]
    fn stochastic_split_weights_successors_by_probability() {
        let a = state(0);
        let good = state(1);
        let bad = state(2);
        let sys = ProductSystem::from_edges(&[
            (a, Move::East, 0.25, good),
            (a, Move::East, 0.75, bad),
            (a, Move::Stay, 1.0, a),
            (good, Move::Stay, 1.0, good),
            (bad, Move::Stay, 1.0, bad),
        ]);
        let rewards: FxHashMap<ProductState, f64> =
            [(a, 0.0), (good, 1_000.0), (bad, -1_000.0)].into_iter().collect();
        let terminal: FxHashSet<ProductState> = [good, bad].into_iter().collect();

        let result = value_iteration(&sys, &rewards, &terminal, 0.9, 0.05);
        // East mixes 0.25 * 1900 + 0.75 * (-1900) < 0, so staying wins.
        assert_eq!(result.policy[&a], [Move::Stay].into_iter().collect::<MoveSet>());
    }

    #[test]
    fn ties_are_kept_in_the_greedy_policy() {
        let a = state(0);
        let left = state(1);
        let right = state(2);
        let sys = ProductSystem::from_edges(&[
            (a, Move::West, 1.0, left),
            (a, Move::East, 1.0, right),
            (left, Move::Stay, 1.0, left),
            (right, Move::Stay, 1.0, right),
        ]);
        let rewards: FxHashMap<ProductState, f64> =
            [(a, 0.0), (left, 500.0), (right, 500.0)].into_iter().collect();
        let terminal: FxHashSet<ProductState> = [left, right].into_iter().collect();

        let result = value_iteration(&sys, &rewards, &terminal, 0.9, 0.05);
        let expected: MoveSet = [Move::West, Move::East].into_iter().collect();
        assert_eq!(result.policy[&a], expected);
    }
}
