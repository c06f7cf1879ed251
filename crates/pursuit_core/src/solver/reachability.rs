//! Almost-sure reachability attractor.
//!
//! Computes, on a restricted product system (the opponent's unconditional
//! danger closure already removed), the maximal state set from which some
//! policy forces goal arrival with probability 1, plus the witnessing
//! moves. The rule is existential, unlike the safety solver's universal
//! one: a single sufficient edge per step is enough.
//!
//! Two nested fixed points. The inner one expands predecessors backward
//! from the goal set, recording the move that discovered each state. The
//! outer one restricts the system to the discovered set and repeats:
//! discovered states may still have edges leaving the restriction, which
//! would break the probability-1 guarantee. The inner rounds are capped;
//! running past the cap reports non-convergence with the best partial
//! result instead of looping.

use fxhash::FxHashSet;

use crate::policy::{MoveSet, Policy};
use crate::product::{ProductState, ProductSystem};

pub struct ReachOutcome {
    /// States with a probability-1 route to the goal set.
    pub states: FxHashSet<ProductState>,
    /// Witnessing moves per state in `states`; empty at goal states.
    pub policy: Policy,
    /// False when the round cap was exceeded; `states` and `policy` then
    /// hold the best partial result.
    pub converged: bool,
}

pub fn almost_sure_attractor(
    restricted: &ProductSystem,
    goal_set: &FxHashSet<ProductState>,
    round_cap: usize,
) -> ReachOutcome {
    let mut sys = restricted.clone();
    let mut rounds = 0usize;

    loop {
        let (reach, policy, capped) = backward_expand(&sys, goal_set, round_cap, &mut rounds);
        if capped {
            log::warn!(
                "reachability attractor: round cap {round_cap} exceeded, \
                 returning partial result ({} states)",
                reach.len()
            );
            return ReachOutcome { states: reach, policy, converged: false };
        }
        if reach.len() == sys.len() {
            return ReachOutcome { states: reach, policy, converged: true };
        }
        sys = sys.restrict(&reach);
    }
}

/// Inner fixed point: predecessor expansion from the goal set. Returns the
/// discovered set, the discovery policy, and whether the cap was hit.
fn backward_expand(
    sys: &ProductSystem,
    goal_set: &FxHashSet<ProductState>,
    round_cap: usize,
    rounds: &mut usize,
) -> (FxHashSet<ProductState>, Policy, bool) {
    let mut reach: FxHashSet<ProductState> = FxHashSet::default();
    let mut policy: Policy =
        sys.states().iter().map(|&s| (s, MoveSet::new())).collect();

    // Deterministic sweep order: system state order, goals first.
    let mut frontier: Vec<ProductState> = Vec::new();
    for &state in sys.states() {
        if goal_set.contains(&state) {
            reach.insert(state);
            frontier.push(state);
        }
    }

    while !frontier.is_empty() {
        *rounds += 1;
        if *rounds > round_cap {
            return (reach, policy, true);
        }
        let mut next = Vec::new();
        for &state in &frontier {
            for &(pred, mv) in sys.predecessors(state) {
                if reach.insert(pred) {
                    if let Some(moves) = policy.get_mut(&pred) {
                        moves.insert(mv);
                    }
                    next.push(pred);
                }
            }
        }
        frontier = next;
    }

    (reach, policy, false)
}
