//! Worst-case safety attractor.
//!
//! Given an unsafe target set F, computes the minimal closure X of F under
//! the universal rule: a state joins X when *every* move available there
//! has at least one edge into X, so no move is certain to avoid the danger.
//! Probability magnitudes are irrelevant; any positive-probability edge
//! counts as a risk. The byproduct is an avoidance policy: per state
//! outside the closure, the moves with no edge into it.

use fxhash::FxHashSet;

use crate::policy::{MoveSet, Policy};
use crate::product::{ProductState, ProductSystem};

pub struct SafetyResult {
    /// The worst-case-unavoidable-danger region (closure of the target).
    pub closure: FxHashSet<ProductState>,
    /// Moves per state that avoid the closure; empty inside it.
    pub policy: Policy,
}

pub fn unconditional_attractor(
    sys: &ProductSystem,
    unsafe_set: &FxHashSet<ProductState>,
) -> SafetyResult {
    let mut closure: FxHashSet<ProductState> =
        unsafe_set.iter().copied().filter(|s| sys.contains(*s)).collect();

    // Monotone backward fixed point, synchronous rounds. Bounded by the
    // state count: every round either grows the closure or terminates.
    loop {
        let mut added = Vec::new();
        for &state in sys.states() {
            if closure.contains(&state) {
                continue;
            }
            let available = sys.available_moves(state);
            let risky = risky_moves(sys, state, &closure);
            if risky == available {
                added.push(state);
            }
        }
        if added.is_empty() {
            break;
        }
        closure.extend(added);
    }

    // Avoidance policy against the final closure.
    let mut policy = Policy::default();
    for &state in sys.states() {
        if closure.contains(&state) {
            policy.insert(state, MoveSet::new());
            continue;
        }
        let mut safe = sys.available_moves(state);
        for mv in risky_moves(sys, state, &closure) {
            safe.remove(&mv);
        }
        policy.insert(state, safe);
    }

    SafetyResult { closure, policy }
}

/// Moves at `state` with at least one edge into `target`.
fn risky_moves(
    sys: &ProductSystem,
    state: ProductState,
    target: &FxHashSet<ProductState>,
) -> MoveSet {
    sys.internal_edges(state).filter(|e| target.contains(&e.to)).map(|e| e.mv).collect()
}
