//! Per-player terminal payoffs over product states.
//!
//! Terminal conditions are evaluated with a fixed precedence: capture
//! (coordinates equal) beats trap beats goal; everything else is neutral.
//! Trap and goal membership is always tested against the evader's cell:
//! the pursuer wins when the *evader* is trapped, and loses when the evader
//! reaches a goal, no matter where the pursuer itself stands.

use fxhash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::grid::Cell;
use crate::product::{Player, ProductState, ProductSystem};

/// Terminal classification of a product state, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Capture,
    Trap,
    Goal,
    Neutral,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Outcome::Neutral
    }
}

/// Classify `state` as seen from `player`'s side of the product relation.
pub fn outcome_for(
    player: Player,
    state: ProductState,
    traps: &FxHashSet<Cell>,
    goals: &FxHashSet<Cell>,
) -> Outcome {
    let evader = player.evader_cell(state);
    if state.own == state.other {
        Outcome::Capture
    } else if traps.contains(&evader) {
        Outcome::Trap
    } else if goals.contains(&evader) {
        Outcome::Goal
    } else {
        Outcome::Neutral
    }
}

/// Terminal payoffs for one player. Magnitudes must dominate 1/(1-gamma)
/// so the discounted values order terminal outcomes ahead of any path
/// shaping (intermediate reward is zero).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    pub capture: f64,
    pub trap: f64,
    pub goal: f64,
}

impl RewardConfig {
    /// The evader loses on capture or trap, wins on goal.
    pub fn evader_default() -> Self {
        RewardConfig { capture: -1_000_000.0, trap: -1_000_000.0, goal: 1_000.0 }
    }

    /// The pursuer wins on capture or trap, loses on goal.
    pub fn pursuer_default() -> Self {
        RewardConfig { capture: 1_000.0, trap: 1_000.0, goal: -1_000_000.0 }
    }

    pub fn payoff(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Capture => self.capture,
            Outcome::Trap => self.trap,
            Outcome::Goal => self.goal,
            Outcome::Neutral => 0.0,
        }
    }
}

/// Total reward map over the product states, from `player`'s perspective.
pub fn reward_table(
    player: Player,
    sys: &ProductSystem,
    traps: &FxHashSet<Cell>,
    goals: &FxHashSet<Cell>,
    config: &RewardConfig,
) -> FxHashMap<ProductState, f64> {
    sys.states()
        .iter()
        .map(|&s| (s, config.payoff(outcome_for(player, s, traps, goals))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets(traps: &[Cell], goals: &[Cell]) -> (FxHashSet<Cell>, FxHashSet<Cell>) {
        (traps.iter().copied().collect(), goals.iter().copied().collect())
    }

    #[test]
    fn capture_takes_precedence_over_trap_and_goal() {
        let c = Cell::new(1, 1);
        let (traps, goals) = sets(&[c], &[c]);
        // Both agents on a cell that is simultaneously a trap and a goal.
        let state = ProductState::new(c, c);
        assert_eq!(outcome_for(Player::Evader, state, &traps, &goals), Outcome::Capture);
        assert_eq!(outcome_for(Player::Pursuer, state, &traps, &goals), Outcome::Capture);
    }

    #[test]
    fn trap_takes_precedence_over_goal() {
        let c = Cell::new(0, 2);
        let (traps, goals) = sets(&[c], &[c]);
        let state = ProductState::new(c, Cell::new(2, 0));
        assert_eq!(outcome_for(Player::Evader, state, &traps, &goals), Outcome::Trap);
    }

    #[test]
    fn trap_and_goal_track_the_evader_cell_for_both_players() {
        let trap = Cell::new(1, 0);
        let goal = Cell::new(2, 2);
        let (traps, goals) = sets(&[trap], &[goal]);

        // Pursuer standing on a trap is not a terminal condition.
        let s = Player::Pursuer.product_state(Cell::new(0, 0), trap);
        assert_eq!(outcome_for(Player::Pursuer, s, &traps, &goals), Outcome::Neutral);

        // Evader on a trap terminates from both perspectives.
        let s = Player::Pursuer.product_state(trap, Cell::new(0, 0));
        assert_eq!(outcome_for(Player::Pursuer, s, &traps, &goals), Outcome::Trap);
        let s = Player::Evader.product_state(trap, Cell::new(0, 0));
        assert_eq!(outcome_for(Player::Evader, s, &traps, &goals), Outcome::Trap);

        // Same for goals.
        let s = Player::Pursuer.product_state(goal, Cell::new(0, 0));
        assert_eq!(outcome_for(Player::Pursuer, s, &traps, &goals), Outcome::Goal);
    }

    #[test]
    fn payoffs_follow_the_outcome() {
        let evader = RewardConfig::evader_default();
        let pursuer = RewardConfig::pursuer_default();
        assert!(evader.payoff(Outcome::Capture) < 0.0);
        assert!(evader.payoff(Outcome::Goal) > 0.0);
        assert_eq!(evader.payoff(Outcome::Neutral), 0.0);
        assert!(pursuer.payoff(Outcome::Capture) > 0.0);
        assert!(pursuer.payoff(Outcome::Goal) < 0.0);
    }
}
