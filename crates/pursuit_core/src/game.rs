//! Game facade: construction, one-shot solving, and the step operation.
//!
//! Construction and solving are a batch phase; the product system, reward
//! tables and policies are computed once and read-only afterwards. The
//! only state the step operation mutates is the two agents' runtime state
//! (cell, win flag, last-used policy label). Re-solving with a different
//! configuration means building a fresh instance.

use fxhash::{FxHashMap, FxHashSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{Cell, Grid, Move, MoveGraph};
use crate::policy::{Policy, PolicyKind};
use crate::product::{Player, ProductState, ProductSystem};
use crate::reward::{outcome_for, reward_table, Outcome, RewardConfig};
use crate::solver::{almost_sure_attractor, unconditional_attractor, value_iteration};

const DEFAULT_SEED: u64 = 0;

/// Solver configuration. Defaults mirror the classic setup: gamma 0.9,
/// tolerance 0.05, reachability round cap 1000.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveParams {
    pub gamma: f64,
    pub epsilon: f64,
    pub reach_round_cap: usize,
    pub evader_rewards: RewardConfig,
    pub pursuer_rewards: RewardConfig,
}

impl Default for SolveParams {
    fn default() -> Self {
        SolveParams {
            gamma: 0.9,
            epsilon: 0.05,
            reach_round_cap: 1_000,
            evader_rewards: RewardConfig::evader_default(),
            pursuer_rewards: RewardConfig::pursuer_default(),
        }
    }
}

impl SolveParams {
    fn validate(&self) -> Result<()> {
        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "gamma must lie in (0, 1), got {}",
                self.gamma
            )));
        }
        if self.epsilon <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Solve diagnostics: unsafe-region sizes and reachability convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    pub total_states: usize,
    pub evader_unsafe_states: usize,
    pub pursuer_unsafe_states: usize,
    pub evader_reach_converged: bool,
    pub pursuer_reach_converged: bool,
}

/// One agent's move within a step report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentStep {
    pub mv: Move,
    pub policy: PolicyKind,
}

/// Result of one step: the moves taken (absent when the game was already
/// over) and the winner, if the step ended the game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepReport {
    pub evader: Option<AgentStep>,
    pub pursuer: Option<AgentStep>,
    pub winner: Option<Player>,
}

/// Serializable board view for a rendering front end.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub width: i32,
    pub height: i32,
    pub evader: Cell,
    pub pursuer: Cell,
    pub traps: Vec<Cell>,
    pub goals: Vec<Cell>,
    pub evader_policy: Option<PolicyKind>,
    pub pursuer_policy: Option<PolicyKind>,
    pub winner: Option<Player>,
}

/// Everything solved for one player. Write-once.
#[derive(Debug)]
struct PlayerSolution {
    unsafe_region: FxHashSet<ProductState>,
    safety_policy: Policy,
    reach_states: FxHashSet<ProductState>,
    reach_policy: Policy,
    reach_converged: bool,
    maxsat_policy: Policy,
    values: FxHashMap<ProductState, f64>,
}

#[derive(Debug)]
struct Solution {
    evader: PlayerSolution,
    pursuer: PlayerSolution,
    params: SolveParams,
    stats: SolveStats,
}

impl Solution {
    fn for_player(&self, player: Player) -> &PlayerSolution {
        match player {
            Player::Evader => &self.evader,
            Player::Pursuer => &self.pursuer,
        }
    }
}

/// Per-agent runtime state, the only data mutated after construction.
#[derive(Debug, Clone, Copy)]
struct AgentState {
    cell: Cell,
    won: bool,
    policy_in_use: Option<PolicyKind>,
}

impl AgentState {
    fn at(cell: Cell) -> Self {
        AgentState { cell, won: false, policy_in_use: None }
    }
}

/// The two-agent grid pursuit game and its synthesis engine.
#[derive(Debug)]
pub struct PursuitGame {
    grid: Grid,
    graph: MoveGraph,
    product: ProductSystem,
    traps: FxHashSet<Cell>,
    goals: FxHashSet<Cell>,
    solution: Option<Solution>,
    evader: AgentState,
    pursuer: AgentState,
    rng: ChaCha8Rng,
}

impl PursuitGame {
    pub fn new(width: i32, height: i32, evader_start: Cell, pursuer_start: Cell) -> Result<Self> {
        Self::with_seed(width, height, evader_start, pursuer_start, DEFAULT_SEED)
    }

    /// Like [`PursuitGame::new`] with an explicit sampling seed; a fixed
    /// seed makes repeated runs reproduce the same move sequence.
    pub fn with_seed(
        width: i32,
        height: i32,
        evader_start: Cell,
        pursuer_start: Cell,
        seed: u64,
    ) -> Result<Self> {
        let grid = Grid::new(width, height)?;
        for start in [evader_start, pursuer_start] {
            if !grid.contains(start) {
                return Err(Error::OutOfBounds { cell: start, width, height });
            }
        }
        let graph = MoveGraph::build(&grid);
        let product =
            ProductSystem::build(&grid, &graph, ProductState::new(evader_start, pursuer_start));
        log::debug!("product transition system built: {} states", product.len());

        Ok(PursuitGame {
            grid,
            graph,
            product,
            traps: FxHashSet::default(),
            goals: FxHashSet::default(),
            solution: None,
            evader: AgentState::at(evader_start),
            pursuer: AgentState::at(pursuer_start),
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Replace the trap set. Must run before [`PursuitGame::solve`].
    pub fn set_traps(&mut self, cells: &[Cell]) -> Result<()> {
        self.set_cells(cells, true)
    }

    /// Replace the goal set. Must run before [`PursuitGame::solve`].
    pub fn set_goals(&mut self, cells: &[Cell]) -> Result<()> {
        self.set_cells(cells, false)
    }

    fn set_cells(&mut self, cells: &[Cell], traps: bool) -> Result<()> {
        if self.solution.is_some() {
            return Err(Error::AlreadySolved);
        }
        for &cell in cells {
            if !self.grid.contains(cell) {
                return Err(Error::OutOfBounds {
                    cell,
                    width: self.grid.width(),
                    height: self.grid.height(),
                });
            }
        }
        let target = if traps { &mut self.traps } else { &mut self.goals };
        target.clear();
        target.extend(cells.iter().copied());
        Ok(())
    }

    /// Run all three solvers for both players. Idempotent: a second call
    /// with the same parameters returns the stored diagnostics without
    /// recomputing; different parameters are rejected, since the policies
    /// are write-once.
    pub fn solve(&mut self) -> Result<()> {
        self.solve_with_params(SolveParams::default()).map(|_| ())
    }

    pub fn solve_with_params(&mut self, params: SolveParams) -> Result<SolveStats> {
        if let Some(solution) = &self.solution {
            if solution.params == params {
                return Ok(solution.stats);
            }
            return Err(Error::AlreadySolved);
        }
        params.validate()?;

        let evader = self.solve_player(Player::Evader, &params);
        let pursuer = self.solve_player(Player::Pursuer, &params);

        let stats = SolveStats {
            total_states: self.product.len(),
            evader_unsafe_states: evader.unsafe_region.len(),
            pursuer_unsafe_states: pursuer.unsafe_region.len(),
            evader_reach_converged: evader.reach_converged,
            pursuer_reach_converged: pursuer.reach_converged,
        };
        log::info!(
            "{} of {} states are in the evader's unsafe region",
            stats.evader_unsafe_states,
            stats.total_states
        );
        log::info!(
            "{} of {} states are in the pursuer's unsafe region",
            stats.pursuer_unsafe_states,
            stats.total_states
        );

        self.solution = Some(Solution { evader, pursuer, params, stats });
        Ok(stats)
    }

    fn solve_player(&self, player: Player, params: &SolveParams) -> PlayerSolution {
        let config = match player {
            Player::Evader => params.evader_rewards,
            Player::Pursuer => params.pursuer_rewards,
        };

        // MaxSat fallback first, on the full system.
        let rewards = reward_table(player, &self.product, &self.traps, &self.goals, &config);
        let terminal: FxHashSet<ProductState> = self
            .product
            .states()
            .iter()
            .copied()
            .filter(|&s| self.outcome(player, s).is_terminal())
            .collect();
        let vi = value_iteration(&self.product, &rewards, &terminal, params.gamma, params.epsilon);

        // Safety shield: closure of the player's losing terminals.
        let losing: FxHashSet<ProductState> = self
            .product
            .states()
            .iter()
            .copied()
            .filter(|&s| self.is_losing(player, s))
            .collect();
        let safety = unconditional_attractor(&self.product, &losing);

        // Almost-sure reachability on the safety-restricted system.
        let keep: FxHashSet<ProductState> = self
            .product
            .states()
            .iter()
            .copied()
            .filter(|s| !safety.closure.contains(s))
            .collect();
        let restricted = self.product.restrict(&keep);
        let goal_states: FxHashSet<ProductState> = restricted
            .states()
            .iter()
            .copied()
            .filter(|&s| self.is_winning(player, s))
            .collect();
        let reach = almost_sure_attractor(&restricted, &goal_states, params.reach_round_cap);
        if !reach.converged {
            log::warn!("{player}: almost-sure reachability did not converge within the cap");
        }

        PlayerSolution {
            unsafe_region: safety.closure,
            safety_policy: safety.policy,
            reach_states: reach.states,
            reach_policy: reach.policy,
            reach_converged: reach.converged,
            maxsat_policy: vi.policy,
            values: vi.values,
        }
    }

    fn outcome(&self, player: Player, state: ProductState) -> Outcome {
        outcome_for(player, state, &self.traps, &self.goals)
    }

    fn is_losing(&self, player: Player, state: ProductState) -> bool {
        let outcome = self.outcome(player, state);
        match player {
            Player::Evader => matches!(outcome, Outcome::Capture | Outcome::Trap),
            Player::Pursuer => matches!(outcome, Outcome::Goal),
        }
    }

    fn is_winning(&self, player: Player, state: ProductState) -> bool {
        let outcome = self.outcome(player, state);
        outcome.is_terminal() && !self.is_losing(player, state)
    }

    /// Advance both agents one step: evader first against the pursuer's
    /// pre-move cell, then the pursuer against the evader's updated cell.
    /// Terminal conditions are checked only after both have moved. A
    /// failed step leaves the agents where they were.
    pub fn step(&mut self) -> Result<StepReport> {
        if self.solution.is_none() {
            return Err(Error::NotSolved);
        }
        if self.is_over() {
            return Ok(StepReport { evader: None, pursuer: None, winner: self.winner() });
        }

        let saved = (self.evader, self.pursuer);
        match self.advance_both() {
            Ok(report) => Ok(report),
            Err(err) => {
                self.evader = saved.0;
                self.pursuer = saved.1;
                Err(err)
            }
        }
    }

    fn advance_both(&mut self) -> Result<StepReport> {
        let evader_step = self.advance(Player::Evader)?;
        let pursuer_step = self.advance(Player::Pursuer)?;

        let state = ProductState::new(self.evader.cell, self.pursuer.cell);
        match self.outcome(Player::Evader, state) {
            Outcome::Capture => {
                self.pursuer.won = true;
                log::info!("game over: the pursuer caught the evader at {}", self.evader.cell);
            }
            Outcome::Trap => {
                self.pursuer.won = true;
                log::info!("game over: the evader hit a trap at {}", self.evader.cell);
            }
            Outcome::Goal => {
                self.evader.won = true;
                log::info!("game over: the evader reached a goal at {}", self.evader.cell);
            }
            Outcome::Neutral => {}
        }

        Ok(StepReport { evader: evader_step, pursuer: pursuer_step, winner: self.winner() })
    }

    /// Move one agent. An agent whose joint state is already terminal
    /// (the mid-step successor of the other agent's move, or a degenerate
    /// start) has no policy and stays put; the post-move terminal check
    /// registers the outcome.
    fn advance(&mut self, player: Player) -> Result<Option<AgentStep>> {
        let state = player.product_state(self.evader.cell, self.pursuer.cell);
        if self.outcome(player, state).is_terminal() {
            return Ok(None);
        }
        let (moves, kind) = self.choose(player, state)?;
        let mv = moves[self.rng.gen_range(0..moves.len())];

        let agent = match player {
            Player::Evader => &self.evader,
            Player::Pursuer => &self.pursuer,
        };
        let dest = self.graph.apply(agent.cell, mv).ok_or_else(|| {
            Error::Internal(format!("{player}: policy move {mv} has no edge at {}", agent.cell))
        })?;

        let agent = match player {
            Player::Evader => &mut self.evader,
            Player::Pursuer => &mut self.pursuer,
        };
        agent.cell = dest;
        agent.policy_in_use = Some(kind);
        log::debug!("{player} used the {kind} policy: {mv} to {dest}");
        Ok(Some(AgentStep { mv, policy: kind }))
    }

    /// Arbitration rule: take the almost-sure move set when it is
    /// non-empty and safety-compatible at the current state; otherwise
    /// (including a missing entry) fall back to MaxSat.
    fn choose(&self, player: Player, state: ProductState) -> Result<(Vec<Move>, PolicyKind)> {
        let sol = self.solution.as_ref().ok_or(Error::NotSolved)?.for_player(player);

        if let Some(reach) = sol.reach_policy.get(&state) {
            if !reach.is_empty() {
                if let Some(safe) = sol.safety_policy.get(&state) {
                    if reach.is_subset(safe) {
                        return Ok((reach.iter().copied().collect(), PolicyKind::AlmostSure));
                    }
                }
            }
        }

        let moves = sol
            .maxsat_policy
            .get(&state)
            .filter(|moves| !moves.is_empty())
            .ok_or_else(|| Error::EmptyPolicy {
                player: player.to_string(),
                state: state.to_string(),
            })?;
        Ok((moves.iter().copied().collect(), PolicyKind::MaxSat))
    }

    // ---- observers ------------------------------------------------------

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn evader_cell(&self) -> Cell {
        self.evader.cell
    }

    pub fn pursuer_cell(&self) -> Cell {
        self.pursuer.cell
    }

    pub fn cell(&self, player: Player) -> Cell {
        match player {
            Player::Evader => self.evader.cell,
            Player::Pursuer => self.pursuer.cell,
        }
    }

    pub fn traps(&self) -> &FxHashSet<Cell> {
        &self.traps
    }

    pub fn goals(&self) -> &FxHashSet<Cell> {
        &self.goals
    }

    pub fn is_solved(&self) -> bool {
        self.solution.is_some()
    }

    pub fn has_won(&self, player: Player) -> bool {
        match player {
            Player::Evader => self.evader.won,
            Player::Pursuer => self.pursuer.won,
        }
    }

    pub fn winner(&self) -> Option<Player> {
        if self.evader.won {
            Some(Player::Evader)
        } else if self.pursuer.won {
            Some(Player::Pursuer)
        } else {
            None
        }
    }

    pub fn is_over(&self) -> bool {
        self.winner().is_some()
    }

    /// Policy label the agent used on its most recent step.
    pub fn policy_in_use(&self, player: Player) -> Option<PolicyKind> {
        match player {
            Player::Evader => self.evader.policy_in_use,
            Player::Pursuer => self.pursuer.policy_in_use,
        }
    }

    /// Computed move policy of `kind` for `player`.
    pub fn policy(&self, player: Player, kind: PolicyKind) -> Result<&Policy> {
        let sol = self.solution.as_ref().ok_or(Error::NotSolved)?.for_player(player);
        Ok(match kind {
            PolicyKind::AlmostSure => &sol.reach_policy,
            PolicyKind::MaxSat => &sol.maxsat_policy,
        })
    }

    /// Avoidance policy from the safety attractor.
    pub fn safety_policy(&self, player: Player) -> Result<&Policy> {
        let sol = self.solution.as_ref().ok_or(Error::NotSolved)?.for_player(player);
        Ok(&sol.safety_policy)
    }

    /// Worst-case-unavoidable-danger region for `player`.
    pub fn unsafe_region(&self, player: Player) -> Result<&FxHashSet<ProductState>> {
        let sol = self.solution.as_ref().ok_or(Error::NotSolved)?.for_player(player);
        Ok(&sol.unsafe_region)
    }

    /// States with a probability-1 route to `player`'s goal set.
    pub fn almost_sure_states(&self, player: Player) -> Result<&FxHashSet<ProductState>> {
        let sol = self.solution.as_ref().ok_or(Error::NotSolved)?.for_player(player);
        Ok(&sol.reach_states)
    }

    /// Converged value function from value iteration.
    pub fn value_function(&self, player: Player) -> Result<&FxHashMap<ProductState, f64>> {
        let sol = self.solution.as_ref().ok_or(Error::NotSolved)?.for_player(player);
        Ok(&sol.values)
    }

    // ---- diagnostics ----------------------------------------------------

    pub fn dump_move_graph(&self) -> String {
        self.graph.dump()
    }

    pub fn dump_product_system(&self) -> String {
        self.product.dump()
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut traps: Vec<Cell> = self.traps.iter().copied().collect();
        let mut goals: Vec<Cell> = self.goals.iter().copied().collect();
        traps.sort();
        goals.sort();
        Snapshot {
            width: self.grid.width(),
            height: self.grid.height(),
            evader: self.evader.cell,
            pursuer: self.pursuer.cell,
            traps,
            goals,
            evader_policy: self.evader.policy_in_use,
            pursuer_policy: self.pursuer.policy_in_use,
            winner: self.winner(),
        }
    }

    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }
}
