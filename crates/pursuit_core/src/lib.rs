//! # pursuit_core - Grid Pursuit Stochastic-Game Synthesis Engine
//!
//! Two-agent pursuit on a rectangular grid: a controlled evader and a
//! controlled pursuer share one move set, and each models its opponent as
//! a stochastic disturbance driven purely by grid geometry. For each
//! player the engine computes a worst-case safety attractor with an
//! avoidance policy, an almost-sure reachability attractor with a
//! witnessing policy, and a discounted value-iteration ("MaxSat")
//! fallback policy. A per-step arbitration rule picks between the
//! almost-sure policy (when safety-compatible) and the MaxSat fallback.
//!
//! ## Features
//! - Product transition system over joint (self, opponent) positions,
//!   built by exhaustive worklist expansion
//! - Three fixed-point solvers sharing one product relation
//! - Deterministic stepping: seeded ChaCha sampling over tie-preserving
//!   move sets (same seed = same run)
//! - JSON snapshots for a rendering front end
//!
//! Everything is single-threaded and synchronous: solving is a one-time
//! batch phase, stepping a cheap repeatable one.

pub mod error;
pub mod game;
pub mod grid;
pub mod policy;
pub mod product;
pub mod reward;
pub mod solver;

pub use error::{Error, Result};
pub use game::{AgentStep, PursuitGame, Snapshot, SolveParams, SolveStats, StepReport};
pub use grid::{Cell, Grid, Move, MoveGraph};
pub use policy::{MoveSet, Policy, PolicyKind};
pub use product::{Player, ProductEdge, ProductState, ProductSystem};
pub use reward::{Outcome, RewardConfig};
