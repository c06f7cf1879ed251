//! The three fixed-point engines: worst-case safety attractor, almost-sure
//! reachability attractor, and discounted value iteration.

pub mod reachability;
pub mod safety;
pub mod value_iteration;

pub use reachability::{almost_sure_attractor, ReachOutcome};
pub use safety::{unconditional_attractor, SafetyResult};
pub use value_iteration::{value_iteration, ValueIterationResult};
