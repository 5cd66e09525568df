//! Temporal decomposition engine: resolves timeblock coverage into active
//! time lists, cuts rolling-window solves into rolls, expands stochastic
//! branches and links nested solves across timeline resolutions.

mod error;
mod matching;
mod resolver;
mod rolling;
mod stepjump;
mod stochastic;
mod tables;
mod tree;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{DecompError, DecompResult};
pub use matching::{build_matching_map, find_next_timestep, find_previous_timestep, MatchRow};
pub use resolver::resolve_active_time;
pub use rolling::{decompose, RollWindows};
pub use stepjump::{build_step_jumps, StepJumpRecord};
pub use stochastic::{expand, StochasticTables};
pub use tables::{BranchRow, DecompTables, Rolling, SolveSpec, TimeblockSet};
pub use tree::{SolveNode, SolvePlan, TreeBuilder};
