//! Error types for the decomposition engine.

use rh_timeline::TimelineError;
use thiserror::Error;

pub type DecompResult<T> = Result<T, DecompError>;

#[derive(Error, Debug)]
pub enum DecompError {
    #[error(
        "Solve '{solve}' could not connect to a timeline. Check that the solve \
         has period_timeblock_sets, that the timeblock sets and timelines exist \
         and that every timeblock set links to a timeline"
    )]
    NoTimelineLink { solve: String },

    #[error("Unknown timeblock set '{set}' referenced by solve '{solve}'")]
    UnknownTimeblockSet { solve: String, set: String },

    #[error("Unknown solve: {solve}")]
    UnknownSolve { solve: String },

    #[error("Period '{period}' is not covered by solve '{solve}'")]
    UnknownPeriod { solve: String, period: String },

    #[error("Rolling start point ({period}, {step}) not found in solve '{solve}'")]
    StartNotFound {
        solve: String,
        period: String,
        step: String,
    },

    #[error("Solve '{solve}' has mode rolling_window but no rolling parameters")]
    MissingRolling { solve: String },

    #[error(
        "A realized start time of solve '{solve}' cannot be found in its \
         stochastic branch rows. Check that one branch row is realized at the \
         start of the solve and that the rolling jump matches the branch starts"
    )]
    MissingRealizedStart { solve: String },

    #[error(
        "Each period should have one and only one realized branch; solve \
         '{solve}' period '{period}' has {found}"
    )]
    AmbiguousRealizedBranch {
        solve: String,
        period: String,
        found: usize,
    },

    #[error(
        "No earlier period shares the branch lineage of '{period}' in solve \
         '{solve}'; the branch cannot continue across the period boundary"
    )]
    BranchLineageNotFound { solve: String, period: String },

    #[error(
        "Timestep '{step}' of period '{period}' starts before the parent \
         solve's first timestep; the nested window does not align"
    )]
    OffsetBeforeParentWindow { period: String, step: String },

    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),
}
