//! Artifact emission and sequential execution of a decomposed solve plan.

mod artifacts;
mod error;
mod executor;
mod run;

pub use artifacts::ScratchArea;
pub use error::{ExecError, ExecResult};
pub use executor::{ExecOutcome, ExecRequest, NoopExecutor, SolveExecutor};
pub use run::{run, RunReport};
