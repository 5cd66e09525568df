//! Error types for artifact emission and solve execution.

use thiserror::Error;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("The solve '{solve}' is infeasible. Check the constraints")]
    Infeasible { solve: String },

    #[error("Execution of solve '{solve}' failed: {status}")]
    ExecutionFailed { solve: String, status: String },

    #[error(
        "years_represented is defined for solve '{solve}' but not for its \
         period '{period}'"
    )]
    MissingYears { solve: String, period: String },

    #[error(transparent)]
    Decomp(#[from] rh_decomp::DecompError),

    #[error(transparent)]
    Model(#[from] rh_model::ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
