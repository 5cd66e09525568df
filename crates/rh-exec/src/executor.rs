//! The executor seam: whoever turns one solve's artifact set into results.

use std::path::Path;

use crate::error::ExecResult;

/// Outcome of executing one concrete solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Success,
    /// The problem was built but has no feasible solution.
    Infeasible,
    /// The execution itself failed, with a status description.
    Failure(String),
}

/// Everything an executor gets handed for one concrete solve. The artifact
/// set has already been written under `scratch`.
#[derive(Debug)]
pub struct ExecRequest<'a> {
    pub solve: &'a str,
    pub complete_solve: &'a str,
    pub solver: Option<&'a str>,
    pub solver_arguments: &'a [String],
    pub solver_precommand: Option<&'a str>,
    pub scratch: &'a Path,
}

/// Executes concrete solves one at a time, in plan order.
pub trait SolveExecutor {
    fn execute(&mut self, request: &ExecRequest<'_>) -> ExecResult<ExecOutcome>;
}

/// Executor that solves nothing and succeeds always. Used to emit artifact
/// sets without an optimization backend, and in tests.
#[derive(Debug, Default)]
pub struct NoopExecutor {
    invoked: Vec<String>,
}

impl NoopExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete solve names in the order they were handed over.
    pub fn invocations(&self) -> &[String] {
        &self.invoked
    }
}

impl SolveExecutor for NoopExecutor {
    fn execute(&mut self, request: &ExecRequest<'_>) -> ExecResult<ExecOutcome> {
        self.invoked.push(request.solve.to_string());
        Ok(ExecOutcome::Success)
    }
}
