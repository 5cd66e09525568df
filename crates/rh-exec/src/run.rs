//! Sequential run driver: decompose, emit artifacts per concrete solve,
//! hand each solve to the executor and carry state between levels.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::info;

use rh_decomp::{
    build_matching_map, expand, resolve_active_time, DecompTables, SolvePlan, StochasticTables,
    TreeBuilder,
};
use rh_model::ModelConfig;

use crate::artifacts::ScratchArea;
use crate::error::{ExecError, ExecResult};
use crate::executor::{ExecOutcome, ExecRequest, SolveExecutor};

/// What a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Concrete solves in the order they were executed.
    pub executed: Vec<String>,
}

/// Years-represented rows per declared solve, including the history
/// accumulated by every earlier solve that keeps periods.
///
/// Rows are restricted to periods the solve covers; a solve with no rows of
/// its own defaults every covered period to one year.
fn period_history(tables: &DecompTables) -> ExecResult<HashMap<String, Vec<(String, f64)>>> {
    let order = tables.declared_solves();
    let mut history = HashMap::with_capacity(order.len());
    for name in &order {
        let spec = tables.solve(name)?;
        let covered = |solve: &rh_decomp::SolveSpec, period: &str| {
            solve.period_block_sets.iter().any(|(p, _)| p == period)
        };
        let own: Vec<(String, f64)> = spec
            .years_represented
            .iter()
            .filter(|(p, _)| covered(spec, p))
            .cloned()
            .collect();

        let mut rows: Vec<(String, f64)> = Vec::new();
        for earlier_name in &order {
            if earlier_name == name {
                break;
            }
            let earlier = tables.solve(earlier_name)?;
            for (period, years) in &earlier.years_represented {
                let kept = earlier.keeps_period(period)
                    || earlier.invest_periods.iter().any(|p| p == period);
                if kept && covered(earlier, period) && !rows.iter().any(|(p, _)| p == period) {
                    rows.push((period.clone(), *years));
                }
            }
        }
        for row in &own {
            if !rows.iter().any(|(p, _)| p == &row.0) {
                rows.push(row.clone());
            }
        }
        if own.is_empty() {
            for (period, _) in &spec.period_block_sets {
                if !rows.iter().any(|(p, _)| p == period) {
                    rows.push((period.clone(), 1.0));
                }
            }
        }
        history.insert(name.clone(), rows);
    }
    Ok(history)
}

/// Every period a concrete solve models must have years-represented rows
/// when the declaring solve defines any.
fn check_years_cover_plan(
    plan: &SolvePlan,
    stoch: &StochasticTables,
    history: &HashMap<String, Vec<(String, f64)>>,
) -> ExecResult<()> {
    for solve in &plan.order {
        let complete = plan.complete_solve_of(solve)?;
        let Some(rows) = history.get(complete) else {
            continue;
        };
        let pb = &stoch.period_branch[solve];
        for label in plan.active_of(solve)?.labels() {
            let is_period = pb.iter().any(|(p, b)| p == label && b == label);
            if is_period && !rows.iter().any(|(p, _)| p == label) {
                return Err(ExecError::MissingYears {
                    solve: complete.to_string(),
                    period: label.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Decompose the model and run every concrete solve in order, aborting on
/// the first non-success outcome.
pub fn run(
    config: &ModelConfig,
    scratch_dir: impl Into<PathBuf>,
    executor: &mut dyn SolveExecutor,
) -> ExecResult<RunReport> {
    let tables = DecompTables::from_config(config)?;
    let mut plan = TreeBuilder::new(&tables).plan()?;
    let stoch = expand(&tables, &mut plan)?;
    let history = period_history(&tables)?;
    check_years_cover_plan(&plan, &stoch, &history)?;

    let area = ScratchArea::new(scratch_dir)?;
    let mut executed = Vec::with_capacity(plan.order.len());

    for (i, solve) in plan.order.iter().enumerate() {
        let complete = plan.complete_solve_of(solve)?.to_string();
        let spec = tables.solve(&complete)?;
        let active = plan.active_of(solve)?;
        let realized = plan.realized_of(solve)?;
        let pb = &stoch.period_branch[solve];
        info!(solve = %solve, complete = %complete, "writing solve artifacts");

        let complete_active = resolve_active_time(&tables, spec)?;
        area.write_full_timelines(&tables, spec, &stoch.branch_steps[solve])?;
        area.write_steps_in_use(active)?;
        area.write_steps_complete_solve(&complete_active)?;
        area.write_step_jumps(&stoch.step_jumps[solve])?;

        area.write_period_years("period_with_history.csv", pb, &history[&complete])?;
        // An investment solve without explicit realized-invest periods
        // realizes its investments where it realizes dispatch.
        if spec.realized_invest_periods.is_empty()
            && !spec.invest_periods.is_empty()
            && !spec.realized_periods.is_empty()
        {
            area.write_period_list(
                "realized_invest_periods_of_current_solve.csv",
                &spec.realized_periods,
            )?;
        } else {
            area.write_period_list(
                "realized_invest_periods_of_current_solve.csv",
                &spec.realized_invest_periods,
            )?;
        }
        area.write_period_list("invest_periods_of_current_solve.csv", &spec.invest_periods)?;
        area.write_years_represented(pb, &spec.years_represented)?;
        area.write_period_years("p_discount_years.csv", pb, &spec.years_represented)?;
        area.write_current_solve(solve)?;
        area.write_first_steps(active)?;
        area.write_last_steps(active)?;
        area.write_last_realized_step(realized, spec)?;
        area.write_realized_dispatch(realized, spec)?;
        area.write_fix_storage_timesteps(realized, spec)?;

        area.write_period_branch(pb)?;
        area.write_all_branches(plan.order.iter().map(|s| stoch.period_branch[s].as_slice()))?;
        area.write_branch_lineage(&stoch.branch_lineage[solve])?;
        area.write_branch_weights(&stoch.weights[solve])?;
        area.write_first_and_last_periods(active, spec, pb)?;

        // Nested solves read storage levels fixed by their parent level.
        let parent_roll = plan.parent_roll.get(solve).cloned().flatten();
        let parent_fixes_storage = match &parent_roll {
            Some(parent) => {
                let parent_complete = plan.complete_solve_of(parent)?;
                let is_nested = tables
                    .solves
                    .iter()
                    .any(|s| s.contains.as_deref() == Some(complete.as_str()));
                is_nested && tables.solve(parent_complete)?.fixes_storage()
            }
            None => false,
        };
        if let (true, Some(parent)) = (parent_fixes_storage, &parent_roll) {
            let parent_complete = plan.complete_solve_of(parent)?.to_string();
            let parent_spec = tables.solve(&parent_complete)?;
            let rows = build_matching_map(
                &tables,
                plan.active_of(parent)?,
                active,
                spec,
                parent_spec,
                pb,
            )?;
            area.write_matching_map(&rows)?;
            area.restore_storage_fix(&parent_complete)?;
        } else {
            area.write_empty_matching_map()?;
        }

        area.write_solve_status(
            plan.first_of_level.contains(solve),
            plan.last_of_level.contains(solve),
            true,
        )?;
        area.write_solve_status(i == 0, i == plan.order.len() - 1, false)?;
        if i == 0 {
            area.write_empty_investment_files()?;
            area.write_empty_storage_fix_files()?;
        }

        info!(solve = %solve, "executing");
        let outcome = executor.execute(&ExecRequest {
            solve,
            complete_solve: &complete,
            solver: spec.solver.as_deref(),
            solver_arguments: &spec.solver_arguments,
            solver_precommand: spec.solver_precommand.as_deref(),
            scratch: area.dir(),
        })?;
        match outcome {
            ExecOutcome::Success => {}
            ExecOutcome::Infeasible => {
                return Err(ExecError::Infeasible {
                    solve: complete.clone(),
                })
            }
            ExecOutcome::Failure(status) => {
                return Err(ExecError::ExecutionFailed {
                    solve: complete.clone(),
                    status,
                })
            }
        }
        // Keep this level's storage fix for its nested solves.
        if spec.fixes_storage() {
            area.snapshot_storage_fix(&complete)?;
        }
        executed.push(solve.clone());
    }

    Ok(RunReport { executed })
}
