//! Stochastic branch expansion: rewrite each concrete solve's active time
//! list around its branch points and derive the branch bookkeeping tables.

use std::collections::HashMap;

use tracing::debug;

use rh_timeline::ActiveTimeList;

use crate::error::{DecompError, DecompResult};
use crate::stepjump::{self, StepJumpRecord};
use crate::tables::{BranchRow, DecompTables};
use crate::tree::SolvePlan;

/// Per-concrete-solve branch tables produced by the expansion.
#[derive(Debug, Default)]
pub struct StochasticTables {
    /// (period, branch label) pairs, realized periods as (p, p).
    pub period_branch: HashMap<String, Vec<(String, String)>>,
    /// (label, time branch) lineage rows.
    pub branch_lineage: HashMap<String, Vec<(String, String)>>,
    /// Branch point of the solve, if it has one.
    pub branch_start: HashMap<String, Option<(String, String)>>,
    /// (branch label, step) rows for steps on a branched continuation.
    pub branch_steps: HashMap<String, Vec<(String, String)>>,
    /// (label, weight) rows; the realized lineage weighs 1.
    pub weights: HashMap<String, Vec<(String, f64)>>,
    /// Predecessor table per concrete solve.
    pub step_jumps: HashMap<String, Vec<StepJumpRecord>>,
}

struct Expansion {
    active: ActiveTimeList,
    realized: ActiveTimeList,
    period_branch: Vec<(String, String)>,
    branch_steps: Vec<(String, String)>,
    lineage: Vec<(String, String)>,
    branch_start: Option<(String, String)>,
}

/// Expand every concrete solve of the plan in place and return the branch
/// tables. Solves without branch rows pass through with trivial
/// (period, period) rows.
pub fn expand(tables: &DecompTables, plan: &mut SolvePlan) -> DecompResult<StochasticTables> {
    let mut out = StochasticTables::default();
    for solve in plan.order.clone() {
        let complete = plan.complete_solve_of(&solve)?.to_string();
        let spec = tables.solve(&complete)?;
        let active = plan.active_of(&solve)?.clone();
        let realized = plan.realized_of(&solve)?.clone();

        let mut exp = expand_one(&solve, &active, &realized, &spec.branches)?;
        if let Some((period, step)) = &exp.branch_start {
            debug!(
                solve = %solve,
                period = %period,
                step = %step,
                branches = exp.lineage.len(),
                "expanded stochastic branch point"
            );
        }
        confirm_realized_branches(&solve, &active, &spec.branches, &mut exp)?;
        let weights = branch_weights(&exp, &spec.branches);
        let jumps = stepjump::build_step_jumps(
            &solve,
            &exp.active,
            &exp.period_branch,
            &exp.lineage,
        )?;

        plan.active.insert(solve.clone(), exp.active);
        plan.realized.insert(solve.clone(), exp.realized);
        out.period_branch.insert(solve.clone(), exp.period_branch);
        out.branch_lineage.insert(solve.clone(), exp.lineage);
        out.branch_start.insert(solve.clone(), exp.branch_start);
        out.branch_steps.insert(solve.clone(), exp.branch_steps);
        out.weights.insert(solve.clone(), weights);
        out.step_jumps.insert(solve.clone(), jumps);
    }
    Ok(out)
}

/// Rewrite one solve's lists around its first branch point.
///
/// Periods before the branch point pass through unchanged. At the branch
/// point every declared branch is recorded; non-realized branches with
/// weight over zero are materialized as `<period>_<branch>` labels sharing
/// the remaining steps. Every later period is replicated per branch the
/// same way and dropped from the realized list.
fn expand_one(
    solve: &str,
    active: &ActiveTimeList,
    realized: &ActiveTimeList,
    branches: &[BranchRow],
) -> DecompResult<Expansion> {
    let mut exp = Expansion {
        active: ActiveTimeList::new(),
        realized: ActiveTimeList::new(),
        period_branch: Vec::new(),
        branch_steps: Vec::new(),
        lineage: Vec::new(),
        branch_start: None,
    };
    if branches.is_empty() {
        exp.active = active.clone();
        exp.realized = realized.clone();
        for label in active.labels() {
            exp.period_branch.push((label.to_string(), label.to_string()));
        }
        return Ok(exp);
    }

    // A rolling solve must start every roll on a realized branch, otherwise
    // there is no single trajectory to keep.
    if let Some((first_period, first_step)) = active.first_step() {
        let starts_realized = branches
            .iter()
            .any(|row| row.period == first_period && row.start_step == first_step && row.realized);
        if !starts_realized {
            return Err(DecompError::MissingRealizedStart {
                solve: solve.to_string(),
            });
        }
    }

    let mut point_rows: Vec<&BranchRow> = Vec::new();
    for (period, steps) in active.iter() {
        if exp.branch_start.is_none() {
            exp.period_branch.push((period.to_string(), period.to_string()));
            let point = steps.iter().find_map(|step| {
                let rows: Vec<&BranchRow> = branches
                    .iter()
                    .filter(|row| row.period == period && row.start_step == step.step)
                    .collect();
                (!rows.is_empty()).then_some((step.step.clone(), rows))
            });
            match point {
                Some((start_step, rows)) => {
                    exp.branch_start = Some((period.to_string(), start_step));
                    exp.active.push_entry(period.to_string(), steps.to_vec());
                    if let Some(kept) = realized.get(period) {
                        exp.realized.push_entry(period.to_string(), kept.to_vec());
                    }
                    for row in &rows {
                        let label = format!("{period}_{}", row.branch);
                        if row.weight != 0.0 && row.branch != period && !row.realized {
                            exp.active.push_entry(label.clone(), steps.to_vec());
                            exp.lineage.push((label.clone(), row.branch.clone()));
                        }
                        exp.period_branch.push((period.to_string(), label.clone()));
                        for step in steps {
                            exp.branch_steps.push((label.clone(), step.step.clone()));
                        }
                    }
                    point_rows = rows;
                }
                None => {
                    exp.active.push_entry(period.to_string(), steps.to_vec());
                    if let Some(kept) = realized.get(period) {
                        exp.realized.push_entry(period.to_string(), kept.to_vec());
                    }
                }
            }
        } else {
            for row in &point_rows {
                let label = format!("{period}_{}", row.branch);
                exp.period_branch.push((period.to_string(), label.clone()));
                if row.weight != 0.0 || row.realized {
                    exp.active.push_entry(label.clone(), steps.to_vec());
                    exp.lineage.push((label.clone(), row.branch.clone()));
                }
                for step in steps {
                    exp.branch_steps.push((label.clone(), step.step.clone()));
                }
            }
        }
    }
    Ok(exp)
}

/// Tie each original period to its single realized branch, appending the
/// lineage rows the realized trajectory follows.
fn confirm_realized_branches(
    solve: &str,
    original_active: &ActiveTimeList,
    branches: &[BranchRow],
    exp: &mut Expansion,
) -> DecompResult<()> {
    if branches.is_empty() {
        return Ok(());
    }
    for (period, steps) in original_active.iter() {
        let Some(first) = steps.first() else { continue };
        let mut found: Vec<&BranchRow> = branches
            .iter()
            .filter(|row| row.period == period && row.start_step == first.step && row.realized)
            .collect();
        if found.is_empty() {
            if let Some((bp_period, bp_step)) = &exp.branch_start {
                found = branches
                    .iter()
                    .filter(|row| {
                        &row.period == bp_period && &row.start_step == bp_step && row.realized
                    })
                    .collect();
            }
        }
        for row in &found {
            exp.lineage.push((period.to_string(), row.branch.clone()));
        }
        if found.len() > 1 || (found.is_empty() && exp.branch_start.is_some()) {
            return Err(DecompError::AmbiguousRealizedBranch {
                solve: solve.to_string(),
                period: period.to_string(),
                found: found.len(),
            });
        }
    }
    Ok(())
}

/// Weight per lineage label: the realized trajectory always weighs 1,
/// whatever its row declares; other materialized branches carry their
/// declared weight.
fn branch_weights(exp: &Expansion, branches: &[BranchRow]) -> Vec<(String, f64)> {
    let mut declared: HashMap<&str, (f64, bool)> = HashMap::new();
    if let Some((bp_period, bp_step)) = &exp.branch_start {
        for row in branches {
            if &row.period == bp_period && &row.start_step == bp_step {
                declared.insert(row.branch.as_str(), (row.weight, row.realized));
            }
        }
    }
    let mut weights = Vec::with_capacity(exp.lineage.len());
    for (label, time_branch) in &exp.lineage {
        if exp
            .period_branch
            .iter()
            .any(|(p, b)| p == label && b == label)
        {
            weights.push((label.clone(), 1.0));
        } else if let Some((weight, realized)) = declared.get(time_branch.as_str()) {
            if exp.active.contains_label(label) {
                weights.push((label.clone(), if *realized { 1.0 } else { *weight }));
            }
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{tables_of, two_period_config};
    use crate::tree::TreeBuilder;
    use rh_model::BranchDef;

    fn branch_row(period: &str, branch: &str, start: &str, realized: bool, weight: f64) -> BranchDef {
        BranchDef {
            period: period.to_string(),
            branch: branch.to_string(),
            start_step: start.to_string(),
            realized,
            weight,
        }
    }

    /// p1/p2 over 4 steps each, branching at the solve start.
    fn branched_config() -> rh_model::ModelConfig {
        let mut config = two_period_config(4);
        config.solves[0].stochastic_branches = vec![
            branch_row("p1", "base", "t0001", true, 0.5),
            branch_row("p1", "high", "t0001", false, 0.3),
            branch_row("p1", "zero", "t0001", false, 0.0),
        ];
        config
    }

    #[test]
    fn unbranched_solves_pass_through() {
        let tables = tables_of(&two_period_config(2));
        let mut plan = TreeBuilder::new(&tables).plan().unwrap();
        let out = expand(&tables, &mut plan).unwrap();
        assert_eq!(
            out.period_branch["dispatch"],
            vec![
                ("p1".to_string(), "p1".to_string()),
                ("p2".to_string(), "p2".to_string())
            ]
        );
        assert!(out.branch_start["dispatch"].is_none());
        assert!(out.weights["dispatch"].is_empty());
        assert_eq!(out.step_jumps["dispatch"].len(), 4);
    }

    #[test]
    fn branch_point_materializes_weighted_branches_only() {
        let tables = tables_of(&branched_config());
        let mut plan = TreeBuilder::new(&tables).plan().unwrap();
        let out = expand(&tables, &mut plan).unwrap();

        let active = plan.active_of("dispatch").unwrap();
        let labels: Vec<&str> = active.labels().collect();
        // p1 stays, high is materialized, zero-weight is not; p2 is
        // replicated for the realized and the weighted branch.
        assert_eq!(labels, vec!["p1", "p1_high", "p2_base", "p2_high"]);
        assert_eq!(
            out.branch_start["dispatch"],
            Some(("p1".to_string(), "t0001".to_string()))
        );

        // The branched copy shares the branch period's steps.
        assert_eq!(active.get("p1_high").unwrap().len(), 4);

        // period__branch keeps the original period on every label.
        let pb = &out.period_branch["dispatch"];
        assert!(pb.contains(&("p1".to_string(), "p1".to_string())));
        assert!(pb.contains(&("p1".to_string(), "p1_zero".to_string())));
        assert!(pb.contains(&("p2".to_string(), "p2_high".to_string())));
    }

    #[test]
    fn realized_list_stops_at_the_branch_point_period() {
        let tables = tables_of(&branched_config());
        let mut plan = TreeBuilder::new(&tables).plan().unwrap();
        expand(&tables, &mut plan).unwrap();
        let realized = plan.realized_of("dispatch").unwrap();
        assert!(realized.contains_label("p1"));
        assert!(!realized.contains_label("p2"));
    }

    #[test]
    fn realized_lineage_weighs_one() {
        let tables = tables_of(&branched_config());
        let mut plan = TreeBuilder::new(&tables).plan().unwrap();
        let out = expand(&tables, &mut plan).unwrap();
        let weights = &out.weights["dispatch"];
        assert!(weights.contains(&("p1".to_string(), 1.0)));
        assert!(weights.contains(&("p1_high".to_string(), 0.3)));
        // The realized trajectory weighs 1 even though its row declares 0.5.
        assert!(weights.contains(&("p2_base".to_string(), 1.0)));
        assert!(weights.contains(&("p2_high".to_string(), 0.3)));
        // The original period label is gone after the branch point, so it
        // carries no weight row.
        assert!(!weights.iter().any(|(label, _)| label == "p2"));
    }

    #[test]
    fn missing_realized_start_is_fatal() {
        let mut config = branched_config();
        config.solves[0].stochastic_branches.remove(0);
        let tables = tables_of(&config);
        let mut plan = TreeBuilder::new(&tables).plan().unwrap();
        let err = expand(&tables, &mut plan).unwrap_err();
        assert!(matches!(err, DecompError::MissingRealizedStart { .. }));
    }

    #[test]
    fn two_realized_branches_on_one_period_is_fatal() {
        let mut config = branched_config();
        config.solves[0]
            .stochastic_branches
            .push(branch_row("p1", "alt", "t0001", true, 0.5));
        let tables = tables_of(&config);
        let mut plan = TreeBuilder::new(&tables).plan().unwrap();
        let err = expand(&tables, &mut plan).unwrap_err();
        assert!(matches!(err, DecompError::AmbiguousRealizedBranch { .. }));
    }
}
