//! Scratch-area artifact writers: the per-solve CSV files the executor
//! reads. Every file is overwritten for every solve; headers are always
//! written, even when a file has no rows.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rh_decomp::{DecompError, DecompTables, MatchRow, SolveSpec, StepJumpRecord};
use rh_timeline::ActiveTimeList;

use crate::error::ExecResult;

const STORAGE_FIX_STEMS: [&str; 3] = [
    "fix_storage_quantity",
    "fix_storage_price",
    "fix_storage_usage",
];

/// Format a numeric cell the way the artifact consumers expect: integral
/// values without a trailing fraction.
pub(crate) fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// The directory one run writes its per-solve artifacts into.
#[derive(Debug)]
pub struct ScratchArea {
    dir: PathBuf,
}

impl ScratchArea {
    pub fn new(dir: impl Into<PathBuf>) -> ExecResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn write(
        &self,
        name: &str,
        header: &str,
        rows: impl IntoIterator<Item = String>,
    ) -> ExecResult<()> {
        let mut out = BufWriter::new(File::create(self.path(name))?);
        writeln!(out, "{header}")?;
        for row in rows {
            writeln!(out, "{row}")?;
        }
        out.flush()?;
        Ok(())
    }

    /// All steps of every timeline the solve's periods link to, plus the
    /// branch-qualified steps of its stochastic continuations.
    pub fn write_full_timelines(
        &self,
        tables: &DecompTables,
        spec: &SolveSpec,
        branch_steps: &[(String, String)],
    ) -> ExecResult<()> {
        let mut rows = Vec::new();
        for (period, set_name) in &spec.period_block_sets {
            let set = tables
                .block_set(set_name)
                .ok_or_else(|| DecompError::UnknownTimeblockSet {
                    solve: spec.name.clone(),
                    set: set_name.clone(),
                })?;
            let timeline = tables.store.require(&set.timeline).map_err(DecompError::from)?;
            for step in timeline.steps() {
                rows.push(format!("{period},{}", step.id));
            }
        }
        for (branch, step) in branch_steps {
            rows.push(format!("{branch},{step}"));
        }
        self.write("steps_in_timeline.csv", "period,step", rows)
    }

    pub fn write_steps_in_use(&self, active: &ActiveTimeList) -> ExecResult<()> {
        self.write(
            "steps_in_use.csv",
            "period,step,step_duration",
            step_duration_rows(active),
        )
    }

    /// The full (undecomposed) step set of the declared solve this concrete
    /// solve was cut from.
    pub fn write_steps_complete_solve(&self, complete_active: &ActiveTimeList) -> ExecResult<()> {
        self.write(
            "steps_complete_solve.csv",
            "period,step,complete_step_duration",
            step_duration_rows(complete_active),
        )
    }

    pub fn write_step_jumps(&self, jumps: &[StepJumpRecord]) -> ExecResult<()> {
        self.write(
            "step_previous.csv",
            "period,time,previous,previous_within_block,previous_period,previous_within_solve,jump",
            jumps.iter().map(|r| {
                format!(
                    "{},{},{},{},{},{},{}",
                    r.period,
                    r.step,
                    r.previous,
                    r.previous_within_block,
                    r.previous_period,
                    r.previous_within_solve,
                    r.jump
                )
            }),
        )
    }

    /// Cumulative years-from-solve per period, branch labels mirroring
    /// their period's value.
    pub fn write_period_years(
        &self,
        name: &str,
        period_branch: &[(String, String)],
        years: &[(String, f64)],
    ) -> ExecResult<()> {
        let mut rows = Vec::new();
        let mut year_count = 0.0;
        for (period, period_years) in years {
            rows.push(format!("{period},{}", fmt_num(year_count)));
            for (original, branch) in period_branch {
                if original == period && original != branch {
                    rows.push(format!("{branch},{}", fmt_num(year_count)));
                }
            }
            year_count += period_years;
        }
        self.write(name, "period,param", rows)
    }

    /// Year-by-year discounting rows: one row per whole year a period
    /// represents, with the fraction covered within that year.
    pub fn write_years_represented(
        &self,
        period_branch: &[(String, String)],
        years: &[(String, f64)],
    ) -> ExecResult<()> {
        let mut rows = Vec::new();
        let mut year_count = 0.0;
        for (period, period_years) in years {
            let whole_years = period_years.max(1.0) as usize;
            for _ in 0..whole_years {
                let within_year = period_years.min(1.0);
                rows.push(format!(
                    "{period},y{},{},{}",
                    fmt_num(year_count),
                    fmt_num(year_count),
                    fmt_num(within_year)
                ));
                for (original, branch) in period_branch {
                    if original == period && original != branch {
                        rows.push(format!(
                            "{branch},y{},{},{}",
                            fmt_num(year_count),
                            fmt_num(year_count),
                            fmt_num(within_year)
                        ));
                    }
                }
                year_count += within_year;
            }
        }
        self.write(
            "p_years_represented.csv",
            "period,years_from_solve,p_years_from_solve,p_years_represented",
            rows,
        )
    }

    pub fn write_period_list(&self, name: &str, periods: &[String]) -> ExecResult<()> {
        self.write(name, "period", periods.iter().cloned())
    }

    pub fn write_current_solve(&self, solve: &str) -> ExecResult<()> {
        self.write("solve_current.csv", "solve", [solve.to_string()])
    }

    pub fn write_first_steps(&self, active: &ActiveTimeList) -> ExecResult<()> {
        let rows = active.iter().filter_map(|(label, steps)| {
            steps.first().map(|s| format!("{label},{}", s.step))
        });
        self.write("first_timesteps.csv", "period,step", rows)
    }

    pub fn write_last_steps(&self, active: &ActiveTimeList) -> ExecResult<()> {
        let rows = active.iter().filter_map(|(label, steps)| {
            steps.last().map(|s| format!("{label},{}", s.step))
        });
        self.write("last_timesteps.csv", "period,step", rows)
    }

    /// Last timestep of the last realized period of this window, if any.
    pub fn write_last_realized_step(
        &self,
        realized: &ActiveTimeList,
        spec: &SolveSpec,
    ) -> ExecResult<()> {
        let row = realized
            .iter()
            .filter(|(label, steps)| {
                !steps.is_empty() && spec.realized_periods.iter().any(|p| p == label)
            })
            .last()
            .map(|(label, steps)| format!("{label},{}", steps[steps.len() - 1].step));
        self.write("last_realized_timestep.csv", "period,step", row)
    }

    pub fn write_realized_dispatch(
        &self,
        realized: &ActiveTimeList,
        spec: &SolveSpec,
    ) -> ExecResult<()> {
        let rows = realized
            .iter()
            .filter(|(label, _)| spec.realized_periods.iter().any(|p| p == label))
            .flat_map(|(label, steps)| {
                steps
                    .iter()
                    .map(move |s| format!("{label},{}", s.step))
                    .collect::<Vec<_>>()
            });
        self.write("realized_dispatch.csv", "period,step", rows)
    }

    /// Timesteps whose storage state this solve fixes for nested levels.
    pub fn write_fix_storage_timesteps(
        &self,
        realized: &ActiveTimeList,
        spec: &SolveSpec,
    ) -> ExecResult<()> {
        let rows = realized
            .iter()
            .filter(|(label, _)| spec.fix_storage_periods.iter().any(|p| p == label))
            .flat_map(|(label, steps)| {
                steps
                    .iter()
                    .map(move |s| format!("{label},{}", s.step))
                    .collect::<Vec<_>>()
            });
        self.write("fix_storage_timesteps.csv", "period,step", rows)
    }

    pub fn write_period_branch(&self, period_branch: &[(String, String)]) -> ExecResult<()> {
        self.write(
            "period__branch.csv",
            "period,branch",
            period_branch.iter().map(|(p, b)| format!("{p},{b}")),
        )
    }

    /// Union of branch labels across every concrete solve of the plan.
    pub fn write_all_branches<'a>(
        &self,
        period_branch_lists: impl IntoIterator<Item = &'a [(String, String)]>,
    ) -> ExecResult<()> {
        let mut branches: Vec<String> = Vec::new();
        for list in period_branch_lists {
            for (_, branch) in list {
                if !branches.contains(branch) {
                    branches.push(branch.clone());
                }
            }
        }
        self.write("branch_all.csv", "branch", branches)
    }

    pub fn write_branch_lineage(&self, lineage: &[(String, String)]) -> ExecResult<()> {
        self.write(
            "solve_branch__time_branch.csv",
            "period,branch",
            lineage.iter().map(|(label, tb)| format!("{label},{tb}")),
        )
    }

    pub fn write_branch_weights(&self, weights: &[(String, f64)]) -> ExecResult<()> {
        self.write(
            "solve_branch_weight.csv",
            "branch,p_branch_weight_input",
            weights.iter().map(|(label, w)| format!("{label},{w:?}")),
        )
    }

    /// First and last periods of the window, expanded over branch labels.
    pub fn write_first_and_last_periods(
        &self,
        active: &ActiveTimeList,
        spec: &SolveSpec,
        period_branch: &[(String, String)],
    ) -> ExecResult<()> {
        let Some(first_label) = active.first_label() else {
            self.write_period_list("period_last.csv", &[])?;
            self.write_period_list("period_first_of_solve.csv", &[])?;
            return self.write_period_list("period_first.csv", &[]);
        };
        let last_label = active.last_label().unwrap_or(first_label);
        let last_step = active
            .get(last_label)
            .and_then(|steps| steps.last())
            .map(|s| s.step.clone());

        // Branch copies of the last period share its final step.
        let mut period_last = vec![last_label.to_string()];
        if let Some(last_step) = &last_step {
            for (label, steps) in active.iter() {
                if label != last_label && steps.last().map(|s| &s.step) == Some(last_step) {
                    period_last.push(label.to_string());
                }
            }
        }
        self.write_period_list("period_last.csv", &period_last)?;

        let first_of_solve: Vec<String> = period_branch
            .iter()
            .filter(|(p, _)| p == first_label)
            .map(|(_, b)| b.clone())
            .collect();
        self.write_period_list("period_first_of_solve.csv", &first_of_solve)?;

        // First period of the declared solve, not of this window.
        let first_declared = spec
            .period_block_sets
            .first()
            .map(|(p, _)| p.as_str())
            .unwrap_or(first_label);
        let first: Vec<String> = period_branch
            .iter()
            .filter(|(p, _)| p == first_declared)
            .map(|(_, b)| b.clone())
            .collect();
        self.write_period_list("period_first.csv", &first)
    }

    /// Top-level (or nested-level) first/last flags for the model.
    pub fn write_solve_status(&self, first: bool, last: bool, nested: bool) -> ExecResult<()> {
        let (name, header) = if nested {
            ("p_nested_model.csv", "modelParam,p_nested_model")
        } else {
            ("p_model.csv", "modelParam,p_model")
        };
        self.write(
            name,
            header,
            [
                format!("solveFirst,{}", u8::from(first)),
                format!("solveLast,{}", u8::from(last)),
            ],
        )
    }

    pub fn write_matching_map(&self, rows: &[MatchRow]) -> ExecResult<()> {
        self.write(
            "timeline_matching_map.csv",
            "period,step,upper_step",
            rows.iter()
                .map(|r| format!("{},{},{}", r.period, r.step, r.upper_step)),
        )
    }

    pub fn write_empty_matching_map(&self) -> ExecResult<()> {
        self.write("timeline_matching_map.csv", "period,step,upper_step", [])
    }

    /// Header-only investment state, seeded before the first solve.
    pub fn write_empty_investment_files(&self) -> ExecResult<()> {
        self.write("p_entity_invested.csv", "entity,p_entity_invested", [])?;
        self.write("p_entity_divested.csv", "entity,p_entity_divested", [])?;
        self.write(
            "p_entity_period_existing_capacity.csv",
            "entity,period,p_entity_period_existing_capacity,p_entity_period_invested_capacity",
            [],
        )
    }

    /// Header-only storage-fix state, seeded before the first solve.
    pub fn write_empty_storage_fix_files(&self) -> ExecResult<()> {
        self.write("fix_storage_price.csv", "node,period,step,ndt_fix_storage_price", [])?;
        self.write(
            "fix_storage_quantity.csv",
            "node,period,step,ndt_fix_storage_quantity",
            [],
        )?;
        self.write("fix_storage_usage.csv", "node,period,step,ndt_fix_storage_usage", [])?;
        self.write("p_roll_continue_state.csv", "node,p_roll_continue_state", [])
    }

    /// Save this level's storage-fix state so deeper levels keep reading
    /// the level's values instead of the latest roll's.
    pub fn snapshot_storage_fix(&self, level: &str) -> ExecResult<()> {
        for stem in STORAGE_FIX_STEMS {
            let current = self.path(&format!("{stem}.csv"));
            if current.exists() {
                fs::copy(&current, self.path(&format!("{stem}_{level}.csv")))?;
            }
        }
        Ok(())
    }

    /// Restore the parent level's storage-fix snapshot for a nested solve.
    pub fn restore_storage_fix(&self, level: &str) -> ExecResult<()> {
        for stem in STORAGE_FIX_STEMS {
            let snapshot = self.path(&format!("{stem}_{level}.csv"));
            if snapshot.exists() {
                fs::copy(&snapshot, self.path(&format!("{stem}.csv")))?;
            }
        }
        Ok(())
    }
}

fn step_duration_rows(active: &ActiveTimeList) -> Vec<String> {
    active
        .iter()
        .flat_map(|(label, steps)| {
            steps
                .iter()
                .map(move |s| format!("{label},{},{}", s.step, fmt_num(s.duration)))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_timeline::ActiveStep;

    fn scratch(tag: &str) -> ScratchArea {
        let dir = std::env::temp_dir().join(format!("rh-exec-artifacts-{tag}-{}", std::process::id()));
        ScratchArea::new(dir).unwrap()
    }

    fn read(area: &ScratchArea, name: &str) -> String {
        fs::read_to_string(area.path(name)).unwrap()
    }

    fn sample_active() -> ActiveTimeList {
        let mut atl = ActiveTimeList::new();
        atl.push_entry(
            "p1",
            vec![
                ActiveStep::new("t0001", 0, 1.0),
                ActiveStep::new("t0002", 1, 1.5),
            ],
        );
        atl
    }

    #[test]
    fn steps_in_use_has_durations() {
        let area = scratch("steps");
        area.write_steps_in_use(&sample_active()).unwrap();
        assert_eq!(
            read(&area, "steps_in_use.csv"),
            "period,step,step_duration\np1,t0001,1\np1,t0002,1.5\n"
        );
    }

    #[test]
    fn solve_status_flags_are_binary() {
        let area = scratch("status");
        area.write_solve_status(true, false, false).unwrap();
        assert_eq!(
            read(&area, "p_model.csv"),
            "modelParam,p_model\nsolveFirst,1\nsolveLast,0\n"
        );
        area.write_solve_status(false, true, true).unwrap();
        assert_eq!(
            read(&area, "p_nested_model.csv"),
            "modelParam,p_nested_model\nsolveFirst,0\nsolveLast,1\n"
        );
    }

    #[test]
    fn years_represented_expands_whole_years() {
        let area = scratch("years");
        let pb = vec![("p1".to_string(), "p1".to_string())];
        area.write_years_represented(&pb, &[("p1".to_string(), 2.0), ("p2".to_string(), 0.5)])
            .unwrap();
        assert_eq!(
            read(&area, "p_years_represented.csv"),
            "period,years_from_solve,p_years_from_solve,p_years_represented\n\
             p1,y0,0,1\np1,y1,1,1\np2,y2,2,0.5\n"
        );
    }

    #[test]
    fn period_years_accumulate() {
        let area = scratch("discount");
        let pb = vec![
            ("p1".to_string(), "p1".to_string()),
            ("p2".to_string(), "p2_high".to_string()),
        ];
        area.write_period_years(
            "p_discount_years.csv",
            &pb,
            &[("p1".to_string(), 5.0), ("p2".to_string(), 5.0)],
        )
        .unwrap();
        assert_eq!(
            read(&area, "p_discount_years.csv"),
            "period,param\np1,0\np2,5\np2_high,5\n"
        );
    }

    #[test]
    fn storage_fix_roundtrip_between_levels() {
        let area = scratch("fix");
        area.write_empty_storage_fix_files().unwrap();
        area.snapshot_storage_fix("plan").unwrap();
        fs::write(area.path("fix_storage_quantity.csv"), "scribbled").unwrap();
        area.restore_storage_fix("plan").unwrap();
        assert_eq!(
            read(&area, "fix_storage_quantity.csv"),
            "node,period,step,ndt_fix_storage_quantity\n"
        );
    }
}
