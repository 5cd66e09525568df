//! Working tables: the validated configuration lifted into engine types,
//! with derived timelines already built.

use rh_model::{ModelConfig, PeriodsDef, SolveMode};
use rh_timeline::{aggregate_timeline, Timeline, TimelineStore, Timestep};

use crate::error::{DecompError, DecompResult};

/// A named set of (start step, step count) claims against one timeline.
#[derive(Debug, Clone)]
pub struct TimeblockSet {
    pub name: String,
    pub timeline: String,
    pub blocks: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Copy)]
pub struct Rolling {
    pub jump: f64,
    pub horizon: f64,
    /// -1 means unbounded.
    pub duration: f64,
}

/// One stochastic branch row of a solve.
#[derive(Debug, Clone)]
pub struct BranchRow {
    pub period: String,
    pub branch: String,
    pub start_step: String,
    pub realized: bool,
    pub weight: f64,
}

/// A declared solve after variant expansion, with flat period flags.
#[derive(Debug, Clone)]
pub struct SolveSpec {
    pub name: String,
    pub mode: SolveMode,
    pub period_block_sets: Vec<(String, String)>,
    pub contains: Option<String>,
    pub rolling: Option<Rolling>,
    pub branches: Vec<BranchRow>,
    pub realized_periods: Vec<String>,
    pub invest_periods: Vec<String>,
    pub realized_invest_periods: Vec<String>,
    pub fix_storage_periods: Vec<String>,
    pub years_represented: Vec<(String, f64)>,
    pub solver: Option<String>,
    pub solver_arguments: Vec<String>,
    pub solver_precommand: Option<String>,
}

impl SolveSpec {
    /// Periods kept after this solve: realized, realized-invest or
    /// storage-fixing.
    pub fn keeps_period(&self, period: &str) -> bool {
        self.realized_periods.iter().any(|p| p == period)
            || self.realized_invest_periods.iter().any(|p| p == period)
            || self.fix_storage_periods.iter().any(|p| p == period)
    }

    pub fn fixes_storage(&self) -> bool {
        !self.fix_storage_periods.is_empty()
    }

    /// Timeblock set covering a period, if any.
    pub fn block_set_of(&self, period: &str) -> Option<&str> {
        self.period_block_sets
            .iter()
            .find(|(p, _)| p == period)
            .map(|(_, set)| set.as_str())
    }
}

/// All tables one run decomposes against.
#[derive(Debug)]
pub struct DecompTables {
    pub store: TimelineStore,
    pub block_sets: Vec<TimeblockSet>,
    pub solves: Vec<SolveSpec>,
    /// Top-level execution order of declared solves.
    pub model_solves: Vec<String>,
}

impl DecompTables {
    /// Build working tables from a loaded configuration, aggregating the
    /// timelines of every timeblock set that requests a new step duration.
    pub fn from_config(config: &ModelConfig) -> DecompResult<Self> {
        let mut store = TimelineStore::new();
        for timeline in &config.timelines {
            let steps = timeline
                .steps
                .iter()
                .map(|s| Timestep::new(s.step.clone(), s.duration))
                .collect();
            store.insert(Timeline::new(timeline.name.clone(), steps)?)?;
        }

        let mut block_sets = Vec::with_capacity(config.timeblock_sets.len());
        for set in &config.timeblock_sets {
            let blocks: Vec<(String, usize)> = set
                .blocks
                .iter()
                .map(|b| (b.start_step.clone(), b.step_count))
                .collect();
            if let Some(target) = set.new_step_duration {
                let base = store.require(&set.timeline)?;
                let derived_name = format!("{}_{}", set.timeline, set.name);
                let aggregated = aggregate_timeline(base, &blocks, target, &derived_name)?;
                store.insert_derived(aggregated.timeline, set.timeline.clone())?;
                block_sets.push(TimeblockSet {
                    name: set.name.clone(),
                    timeline: derived_name,
                    blocks: aggregated.blocks,
                });
            } else {
                block_sets.push(TimeblockSet {
                    name: set.name.clone(),
                    timeline: set.timeline.clone(),
                    blocks,
                });
            }
        }

        let solves = config.solves.iter().map(lift_solve).collect();

        Ok(Self {
            store,
            block_sets,
            solves,
            model_solves: config.model.solves.clone(),
        })
    }

    pub fn solve(&self, name: &str) -> DecompResult<&SolveSpec> {
        self.solves
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| DecompError::UnknownSolve {
                solve: name.to_string(),
            })
    }

    pub fn block_set(&self, name: &str) -> Option<&TimeblockSet> {
        self.block_sets.iter().find(|b| b.name == name)
    }

    /// Timeline of the block set covering `period` in `solve`.
    pub fn timeline_of(&self, solve: &SolveSpec, period: &str) -> DecompResult<&Timeline> {
        let set_name =
            solve
                .block_set_of(period)
                .ok_or_else(|| DecompError::UnknownPeriod {
                    solve: solve.name.clone(),
                    period: period.to_string(),
                })?;
        let set = self
            .block_set(set_name)
            .ok_or_else(|| DecompError::UnknownTimeblockSet {
                solve: solve.name.clone(),
                set: set_name.to_string(),
            })?;
        Ok(self.store.require(&set.timeline)?)
    }

    /// Declared solves in execution order, children after their parent.
    pub fn declared_solves(&self) -> Vec<String> {
        let mut names = self.model_solves.clone();
        for solve in &self.solves {
            if let Some(child) = &solve.contains {
                if !names.contains(child) {
                    names.push(child.clone());
                }
            }
        }
        names
    }
}

fn flat(def: &PeriodsDef) -> Vec<String> {
    def.as_flat().to_vec()
}

fn lift_solve(def: &rh_model::SolveDef) -> SolveSpec {
    SolveSpec {
        name: def.name.clone(),
        mode: def.mode,
        period_block_sets: def
            .period_timeblock_sets
            .iter()
            .map(|row| (row.period.clone(), row.timeblock_set.clone()))
            .collect(),
        contains: def.contains.clone(),
        rolling: def.rolling.as_ref().map(|r| Rolling {
            jump: r.jump,
            horizon: r.horizon,
            duration: r.duration,
        }),
        branches: def
            .stochastic_branches
            .iter()
            .map(|b| BranchRow {
                period: b.period.clone(),
                branch: b.branch.clone(),
                start_step: b.start_step.clone(),
                realized: b.realized,
                weight: b.weight,
            })
            .collect(),
        realized_periods: flat(&def.realized_periods),
        invest_periods: flat(&def.invest_periods),
        realized_invest_periods: flat(&def.realized_invest_periods),
        fix_storage_periods: flat(&def.fix_storage_periods),
        years_represented: def
            .years_represented
            .iter()
            .map(|y| (y.period.clone(), y.years))
            .collect(),
        solver: def.solver.clone(),
        solver_arguments: def.solver_arguments.clone(),
        solver_precommand: def.solver_precommand.clone(),
    }
}
