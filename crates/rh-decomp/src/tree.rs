//! Solve tree: declared solves expanded into the flat ordered list of
//! concrete solves the executor runs.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use rh_timeline::ActiveTimeList;

use crate::error::{DecompError, DecompResult};
use crate::matching::find_next_timestep;
use crate::resolver::resolve_active_time;
use crate::rolling::{self, RollWindows};
use crate::tables::{DecompTables, Rolling, SolveSpec};

/// One declared solve with its (single) nested child.
#[derive(Debug, Clone)]
pub enum SolveNode {
    Single {
        solve: String,
        child: Option<Box<SolveNode>>,
    },
    Rolling {
        solve: String,
        rolling: Rolling,
        child: Option<Box<SolveNode>>,
    },
}

impl SolveNode {
    pub fn solve_name(&self) -> &str {
        match self {
            SolveNode::Single { solve, .. } | SolveNode::Rolling { solve, .. } => solve,
        }
    }

    pub fn child(&self) -> Option<&SolveNode> {
        match self {
            SolveNode::Single { child, .. } | SolveNode::Rolling { child, .. } => {
                child.as_deref()
            }
        }
    }
}

/// Flat execution plan over concrete solves (rolls and singles).
#[derive(Debug, Default)]
pub struct SolvePlan {
    /// Concrete solves in execution order.
    pub order: Vec<String>,
    /// Concrete solve -> declared solve it was cut from.
    pub complete_solve: HashMap<String, String>,
    /// Concrete solve -> the parent roll it nests under, if any.
    pub parent_roll: HashMap<String, Option<String>>,
    pub active: HashMap<String, ActiveTimeList>,
    pub realized: HashMap<String, ActiveTimeList>,
    /// Concrete solves that open their nesting level (state starts apply).
    pub first_of_level: HashSet<String>,
    /// Concrete solves that close their nesting level.
    pub last_of_level: HashSet<String>,
}

impl SolvePlan {
    pub fn active_of(&self, solve: &str) -> DecompResult<&ActiveTimeList> {
        self.active.get(solve).ok_or_else(|| DecompError::UnknownSolve {
            solve: solve.to_string(),
        })
    }

    pub fn realized_of(&self, solve: &str) -> DecompResult<&ActiveTimeList> {
        self.realized.get(solve).ok_or_else(|| DecompError::UnknownSolve {
            solve: solve.to_string(),
        })
    }

    pub fn complete_solve_of(&self, solve: &str) -> DecompResult<&str> {
        self.complete_solve
            .get(solve)
            .map(String::as_str)
            .ok_or_else(|| DecompError::UnknownSolve {
                solve: solve.to_string(),
            })
    }
}

/// Builds solve trees for the declared model solves and flattens them.
///
/// Roll counters live here, keyed by declared solve, so every re-entry of a
/// nested rolling solve continues its numbering instead of restarting it.
pub struct TreeBuilder<'a> {
    tables: &'a DecompTables,
    roll_counters: HashMap<String, u64>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(tables: &'a DecompTables) -> Self {
        Self {
            tables,
            roll_counters: HashMap::new(),
        }
    }

    /// Expand one declared solve and its `contains` chain into a tree.
    pub fn build_tree(&self, name: &str) -> DecompResult<SolveNode> {
        let spec = self.tables.solve(name)?;
        let child = match &spec.contains {
            Some(child) => Some(Box::new(self.build_tree(child)?)),
            None => None,
        };
        match spec.mode {
            rh_model::SolveMode::Single => Ok(SolveNode::Single {
                solve: spec.name.clone(),
                child,
            }),
            rh_model::SolveMode::RollingWindow => {
                let rolling = spec.rolling.ok_or_else(|| DecompError::MissingRolling {
                    solve: spec.name.clone(),
                })?;
                Ok(SolveNode::Rolling {
                    solve: spec.name.clone(),
                    rolling,
                    child,
                })
            }
        }
    }

    /// Build and flatten the trees of all model solves, in declared order.
    pub fn plan(&mut self) -> DecompResult<SolvePlan> {
        let mut plan = SolvePlan::default();
        for name in self.tables.model_solves.clone() {
            let tree = self.build_tree(&name)?;
            let mut realized_filter: Vec<String> = Vec::new();
            self.flatten(&tree, None, &mut realized_filter, None, -1.0, &mut plan)?;
        }
        Ok(plan)
    }

    /// Restrict the node's own full list to the periods its ancestors
    /// realized (the filter narrows level by level).
    fn filtered_active(
        spec: &SolveSpec,
        full: ActiveTimeList,
        realized_filter: &mut Vec<String>,
    ) -> ActiveTimeList {
        if realized_filter.is_empty() {
            for period in spec
                .realized_periods
                .iter()
                .chain(&spec.realized_invest_periods)
                .chain(&spec.fix_storage_periods)
            {
                if !realized_filter.contains(period) {
                    realized_filter.push(period.clone());
                }
            }
            return full;
        }
        let mut filtered = ActiveTimeList::new();
        for (label, steps) in full.iter() {
            if realized_filter.iter().any(|p| p == label) {
                filtered.push_entry(label.to_string(), steps.to_vec());
            }
        }
        realized_filter.retain(|p| spec.keeps_period(p));
        filtered
    }

    fn flatten(
        &mut self,
        node: &SolveNode,
        parent: Option<(&str, &str)>,
        realized_filter: &mut Vec<String>,
        start: Option<(String, String)>,
        duration: f64,
        plan: &mut SolvePlan,
    ) -> DecompResult<()> {
        let spec = self.tables.solve(node.solve_name())?;
        let full_own = resolve_active_time(self.tables, spec)?;
        let full = Self::filtered_active(spec, full_own.clone(), realized_filter);

        match node {
            SolveNode::Single { solve, child } => {
                plan.order.push(solve.clone());
                plan.complete_solve.insert(solve.clone(), solve.clone());
                plan.parent_roll
                    .insert(solve.clone(), parent.map(|(_, roll)| roll.to_string()));
                plan.active.insert(solve.clone(), full.clone());
                plan.realized.insert(solve.clone(), full);
                plan.first_of_level.insert(solve.clone());
                plan.last_of_level.insert(solve.clone());
                if let Some(child) = child {
                    self.flatten(
                        child,
                        Some((solve, solve)),
                        realized_filter,
                        None,
                        -1.0,
                        plan,
                    )?;
                }
            }
            SolveNode::Rolling {
                solve,
                rolling,
                child,
            } => {
                let duration = if duration == -1.0 {
                    rolling.duration
                } else {
                    duration
                };
                // A start handed down from the parent roll is on the parent's
                // timeline; map it onto this solve's resolution first.
                let mapped_start = match &start {
                    Some((period, step)) => {
                        let parent_name = parent
                            .map(|(name, _)| name)
                            .ok_or_else(|| DecompError::UnknownSolve {
                                solve: solve.clone(),
                            })?;
                        let parent_spec = self.tables.solve(parent_name)?;
                        let mapped = find_next_timestep(
                            self.tables,
                            &full_own,
                            period,
                            step,
                            parent_spec,
                            spec,
                        )?;
                        Some((period.clone(), mapped))
                    }
                    None => None,
                };

                let counter = self.roll_counters.entry(solve.clone()).or_insert(0);
                let windows: RollWindows = rolling::decompose(
                    solve,
                    &full,
                    rolling.jump,
                    rolling.horizon,
                    mapped_start.as_ref().map(|(p, s)| (p.as_str(), s.as_str())),
                    duration,
                    counter,
                )?;
                debug!(
                    solve = %solve,
                    rolls = windows.names.len(),
                    jump = rolling.jump,
                    horizon = rolling.horizon,
                    "cut rolling solve into rolls"
                );

                for (i, name) in windows.names.iter().enumerate() {
                    plan.complete_solve.insert(name.clone(), solve.clone());
                    plan.parent_roll
                        .insert(name.clone(), parent.map(|(_, roll)| roll.to_string()));
                    plan.active.insert(name.clone(), windows.active[i].clone());
                    plan.realized
                        .insert(name.clone(), windows.realized[i].clone());
                }
                // Only the first roll under a level-opening parent (or with no
                // parent at all) opens this level.
                let opens_level = match parent {
                    None => true,
                    Some((_, parent_roll)) => plan.first_of_level.contains(parent_roll),
                };
                if opens_level {
                    if let Some(first) = windows.names.first() {
                        plan.first_of_level.insert(first.clone());
                    }
                }
                if let Some(last) = windows.names.last() {
                    plan.last_of_level.insert(last.clone());
                }

                match child {
                    Some(child) => {
                        for (i, roll) in windows.names.iter().enumerate() {
                            plan.order.push(roll.clone());
                            let child_start = if i == 0 {
                                None
                            } else {
                                windows.active[i]
                                    .first_step()
                                    .map(|(p, s)| (p.to_string(), s.to_string()))
                            };
                            self.flatten(
                                child,
                                Some((solve, roll)),
                                realized_filter,
                                child_start,
                                rolling.jump,
                                plan,
                            )?;
                        }
                    }
                    None => plan.order.extend(windows.names.iter().cloned()),
                }
            }
        }
        Ok(())
    }
}
