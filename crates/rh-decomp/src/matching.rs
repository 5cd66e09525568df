//! Cross-level timestep matching between nested solves on different
//! timeline resolutions.

use std::collections::HashMap;

use rh_timeline::{ActiveTimeList, TimelineError};

use crate::error::{DecompError, DecompResult};
use crate::tables::{DecompTables, SolveSpec};

/// One row of the timeline matching map: a child timestep and the parent
/// timestep that covers it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRow {
    pub period: String,
    pub step: String,
    pub upper_step: String,
}

/// Duration-weighted offsets of the timeline a solve uses for `period`,
/// keyed by step id, together with the timeline's name.
fn timeline_offsets(
    tables: &DecompTables,
    solve: &SolveSpec,
    period: &str,
) -> DecompResult<(String, HashMap<String, f64>)> {
    let timeline = tables.timeline_of(solve, period)?;
    Ok((timeline.name().to_string(), timeline.offsets_by_id()))
}

fn offset_of(offsets: &HashMap<String, f64>, timeline: &str, step: &str) -> DecompResult<f64> {
    offsets
        .get(step)
        .copied()
        .ok_or_else(|| {
            DecompError::Timeline(TimelineError::UnknownStep {
                timeline: timeline.to_string(),
                step: step.to_string(),
            })
        })
}

/// Branch labels map back to the period whose timeline they share.
fn real_period<'a>(period_branch: &'a [(String, String)], label: &'a str) -> &'a str {
    period_branch
        .iter()
        .rev()
        .find(|(_, branch)| branch == label)
        .map(|(period, _)| period.as_str())
        .unwrap_or(label)
}

/// First timestep of `own_active` at or after the offset that `step` has on
/// the parent solve's timeline. Falls back to the period's last step when
/// the parent offset lies beyond the child window.
pub fn find_next_timestep(
    tables: &DecompTables,
    own_active: &ActiveTimeList,
    period: &str,
    step: &str,
    parent_solve: &SolveSpec,
    own_solve: &SolveSpec,
) -> DecompResult<String> {
    let (parent_tl, parent_offsets) = timeline_offsets(tables, parent_solve, period)?;
    let (own_tl, own_offsets) = timeline_offsets(tables, own_solve, period)?;
    let from_start = offset_of(&parent_offsets, &parent_tl, step)?;

    let steps = own_active
        .get(period)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DecompError::UnknownPeriod {
            solve: own_solve.name.clone(),
            period: period.to_string(),
        })?;
    let mut next = steps[steps.len() - 1].step.clone();
    for candidate in steps {
        if offset_of(&own_offsets, &own_tl, &candidate.step)? >= from_start {
            next = candidate.step.clone();
            break;
        }
    }
    Ok(next)
}

/// Last timestep of the parent's window whose offset does not exceed the
/// offset of `step` on the child solve's timeline. A child step starting
/// before the parent window has no cover and is an error.
pub fn find_previous_timestep(
    tables: &DecompTables,
    parent_active: &ActiveTimeList,
    label: &str,
    step: &str,
    child_solve: &SolveSpec,
    parent_solve: &SolveSpec,
    period_branch: &[(String, String)],
) -> DecompResult<String> {
    let period = real_period(period_branch, label);
    let (child_tl, child_offsets) = timeline_offsets(tables, child_solve, period)?;
    let (parent_tl, parent_offsets) = timeline_offsets(tables, parent_solve, period)?;
    let from_start = offset_of(&child_offsets, &child_tl, step)?;

    let steps = parent_active
        .get(period)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DecompError::UnknownPeriod {
            solve: parent_solve.name.clone(),
            period: period.to_string(),
        })?;
    let mut previous = steps[steps.len() - 1].step.clone();
    let mut covered: Option<&str> = None;
    for candidate in steps {
        if offset_of(&parent_offsets, &parent_tl, &candidate.step)? > from_start {
            match covered {
                Some(found) => previous = found.to_string(),
                None => {
                    return Err(DecompError::OffsetBeforeParentWindow {
                        period: label.to_string(),
                        step: step.to_string(),
                    })
                }
            }
            break;
        }
        covered = Some(&candidate.step);
    }
    Ok(previous)
}

/// Map every timestep the child solve sees onto the parent timestep that
/// covers it.
pub fn build_matching_map(
    tables: &DecompTables,
    parent_active: &ActiveTimeList,
    child_active: &ActiveTimeList,
    child_solve: &SolveSpec,
    parent_solve: &SolveSpec,
    period_branch: &[(String, String)],
) -> DecompResult<Vec<MatchRow>> {
    let mut rows = Vec::with_capacity(child_active.step_count());
    for (label, steps) in child_active.iter() {
        for step in steps {
            let upper = find_previous_timestep(
                tables,
                parent_active,
                label,
                &step.step,
                child_solve,
                parent_solve,
                period_branch,
            )?;
            rows.push(MatchRow {
                period: label.to_string(),
                step: step.step.clone(),
                upper_step: upper,
            });
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve_active_time;
    use crate::testutil::{single_solve_config, solve_def, tables_of};
    use rh_model::{BlockDef, PeriodBlockSetDef, PeriodsDef, TimeblockSetDef};

    /// Two solves over the same 8-step hourly timeline: `plan` on a 4-hour
    /// aggregated view, `dispatch` at full resolution.
    fn two_resolution_tables() -> crate::tables::DecompTables {
        let mut config = single_solve_config(8);
        config.timeblock_sets.push(TimeblockSetDef {
            name: "coarse".to_string(),
            timeline: "hourly".to_string(),
            blocks: vec![BlockDef {
                start_step: "t0001".to_string(),
                step_count: 8,
            }],
            new_step_duration: Some(4.0),
        });
        let mut plan = solve_def("plan");
        plan.period_timeblock_sets = vec![PeriodBlockSetDef {
            period: "p1".to_string(),
            timeblock_set: "coarse".to_string(),
        }];
        plan.realized_periods = PeriodsDef::Flat(vec!["p1".to_string()]);
        config.solves.push(plan);
        config.model.solves = vec!["plan".to_string(), "dispatch".to_string()];
        tables_of(&config)
    }

    #[test]
    fn child_steps_map_to_covering_parent_step() {
        let tables = two_resolution_tables();
        let plan = tables.solve("plan").unwrap();
        let dispatch = tables.solve("dispatch").unwrap();
        let parent_active = resolve_active_time(&tables, plan).unwrap();
        let child_active = resolve_active_time(&tables, dispatch).unwrap();
        let pb = vec![("p1".to_string(), "p1".to_string())];

        let rows =
            build_matching_map(&tables, &parent_active, &child_active, dispatch, plan, &pb)
                .unwrap();
        assert_eq!(rows.len(), 8);
        // Hours 1-4 fall under the first aggregated step, hours 5-8 under
        // the second.
        assert!(rows[..4].iter().all(|r| r.upper_step == "t0001"));
        assert!(rows[4..].iter().all(|r| r.upper_step == "t0005"));
    }

    #[test]
    fn next_timestep_rounds_up_to_child_resolution() {
        let tables = two_resolution_tables();
        let plan = tables.solve("plan").unwrap();
        let dispatch = tables.solve("dispatch").unwrap();
        let child_active = resolve_active_time(&tables, dispatch).unwrap();

        // The second aggregated step starts at offset 4.0, which is hour 5.
        let next =
            find_next_timestep(&tables, &child_active, "p1", "t0005", plan, dispatch).unwrap();
        assert_eq!(next, "t0005");
    }

    #[test]
    fn step_before_parent_window_is_fatal() {
        let tables = two_resolution_tables();
        let plan = tables.solve("plan").unwrap();
        let dispatch = tables.solve("dispatch").unwrap();
        let child_active = resolve_active_time(&tables, dispatch).unwrap();
        let pb = vec![("p1".to_string(), "p1".to_string())];

        // Parent window starting at hour 5 cannot cover hour 1.
        let parent_active = resolve_active_time(&tables, plan)
            .unwrap()
            .window((0, 1), (0, 1));
        let err = find_previous_timestep(
            &tables,
            &parent_active,
            "p1",
            "t0001",
            dispatch,
            plan,
            &pb,
        )
        .unwrap_err();
        assert!(matches!(err, DecompError::OffsetBeforeParentWindow { .. }));
    }
}
