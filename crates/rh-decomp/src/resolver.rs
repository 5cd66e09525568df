//! Timeblock resolver: (solve, period) coverage into an active time list.

use rh_timeline::{ActiveStep, ActiveTimeList, TimelineError};

use crate::error::{DecompError, DecompResult};
use crate::tables::{DecompTables, SolveSpec};

/// Resolve the full active time list of a declared solve.
///
/// For each (period, timeblock set) pair the solve uses, look up the set's
/// timeline, locate each block's starting timestep and take exactly
/// `step_count` steps, tagging each with (id, global index, duration).
/// Fails when nothing resolves: the period/timeblock/timeline link is broken.
pub fn resolve_active_time(
    tables: &DecompTables,
    solve: &SolveSpec,
) -> DecompResult<ActiveTimeList> {
    let mut active = ActiveTimeList::new();
    for (period, set_name) in &solve.period_block_sets {
        let Some(set) = tables.block_set(set_name) else {
            continue;
        };
        let Some(timeline) = tables.store.get(&set.timeline) else {
            continue;
        };
        for (block_start, step_count) in &set.blocks {
            let Some(first) = timeline.position(block_start) else {
                continue;
            };
            if first + step_count > timeline.len() {
                return Err(DecompError::Timeline(TimelineError::BlockOverrun {
                    timeline: timeline.name().to_string(),
                    step: block_start.clone(),
                    requested: *step_count,
                    available: timeline.len() - first,
                }));
            }
            let steps = timeline.steps()[first..first + step_count]
                .iter()
                .enumerate()
                .map(|(offset, step)| {
                    ActiveStep::new(step.id.clone(), first + offset, step.duration)
                });
            active.extend(period, steps);
        }
    }
    if active.is_empty() {
        return Err(DecompError::NoTimelineLink {
            solve: solve.name.clone(),
        });
    }
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{single_solve_config, tables_of};

    #[test]
    fn resolves_period_block_coverage() {
        let tables = tables_of(&single_solve_config(8));
        let solve = tables.solve("dispatch").unwrap();
        let active = resolve_active_time(&tables, solve).unwrap();
        assert_eq!(active.len(), 1);
        let steps = active.get("p1").unwrap();
        assert_eq!(steps.len(), 8);
        assert_eq!(steps[0].step, "t0001");
        assert_eq!(steps[0].index, 0);
        assert_eq!(steps[7].index, 7);
    }

    #[test]
    fn broken_link_is_fatal() {
        let mut config = single_solve_config(4);
        config.solves[0].period_timeblock_sets[0].timeblock_set = "missing".to_string();
        // Validation would catch this earlier; the resolver still refuses.
        let tables = tables_of(&config);
        let solve = tables.solve("dispatch").unwrap();
        let err = resolve_active_time(&tables, solve).unwrap_err();
        assert!(matches!(err, DecompError::NoTimelineLink { .. }));
    }

    #[test]
    fn offsets_strictly_increase_across_periods() {
        let tables = tables_of(&crate::testutil::two_period_config(4));
        let solve = tables.solve("dispatch").unwrap();
        let active = resolve_active_time(&tables, solve).unwrap();
        let offsets = active.running_offsets();
        for pair in offsets.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }
}
