//! Aggregation of a base timeline into a coarser target step duration.

use tracing::warn;

use crate::error::{TimelineError, TimelineResult};
use crate::timeline::{Timeline, Timestep};

/// Result of aggregating the blocks of one timeblock set: the derived
/// timeline and the rewritten (start step, step count) claims against it.
#[derive(Debug, Clone)]
pub struct AggregatedBlocks {
    pub timeline: Timeline,
    pub blocks: Vec<(String, usize)>,
}

/// Merge base steps into steps of roughly `target_duration`.
///
/// Walks each block of the base timeline, accumulating duration until it
/// reaches the target, then closes the merged step under the id of its first
/// base step. The final partial step of each block always closes, even when
/// under the target. A closed step over the target only warns: the target is
/// not an integer multiple of the base step durations.
pub fn aggregate_timeline(
    base: &Timeline,
    blocks: &[(String, usize)],
    target_duration: f64,
    derived_name: &str,
) -> TimelineResult<AggregatedBlocks> {
    let mut new_steps: Vec<Timestep> = Vec::new();
    let mut new_blocks: Vec<(String, usize)> = Vec::new();

    for (block_start, step_count) in blocks {
        let first_index =
            base.position(block_start)
                .ok_or_else(|| TimelineError::UnknownStep {
                    timeline: base.name().to_string(),
                    step: block_start.clone(),
                })?;
        let available = base.len() - first_index;
        if *step_count > available {
            return Err(TimelineError::BlockOverrun {
                timeline: base.name().to_string(),
                step: block_start.clone(),
                requested: *step_count,
                available,
            });
        }

        let mut merged_id = block_start.clone();
        let mut accumulated = 0.0;
        let mut added = 0usize;
        for step in &base.steps()[first_index..first_index + step_count] {
            if accumulated >= target_duration {
                if accumulated > target_duration {
                    warn!(
                        step = merged_id.as_str(),
                        accumulated,
                        target = target_duration,
                        "aggregated step exceeds the target duration; the new \
                         step duration is not a multiple of the base step durations"
                    );
                }
                new_steps.push(Timestep::new(merged_id.clone(), accumulated));
                merged_id = step.id.clone();
                accumulated = 0.0;
                added += 1;
            }
            accumulated += step.duration;
        }
        // The block's tail always closes, even under-duration.
        new_steps.push(Timestep::new(merged_id, accumulated));
        added += 1;
        new_blocks.push((block_start.clone(), added));
    }

    Ok(AggregatedBlocks {
        timeline: Timeline::new(derived_name, new_steps)?,
        blocks: new_blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly(n: usize) -> Timeline {
        Timeline::new(
            "base",
            (1..=n).map(|i| Timestep::new(format!("t{i:04}"), 1.0)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn even_divisor_preserves_block_totals() {
        let base = hourly(8);
        let agg = aggregate_timeline(&base, &[("t0001".to_string(), 8)], 2.0, "base_agg").unwrap();
        assert_eq!(agg.blocks, vec![("t0001".to_string(), 4)]);
        assert_eq!(agg.timeline.len(), 4);
        // 4 steps of 2h each: the base-step total is preserved.
        let total: f64 = agg.timeline.steps().iter().map(|s| s.duration).sum();
        assert_eq!(total, 8.0);
        assert!(agg.timeline.steps().iter().all(|s| s.duration == 2.0));
    }

    #[test]
    fn merged_step_takes_first_base_id() {
        let base = hourly(4);
        let agg = aggregate_timeline(&base, &[("t0001".to_string(), 4)], 2.0, "base_agg").unwrap();
        let ids: Vec<_> = agg.timeline.steps().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["t0001", "t0003"]);
    }

    #[test]
    fn uneven_divisor_closes_partial_tail() {
        let base = hourly(5);
        let agg = aggregate_timeline(&base, &[("t0001".to_string(), 5)], 2.0, "base_agg").unwrap();
        // 2 + 2 + 1: the tail closes even though it is under the target.
        let durations: Vec<_> = agg.timeline.steps().iter().map(|s| s.duration).collect();
        assert_eq!(durations, vec![2.0, 2.0, 1.0]);
        assert_eq!(agg.blocks[0].1, 3);
    }

    #[test]
    fn block_overrun_is_an_error() {
        let base = hourly(3);
        let err =
            aggregate_timeline(&base, &[("t0002".to_string(), 3)], 2.0, "base_agg").unwrap_err();
        assert!(matches!(err, TimelineError::BlockOverrun { .. }));
    }

    #[test]
    fn unknown_block_start_is_an_error() {
        let base = hourly(3);
        let err =
            aggregate_timeline(&base, &[("t9999".to_string(), 1)], 2.0, "base_agg").unwrap_err();
        assert!(matches!(err, TimelineError::UnknownStep { .. }));
    }
}
