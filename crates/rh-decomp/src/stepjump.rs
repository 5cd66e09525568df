//! Step-jump records: for every active timestep, where its predecessor
//! lies and how far back it is on the underlying timeline.

use rh_timeline::{ActiveStep, ActiveTimeList};

use crate::error::{DecompError, DecompResult};

/// Predecessor links of one timestep.
///
/// `previous_within_block` wraps a block's first step back to the block's
/// own last step, so intra-block dynamics stay cyclic. `jump` is the index
/// distance to `previous` on the timeline and is negative on a wrap.
#[derive(Debug, Clone, PartialEq)]
pub struct StepJumpRecord {
    pub period: String,
    pub step: String,
    pub previous: String,
    pub previous_within_block: String,
    pub previous_period: String,
    pub previous_within_solve: String,
    pub jump: i64,
}

/// Contiguous index runs of a period's steps, as (start, end) inclusive.
fn blocks_of(steps: &[ActiveStep]) -> Vec<(usize, usize)> {
    let mut bounds = Vec::new();
    let mut start = 0usize;
    for j in 1..steps.len() {
        if steps[j].index > steps[j - 1].index + 1 {
            bounds.push((start, j - 1));
            start = j;
        }
    }
    if !steps.is_empty() {
        bounds.push((start, steps.len() - 1));
    }
    bounds
}

/// Build the predecessor table for one concrete solve's active list.
///
/// Within a period a step's predecessor is the step before it. A period's
/// first step wraps to the previous period's last step: for a realized
/// period label that is the label just before it in the list (the first
/// period wraps to the last), while a branch label follows its lineage
/// back to the closest earlier label sharing the same time branch.
pub fn build_step_jumps(
    solve: &str,
    active: &ActiveTimeList,
    period_branch: &[(String, String)],
    branch_lineage: &[(String, String)],
) -> DecompResult<Vec<StepJumpRecord>> {
    let labels: Vec<&str> = active.labels().collect();
    let mut records = Vec::with_capacity(active.step_count());

    for (li, (period, steps)) in active.iter().enumerate() {
        if steps.is_empty() {
            continue;
        }
        let bounds = blocks_of(steps);
        let last = &steps[steps.len() - 1];

        for &(block_start, block_end) in &bounds {
            for j in block_start..=block_end {
                let step = &steps[j];
                let record = if j > 0 {
                    let prev = &steps[j - 1];
                    let within_block = if j == block_start {
                        // first step of a later block wraps inside its block
                        steps[block_end].step.clone()
                    } else {
                        prev.step.clone()
                    };
                    StepJumpRecord {
                        period: period.to_string(),
                        step: step.step.clone(),
                        previous: prev.step.clone(),
                        previous_within_block: within_block,
                        previous_period: period.to_string(),
                        previous_within_solve: prev.step.clone(),
                        jump: step.index as i64 - prev.index as i64,
                    }
                } else {
                    period_first_record(
                        solve,
                        active,
                        &labels,
                        li,
                        period,
                        steps,
                        step,
                        last,
                        bounds[0].1,
                        period_branch,
                        branch_lineage,
                    )?
                };
                records.push(record);
            }
        }
    }
    Ok(records)
}

/// Record for the first step of a period, where the predecessor crosses a
/// period (or branch) boundary.
#[allow(clippy::too_many_arguments)]
fn period_first_record(
    solve: &str,
    active: &ActiveTimeList,
    labels: &[&str],
    li: usize,
    period: &str,
    steps: &[ActiveStep],
    step: &ActiveStep,
    last: &ActiveStep,
    first_block_end: usize,
    period_branch: &[(String, String)],
    branch_lineage: &[(String, String)],
) -> DecompResult<StepJumpRecord> {
    let within_block = steps[first_block_end].step.clone();

    if period_branch.iter().any(|(p, b)| p == period && b == period) {
        // Realized period: wrap to the previous label, or to the last
        // label for the very first one.
        let prev_label = if li == 0 {
            labels[labels.len() - 1]
        } else {
            labels[li - 1]
        };
        let prev_steps = active.get(prev_label).unwrap_or(&[]);
        let prev_last = prev_steps.last().unwrap_or(last);
        return Ok(StepJumpRecord {
            period: period.to_string(),
            step: step.step.clone(),
            previous: last.step.clone(),
            previous_within_block: within_block,
            previous_period: prev_label.to_string(),
            previous_within_solve: prev_last.step.clone(),
            jump: step.index as i64 - prev_last.index as i64,
        });
    }

    // Branch label: find the period it branches off.
    let origin = period_branch
        .iter()
        .find(|(_, b)| b == period)
        .map(|(o, _)| o.as_str())
        .ok_or_else(|| DecompError::BranchLineageNotFound {
            solve: solve.to_string(),
            period: period.to_string(),
        })?;

    if period_branch.iter().any(|(p, b)| p == origin && b == origin) {
        // Branching off a realized period: the wrap stays inside this label.
        return Ok(StepJumpRecord {
            period: period.to_string(),
            step: step.step.clone(),
            previous: last.step.clone(),
            previous_within_block: within_block,
            previous_period: period.to_string(),
            previous_within_solve: last.step.clone(),
            jump: step.index as i64 - last.index as i64,
        });
    }

    // A branch label continuing from an earlier period: walk back to the
    // closest earlier label on the same time branch.
    let time_branch = branch_lineage
        .iter()
        .rev()
        .find(|(label, _)| label == period)
        .map(|(_, tb)| tb.as_str())
        .ok_or_else(|| DecompError::BranchLineageNotFound {
            solve: solve.to_string(),
            period: period.to_string(),
        })?;
    for earlier in labels[..li].iter().rev() {
        let shares_branch = branch_lineage
            .iter()
            .any(|(label, tb)| label == earlier && tb == time_branch);
        if !shares_branch {
            continue;
        }
        let prev_steps = active.get(earlier).unwrap_or(&[]);
        if let Some(prev_last) = prev_steps.last() {
            return Ok(StepJumpRecord {
                period: period.to_string(),
                step: step.step.clone(),
                previous: last.step.clone(),
                previous_within_block: within_block,
                previous_period: earlier.to_string(),
                previous_within_solve: prev_last.step.clone(),
                jump: step.index as i64 - prev_last.index as i64,
            });
        }
    }
    Err(DecompError::BranchLineageNotFound {
        solve: solve.to_string(),
        period: period.to_string(),
    })
}
