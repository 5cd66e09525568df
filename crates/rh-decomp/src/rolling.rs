//! Rolling decomposer: split an active time list into overlapping rolls.

use rh_timeline::{ActiveTimeList, StepPos};

use crate::error::{DecompError, DecompResult};

/// Ordered rolls of one rolling-window solve: names plus per-roll active
/// (visible) and realized (kept) windows.
#[derive(Debug, Clone)]
pub struct RollWindows {
    pub names: Vec<String>,
    pub active: Vec<ActiveTimeList>,
    pub realized: Vec<ActiveTimeList>,
}

/// Split `full` into rolls of `horizon` lookahead spaced `jump` apart.
///
/// One pass over the list tracks three counters reset per roll: a roll starts
/// at the first step (or at `start`) and thereafter wherever the jump counter
/// reaches `jump`; its active window ends just before the horizon counter
/// would exceed `horizon` and its realized window just before the jump
/// counter would exceed `jump`. The walk stops once `duration` is covered
/// (-1 = unbounded). Roll names take the next values of `roll_counter`,
/// which is owned by the caller and never reset.
pub fn decompose(
    solve: &str,
    full: &ActiveTimeList,
    jump: f64,
    horizon: f64,
    start: Option<(&str, &str)>,
    duration: f64,
    roll_counter: &mut u64,
) -> DecompResult<RollWindows> {
    let mut starts: Vec<StepPos> = Vec::new();
    let mut realized_ends: Vec<StepPos> = Vec::new();
    let mut active_ends: Vec<StepPos> = Vec::new();

    let mut duration_counter = 0.0;
    let mut horizon_counter = 0.0;
    let mut jump_counter = 0.0;
    let mut started = false;
    let mut last_pos: StepPos = (0, 0);

    'walk: for (ei, (label, steps)) in full.iter().enumerate() {
        for (si, step) in steps.iter().enumerate() {
            if started {
                if duration != -1.0 && duration_counter >= duration {
                    realized_ends.push(last_pos);
                    active_ends.push(last_pos);
                    break 'walk;
                }
                if jump_counter >= jump {
                    realized_ends.push(last_pos);
                    starts.push((ei, si));
                    jump_counter -= jump;
                }
                if horizon_counter >= horizon {
                    active_ends.push(last_pos);
                    horizon_counter -= jump;
                }
                horizon_counter += step.duration;
                jump_counter += step.duration;
                duration_counter += step.duration;
                last_pos = (ei, si);
            } else if start.map_or(true, |(p, s)| p == label && s == step.step) {
                starts.push((ei, si));
                started = true;
                horizon_counter += step.duration;
                jump_counter += step.duration;
                duration_counter += step.duration;
                last_pos = (ei, si);
            }
        }
    }

    if !started {
        let (period, step) = start.unwrap_or(("-", "-"));
        return Err(DecompError::StartNotFound {
            solve: solve.to_string(),
            period: period.to_string(),
            step: step.to_string(),
        });
    }
    // Rolls whose window end was never reached extend to the last step seen.
    while active_ends.len() < starts.len() {
        active_ends.push(last_pos);
    }
    while realized_ends.len() < starts.len() {
        realized_ends.push(last_pos);
    }

    let mut names = Vec::with_capacity(starts.len());
    let mut active = Vec::with_capacity(starts.len());
    let mut realized = Vec::with_capacity(starts.len());
    for (i, &roll_start) in starts.iter().enumerate() {
        names.push(format!("{solve}_roll_{roll_counter}"));
        *roll_counter += 1;
        active.push(full.window(roll_start, active_ends[i]));
        realized.push(full.window(roll_start, realized_ends[i]));
    }

    Ok(RollWindows {
        names,
        active,
        realized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_timeline::ActiveStep;

    fn hourly_list(periods: &[(&str, usize)]) -> ActiveTimeList {
        let mut atl = ActiveTimeList::new();
        let mut index = 0usize;
        for (label, count) in periods {
            let steps: Vec<ActiveStep> = (0..*count)
                .map(|_| {
                    let s = ActiveStep::new(format!("t{:04}", index + 1), index, 1.0);
                    index += 1;
                    s
                })
                .collect();
            atl.push_entry(label.to_string(), steps);
        }
        atl
    }

    #[test]
    fn bounded_duration_yields_ceil_rolls() {
        // jump=3, horizon=5, duration=10 over 12 steps: ceil(10/3) = 4 rolls.
        let full = hourly_list(&[("p1", 12)]);
        let mut counter = 0;
        let rolls = decompose("s", &full, 3.0, 5.0, None, 10.0, &mut counter).unwrap();
        assert_eq!(rolls.names.len(), 4);
        assert_eq!(
            rolls.names,
            vec!["s_roll_0", "s_roll_1", "s_roll_2", "s_roll_3"]
        );

        // Realized windows are jump long except possibly the last.
        let realized_lens: Vec<usize> = rolls.realized.iter().map(|r| r.step_count()).collect();
        assert_eq!(realized_lens, vec![3, 3, 3, 1]);

        // Active windows are horizon long, clipped at the duration end.
        let active_lens: Vec<usize> = rolls.active.iter().map(|r| r.step_count()).collect();
        assert_eq!(active_lens, vec![5, 5, 4, 1]);
    }

    #[test]
    fn roll_counter_is_never_reset() {
        let full = hourly_list(&[("p1", 4)]);
        let mut counter = 0;
        decompose("s", &full, 2.0, 2.0, None, -1.0, &mut counter).unwrap();
        let second = decompose("s", &full, 2.0, 2.0, None, -1.0, &mut counter).unwrap();
        assert_eq!(second.names[0], "s_roll_2");
    }

    #[test]
    fn windows_span_period_boundaries_whole() {
        let full = hourly_list(&[("p1", 4), ("p2", 4)]);
        let mut counter = 0;
        let rolls = decompose("s", &full, 2.0, 4.0, None, -1.0, &mut counter).unwrap();
        assert_eq!(rolls.names.len(), 4);
        // The second roll's active window crosses from p1 into p2.
        let second = &rolls.active[1];
        assert_eq!(second.get("p1").unwrap().len(), 2);
        assert_eq!(second.get("p2").unwrap().len(), 2);
    }

    #[test]
    fn explicit_start_offsets_the_first_roll() {
        let full = hourly_list(&[("p1", 6)]);
        let mut counter = 0;
        let rolls =
            decompose("s", &full, 2.0, 2.0, Some(("p1", "t0003")), -1.0, &mut counter).unwrap();
        let first = rolls.active[0].get("p1").unwrap();
        assert_eq!(first[0].step, "t0003");
    }

    #[test]
    fn missing_start_is_fatal() {
        let full = hourly_list(&[("p1", 4)]);
        let mut counter = 0;
        let err = decompose("s", &full, 2.0, 2.0, Some(("p1", "t9999")), -1.0, &mut counter)
            .unwrap_err();
        assert!(matches!(err, DecompError::StartNotFound { .. }));
    }
}
