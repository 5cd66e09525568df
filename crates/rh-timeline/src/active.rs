//! Ordered active-time lists: the timesteps a concrete solve actually sees.

/// One timestep as seen by a solve: id, global index into its timeline,
/// and duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStep {
    pub step: String,
    pub index: usize,
    pub duration: f64,
}

impl ActiveStep {
    pub fn new(step: impl Into<String>, index: usize, duration: f64) -> Self {
        Self {
            step: step.into(),
            index,
            duration,
        }
    }
}

/// Position of a step inside an [`ActiveTimeList`]: (entry index, step index).
pub type StepPos = (usize, usize);

/// Ordered mapping from period-or-branch label to its active timesteps.
///
/// Insertion order is the model's period order and is preserved; the label
/// of a branched continuation is `<period>_<branch>` and shares the parent
/// period's timeline from the branch point onward.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveTimeList {
    entries: Vec<(String, Vec<ActiveStep>)>,
}

impl ActiveTimeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append steps under a label, extending the label if it already exists
    /// (a period may be covered by several timeblocks).
    pub fn extend(&mut self, label: &str, steps: impl IntoIterator<Item = ActiveStep>) {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(l, _)| l == label) {
            existing.extend(steps);
        } else {
            self.entries.push((label.to_string(), steps.into_iter().collect()));
        }
    }

    pub fn push_entry(&mut self, label: impl Into<String>, steps: Vec<ActiveStep>) {
        self.entries.push((label.into(), steps));
    }

    pub fn get(&self, label: &str) -> Option<&[ActiveStep]> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, s)| s.as_slice())
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.entries.iter().any(|(l, _)| l == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ActiveStep])> {
        self.entries.iter().map(|(l, s)| (l.as_str(), s.as_slice()))
    }

    pub fn entry(&self, pos: usize) -> Option<(&str, &[ActiveStep])> {
        self.entries.get(pos).map(|(l, s)| (l.as_str(), s.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_label(&self) -> Option<&str> {
        self.entries.first().map(|(l, _)| l.as_str())
    }

    pub fn last_label(&self) -> Option<&str> {
        self.entries.last().map(|(l, _)| l.as_str())
    }

    /// First (label, step id) pair of the list, if non-empty.
    pub fn first_step(&self) -> Option<(&str, &str)> {
        self.entries
            .iter()
            .find(|(_, steps)| !steps.is_empty())
            .map(|(l, steps)| (l.as_str(), steps[0].step.as_str()))
    }

    /// Step at a position.
    pub fn step_at(&self, pos: StepPos) -> Option<&ActiveStep> {
        self.entries.get(pos.0).and_then(|(_, s)| s.get(pos.1))
    }

    /// Total step count across all labels.
    pub fn step_count(&self) -> usize {
        self.entries.iter().map(|(_, s)| s.len()).sum()
    }

    /// Copy the window from `start` to `end` (both inclusive), keeping every
    /// label in between whole. Windows spanning several periods never skip a
    /// period.
    pub fn window(&self, start: StepPos, end: StepPos) -> ActiveTimeList {
        let mut out = ActiveTimeList::new();
        for (ei, (label, steps)) in self.entries.iter().enumerate() {
            if ei < start.0 || ei > end.0 {
                continue;
            }
            let lo = if ei == start.0 { start.1 } else { 0 };
            let hi = if ei == end.0 { end.1 + 1 } else { steps.len() };
            if lo < hi {
                out.push_entry(label.clone(), steps[lo..hi].to_vec());
            }
        }
        out
    }

    /// Duration-weighted running offsets of the concatenated list, one per
    /// step in order. Strictly increasing for any well-formed list.
    pub fn running_offsets(&self) -> Vec<f64> {
        let mut offsets = Vec::with_capacity(self.step_count());
        let mut running = 0.0;
        for (_, steps) in &self.entries {
            for step in steps {
                offsets.push(running);
                running += step.duration;
            }
        }
        offsets
    }
}
