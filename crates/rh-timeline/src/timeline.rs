//! Named ordered timestep sequences and the store that owns them.

use std::collections::HashMap;

use crate::error::{TimelineError, TimelineResult};

/// One discretized step of a timeline.
///
/// Order within the owning timeline is significant and never re-sorted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestep {
    pub id: String,
    /// Positive duration in base time units (typically hours).
    pub duration: f64,
}

impl Timestep {
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            duration,
        }
    }
}

/// An ordered timestep sequence with a name.
#[derive(Debug, Clone)]
pub struct Timeline {
    name: String,
    steps: Vec<Timestep>,
}

impl Timeline {
    pub fn new(name: impl Into<String>, steps: Vec<Timestep>) -> TimelineResult<Self> {
        for step in &steps {
            if step.duration <= 0.0 {
                return Err(TimelineError::NonPositiveDuration {
                    step: step.id.clone(),
                    duration: step.duration,
                });
            }
        }
        Ok(Self {
            name: name.into(),
            steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Timestep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the step with the given id, if present.
    pub fn position(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    /// Running offset (sum of preceding durations) per step id.
    ///
    /// Used for cross-timeline alignment, where two timelines over the same
    /// period may discretize it with different step sizes.
    pub fn offsets_by_id(&self) -> HashMap<String, f64> {
        let mut offsets = HashMap::with_capacity(self.steps.len());
        let mut running = 0.0;
        for step in &self.steps {
            offsets.insert(step.id.clone(), running);
            running += step.duration;
        }
        offsets
    }
}

/// All timelines of one run, base and derived, keyed by name.
///
/// Derived timelines record their source so sparse, event-keyed parameters
/// on the base timeline can be mapped back later.
#[derive(Debug, Default)]
pub struct TimelineStore {
    timelines: Vec<Timeline>,
    /// derived name -> source name
    origins: HashMap<String, String>,
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timeline: Timeline) -> TimelineResult<()> {
        if self.get(timeline.name()).is_some() {
            return Err(TimelineError::DuplicateTimeline {
                name: timeline.name().to_string(),
            });
        }
        self.timelines.push(timeline);
        Ok(())
    }

    /// Register a derived timeline together with its provenance.
    pub fn insert_derived(
        &mut self,
        timeline: Timeline,
        source: impl Into<String>,
    ) -> TimelineResult<()> {
        let name = timeline.name().to_string();
        self.insert(timeline)?;
        self.origins.insert(name, source.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Timeline> {
        self.timelines.iter().find(|t| t.name() == name)
    }

    pub fn require(&self, name: &str) -> TimelineResult<&Timeline> {
        self.get(name).ok_or_else(|| TimelineError::UnknownTimeline {
            name: name.to_string(),
        })
    }

    /// Source timeline name of a derived timeline, if any.
    pub fn origin(&self, name: &str) -> Option<&str> {
        self.origins.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timeline> {
        self.timelines.iter()
    }
}
