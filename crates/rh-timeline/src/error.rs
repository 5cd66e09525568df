use thiserror::Error;

pub type TimelineResult<T> = Result<T, TimelineError>;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Unknown timeline: {name}")]
    UnknownTimeline { name: String },

    #[error("Timestep '{step}' not found in timeline '{timeline}'")]
    UnknownStep { timeline: String, step: String },

    #[error(
        "Timeblock starting at '{step}' claims {requested} steps but timeline \
         '{timeline}' has only {available} left"
    )]
    BlockOverrun {
        timeline: String,
        step: String,
        requested: usize,
        available: usize,
    },

    #[error("Non-positive timestep duration for '{step}': {duration}")]
    NonPositiveDuration { step: String, duration: f64 },

    #[error("Duplicate timeline name: {name}")]
    DuplicateTimeline { name: String },
}
