//! rh-timeline: stable time foundation for rollhorizon.
//!
//! Contains:
//! - timeline (named ordered timestep sequences + store with provenance)
//! - active (ordered period/branch -> timestep lists used by every solve)
//! - derive (aggregation of a base timeline into a coarser step duration)
//! - error (shared error types)

pub mod active;
pub mod derive;
pub mod error;
pub mod timeline;

// Re-exports: nice ergonomics for downstream crates
pub use active::{ActiveStep, ActiveTimeList, StepPos};
pub use derive::{aggregate_timeline, AggregatedBlocks};
pub use error::{TimelineError, TimelineResult};
pub use timeline::{Timeline, TimelineStore, Timestep};
