//! Configuration schema definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub version: u32,
    #[serde(default)]
    pub timelines: Vec<TimelineDef>,
    #[serde(default)]
    pub timeblock_sets: Vec<TimeblockSetDef>,
    #[serde(default)]
    pub solves: Vec<SolveDef>,
    pub model: ModelDef,
}

/// Top-level solve execution order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDef {
    pub solves: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineDef {
    pub name: String,
    pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDef {
    pub step: String,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeblockSetDef {
    pub name: String,
    pub timeline: String,
    pub blocks: Vec<BlockDef>,
    /// When set, the base timeline is aggregated to this coarser step
    /// duration for this set before any solve uses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_step_duration: Option<f64>,
}

/// A claim on `step_count` contiguous steps of the set's timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockDef {
    pub start_step: String,
    pub step_count: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SolveMode {
    #[default]
    Single,
    RollingWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolveDef {
    pub name: String,
    #[serde(default)]
    pub mode: SolveMode,
    /// Ordered (period, timeblock set) coverage of this solve.
    pub period_timeblock_sets: Vec<PeriodBlockSetDef>,
    /// Nested child solve, re-entered once per roll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling: Option<RollingDef>,
    #[serde(default)]
    pub stochastic_branches: Vec<BranchDef>,
    #[serde(default)]
    pub realized_periods: PeriodsDef,
    #[serde(default)]
    pub invest_periods: PeriodsDef,
    #[serde(default)]
    pub realized_invest_periods: PeriodsDef,
    #[serde(default)]
    pub fix_storage_periods: PeriodsDef,
    #[serde(default)]
    pub years_represented: Vec<PeriodYearsDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<String>,
    #[serde(default)]
    pub solver_arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_precommand: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodBlockSetDef {
    pub period: String,
    pub timeblock_set: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RollingDef {
    /// Interval between roll starts, in timeline duration units.
    pub jump: f64,
    /// Lookahead window length per roll.
    pub horizon: f64,
    /// Total duration to cover; -1 means unbounded.
    #[serde(default = "default_duration")]
    pub duration: f64,
}

fn default_duration() -> f64 {
    -1.0
}

/// One stochastic branch declaration: from `start_step` of `period` onward,
/// continuation `branch` applies with the given weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BranchDef {
    pub period: String,
    pub branch: String,
    pub start_step: String,
    #[serde(default)]
    pub realized: bool,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodYearsDef {
    pub period: String,
    pub years: f64,
}

/// Period flag lists: either a flat list or a keyed map.
///
/// A keyed map clones the declaring solve once per key (single nesting level
/// only); see [`crate::variants::expand_variants`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PeriodsDef {
    Flat(Vec<String>),
    Keyed(BTreeMap<String, Vec<String>>),
}

impl Default for PeriodsDef {
    fn default() -> Self {
        PeriodsDef::Flat(Vec::new())
    }
}

impl PeriodsDef {
    pub fn is_keyed(&self) -> bool {
        matches!(self, PeriodsDef::Keyed(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PeriodsDef::Flat(v) => v.is_empty(),
            PeriodsDef::Keyed(m) => m.is_empty(),
        }
    }

    /// Flat view; empty for keyed definitions (those are expanded away
    /// before decomposition).
    pub fn as_flat(&self) -> &[String] {
        match self {
            PeriodsDef::Flat(v) => v.as_slice(),
            PeriodsDef::Keyed(_) => &[],
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            PeriodsDef::Flat(_) => Vec::new(),
            PeriodsDef::Keyed(m) => m.keys().map(String::as_str).collect(),
        }
    }

    pub fn for_key(&self, key: &str) -> &[String] {
        match self {
            PeriodsDef::Flat(_) => &[],
            PeriodsDef::Keyed(m) => m.get(key).map(Vec::as_slice).unwrap_or(&[]),
        }
    }
}

impl ModelConfig {
    pub fn solve(&self, name: &str) -> Option<&SolveDef> {
        self.solves.iter().find(|s| s.name == name)
    }

    pub fn timeblock_set(&self, name: &str) -> Option<&TimeblockSetDef> {
        self.timeblock_sets.iter().find(|t| t.name == name)
    }

    pub fn timeline(&self, name: &str) -> Option<&TimelineDef> {
        self.timelines.iter().find(|t| t.name == name)
    }
}
