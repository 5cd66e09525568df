//! Configuration validation logic.

use std::collections::HashSet;

use crate::schema::{ModelConfig, SolveDef, SolveMode};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error(
        "Timeblock set '{set}' claims {claimed} steps of timeline '{timeline}' \
         which has only {available}"
    )]
    BlockClaimOverrun {
        set: String,
        timeline: String,
        claimed: usize,
        available: usize,
    },

    #[error("Solve '{solve}' has mode rolling_window but no rolling parameters")]
    MissingRolling { solve: String },

    #[error("Solve '{solve}' contains itself")]
    SelfContained { solve: String },

    #[error("Solve '{solve}' is part of a contains cycle")]
    ContainsCycle { solve: String },

    #[error("No solves listed under model")]
    EmptyModel,
}

pub fn validate_config(config: &ModelConfig) -> Result<(), ValidationError> {
    let mut timeline_names = HashSet::new();
    for timeline in &config.timelines {
        if !timeline_names.insert(&timeline.name) {
            return Err(ValidationError::DuplicateName {
                name: timeline.name.clone(),
                context: "timelines".to_string(),
            });
        }
        for step in &timeline.steps {
            if step.duration <= 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("timeline '{}' step '{}' duration", timeline.name, step.step),
                    value: step.duration.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }
    }

    let mut set_names = HashSet::new();
    for set in &config.timeblock_sets {
        if !set_names.insert(&set.name) {
            return Err(ValidationError::DuplicateName {
                name: set.name.clone(),
                context: "timeblock_sets".to_string(),
            });
        }
        let Some(timeline) = config.timeline(&set.timeline) else {
            return Err(ValidationError::MissingReference {
                name: set.timeline.clone(),
                context: format!("timeblock set '{}' timeline", set.name),
            });
        };
        let mut claimed = 0usize;
        for block in &set.blocks {
            if !timeline.steps.iter().any(|s| s.step == block.start_step) {
                return Err(ValidationError::MissingReference {
                    name: block.start_step.clone(),
                    context: format!("timeblock set '{}' block start", set.name),
                });
            }
            claimed += block.step_count;
        }
        // Invariant: cumulative step-count never exceeds the timeline length.
        if claimed > timeline.steps.len() {
            return Err(ValidationError::BlockClaimOverrun {
                set: set.name.clone(),
                timeline: set.timeline.clone(),
                claimed,
                available: timeline.steps.len(),
            });
        }
        if let Some(target) = set.new_step_duration {
            if target <= 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("timeblock set '{}' new_step_duration", set.name),
                    value: target.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }
    }

    let mut solve_names = HashSet::new();
    for solve in &config.solves {
        if !solve_names.insert(&solve.name) {
            return Err(ValidationError::DuplicateName {
                name: solve.name.clone(),
                context: "solves".to_string(),
            });
        }
        validate_solve(config, solve)?;
    }

    for solve in &config.solves {
        check_contains_chain(config, solve)?;
    }

    if config.model.solves.is_empty() {
        return Err(ValidationError::EmptyModel);
    }
    for name in &config.model.solves {
        if config.solve(name).is_none() {
            return Err(ValidationError::MissingReference {
                name: name.clone(),
                context: "model solves".to_string(),
            });
        }
    }

    Ok(())
}

fn check_contains_chain(config: &ModelConfig, solve: &SolveDef) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    seen.insert(solve.name.as_str());
    let mut current = solve;
    while let Some(child) = &current.contains {
        if !seen.insert(child.as_str()) {
            return Err(ValidationError::ContainsCycle {
                solve: solve.name.clone(),
            });
        }
        match config.solve(child) {
            Some(next) => current = next,
            // The dangling reference is reported per-solve elsewhere.
            None => break,
        }
    }
    Ok(())
}

fn validate_solve(config: &ModelConfig, solve: &SolveDef) -> Result<(), ValidationError> {
    for row in &solve.period_timeblock_sets {
        if config.timeblock_set(&row.timeblock_set).is_none() {
            return Err(ValidationError::MissingReference {
                name: row.timeblock_set.clone(),
                context: format!("solve '{}' period_timeblock_sets", solve.name),
            });
        }
    }

    match (&solve.mode, &solve.rolling) {
        (SolveMode::RollingWindow, None) => {
            return Err(ValidationError::MissingRolling {
                solve: solve.name.clone(),
            });
        }
        (_, Some(rolling)) => {
            if rolling.jump <= 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("solve '{}' rolling.jump", solve.name),
                    value: rolling.jump.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
            if rolling.horizon <= 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("solve '{}' rolling.horizon", solve.name),
                    value: rolling.horizon.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
            if rolling.duration <= 0.0 && rolling.duration != -1.0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("solve '{}' rolling.duration", solve.name),
                    value: rolling.duration.to_string(),
                    reason: "must be positive or -1 for unbounded".to_string(),
                });
            }
        }
        _ => {}
    }

    if let Some(child) = &solve.contains {
        if child == &solve.name {
            return Err(ValidationError::SelfContained {
                solve: solve.name.clone(),
            });
        }
        if config.solve(child).is_none() {
            return Err(ValidationError::MissingReference {
                name: child.clone(),
                context: format!("solve '{}' contains", solve.name),
            });
        }
    }

    for branch in &solve.stochastic_branches {
        if branch.weight < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: format!("solve '{}' branch '{}' weight", solve.name, branch.branch),
                value: branch.weight.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
    }

    for py in &solve.years_represented {
        if py.years < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: format!("solve '{}' years_represented '{}'", solve.name, py.period),
                value: py.years.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
    }

    Ok(())
}
