//! Shared fixtures for unit tests.

use rh_model::{
    BlockDef, ModelConfig, ModelDef, PeriodBlockSetDef, PeriodsDef, RollingDef, SolveDef,
    SolveMode, StepDef, TimeblockSetDef, TimelineDef,
};

use crate::tables::DecompTables;

pub fn hourly_timeline(name: &str, steps: usize) -> TimelineDef {
    TimelineDef {
        name: name.to_string(),
        steps: (1..=steps)
            .map(|i| StepDef {
                step: format!("t{i:04}"),
                duration: 1.0,
            })
            .collect(),
    }
}

pub fn solve_def(name: &str) -> SolveDef {
    SolveDef {
        name: name.to_string(),
        mode: SolveMode::Single,
        period_timeblock_sets: Vec::new(),
        contains: None,
        rolling: None,
        stochastic_branches: Vec::new(),
        realized_periods: PeriodsDef::default(),
        invest_periods: PeriodsDef::default(),
        realized_invest_periods: PeriodsDef::default(),
        fix_storage_periods: PeriodsDef::default(),
        years_represented: Vec::new(),
        solver: None,
        solver_arguments: Vec::new(),
        solver_precommand: None,
    }
}

/// One period `p1` over one hourly timeline, one single-mode solve
/// `dispatch` covering all of it.
pub fn single_solve_config(steps: usize) -> ModelConfig {
    let mut dispatch = solve_def("dispatch");
    dispatch.period_timeblock_sets = vec![PeriodBlockSetDef {
        period: "p1".to_string(),
        timeblock_set: "blocks".to_string(),
    }];
    dispatch.realized_periods = PeriodsDef::Flat(vec!["p1".to_string()]);
    ModelConfig {
        version: 22,
        timelines: vec![hourly_timeline("hourly", steps)],
        timeblock_sets: vec![TimeblockSetDef {
            name: "blocks".to_string(),
            timeline: "hourly".to_string(),
            blocks: vec![BlockDef {
                start_step: "t0001".to_string(),
                step_count: steps,
            }],
            new_step_duration: None,
        }],
        solves: vec![dispatch],
        model: ModelDef {
            solves: vec!["dispatch".to_string()],
        },
    }
}

/// Periods `p1` and `p2`, each covering one half of a shared hourly
/// timeline, both realized by the single-mode solve `dispatch`.
pub fn two_period_config(steps_per_period: usize) -> ModelConfig {
    let n = steps_per_period;
    let mut dispatch = solve_def("dispatch");
    dispatch.period_timeblock_sets = vec![
        PeriodBlockSetDef {
            period: "p1".to_string(),
            timeblock_set: "b1".to_string(),
        },
        PeriodBlockSetDef {
            period: "p2".to_string(),
            timeblock_set: "b2".to_string(),
        },
    ];
    dispatch.realized_periods = PeriodsDef::Flat(vec!["p1".to_string(), "p2".to_string()]);
    ModelConfig {
        version: 22,
        timelines: vec![hourly_timeline("hourly", 2 * n)],
        timeblock_sets: vec![
            TimeblockSetDef {
                name: "b1".to_string(),
                timeline: "hourly".to_string(),
                blocks: vec![BlockDef {
                    start_step: "t0001".to_string(),
                    step_count: n,
                }],
                new_step_duration: None,
            },
            TimeblockSetDef {
                name: "b2".to_string(),
                timeline: "hourly".to_string(),
                blocks: vec![BlockDef {
                    start_step: format!("t{:04}", n + 1),
                    step_count: n,
                }],
                new_step_duration: None,
            },
        ],
        solves: vec![dispatch],
        model: ModelDef {
            solves: vec!["dispatch".to_string()],
        },
    }
}

/// Make the `dispatch` solve of a fixture roll with the given parameters.
pub fn with_rolling(mut config: ModelConfig, jump: f64, horizon: f64, duration: f64) -> ModelConfig {
    let solve = config
        .solves
        .iter_mut()
        .find(|s| s.name == "dispatch")
        .unwrap();
    solve.mode = SolveMode::RollingWindow;
    solve.rolling = Some(RollingDef {
        jump,
        horizon,
        duration,
    });
    config
}

pub fn tables_of(config: &ModelConfig) -> DecompTables {
    DecompTables::from_config(config).unwrap()
}
