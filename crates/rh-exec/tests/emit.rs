//! Nested two-level run: artifact set of the child reflects the parent's
//! storage fixing and timeline matching.

use std::fs;
use std::path::PathBuf;

use rh_exec::{run, ExecOutcome, ExecRequest, ExecResult, NoopExecutor, SolveExecutor};
use rh_model::{
    BlockDef, ModelConfig, ModelDef, PeriodBlockSetDef, PeriodsDef, RollingDef, SolveDef,
    SolveMode, StepDef, TimeblockSetDef, TimelineDef,
};

fn solve(name: &str, set: &str) -> SolveDef {
    SolveDef {
        name: name.to_string(),
        mode: SolveMode::Single,
        period_timeblock_sets: vec![PeriodBlockSetDef {
            period: "p1".to_string(),
            timeblock_set: set.to_string(),
        }],
        contains: None,
        rolling: None,
        stochastic_branches: Vec::new(),
        realized_periods: PeriodsDef::Flat(vec!["p1".to_string()]),
        invest_periods: PeriodsDef::default(),
        realized_invest_periods: PeriodsDef::default(),
        fix_storage_periods: PeriodsDef::default(),
        years_represented: Vec::new(),
        solver: None,
        solver_arguments: Vec::new(),
        solver_precommand: None,
    }
}

fn nested_config() -> ModelConfig {
    let mut plan = solve("plan", "coarse");
    plan.fix_storage_periods = PeriodsDef::Flat(vec!["p1".to_string()]);
    plan.contains = Some("dispatch".to_string());
    let dispatch = solve("dispatch", "fine");
    ModelConfig {
        version: 22,
        timelines: vec![TimelineDef {
            name: "hourly".to_string(),
            steps: (1..=4)
                .map(|i| StepDef {
                    step: format!("t{i:04}"),
                    duration: 1.0,
                })
                .collect(),
        }],
        timeblock_sets: vec![
            TimeblockSetDef {
                name: "fine".to_string(),
                timeline: "hourly".to_string(),
                blocks: vec![BlockDef {
                    start_step: "t0001".to_string(),
                    step_count: 4,
                }],
                new_step_duration: None,
            },
            TimeblockSetDef {
                name: "coarse".to_string(),
                timeline: "hourly".to_string(),
                blocks: vec![BlockDef {
                    start_step: "t0001".to_string(),
                    step_count: 4,
                }],
                new_step_duration: Some(2.0),
            },
        ],
        solves: vec![plan, dispatch],
        model: ModelDef {
            solves: vec!["plan".to_string()],
        },
    }
}

fn scratch(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("rh-exec-emit-{tag}-{}", std::process::id()))
}

#[test]
fn child_solves_inherit_the_parent_storage_fix() {
    let dir = scratch("nested");
    let mut executor = NoopExecutor::new();
    let report = run(&nested_config(), &dir, &mut executor).unwrap();
    assert_eq!(report.executed, vec!["plan", "dispatch"]);

    // The child was the last solve written: its matching map connects the
    // hourly steps to the parent's two-hour steps.
    let map = fs::read_to_string(dir.join("timeline_matching_map.csv")).unwrap();
    assert_eq!(
        map,
        "period,step,upper_step\n\
         p1,t0001,t0001\np1,t0002,t0001\np1,t0003,t0003\np1,t0004,t0003\n"
    );

    // The parent snapshotted its storage fix for the nested level.
    assert!(dir.join("fix_storage_quantity_plan.csv").exists());
    let fixed = fs::read_to_string(dir.join("fix_storage_timesteps.csv")).unwrap();
    assert_eq!(fixed, "period,step\n");
}

/// Captures the named artifact as it stood when each solve executed.
struct FileSnapshots {
    name: &'static str,
    seen: Vec<(String, String)>,
}

impl SolveExecutor for FileSnapshots {
    fn execute(&mut self, request: &ExecRequest<'_>) -> ExecResult<ExecOutcome> {
        let content = fs::read_to_string(request.scratch.join(self.name))?;
        self.seen.push((request.solve.to_string(), content));
        Ok(ExecOutcome::Success)
    }
}

#[test]
fn rolls_partition_the_emitted_step_files() {
    // jump=2, horizon=2 over 4 steps: two rolls whose steps_in_use and
    // realized_dispatch files together cover every step exactly once.
    let mut config = nested_config();
    config.solves.truncate(1);
    config.solves[0].contains = None;
    config.solves[0].fix_storage_periods = PeriodsDef::default();
    config.solves[0].period_timeblock_sets[0].timeblock_set = "fine".to_string();
    config.solves[0].mode = SolveMode::RollingWindow;
    config.solves[0].rolling = Some(RollingDef {
        jump: 2.0,
        horizon: 2.0,
        duration: -1.0,
    });

    let dir = scratch("rolling");
    let mut executor = FileSnapshots {
        name: "steps_in_use.csv",
        seen: Vec::new(),
    };
    run(&config, &dir, &mut executor).unwrap();
    assert_eq!(
        executor.seen,
        vec![
            (
                "plan_roll_0".to_string(),
                "period,step,step_duration\np1,t0001,1\np1,t0002,1\n".to_string()
            ),
            (
                "plan_roll_1".to_string(),
                "period,step,step_duration\np1,t0003,1\np1,t0004,1\n".to_string()
            ),
        ]
    );

    let dir = scratch("rolling-dispatch");
    let mut executor = FileSnapshots {
        name: "realized_dispatch.csv",
        seen: Vec::new(),
    };
    run(&config, &dir, &mut executor).unwrap();
    let realized: Vec<&str> = executor.seen.iter().map(|(_, c)| c.as_str()).collect();
    assert_eq!(
        realized,
        vec![
            "period,step\np1,t0001\np1,t0002\n",
            "period,step\np1,t0003\np1,t0004\n"
        ]
    );
}

#[test]
fn parent_writes_its_fix_storage_window() {
    // Without a child in between, the last artifact set is the parent's.
    let mut config = nested_config();
    config.solves[0].contains = None;
    config.solves.truncate(1);
    let dir = scratch("parent-only");
    let mut executor = NoopExecutor::new();
    run(&config, &dir, &mut executor).unwrap();

    let fixed = fs::read_to_string(dir.join("fix_storage_timesteps.csv")).unwrap();
    assert_eq!(fixed, "period,step\np1,t0001\np1,t0003\n");
    // No parent level above: the matching map stays empty.
    let map = fs::read_to_string(dir.join("timeline_matching_map.csv")).unwrap();
    assert_eq!(map, "period,step,upper_step\n");
}
