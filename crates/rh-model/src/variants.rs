//! Expansion of map-keyed period parameters into per-key solve clones.

use crate::schema::{ModelConfig, PeriodsDef, SolveDef};
use crate::{ModelError, ModelResult};

/// Expand every solve carrying a keyed period parameter into one clone per
/// key, named `<solve>_<key>`.
///
/// The clone inherits mode, rolling parameters, child link, branch rows and
/// solver selection; its period coverage and flag lists are restricted to
/// the key's periods. The clone replaces the original in the model solve
/// order. Only a single nesting level is supported: a keyed solve reachable
/// through `contains` is rejected.
pub fn expand_variants(mut config: ModelConfig) -> ModelResult<ModelConfig> {
    let keyed: Vec<String> = config
        .solves
        .iter()
        .filter(|s| has_keyed_params(s))
        .map(|s| s.name.clone())
        .collect();
    if keyed.is_empty() {
        return Ok(config);
    }

    for name in &keyed {
        let contained = config
            .solves
            .iter()
            .any(|s| s.contains.as_deref() == Some(name.as_str()));
        if contained || !config.model.solves.contains(name) {
            return Err(ModelError::NestedVariants {
                solve: name.clone(),
            });
        }
    }

    for name in keyed {
        let Some(solve) = config.solve(&name).cloned() else {
            continue;
        };
        let keys = variant_keys(&solve);
        let clones: Vec<SolveDef> = keys.iter().map(|key| clone_for_key(&solve, key)).collect();

        config.solves.retain(|s| s.name != name);
        config.solves.extend(clones.iter().cloned());

        // Membership in the model list was checked above.
        if let Some(pos) = config.model.solves.iter().position(|s| s == &name) {
            config.model.solves.remove(pos);
            for (offset, clone) in clones.iter().enumerate() {
                config.model.solves.insert(pos + offset, clone.name.clone());
            }
        }
    }

    Ok(config)
}

fn has_keyed_params(solve: &SolveDef) -> bool {
    solve.realized_periods.is_keyed()
        || solve.invest_periods.is_keyed()
        || solve.realized_invest_periods.is_keyed()
        || solve.fix_storage_periods.is_keyed()
}

/// Sorted union of variant keys across the four period parameters.
fn variant_keys(solve: &SolveDef) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for def in [
        &solve.realized_periods,
        &solve.invest_periods,
        &solve.realized_invest_periods,
        &solve.fix_storage_periods,
    ] {
        for key in def.keys() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
    }
    keys.sort();
    keys
}

fn restrict(def: &PeriodsDef, key: &str) -> PeriodsDef {
    match def {
        PeriodsDef::Flat(v) => PeriodsDef::Flat(v.clone()),
        PeriodsDef::Keyed(_) => PeriodsDef::Flat(def.for_key(key).to_vec()),
    }
}

fn clone_for_key(solve: &SolveDef, key: &str) -> SolveDef {
    let mut clone = solve.clone();
    clone.name = format!("{}_{}", solve.name, key);
    clone.realized_periods = restrict(&solve.realized_periods, key);
    clone.invest_periods = restrict(&solve.invest_periods, key);
    clone.realized_invest_periods = restrict(&solve.realized_invest_periods, key);
    clone.fix_storage_periods = restrict(&solve.fix_storage_periods, key);

    // Periods this clone may still touch: the union of its restricted flags,
    // falling back to everything when the key names none.
    let mut kept: Vec<&str> = Vec::new();
    for def in [
        &clone.realized_periods,
        &clone.invest_periods,
        &clone.realized_invest_periods,
        &clone.fix_storage_periods,
    ] {
        for period in def.as_flat() {
            if !kept.contains(&period.as_str()) {
                kept.push(period);
            }
        }
    }
    if !kept.is_empty() {
        clone
            .period_timeblock_sets
            .retain(|row| kept.contains(&row.period.as_str()));
        clone
            .years_represented
            .retain(|row| kept.contains(&row.period.as_str()));
    }
    clone
}
