//! render_json.rs: JSON renderer for prediction and backtest reports.
//!
//! Objects are built in section order; with `preserve_order` the printed key
//! order follows insertion. Callers that need a hashable form pass the value
//! through a canonical writer, which re-sorts keys.

use pf_core::AggregateResult;
use serde_json::{json, Map as JsonMap, Value};

use crate::structure::{BacktestModel, ReportModel};
use crate::ShareRow;

pub fn render_json(m: &ReportModel) -> Value {
    let mut root = obj();

    root.insert(
        "cover".into(),
        json!({ "title": m.cover.title, "current": m.cover.current }),
    );
    root.insert(
        "totals".into(),
        json!({
            "total_voters": m.totals.total_voters,
            "total_votes": m.totals.total_votes,
            "attendance_pct": m.totals.attendance_pct,
        }),
    );
    root.insert("shares".into(), shares_json(&m.shares));

    let coverage = m
        .coverage
        .iter()
        .map(|c| {
            let mut rules = obj();
            for (r, n) in &c.rules {
                rules.insert(r.clone(), Value::from(*n));
            }
            json!({
                "dataset": c.dataset,
                "observed_units": c.observed_units,
                "universe_units": c.universe_units,
                "projected_units": c.projected_units,
                "observed_pct": c.observed_pct,
                "rules": Value::Object(rules),
            })
        })
        .collect();
    root.insert("coverage".into(), Value::Array(coverage));

    let mut per_dataset = obj();
    for (name, agg) in &m.aggregates.datasets {
        per_dataset.insert(name.clone(), aggregate_json(agg));
    }
    root.insert(
        "aggregates".into(),
        json!({ "combined": aggregate_json(&m.aggregates.combined), "datasets": Value::Object(per_dataset) }),
    );

    let mut inputs = obj();
    for d in &m.integrity.inputs {
        inputs.insert(d.dataset.clone(), Value::String(d.sha256.clone()));
    }
    let mut params = obj();
    for v in &m.integrity.params {
        params.insert(v.key.clone(), Value::String(v.value.clone()));
    }
    root.insert(
        "integrity".into(),
        json!({ "inputs_sha256": Value::Object(inputs), "params": Value::Object(params) }),
    );

    Value::Object(root)
}

pub fn render_backtest_json(m: &BacktestModel) -> Value {
    let rows: Vec<Value> = m
        .rows
        .iter()
        .map(|r| {
            json!({
                "fraction_pct": r.fraction_pct,
                "sampled_units": r.sampled_units,
                "error": r.error,
                "shares": shares_json(&r.shares),
            })
        })
        .collect();

    let mut root = obj();
    root.insert("title".into(), Value::String(m.title.clone()));
    root.insert("seed".into(), Value::from(m.seed));
    root.insert("truth".into(), shares_json(&m.truth));
    root.insert("samples".into(), Value::Array(rows));
    Value::Object(root)
}

/* ----------------------- helpers ----------------------- */

#[inline]
fn obj() -> JsonMap<String, Value> {
    JsonMap::new()
}

/// Full-precision sums and shares.
fn aggregate_json(a: &AggregateResult) -> Value {
    json!({
        "total_voters": a.total_voters(),
        "total_votes": a.total_votes(),
        "votes": a.votes(),
        "votes_ratio": a.votes_ratio(),
    })
}

fn shares_json(rows: &[ShareRow]) -> Value {
    Value::Array(rows.iter().map(|r| json!({ "name": r.name, "percent": r.percent })).collect())
}

/* ---------------------------------- Tests --------------------------------- */
