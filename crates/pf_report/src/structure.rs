//! crates/pf_report/src/structure.rs
//! Report data model + mappers from pipeline results.
//! No I/O and no recomputation of the prediction; only display-ready values.

use std::collections::BTreeMap;

use pf_core::variables::UndefinedParticipation;
use pf_core::{AggregateResult, Params};
use pf_pipeline::{BacktestReport, PredictionRun};

use crate::{floor_percent, humanize, ReportError, ShareRow};

// -------------------- Prediction report (section order is render order) --------------------

#[derive(Clone, Debug, PartialEq)]
pub struct ReportModel {
    pub cover: CoverBlock,
    pub totals: TotalsBlock,
    pub shares: Vec<ShareRow>,
    pub coverage: Vec<CoverageRow>,
    pub aggregates: AggregatesBlock,
    pub integrity: IntegrityBlock,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CoverBlock {
    pub title: String,
    /// Name of the partially counted dataset the prediction completes.
    pub current: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TotalsBlock {
    pub total_voters: u64,
    pub total_votes: f64,
    pub attendance_pct: f64,
}

/// Per historical dataset: how much of its universe was observed, and how the
/// remaining units were matched.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageRow {
    pub dataset: String,
    pub observed_units: usize,
    pub universe_units: usize,
    pub projected_units: usize,
    pub observed_pct: f64,
    /// (rule name, projections), rule names in byte order
    pub rules: Vec<(String, usize)>,
}

/// Unrounded engine output; the floored percentages above are for display only.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatesBlock {
    pub combined: AggregateResult,
    /// (historical dataset, its full-universe aggregate), in run order
    pub datasets: Vec<(String, AggregateResult)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntegrityBlock {
    pub inputs: Vec<DigestRow>,
    pub params: Vec<SnapshotVar>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DigestRow { pub dataset: String, pub sha256: String }

#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotVar { pub key: String, pub value: String }

fn params_snapshot(p: &Params) -> Vec<SnapshotVar> {
    let var = |key: &str, value: String| SnapshotVar { key: key.into(), value };
    vec![
        var("size_bucket_width", p.size_bucket_width.to_string()),
        var("participation_term", p.participation_term.to_string()),
        var(
            "undefined_participation",
            match p.undefined_participation {
                UndefinedParticipation::Fail => "fail",
                UndefinedParticipation::Zero => "zero",
            }
            .into(),
        ),
        var("exclude_zero_electorate_references", p.exclude_zero_electorate_references.to_string()),
    ]
}

/// Build the prediction report.
///
/// `digests` maps dataset name to the sha256 of its export; every historical
/// dataset of the run must have one. All digests are listed, in name order.
pub fn model_from_run(
    title: &str,
    current: &str,
    run: &PredictionRun,
    names: &[String],
    digests: &BTreeMap<String, String>,
    params: &Params,
) -> Result<ReportModel, ReportError> {
    let shares = humanize(&run.combined, names)?;

    let coverage = run
        .datasets
        .iter()
        .map(|d| {
            if !digests.contains_key(&d.name) {
                return Err(ReportError::MissingDigest(d.name.clone()));
            }
            Ok(CoverageRow {
                dataset: d.name.clone(),
                observed_units: d.observed_units,
                universe_units: d.universe_units,
                projected_units: d.projected_units,
                observed_pct: floor_percent(d.coverage()),
                rules: d.rules_used.iter().map(|(r, n)| (r.to_string(), *n)).collect(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReportModel {
        cover: CoverBlock { title: title.to_string(), current: current.to_string() },
        totals: TotalsBlock {
            total_voters: run.combined.total_voters(),
            total_votes: run.combined.total_votes(),
            attendance_pct: floor_percent(run.combined.attendance()),
        },
        shares,
        coverage,
        aggregates: AggregatesBlock {
            combined: run.combined.clone(),
            datasets: run.datasets.iter().map(|d| (d.name.clone(), d.aggregate.clone())).collect(),
        },
        integrity: IntegrityBlock {
            inputs: digests
                .iter()
                .map(|(k, v)| DigestRow { dataset: k.clone(), sha256: v.clone() })
                .collect(),
            params: params_snapshot(params),
        },
    })
}

// -------------------- Backtest report --------------------

#[derive(Clone, Debug, PartialEq)]
pub struct BacktestModel {
    pub title: String,
    pub seed: u64,
    pub truth: Vec<ShareRow>,
    pub rows: Vec<BacktestRow>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BacktestRow {
    /// Sample fraction as a percentage (0.5 for 0.005).
    pub fraction_pct: f64,
    pub sampled_units: usize,
    /// Mean squared error of the percentage shares.
    pub error: f64,
    pub shares: Vec<ShareRow>,
}

pub fn backtest_model(title: &str, report: &BacktestReport, names: &[String]) -> Result<BacktestModel, ReportError> {
    let rows = report
        .cases
        .iter()
        .map(|c| {
            Ok(BacktestRow {
                fraction_pct: c.fraction * 100.0,
                sampled_units: c.sampled_units,
                error: c.error,
                shares: humanize(&c.predicted, names)?,
            })
        })
        .collect::<Result<Vec<_>, ReportError>>()?;

    Ok(BacktestModel {
        title: title.to_string(),
        seed: report.seed,
        truth: humanize(&report.truth, names)?,
        rows,
    })
}

/* ---------------------------------- Tests --------------------------------- */
