//! pf_report/src/lib.rs: Pure offline report model + renderers (text, JSON).
//!
//! Determinism rules:
//! - No I/O here. Callers hand over the in-memory run, names and digests.
//! - Percentages are floored to two decimals once, in the model; renderers
//!   only format.
//! - Stable section order and field names.

#![forbid(unsafe_code)]

use core::fmt;

use pf_core::AggregateResult;

pub mod render_text;
#[cfg(feature = "render_json")]
pub mod render_json;
pub mod structure;

pub use render_text::{render_backtest_text, render_text};
#[cfg(feature = "render_json")]
pub use render_json::{render_backtest_json, render_json};
pub use structure::{
    backtest_model, model_from_run, AggregatesBlock, BacktestModel, BacktestRow, CoverBlock, CoverageRow,
    DigestRow, IntegrityBlock, ReportModel, SnapshotVar, TotalsBlock,
};

// ----- Errors -----

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Option names were given but do not match the aggregate's option count.
    NameCount { expected: usize, got: usize },
    /// A dataset summary refers to a dataset with no recorded digest.
    MissingDigest(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::NameCount { expected, got } => {
                write!(f, "expected {expected} option names, got {got}")
            }
            ReportError::MissingDigest(name) => write!(f, "no input digest for dataset {name}"),
        }
    }
}

impl std::error::Error for ReportError {}

// ----- Shares -----

/// One line of the share table: option name and its percentage.
#[derive(Clone, Debug, PartialEq)]
pub struct ShareRow {
    pub name: String,
    /// `floor(ratio * 10000) / 100`
    pub percent: f64,
}

/// Ratio in `[0, 1]` as a percentage floored to two decimals.
#[inline]
pub fn floor_percent(ratio: f64) -> f64 {
    (ratio * 10_000.0).floor() / 100.0
}

/// Label for option `i` when no names were supplied.
pub fn fallback_name(i: usize) -> String {
    format!("option {}", i + 1)
}

/// Share table of `aggregate`, highest percentage first.
///
/// Equal percentages keep option order. With an empty `names` slice the rows
/// are labelled `option 1..n`; otherwise the name count must match.
pub fn humanize(aggregate: &AggregateResult, names: &[String]) -> Result<Vec<ShareRow>, ReportError> {
    let n = aggregate.num_options();
    if !names.is_empty() && names.len() != n {
        return Err(ReportError::NameCount { expected: n, got: names.len() });
    }

    let mut rows: Vec<ShareRow> = aggregate
        .votes_ratio()
        .iter()
        .enumerate()
        .map(|(i, &r)| ShareRow {
            name: names.get(i).cloned().unwrap_or_else(|| fallback_name(i)),
            percent: floor_percent(r),
        })
        .collect();
    // stable sort: ties stay in option order
    rows.sort_by(|a, b| b.percent.total_cmp(&a.percent));
    Ok(rows)
}

/// Two-decimal display used by every renderer.
pub fn pct_2dp(p: f64) -> String {
    format!("{p:.2}%")
}

/* ---------------------------------- Tests --------------------------------- */
