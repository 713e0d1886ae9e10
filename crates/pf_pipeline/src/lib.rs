//! pf_pipeline: deterministic prediction surface (pool → match → project → sum → combine).
//! This crate stays I/O-free: datasets arrive already loaded (see `pf_io`) and the
//! math lives in `pf_algo`. Nothing here logs or prints.

#![forbid(unsafe_code)]

use pf_algo::PredictError;
use pf_core::{CoreError, UnitId};

pub mod backtest;
pub mod engine;

pub use backtest::{backtest, BacktestCase, BacktestReport};
pub use engine::{predict, DatasetSummary, PredictionEngine, PredictionRun, UnitOutcome, FULL_POOL_RULE};

/// Single error surface for a prediction run. Every variant aborts the run.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid params: {0}")]
    Params(#[from] CoreError),
    #[error("nothing to aggregate")]
    EmptyInput,
    #[error("dataset {dataset}: no observed reference units to project from")]
    InsufficientData { dataset: String },
    #[error("division by zero: {quantity} of unit {unit} is undefined")]
    DivisionByZero { unit: UnitId, quantity: &'static str },
    #[error("option count mismatch: expected {expected}, got {got}")]
    OptionCountMismatch { expected: usize, got: usize },
    /// A match was requested against an empty pool outside any dataset.
    #[error("no candidate reference units")]
    NoCandidates,
    #[error("backtest: {0}")]
    Backtest(String),
}

impl PipelineError {
    /// Lift an algorithm error raised while predicting from `dataset`.
    pub(crate) fn in_dataset(e: PredictError, dataset: &str) -> Self {
        match e {
            PredictError::EmptyInput => PipelineError::EmptyInput,
            PredictError::NoCandidates => PipelineError::InsufficientData { dataset: dataset.to_string() },
            PredictError::DivisionByZero { unit, quantity } => PipelineError::DivisionByZero { unit, quantity },
            PredictError::OptionCountMismatch { expected, got } => {
                PipelineError::OptionCountMismatch { expected, got }
            }
        }
    }
}

impl From<PredictError> for PipelineError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::NoCandidates => PipelineError::NoCandidates,
            other => PipelineError::in_dataset(other, ""),
        }
    }
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_names_the_dataset_only_when_known() {
        assert_eq!(
            PipelineError::in_dataset(PredictError::NoCandidates, "past"),
            PipelineError::InsufficientData { dataset: "past".into() }
        );
        let e = PipelineError::from(PredictError::NoCandidates);
        assert_eq!(e, PipelineError::NoCandidates);
        assert_eq!(e.to_string(), "no candidate reference units");
        assert_eq!(PipelineError::from(PredictError::EmptyInput), PipelineError::EmptyInput);
    }
}
