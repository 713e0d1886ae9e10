// crates/pf_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Algorithm layer of the PF engine. Pure functions over `pf_core` types:
//! no I/O, no logging, no randomness.

use pf_core::ids::UnitId;

pub mod aggregate;
pub mod distance;
pub mod matching;
pub mod projection;

// Tight, explicit re-exports (avoid wildcard export drift).
pub use aggregate::{combine, sum};
pub use distance::{mean_square_error, DistanceMetric, ShareDistance};
pub use matching::{MatchFinder, MatchOutcome, MatchRule, DEFAULT_CASCADE};
pub use projection::project;

/// Errors raised by the algorithm layer. All of them abort the current prediction.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error("cannot aggregate an empty collection")]
    EmptyInput,
    #[error("no candidate reference units")]
    NoCandidates,
    #[error("division by zero: {quantity} of unit {unit} is undefined")]
    DivisionByZero { unit: UnitId, quantity: &'static str },
    #[error("option count mismatch: expected {expected}, got {got}")]
    OptionCountMismatch { expected: usize, got: usize },
}
