//! Dissimilarity between two units.
//!
//! Share term: mean squared difference of the share vectors expressed in
//! percent, `(1/n) * Σ (ratioA[i]*100 - ratioB[i]*100)^2`.
//! Participation term (optional): `|attendanceA*100 - attendanceB*100|`,
//! added linearly. Both terms are symmetric in their arguments.

use pf_core::{
    variables::{Params, UndefinedParticipation},
    UnitRecord,
};

use crate::PredictError;

const PERCENT: f64 = 100.0;

/// Distance seam used by the match finder.
pub trait DistanceMetric {
    fn distance(&self, a: &UnitRecord, b: &UnitRecord) -> Result<f64, PredictError>;
}

/// Mean of squared component differences; `0.0` for empty input.
///
/// Slices are compared up to the shorter length; callers pass equal lengths.
pub fn mean_square_error(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    sum / a.len() as f64
}

/// Share distance with an optional participation penalty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShareDistance {
    pub participation_term: bool,
    pub undefined_participation: UndefinedParticipation,
}

impl ShareDistance {
    /// Share-only variant.
    pub const SHARES_ONLY: ShareDistance = ShareDistance {
        participation_term: false,
        undefined_participation: UndefinedParticipation::Fail,
    };

    pub fn from_params(p: &Params) -> Self {
        Self {
            participation_term: p.participation_term,
            undefined_participation: p.undefined_participation,
        }
    }

    fn attendance_pct(&self, u: &UnitRecord) -> Result<f64, PredictError> {
        match (u.attendance(), self.undefined_participation) {
            (Some(a), _) => Ok(a * PERCENT),
            (None, UndefinedParticipation::Zero) => Ok(0.0),
            (None, UndefinedParticipation::Fail) => Err(PredictError::DivisionByZero {
                unit: u.id().clone(),
                quantity: "participation rate",
            }),
        }
    }
}

impl Default for ShareDistance {
    fn default() -> Self { Self::from_params(&Params::default()) }
}

impl DistanceMetric for ShareDistance {
    fn distance(&self, a: &UnitRecord, b: &UnitRecord) -> Result<f64, PredictError> {
        let pa: Vec<f64> = a.votes_ratio().iter().map(|r| r * PERCENT).collect();
        let pb: Vec<f64> = b.votes_ratio().iter().map(|r| r * PERCENT).collect();
        let shares = mean_square_error(&pa, &pb);

        if !self.participation_term {
            return Ok(shares);
        }
        let participation = (self.attendance_pct(a)? - self.attendance_pct(b)?).abs();
        Ok(shares + participation)
    }
}

/* ---------------------------------- Tests --------------------------------- */
