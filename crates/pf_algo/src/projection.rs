//! Projection of one unobserved unit from its reference's current tallies.
//!
//! Same participation rate and same preference distribution as the reference;
//! electorate taken from the unit's historical record. Results are never rounded.

use pf_core::{Prediction, UnitRecord};

use crate::PredictError;

/// `total_votes = ref.total_votes * unit.total_voters / ref.total_voters`,
/// `votes_ratio = ref.votes_ratio`, `votes[i] = votes_ratio[i] * total_votes`.
///
/// Requires `reference_current.total_voters > 0`.
pub fn project(historical: &UnitRecord, reference_current: &UnitRecord) -> Result<Prediction, PredictError> {
    if reference_current.total_voters() == 0 {
        return Err(PredictError::DivisionByZero {
            unit: reference_current.id().clone(),
            quantity: "electorate",
        });
    }
    let total_votes = reference_current.total_votes() as f64 * historical.total_voters() as f64
        / reference_current.total_voters() as f64;

    Ok(Prediction::new(
        historical.id().clone(),
        reference_current.id().clone(),
        historical.total_voters(),
        total_votes,
        reference_current.votes_ratio().to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::SizeBucket;

    fn unit(id: &str, voters: u64, votes: Vec<u64>) -> UnitRecord {
        let cast = votes.iter().sum();
        UnitRecord::new(
            id.parse().unwrap(),
            "1".parse().unwrap(),
            "1".parse().unwrap(),
            voters,
            cast,
            votes,
            SizeBucket::default(),
        )
    }

    #[test]
    fn scales_reference_turnout_to_unit_electorate() {
        // reference: 30 voters, 20 cast as [12, 8]; unit electorate 40
        let p = project(&unit("1-1-3", 40, vec![4, 6]), &unit("1-1-1", 30, vec![12, 8])).unwrap();
        assert_eq!(p.id().as_str(), "1-1-3");
        assert_eq!(p.reference_unit_id().as_str(), "1-1-1");
        assert_eq!(p.total_voters(), 40);
        assert!((p.total_votes() - 80.0 / 3.0).abs() < 1e-9);
        assert_eq!(p.votes_ratio(), &[0.6, 0.4]);
        assert!((p.votes()[0] - 16.0).abs() < 1e-9);
        assert!((p.votes()[1] - 32.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_reference_electorate_is_an_error() {
        let err = project(&unit("1-1-3", 40, vec![1]), &unit("1-1-1", 0, vec![0])).unwrap_err();
        assert_eq!(
            err,
            PredictError::DivisionByZero { unit: "1-1-1".parse().unwrap(), quantity: "electorate" }
        );
    }

    #[test]
    fn zero_cast_reference_projects_zeros() {
        let p = project(&unit("1-1-3", 40, vec![9, 9]), &unit("1-1-1", 25, vec![0, 0])).unwrap();
        assert_eq!(p.total_votes(), 0.0);
        assert_eq!(p.votes(), &[0.0, 0.0]);
    }
}
