//! Component-wise aggregation.
//!
//! `combine` is `sum` one level up: any `Tallied` collection goes through the
//! same loop, so combining single-element aggregates equals summing directly.

use pf_core::{AggregateResult, Tallied};

use crate::PredictError;

/// Sum voters, ballots, and per-option votes in input order; shares are
/// recomputed from the sums.
pub fn sum<T: Tallied>(items: &[T]) -> Result<AggregateResult, PredictError> {
    let first = items.first().ok_or(PredictError::EmptyInput)?;
    let n = first.tally_options();

    let mut voters: u64 = 0;
    let mut total: f64 = 0.0;
    let mut votes = vec![0.0_f64; n];
    for it in items {
        if it.tally_options() != n {
            return Err(PredictError::OptionCountMismatch { expected: n, got: it.tally_options() });
        }
        voters = voters.saturating_add(it.tally_voters());
        total += it.tally_votes();
        for (i, v) in votes.iter_mut().enumerate() {
            *v += it.tally_vote(i);
        }
    }
    Ok(AggregateResult::from_sums(voters, total, votes))
}

/// Re-aggregate several aggregates (not an average).
#[inline]
pub fn combine(aggregates: &[AggregateResult]) -> Result<AggregateResult, PredictError> {
    sum(aggregates)
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::{Prediction, SizeBucket, UnitRecord};

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
    fn empty_is_an_error() {
        assert_eq!(sum::<UnitRecord>(&[]), Err(PredictError::EmptyInput));
        assert_eq!(combine(&[]), Err(PredictError::EmptyInput));
    }

    #[test]
    fn sums_component_wise() {
        let a = sum(&[unit("1-1-1", 30, vec![12, 8]), unit("1-1-2", 50, vec![10, 30])]).unwrap();
        assert_eq!(a.total_voters(), 80);
        assert_eq!(a.total_votes(), 60.0);
        assert_eq!(a.votes(), &[22.0, 38.0]);
        assert!((a.votes_ratio()[0] - 22.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn mixed_option_counts_rejected() {
        let r = sum(&[unit("1-1-1", 3, vec![1, 1]), unit("1-1-2", 3, vec![1])]);
        assert_eq!(r, Err(PredictError::OptionCountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn zero_ballots_give_zero_shares() {
        let a = sum(&[unit("1-1-1", 10, vec![0, 0])]).unwrap();
        assert_eq!(a.votes_ratio(), &[0.0, 0.0]);
    }

    #[test]
    fn sums_predictions_without_rounding() {
        let p = Prediction::new("1-1-3".parse().unwrap(), "1-1-1".parse().unwrap(), 40, 80.0 / 3.0, vec![0.6, 0.4]);
        let a = sum(&[p]).unwrap();
        assert!((a.total_votes() - 80.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn combine_of_singletons_equals_direct_sum() {
        let units = vec![unit("1-1-1", 30, vec![12, 8]), unit("1-1-2", 50, vec![10, 30])];
        let direct = sum(&units).unwrap();
        let parts: Vec<AggregateResult> = units.iter().map(|u| sum(std::slice::from_ref(u)).unwrap()).collect();
        assert_eq!(combine(&parts).unwrap(), direct);
    }
}
