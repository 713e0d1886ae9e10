//! Entities: unit records, datasets, projected units, aggregates.
//!
//! Records are immutable once built. `votes_ratio` is always derived inside a
//! constructor from the tallies it describes; nothing outside this module can
//! set it.

use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::ids::{AreaCode, UnitId};

#[cfg(feature = "serde")]
use serde::Serialize;

/* -------------------------------------------------------------------------- */
/*                                  Shares                                    */
/* -------------------------------------------------------------------------- */

/// Per-option share of `total`. Zero total yields all-zero shares (never NaN).
pub fn share_ratios<I>(votes: I, total: f64) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    votes
        .into_iter()
        .map(|v| if total == 0.0 { 0.0 } else { v / total })
        .collect()
}

/// Anything that can be summed by the aggregator.
pub trait Tallied {
    fn tally_voters(&self) -> u64;
    fn tally_votes(&self) -> f64;
    fn tally_options(&self) -> usize;
    /// Votes for option `i`; callers stay within `0..tally_options()`.
    fn tally_vote(&self, i: usize) -> f64;
}

impl<T: Tallied + ?Sized> Tallied for &T {
    #[inline] fn tally_voters(&self) -> u64 { (**self).tally_voters() }
    #[inline] fn tally_votes(&self) -> f64 { (**self).tally_votes() }
    #[inline] fn tally_options(&self) -> usize { (**self).tally_options() }
    #[inline] fn tally_vote(&self, i: usize) -> f64 { (**self).tally_vote(i) }
}

/* -------------------------------------------------------------------------- */
/*                                Size classes                                */
/* -------------------------------------------------------------------------- */

/// Electorate bucket width; `size_class = total_voters / width`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SizeBucket(u64);

impl SizeBucket {
    pub const DEFAULT_WIDTH: u64 = 100;

    pub fn new(width: u64) -> Result<Self, CoreError> {
        if width == 0 { Err(CoreError::InvalidBucketWidth) } else { Ok(Self(width)) }
    }

    pub fn width(self) -> u64 { self.0 }

    #[inline]
    pub fn class_of(self, total_voters: u64) -> u64 {
        total_voters / self.0
    }
}

impl Default for SizeBucket {
    fn default() -> Self { Self(Self::DEFAULT_WIDTH) }
}

/* -------------------------------------------------------------------------- */
/*                                 UnitRecord                                 */
/* -------------------------------------------------------------------------- */

/// One reporting unit in one period.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct UnitRecord {
    id: UnitId,
    area_coarse: AreaCode,
    area_locality: AreaCode,
    size_class: u64,
    total_voters: u64,
    total_votes: u64,
    votes: Vec<u64>,
    votes_ratio: Vec<f64>,
}

impl UnitRecord {
    pub fn new(
        id: UnitId,
        area_coarse: AreaCode,
        area_locality: AreaCode,
        total_voters: u64,
        total_votes: u64,
        votes: Vec<u64>,
        bucket: SizeBucket,
    ) -> Self {
        let votes_ratio = share_ratios(votes.iter().map(|&v| v as f64), total_votes as f64);
        Self {
            id,
            area_coarse,
            area_locality,
            size_class: bucket.class_of(total_voters),
            total_voters,
            total_votes,
            votes,
            votes_ratio,
        }
    }

    pub fn id(&self) -> &UnitId { &self.id }
    pub fn area_coarse(&self) -> &AreaCode { &self.area_coarse }
    pub fn area_locality(&self) -> &AreaCode { &self.area_locality }
    pub fn size_class(&self) -> u64 { self.size_class }
    pub fn total_voters(&self) -> u64 { self.total_voters }
    pub fn total_votes(&self) -> u64 { self.total_votes }
    pub fn votes(&self) -> &[u64] { &self.votes }
    pub fn votes_ratio(&self) -> &[f64] { &self.votes_ratio }
    pub fn num_options(&self) -> usize { self.votes.len() }

    /// Ballots cast per eligible voter; `None` when the electorate is empty.
    pub fn attendance(&self) -> Option<f64> {
        if self.total_voters == 0 {
            None
        } else {
            Some(self.total_votes as f64 / self.total_voters as f64)
        }
    }
}

impl Tallied for UnitRecord {
    fn tally_voters(&self) -> u64 { self.total_voters }
    fn tally_votes(&self) -> f64 { self.total_votes as f64 }
    fn tally_options(&self) -> usize { self.votes.len() }
    fn tally_vote(&self, i: usize) -> f64 { self.votes[i] as f64 }
}

/* -------------------------------------------------------------------------- */
/*                                 Prediction                                 */
/* -------------------------------------------------------------------------- */

/// Projected current-period tallies of one unit, with the donor it came from.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Prediction {
    id: UnitId,
    reference_unit_id: UnitId,
    total_voters: u64,
    total_votes: f64,
    votes: Vec<f64>,
    votes_ratio: Vec<f64>,
}

impl Prediction {
    /// Build from a projected turnout and share vector; `votes[i] = votes_ratio[i] * total_votes`.
    /// No rounding.
    pub fn new(
        id: UnitId,
        reference_unit_id: UnitId,
        total_voters: u64,
        total_votes: f64,
        votes_ratio: Vec<f64>,
    ) -> Self {
        let votes = votes_ratio.iter().map(|r| r * total_votes).collect();
        Self { id, reference_unit_id, total_voters, total_votes, votes, votes_ratio }
    }

    pub fn id(&self) -> &UnitId { &self.id }
    pub fn reference_unit_id(&self) -> &UnitId { &self.reference_unit_id }
    pub fn total_voters(&self) -> u64 { self.total_voters }
    pub fn total_votes(&self) -> f64 { self.total_votes }
    pub fn votes(&self) -> &[f64] { &self.votes }
    pub fn votes_ratio(&self) -> &[f64] { &self.votes_ratio }
}

impl Tallied for Prediction {
    fn tally_voters(&self) -> u64 { self.total_voters }
    fn tally_votes(&self) -> f64 { self.total_votes }
    fn tally_options(&self) -> usize { self.votes.len() }
    fn tally_vote(&self, i: usize) -> f64 { self.votes[i] }
}

/* -------------------------------------------------------------------------- */
/*                               AggregateResult                              */
/* -------------------------------------------------------------------------- */

/// Sum over records, predictions, or other aggregates.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct AggregateResult {
    total_voters: u64,
    total_votes: f64,
    votes: Vec<f64>,
    votes_ratio: Vec<f64>,
}

impl AggregateResult {
    /// Shares are recomputed from the sums (zero-guarded).
    pub fn from_sums(total_voters: u64, total_votes: f64, votes: Vec<f64>) -> Self {
        let votes_ratio = share_ratios(votes.iter().copied(), total_votes);
        Self { total_voters, total_votes, votes, votes_ratio }
    }

    pub fn total_voters(&self) -> u64 { self.total_voters }
    pub fn total_votes(&self) -> f64 { self.total_votes }
    pub fn votes(&self) -> &[f64] { &self.votes }
    pub fn votes_ratio(&self) -> &[f64] { &self.votes_ratio }
    pub fn num_options(&self) -> usize { self.votes.len() }

    /// Ballots cast per eligible voter over the whole aggregate (0 for an empty electorate).
    pub fn attendance(&self) -> f64 {
        if self.total_voters == 0 { 0.0 } else { self.total_votes / self.total_voters as f64 }
    }
}

impl Tallied for AggregateResult {
    fn tally_voters(&self) -> u64 { self.total_voters }
    fn tally_votes(&self) -> f64 { self.total_votes }
    fn tally_options(&self) -> usize { self.votes.len() }
    fn tally_vote(&self, i: usize) -> f64 { self.votes[i] }
}

/* -------------------------------------------------------------------------- */
/*                                   Dataset                                  */
/* -------------------------------------------------------------------------- */

/// Ordered units of one period, indexed by id.
#[derive(Clone, Debug)]
pub struct Dataset {
    name: String,
    units: Vec<UnitRecord>,
    index: BTreeMap<UnitId, usize>,
}

impl Dataset {
    /// Validates unique ids and a single option count across all units.
    pub fn new(name: impl Into<String>, units: Vec<UnitRecord>) -> Result<Self, CoreError> {
        let mut index = BTreeMap::new();
        let expected = units.first().map(UnitRecord::num_options);
        for (pos, u) in units.iter().enumerate() {
            if let Some(expected) = expected {
                if u.num_options() != expected {
                    return Err(CoreError::OptionCountMismatch {
                        unit: u.id().to_string(),
                        expected,
                        got: u.num_options(),
                    });
                }
            }
            if index.insert(u.id().clone(), pos).is_some() {
                return Err(CoreError::DuplicateUnit(u.id().to_string()));
            }
        }
        Ok(Self { name: name.into(), units, index })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn units(&self) -> &[UnitRecord] { &self.units }
    pub fn len(&self) -> usize { self.units.len() }
    pub fn is_empty(&self) -> bool { self.units.is_empty() }

    /// Option count shared by every unit; `None` for an empty dataset.
    pub fn num_options(&self) -> Option<usize> {
        self.units.first().map(UnitRecord::num_options)
    }

    pub fn get(&self, id: &UnitId) -> Option<&UnitRecord> {
        self.index.get(id).map(|&pos| &self.units[pos])
    }

    /// New dataset holding the units at `positions` (kept in original order, duplicates ignored).
    pub fn select(&self, name: impl Into<String>, positions: &[usize]) -> Dataset {
        let mut keep: Vec<usize> = positions.iter().copied().filter(|&p| p < self.units.len()).collect();
        keep.sort_unstable();
        keep.dedup();
        let units: Vec<UnitRecord> = keep.iter().map(|&p| self.units[p].clone()).collect();
        let index = units.iter().enumerate().map(|(pos, u)| (u.id().clone(), pos)).collect();
        Dataset { name: name.into(), units, index }
    }
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, voters: u64, cast: u64, votes: Vec<u64>) -> UnitRecord {
        let (c, l, _) = {
            let mut it = id.split('-');
            (it.next().unwrap(), it.next().unwrap(), it.next().unwrap())
        };
        UnitRecord::new(
            id.parse().unwrap(),
            c.parse().unwrap(),
            l.parse().unwrap(),
            voters,
            cast,
            votes,
            SizeBucket::default(),
        )
    }

    #[test]
    fn zero_votes_have_zero_shares() {
        let u = unit("1-2-3", 50, 0, vec![0, 0, 0]);
        assert_eq!(u.votes_ratio(), &[0.0, 0.0, 0.0]);
        assert!(u.votes_ratio().iter().all(|r| !r.is_nan()));
    }

    #[test]
    fn shares_follow_votes() {
        let u = unit("1-2-3", 30, 20, vec![12, 8]);
        assert_eq!(u.votes_ratio(), &[0.6, 0.4]);
        assert_eq!(u.attendance(), Some(20.0 / 30.0));
    }

    #[test]
    fn size_class_is_floor_of_bucket() {
        assert_eq!(unit("1-2-3", 99, 0, vec![]).size_class(), 0);
        assert_eq!(unit("1-2-3", 100, 0, vec![]).size_class(), 1);
        assert_eq!(unit("1-2-3", 1234, 0, vec![]).size_class(), 12);
        assert!(SizeBucket::new(0).is_err());
    }

    #[test]
    fn empty_electorate_has_no_attendance() {
        assert_eq!(unit("1-2-3", 0, 0, vec![0]).attendance(), None);
    }

    #[test]
    fn prediction_votes_are_unrounded() {
        let p = Prediction::new(
            "1-2-3".parse().unwrap(),
            "1-2-4".parse().unwrap(),
            40,
            80.0 / 3.0,
            vec![0.6, 0.4],
        );
        assert!((p.votes()[0] - 16.0).abs() < 1e-9);
        assert!((p.votes()[1] - 32.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn dataset_rejects_duplicates_and_ragged_options() {
        let dup = Dataset::new("d", vec![unit("1-2-3", 1, 1, vec![1]), unit("1-2-3", 1, 1, vec![1])]);
        assert_eq!(dup.unwrap_err(), CoreError::DuplicateUnit("1-2-3".into()));

        let ragged = Dataset::new("d", vec![unit("1-2-3", 1, 1, vec![1]), unit("1-2-4", 1, 1, vec![1, 0])]);
        assert!(matches!(ragged, Err(CoreError::OptionCountMismatch { expected: 1, got: 2, .. })));
    }

    #[test]
    fn dataset_lookup_and_select_keep_order() {
        let ds = Dataset::new(
            "d",
            vec![unit("1-2-1", 1, 1, vec![1]), unit("1-2-2", 1, 1, vec![1]), unit("1-2-3", 1, 1, vec![1])],
        )
        .unwrap();
        assert!(ds.contains(&"1-2-2".parse().unwrap()));
        assert_eq!(ds.num_options(), Some(1));

        let sub = ds.select("s", &[2, 0, 2]);
        let ids: Vec<&str> = sub.units().iter().map(|u| u.id().as_str()).collect();
        assert_eq!(ids, vec!["1-2-1", "1-2-3"]);
        assert_eq!(sub.get(&"1-2-3".parse().unwrap()).map(|u| u.id().as_str()), Some("1-2-3"));
    }

    #[test]
    fn aggregate_ratios_zero_guarded() {
        let a = AggregateResult::from_sums(10, 0.0, vec![0.0, 0.0]);
        assert_eq!(a.votes_ratio(), &[0.0, 0.0]);
        assert_eq!(a.attendance(), 0.0);
    }
}
