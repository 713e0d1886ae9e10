//! Reference selection: cascading categorical filters, then nearest by distance.
//!
//! The cascade is policy data. Rules are tried in order and the first rule
//! that leaves a non-empty subset of the pool decides the candidates; the
//! closest candidate within that subset wins. When no rule matches, the whole
//! pool is ranked. Ties go to the earliest candidate in pool order.

use pf_core::determinism::first_min_by_key;
use pf_core::UnitRecord;

use crate::distance::DistanceMetric;
use crate::PredictError;

/// One categorical filter of the cascade.
#[derive(Clone, Copy)]
pub struct MatchRule {
    pub name: &'static str,
    /// `predicate(unit, candidate)`; true keeps the candidate.
    pub predicate: fn(&UnitRecord, &UnitRecord) -> bool,
}

impl core::fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MatchRule").field("name", &self.name).finish()
    }
}

fn same_locality(a: &UnitRecord, b: &UnitRecord) -> bool {
    a.area_locality() == b.area_locality()
}
fn same_coarse(a: &UnitRecord, b: &UnitRecord) -> bool {
    a.area_coarse() == b.area_coarse()
}
fn same_size(a: &UnitRecord, b: &UnitRecord) -> bool {
    a.size_class() == b.size_class()
}
fn same_locality_same_size(a: &UnitRecord, b: &UnitRecord) -> bool {
    same_locality(a, b) && same_size(a, b)
}
fn same_coarse_same_size(a: &UnitRecord, b: &UnitRecord) -> bool {
    same_coarse(a, b) && same_size(a, b)
}

/// Most specific first.
pub const DEFAULT_CASCADE: [MatchRule; 5] = [
    MatchRule { name: "same_locality_same_size", predicate: same_locality_same_size },
    MatchRule { name: "same_coarse_same_size", predicate: same_coarse_same_size },
    MatchRule { name: "same_locality", predicate: same_locality },
    MatchRule { name: "same_coarse", predicate: same_coarse },
    MatchRule { name: "same_size", predicate: same_size },
];

/// Chosen reference plus the rule that admitted it (`None` = full-pool fallback).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome<'p> {
    pub reference: &'p UnitRecord,
    pub rule: Option<&'static str>,
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub struct MatchFinder<M> {
    metric: M,
    cascade: Vec<MatchRule>,
}

impl<M: DistanceMetric> MatchFinder<M> {
    pub fn new(metric: M) -> Self {
        Self::with_cascade(metric, DEFAULT_CASCADE.to_vec())
    }

    /// An empty cascade ranks the whole pool directly.
    pub fn with_cascade(metric: M, cascade: Vec<MatchRule>) -> Self {
        Self { metric, cascade }
    }

    pub fn cascade(&self) -> &[MatchRule] { &self.cascade }

    /// Best reference for `unit` among `pool`. Fails with `NoCandidates` iff `pool` is empty.
    pub fn find_best_match<'p>(
        &self,
        unit: &UnitRecord,
        pool: &[&'p UnitRecord],
    ) -> Result<MatchOutcome<'p>, PredictError> {
        if pool.is_empty() {
            return Err(PredictError::NoCandidates);
        }
        for rule in &self.cascade {
            let subset: Vec<&'p UnitRecord> =
                pool.iter().copied().filter(|c| (rule.predicate)(unit, c)).collect();
            if !subset.is_empty() {
                return self.closest(unit, &subset, Some(rule.name));
            }
        }
        self.closest(unit, pool, None)
    }

    fn closest<'p>(
        &self,
        unit: &UnitRecord,
        candidates: &[&'p UnitRecord],
        rule: Option<&'static str>,
    ) -> Result<MatchOutcome<'p>, PredictError> {
        let best = first_min_by_key(candidates.iter().map(|c| self.metric.distance(unit, c)))?;
        let (pos, distance) = best.ok_or(PredictError::NoCandidates)?;
        Ok(MatchOutcome { reference: candidates[pos], rule, distance })
    }
}

/* ---------------------------------- Tests --------------------------------- */
