//! crates/pf_pipeline/src/engine.rs
//! PREDICT stage: one full-universe prediction per historical dataset, then a
//! re-aggregation of those predictions (equal weight per vote, not per dataset).
//!
//! Per historical dataset `H`:
//!   1) reference pool = units of `H` observed in the current period (pool order = `H` order);
//!   2) every unit of `H`: observed record as-is, or best match in the pool projected
//!      with that reference's current record;
//!   3) `sum` of all per-unit outcomes.

use std::collections::BTreeMap;

use pf_algo::{
    aggregate::{combine, sum},
    distance::{DistanceMetric, ShareDistance},
    matching::MatchFinder,
    projection::project,
};
use pf_core::{
    variables::{validate_domains, Params},
    AggregateResult, Dataset, Prediction, Tallied, UnitRecord,
};

use crate::PipelineError;

/// Rule label recorded when the cascade found nothing and the whole pool was ranked.
pub const FULL_POOL_RULE: &str = "full_pool";

// ----- Per-unit outcome ------------------------------------------------------------------------

/// What the engine emitted for one unit of the historical universe.
#[derive(Clone, Debug, PartialEq)]
pub enum UnitOutcome<'a> {
    /// Ground truth from the current period.
    Observed(&'a UnitRecord),
    /// Projected from a reference unit.
    Projected {
        prediction: Prediction,
        rule: Option<&'static str>,
        distance: f64,
    },
}

impl UnitOutcome<'_> {
    pub fn is_observed(&self) -> bool {
        matches!(self, UnitOutcome::Observed(_))
    }
}

impl Tallied for UnitOutcome<'_> {
    fn tally_voters(&self) -> u64 {
        match self {
            UnitOutcome::Observed(u) => u.tally_voters(),
            UnitOutcome::Projected { prediction, .. } => prediction.tally_voters(),
        }
    }
    fn tally_votes(&self) -> f64 {
        match self {
            UnitOutcome::Observed(u) => u.tally_votes(),
            UnitOutcome::Projected { prediction, .. } => prediction.tally_votes(),
        }
    }
    fn tally_options(&self) -> usize {
        match self {
            UnitOutcome::Observed(u) => u.tally_options(),
            UnitOutcome::Projected { prediction, .. } => prediction.tally_options(),
        }
    }
    fn tally_vote(&self, i: usize) -> f64 {
        match self {
            UnitOutcome::Observed(u) => u.tally_vote(i),
            UnitOutcome::Projected { prediction, .. } => prediction.tally_vote(i),
        }
    }
}

// ----- Run summaries ---------------------------------------------------------------------------

/// Per-historical-dataset bookkeeping of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetSummary {
    pub name: String,
    pub universe_units: usize,
    pub observed_units: usize,
    pub projected_units: usize,
    /// Projections per cascade rule (`FULL_POOL_RULE` for the fallback).
    pub rules_used: BTreeMap<&'static str, usize>,
    pub aggregate: AggregateResult,
}

impl DatasetSummary {
    /// Observed share of the universe in `[0, 1]`; 0 for an empty universe.
    pub fn coverage(&self) -> f64 {
        if self.universe_units == 0 {
            0.0
        } else {
            self.observed_units as f64 / self.universe_units as f64
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PredictionRun {
    pub datasets: Vec<DatasetSummary>,
    pub combined: AggregateResult,
}

// ----- Engine ----------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PredictionEngine<M = ShareDistance> {
    params: Params,
    finder: MatchFinder<M>,
    /// Same cascade, shares only: ranks donors for units with no electorate.
    shares_finder: MatchFinder<ShareDistance>,
}

impl PredictionEngine<ShareDistance> {
    /// Engine with the default cascade and the distance configured by `params`.
    pub fn new(params: Params) -> Result<Self, PipelineError> {
        let metric = ShareDistance::from_params(&params);
        Self::with_finder(params, MatchFinder::new(metric))
    }
}

impl<M: DistanceMetric> PredictionEngine<M> {
    pub fn with_finder(params: Params, finder: MatchFinder<M>) -> Result<Self, PipelineError> {
        validate_domains(&params)?;
        let shares_finder = MatchFinder::with_cascade(ShareDistance::SHARES_ONLY, finder.cascade().to_vec());
        Ok(Self { params, finder, shares_finder })
    }

    pub fn params(&self) -> &Params { &self.params }

    /// Per-unit outcomes for one historical dataset, in `historical` order.
    pub fn predict_dataset<'a>(
        &self,
        historical: &'a Dataset,
        observed: &'a Dataset,
    ) -> Result<Vec<UnitOutcome<'a>>, PipelineError> {
        let pool: Vec<&'a UnitRecord> = historical
            .units()
            .iter()
            .filter(|h| match observed.get(h.id()) {
                Some(cur) => {
                    !(self.params.exclude_zero_electorate_references
                        && (cur.total_voters() == 0 || h.total_voters() == 0))
                }
                None => false,
            })
            .collect();

        let mut out = Vec::with_capacity(historical.len());
        for unit in historical.units() {
            if let Some(cur) = observed.get(unit.id()) {
                out.push(UnitOutcome::Observed(cur));
                continue;
            }
            let found = if self.params.exclude_zero_electorate_references && unit.total_voters() == 0 {
                // projects to zero votes whichever donor is picked
                self.shares_finder.find_best_match(unit, &pool)
            } else {
                self.finder.find_best_match(unit, &pool)
            };
            let m = found.map_err(|e| PipelineError::in_dataset(e, historical.name()))?;
            let reference_current = observed
                .get(m.reference.id())
                .ok_or_else(|| PipelineError::InsufficientData { dataset: historical.name().to_string() })?;
            let prediction =
                project(unit, reference_current).map_err(|e| PipelineError::in_dataset(e, historical.name()))?;
            out.push(UnitOutcome::Projected { prediction, rule: m.rule, distance: m.distance });
        }
        Ok(out)
    }

    fn summarize(&self, historical: &Dataset, observed: &Dataset) -> Result<DatasetSummary, PipelineError> {
        let outcomes = self.predict_dataset(historical, observed)?;
        let aggregate = sum(&outcomes).map_err(|e| PipelineError::in_dataset(e, historical.name()))?;

        let mut rules_used = BTreeMap::new();
        let mut observed_units = 0;
        for o in &outcomes {
            match o {
                UnitOutcome::Observed(_) => observed_units += 1,
                UnitOutcome::Projected { rule, .. } => {
                    *rules_used.entry(rule.unwrap_or(FULL_POOL_RULE)).or_insert(0) += 1;
                }
            }
        }
        Ok(DatasetSummary {
            name: historical.name().to_string(),
            universe_units: outcomes.len(),
            observed_units,
            projected_units: outcomes.len() - observed_units,
            rules_used,
            aggregate,
        })
    }

    /// Full run with per-dataset summaries.
    pub fn predict_detailed(&self, historical: &[Dataset], observed: &Dataset) -> Result<PredictionRun, PipelineError> {
        let datasets = historical
            .iter()
            .map(|h| self.summarize(h, observed))
            .collect::<Result<Vec<_>, _>>()?;
        let aggregates: Vec<AggregateResult> = datasets.iter().map(|d| d.aggregate.clone()).collect();
        let combined = combine(&aggregates)?;
        Ok(PredictionRun { datasets, combined })
    }

    pub fn predict(&self, historical: &[Dataset], observed: &Dataset) -> Result<AggregateResult, PipelineError> {
        self.predict_detailed(historical, observed).map(|run| run.combined)
    }
}

/// Single entry point: final aggregate prediction for `observed` given `historical`.
pub fn predict(params: &Params, historical: &[Dataset], observed: &Dataset) -> Result<AggregateResult, PipelineError> {
    PredictionEngine::new(params.clone())?.predict(historical, observed)
}

// ----- Tests -----------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::SizeBucket;

    fn unit(id: &str, voters: u64, votes: Vec<u64>) -> UnitRecord {
        let parts: Vec<&str> = id.split('-').collect();
        let cast = votes.iter().sum();
        UnitRecord::new(
            id.parse().unwrap(),
            parts[0].parse().unwrap(),
            parts[1].parse().unwrap(),
            voters,
            cast,
            votes,
            SizeBucket::default(),
        )
    }

    #[test]
    fn invalid_params_rejected_up_front() {
        let p = Params { size_bucket_width: 0, ..Params::default() };
        assert!(matches!(PredictionEngine::new(p), Err(PipelineError::Params(_))));
    }

    #[test]
    fn history_may_list_other_options_than_the_current_period() {
        // A three-option run-off as history for a four-option first round.
        let h = Dataset::new(
            "runoff",
            vec![unit("1-1-1", 300, vec![100, 90, 10]), unit("1-1-2", 300, vec![120, 70, 10])],
        )
        .unwrap();
        let o = Dataset::new("now", vec![unit("1-1-1", 250, vec![50, 60, 70, 20])]).unwrap();
        let e = PredictionEngine::new(Params::default()).unwrap();

        let outcomes = e.predict_dataset(&h, &o).unwrap();
        match &outcomes[1] {
            UnitOutcome::Projected { prediction, .. } => {
                assert_eq!(prediction.votes().len(), 4);
                assert_eq!(prediction.reference_unit_id().as_str(), "1-1-1");
            }
            other => panic!("expected projection, got {other:?}"),
        }
        let total = e.predict(std::slice::from_ref(&h), &o).unwrap();
        assert_eq!(total.num_options(), 4);
        assert_eq!(total.total_voters(), 550);
    }

    #[test]
    fn outcomes_follow_historical_order_and_count_rules() {
        let h = Dataset::new(
            "h",
            vec![unit("1-1-1", 30, vec![10, 10]), unit("1-1-2", 30, vec![5, 15]), unit("2-2-1", 940, vec![20, 0])],
        )
        .unwrap();
        let o = Dataset::new("o", vec![unit("1-1-1", 30, vec![12, 8])]).unwrap();
        let e = PredictionEngine::new(Params::default()).unwrap();

        let outcomes = e.predict_dataset(&h, &o).unwrap();
        assert!(outcomes[0].is_observed());
        assert!(matches!(outcomes[1], UnitOutcome::Projected { rule: Some("same_locality_same_size"), .. }));
        assert!(matches!(outcomes[2], UnitOutcome::Projected { rule: None, .. }));

        let run = e.predict_detailed(std::slice::from_ref(&h), &o).unwrap();
        let s = &run.datasets[0];
        assert_eq!((s.universe_units, s.observed_units, s.projected_units), (3, 1, 2));
        assert_eq!(s.rules_used.get("same_locality_same_size"), Some(&1));
        assert_eq!(s.rules_used.get(FULL_POOL_RULE), Some(&1));
        assert!((s.coverage() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn no_historical_datasets_is_empty_input() {
        let o = Dataset::new("o", vec![unit("1-1-1", 30, vec![12, 8])]).unwrap();
        assert_eq!(predict(&Params::default(), &[], &o), Err(PipelineError::EmptyInput));
    }
}
