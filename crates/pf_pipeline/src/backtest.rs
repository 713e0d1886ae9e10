//! Backtesting against a fully counted period.
//!
//! For each sample fraction, draw `floor(len * fraction)` units of the complete
//! current dataset with the seeded sampler, predict from that sample, and score
//! the prediction against the sum of the complete dataset. The error is the mean
//! squared difference of the percentage shares. One sampler serves all
//! fractions in order, so a fixed seed and fraction list give a fixed report.

use pf_algo::{aggregate::sum, distance::mean_square_error, DistanceMetric};
use pf_core::{rng::SampleRng, AggregateResult, Dataset};

use crate::{PipelineError, PredictionEngine};

#[derive(Clone, Debug, PartialEq)]
pub struct BacktestCase {
    pub fraction: f64,
    pub sampled_units: usize,
    pub predicted: AggregateResult,
    /// Mean squared error of the percentage shares against the truth.
    pub error: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BacktestReport {
    pub seed: u64,
    pub truth: AggregateResult,
    pub cases: Vec<BacktestCase>,
}

fn percent(ratios: &[f64]) -> Vec<f64> {
    ratios.iter().map(|r| r * 100.0).collect()
}

pub fn backtest<M: DistanceMetric>(
    engine: &PredictionEngine<M>,
    historical: &[Dataset],
    truth: &Dataset,
    fractions: &[f64],
    seed: u64,
) -> Result<BacktestReport, PipelineError> {
    if fractions.is_empty() {
        return Err(PipelineError::Backtest("no sample fractions given".into()));
    }
    if let Some(bad) = fractions.iter().find(|f| !(f.is_finite() && **f > 0.0 && **f <= 1.0)) {
        return Err(PipelineError::Backtest(format!("sample fraction {bad} outside (0, 1]")));
    }

    let truth_sum = sum(truth.units()).map_err(|e| PipelineError::in_dataset(e, truth.name()))?;
    let truth_pct = percent(truth_sum.votes_ratio());

    let mut rng = SampleRng::from_seed_u64(seed);
    let mut cases = Vec::with_capacity(fractions.len());
    for &fraction in fractions {
        let k = (truth.len() as f64 * fraction).floor() as usize;
        let positions = rng.sample_positions(truth.len(), k);
        let sample = truth.select(format!("{}@{fraction}", truth.name()), &positions);

        let predicted = engine.predict(historical, &sample)?;
        let error = mean_square_error(&percent(predicted.votes_ratio()), &truth_pct);
        cases.push(BacktestCase { fraction, sampled_units: sample.len(), predicted, error });
    }
    Ok(BacktestReport { seed, truth: truth_sum, cases })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::{Params, SizeBucket, UnitRecord};

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

    fn period(name: &str, scale: u64) -> Dataset {
        let units = (0..20)
            .map(|i| unit(&format!("{}-{}-{i}", i % 2, i % 4), 100 + 10 * i, vec![10 + i * scale, 30 - i, 5]))
            .collect();
        Dataset::new(name, units).unwrap()
    }

    #[test]
    fn full_sample_has_zero_error() {
        let e = PredictionEngine::new(Params::default()).unwrap();
        let r = backtest(&e, &[period("h", 1)], &period("t", 2), &[1.0], 0).unwrap();
        assert_eq!(r.cases[0].sampled_units, 20);
        assert!(r.cases[0].error.abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_report() {
        let e = PredictionEngine::new(Params::default()).unwrap();
        let (h, t) = ([period("h", 1)], period("t", 2));
        let a = backtest(&e, &h, &t, &[0.1, 0.25, 0.5], 7).unwrap();
        let b = backtest(&e, &h, &t, &[0.1, 0.25, 0.5], 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.cases.iter().map(|c| c.sampled_units).collect::<Vec<_>>(), vec![2, 5, 10]);
        assert!(a.cases.iter().all(|c| c.error >= 0.0));
    }

    #[test]
    fn bad_fractions_rejected() {
        let e = PredictionEngine::new(Params::default()).unwrap();
        let (h, t) = ([period("h", 1)], period("t", 2));
        assert!(matches!(backtest(&e, &h, &t, &[], 0), Err(PipelineError::Backtest(_))));
        assert!(matches!(backtest(&e, &h, &t, &[0.0], 0), Err(PipelineError::Backtest(_))));
        assert!(matches!(backtest(&e, &h, &t, &[1.5], 0), Err(PipelineError::Backtest(_))));
    }

    #[test]
    fn empty_sample_is_insufficient_data() {
        let e = PredictionEngine::new(Params::default()).unwrap();
        let r = backtest(&e, &[period("h", 1)], &period("t", 2), &[0.01], 0);
        assert_eq!(r, Err(PipelineError::InsufficientData { dataset: "h".into() }));
    }
}
