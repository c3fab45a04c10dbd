//! Aggregation of the failure probabilities per initial condition.
use serde::Serialize;

use crate::{
    config::{Config, Throughput},
    errors::AggregationError,
    sweep::{Outcome, Sweep},
};

/// The probabilities of all the successful combinations sharing the same
/// initial condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub initial_codons: f64,
    pub stop_codons: u32,
    pub probabilities: Vec<f64>,
    /// The number of combinations which errored
    pub failed: usize,
}

impl Bucket {
    fn new(initial_codons: f64, stop_codons: u32) -> Self {
        Bucket {
            initial_codons,
            stop_codons,
            probabilities: Vec::new(),
            failed: 0,
        }
    }

    pub fn nb_outcomes(&self) -> usize {
        self.probabilities.len() + self.failed
    }
}

/// One bucket per initial condition, in the configured order.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketedResults {
    pub buckets: Vec<Bucket>,
}

impl BucketedResults {
    pub fn from_outcomes(
        config: &Config,
        outcomes: &[Outcome],
    ) -> Result<Self, AggregationError> {
        let mut buckets: Vec<Bucket> = config
            .initial_codons
            .iter()
            .zip(&config.stop_codons)
            .map(|(c0, stop)| Bucket::new(*c0, *stop))
            .collect();
        for outcome in outcomes {
            let bucket = buckets
                .iter_mut()
                .find(|b| b.initial_codons == outcome.combo.initial_codons)
                .ok_or(AggregationError::UnknownInitialCondition {
                    index: outcome.index,
                    initial_codons: outcome.combo.initial_codons,
                })?;
            match &outcome.probability {
                Ok(prob) => bucket.probabilities.push(*prob),
                Err(_) => bucket.failed += 1,
            }
        }
        Ok(BucketedResults { buckets })
    }

    /// Check that each bucket received `expected` outcomes, successful or
    /// not.
    pub fn check_sizes(&self, expected: usize) -> Result<(), AggregationError> {
        for bucket in &self.buckets {
            if bucket.nb_outcomes() != expected {
                return Err(AggregationError::BucketSize {
                    initial_codons: bucket.initial_codons,
                    expected,
                    found: bucket.nb_outcomes(),
                });
            }
        }
        Ok(())
    }

    pub fn summarise(
        &self,
        throughput: &Throughput,
    ) -> Result<Summary, AggregationError> {
        let reads = throughput.reads_per_hour_all_templates();
        let buckets = self
            .buckets
            .iter()
            .map(|bucket| {
                let (min, max, mean) = min_max_mean(&bucket.probabilities)
                    .ok_or(AggregationError::EmptyBucket {
                        initial_codons: bucket.initial_codons,
                        failed: bucket.failed,
                    })?;
                Ok(BucketStats {
                    initial_codons: bucket.initial_codons,
                    stop_codons: bucket.stop_codons,
                    count: bucket.probabilities.len(),
                    failed: bucket.failed,
                    above_one: bucket
                        .probabilities
                        .iter()
                        .filter(|p| **p > 1.)
                        .count(),
                    min,
                    max,
                    mean,
                    avg_failures_per_hour: mean * reads,
                })
            })
            .collect::<Result<Vec<BucketStats>, AggregationError>>()?;
        Ok(Summary { buckets, reads_per_hour_all_templates: reads })
    }
}

/// Statistics of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketStats {
    pub initial_codons: f64,
    pub stop_codons: u32,
    pub count: usize,
    pub failed: usize,
    /// Probabilities greater than one, kept as they are
    pub above_one: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub avg_failures_per_hour: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub buckets: Vec<BucketStats>,
    pub reads_per_hour_all_templates: f64,
}

/// Bucket the outcomes of `sweep`, check each bucket received one outcome per
/// combination of rates and compute the statistics.
pub fn aggregate(
    sweep: &Sweep,
    outcomes: &[Outcome],
) -> Result<Summary, AggregationError> {
    let config = sweep.config();
    let bucketed = BucketedResults::from_outcomes(config, outcomes)?;
    bucketed.check_sizes(sweep.nb_rate_samples())?;
    bucketed.summarise(&config.throughput)
}

/// Returns `None` for empty `values`.
pub fn min_max_mean(values: &[f64]) -> Option<(f64, f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let (min, max, sum) = values.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.),
        |(min, max, sum), v| (min.min(*v), max.max(*v), sum + v),
    );
    Some((min, max, sum / values.len() as f64))
}
