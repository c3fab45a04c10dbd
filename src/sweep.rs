//! Sweep over all the combinations of sampled rates and initial conditions.
//!
//! A combination is identified by its index in the nesting order stRNA
//! binding, RF1 binding, stRNA unbinding, RF1 unbinding and initial codons,
//! the latter varying the fastest. Each combination is independent from the
//! others, so the sweep can be run in parallel: the outcomes are always
//! returned in index order.
use indicatif::ProgressBar;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rayon::prelude::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;

use crate::{
    config::Config,
    errors::{CombinationError, ConfigError, IntegrationError},
    estimator::failure_probability,
    kinetics::{integrate, SystemState, Trajectory},
    sampler::{RateGrid, RateSample},
};

/// The inputs of one integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamCombo {
    pub rates: RateSample,
    pub initial_codons: f64,
}

/// The result of one combination.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub index: usize,
    pub combo: ParamCombo,
    /// The state at the end of the horizon, `None` when the integration
    /// failed
    pub final_state: Option<SystemState>,
    pub probability: Result<f64, CombinationError>,
    /// Only kept when requested with [`Sweep::keep_trajectories`]
    pub trajectory: Option<Trajectory>,
}

#[derive(Debug, Clone)]
pub struct Sweep {
    config: Config,
    grid: RateGrid,
    /// The number of combinations of rates, one bucket holds that many
    rate_samples: usize,
    time: Vec<f64>,
    keep_trajectories: bool,
}

impl Sweep {
    pub fn new(config: Config, grid: RateGrid) -> Result<Self, ConfigError> {
        config.validate()?;
        let rate_samples = grid
            .nb_rate_samples()
            .filter(|n| n.checked_mul(config.initial_codons.len()).is_some())
            .ok_or(ConfigError::Invalid {
                field: "rate grid",
                value: grid.strna_bind.len() as f64
                    * grid.rf1_bind.len() as f64
                    * grid.strna_unbind.len() as f64
                    * grid.rf1_unbind.len() as f64,
            })?;
        if rate_samples == 0 {
            return Err(ConfigError::Empty("rate grid"));
        }
        let time = config.time.points();
        Ok(Sweep {
            config,
            grid,
            rate_samples,
            time,
            keep_trajectories: false,
        })
    }

    /// Sample the rates with a generator seeded by `seed` and create the
    /// sweep.
    pub fn from_seed(config: Config, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let grid = RateGrid::sample(&config, &mut rng)?;
        Sweep::new(config, grid)
    }

    pub fn keep_trajectories(mut self, keep: bool) -> Self {
        self.keep_trajectories = keep;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grid(&self) -> &RateGrid {
        &self.grid
    }

    /// The number of combinations of rates, that is the number of outcomes
    /// for each initial condition.
    pub fn nb_rate_samples(&self) -> usize {
        self.rate_samples
    }

    /// The number of combinations.
    pub fn len(&self) -> usize {
        self.rate_samples * self.config.initial_codons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn combo(&self, index: usize) -> Option<ParamCombo> {
        let nb_initial = self.config.initial_codons.len();
        let rates = self.grid.get(index / nb_initial)?;
        Some(ParamCombo {
            rates,
            initial_codons: self.config.initial_codons[index % nb_initial],
        })
    }

    /// Recompute the full trajectory of the combination `index`.
    pub fn trajectory(
        &self,
        index: usize,
    ) -> Option<Result<Trajectory, IntegrationError>> {
        let combo = self.combo(index)?;
        Some(integrate(
            combo.rates,
            SystemState::unresolved(combo.initial_codons),
            &self.time,
            &self.config.solver,
        ))
    }

    pub fn evaluate(&self, index: usize, combo: ParamCombo) -> Outcome {
        let initial = SystemState::unresolved(combo.initial_codons);
        match integrate(combo.rates, initial, &self.time, &self.config.solver)
        {
            Ok(trajectory) => {
                // the time grid is never empty
                let final_state =
                    trajectory.final_state().copied().unwrap_or(initial);
                let probability = failure_probability(
                    &final_state,
                    combo.initial_codons,
                    self.config.reference_codons,
                )
                .map_err(CombinationError::from);
                Outcome {
                    index,
                    combo,
                    final_state: Some(final_state),
                    probability,
                    trajectory: self.keep_trajectories.then_some(trajectory),
                }
            }
            Err(err) => Outcome {
                index,
                combo,
                final_state: None,
                probability: Err(err.into()),
                trajectory: None,
            },
        }
    }

    pub fn evaluate_at(&self, index: usize) -> Option<Outcome> {
        self.combo(index).map(|combo| self.evaluate(index, combo))
    }

    /// Evaluate all the combinations sequentially.
    pub fn run(&self) -> Vec<Outcome> {
        (0..self.len()).filter_map(|idx| self.evaluate_at(idx)).collect()
    }

    /// Evaluate all the combinations with rayon, the outcomes are in index
    /// order.
    pub fn par_run(&self) -> Vec<Outcome> {
        self.par_run_with_progress(None)
    }

    /// Same as [`Sweep::par_run`], `progress` is incremented once per
    /// combination.
    pub fn par_run_with_progress(
        &self,
        progress: Option<&ProgressBar>,
    ) -> Vec<Outcome> {
        (0..self.len())
            .into_par_iter()
            .filter_map(|idx| {
                let outcome = self.evaluate_at(idx);
                if let Some(progress) = progress {
                    progress.inc(1);
                }
                outcome
            })
            .collect()
    }
}
