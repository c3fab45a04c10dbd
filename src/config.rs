//! Configuration of a sweep.
//!
//! The [`Default`] configuration reproduces the reference setup: ten samples
//! per rate, five initial conditions and a horizon of 3600 minutes.
use std::{fs, path::Path};

use anyhow::Context;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// A normal distribution from which a rate constant is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateDistribution {
    pub mean: f64,
    pub std: f64,
}

impl RateDistribution {
    pub fn new(mean: f64, std: f64) -> Self {
        RateDistribution { mean, std }
    }

    pub fn validate(&self, rate: &'static str) -> Result<(), ConfigError> {
        if self.mean.is_finite() && self.std.is_finite() && self.std > 0. {
            Ok(())
        } else {
            Err(ConfigError::Distribution {
                rate,
                mean: self.mean,
                std: self.std,
            })
        }
    }

    pub fn normal(&self, rate: &'static str) -> Result<Normal<f64>, ConfigError> {
        self.validate(rate)?;
        Normal::new(self.mean, self.std).map_err(|_| ConfigError::Distribution {
            rate,
            mean: self.mean,
            std: self.std,
        })
    }
}

/// The distributions of the four rate constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateConfig {
    /// Binding of the suppressor tRNA to the stalled codon
    pub strna_bind: RateDistribution,
    /// Binding of the release factor 1 to the stalled codon
    pub rf1_bind: RateDistribution,
    /// Unbinding of the suppressor tRNA
    pub strna_unbind: RateDistribution,
    /// Unbinding of the release factor 1
    pub rf1_unbind: RateDistribution,
}

impl Default for RateConfig {
    fn default() -> Self {
        RateConfig {
            strna_bind: RateDistribution::new(140., 10.),
            rf1_bind: RateDistribution::new(34.4, 5.),
            strna_unbind: RateDistribution::new(60.23, 5.),
            rf1_unbind: RateDistribution::new(0.19, 0.05),
        }
    }
}

impl RateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strna_bind.validate("strna_bind")?;
        self.rf1_bind.validate("rf1_bind")?;
        self.strna_unbind.validate("strna_unbind")?;
        self.rf1_unbind.validate("rf1_unbind")
    }
}

/// Evenly spaced time points `0, dt, 2dt, ..., (steps - 1)dt` in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    pub steps: usize,
    pub dt: f64,
}

impl Default for TimeGrid {
    fn default() -> Self {
        // one point per minute
        TimeGrid { steps: 3600, dt: 1. }
    }
}

impl TimeGrid {
    pub fn points(&self) -> Vec<f64> {
        (0..self.steps).map(|i| i as f64 * self.dt).collect()
    }

    pub fn horizon(&self) -> f64 {
        self.steps.saturating_sub(1) as f64 * self.dt
    }
}

/// Tolerances and budget of the adaptive integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub rtol: f64,
    pub atol: f64,
    /// Max number of attempted steps for one trajectory.
    pub max_steps: usize,
    /// Smallest step allowed, relative to the current time (or absolute at
    /// time zero).
    pub min_step: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            rtol: 1e-7,
            atol: 1e-9,
            max_steps: 1_000_000,
            min_step: 1e-14,
        }
    }
}

/// Translation throughput used to turn a failure probability into a number
/// of failures per hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    /// Length of the reference gene (kanR) in nucleotides
    pub gene_length_nt: f64,
    /// Nucleotides translated per time unit
    pub translation_rate: f64,
    pub time_units_per_hour: f64,
    /// Number of templates (plasmids) translated in parallel
    pub templates: f64,
}

impl Default for Throughput {
    fn default() -> Self {
        Throughput {
            gene_length_nt: 819.,
            translation_rate: 60.,
            time_units_per_hour: 3600.,
            templates: 200.,
        }
    }
}

impl Throughput {
    pub fn time_units_per_read(&self) -> f64 {
        self.gene_length_nt / self.translation_rate
    }

    pub fn reads_per_hour(&self) -> f64 {
        self.time_units_per_hour / self.time_units_per_read()
    }

    pub fn reads_per_hour_all_templates(&self) -> f64 {
        self.reads_per_hour() * self.templates
    }
}

/// All the parameters of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub rates: RateConfig,
    /// Number of samples drawn for each rate
    pub samples_per_rate: usize,
    /// The initial numbers of unresolved codons, one bucket each
    pub initial_codons: Vec<f64>,
    /// Number of stop codons associated to each entry of `initial_codons`
    pub stop_codons: Vec<u32>,
    /// The number of codons per stop codon, used as exponent scale in the
    /// failure probability
    pub reference_codons: f64,
    pub time: TimeGrid,
    pub solver: SolverOptions,
    pub throughput: Throughput,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rates: RateConfig::default(),
            samples_per_rate: 10,
            initial_codons: vec![200., 400., 1000., 2000., 3200.],
            stop_codons: vec![1, 2, 5, 10, 16],
            reference_codons: 200.,
            time: TimeGrid::default(),
            solver: SolverOptions::default(),
            throughput: Throughput::default(),
        }
    }
}

fn ensure_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0. {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, value })
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(
            &fs::read_to_string(path).with_context(|| {
                format!("Cannot read the config from {:#?}", path)
            })?,
        )
        .with_context(|| format!("Cannot parse the config from {:#?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config = serde_json::to_string_pretty(self)
            .with_context(|| "Cannot serialize the config")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create dir {:#?}", parent))?;
        }
        fs::write(path, config)
            .with_context(|| format!("Cannot save the config to {:#?}", path))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rates.validate()?;
        if self.samples_per_rate == 0 {
            return Err(ConfigError::Empty("samples_per_rate"));
        }
        if self.initial_codons.is_empty() {
            return Err(ConfigError::Empty("initial_codons"));
        }
        if self.nb_combinations().is_none() {
            return Err(ConfigError::Invalid {
                field: "samples_per_rate",
                value: self.samples_per_rate as f64,
            });
        }
        if self.initial_codons.len() != self.stop_codons.len() {
            return Err(ConfigError::LookupMismatch {
                initial: self.initial_codons.len(),
                labels: self.stop_codons.len(),
            });
        }
        for (i, c0) in self.initial_codons.iter().enumerate() {
            // zero is left to the estimator which reports it per combination
            if !c0.is_finite() || self.initial_codons[..i].contains(c0) {
                return Err(ConfigError::Invalid {
                    field: "initial_codons",
                    value: *c0,
                });
            }
        }
        ensure_positive("reference_codons", self.reference_codons)?;
        if self.time.steps == 0 {
            return Err(ConfigError::Empty("time.steps"));
        }
        ensure_positive("time.dt", self.time.dt)?;
        ensure_positive("solver.rtol", self.solver.rtol)?;
        ensure_positive("solver.atol", self.solver.atol)?;
        ensure_positive("solver.min_step", self.solver.min_step)?;
        if self.solver.max_steps == 0 {
            return Err(ConfigError::Empty("solver.max_steps"));
        }
        ensure_positive("throughput.gene_length_nt", self.throughput.gene_length_nt)?;
        ensure_positive("throughput.translation_rate", self.throughput.translation_rate)?;
        ensure_positive(
            "throughput.time_units_per_hour",
            self.throughput.time_units_per_hour,
        )?;
        ensure_positive("throughput.templates", self.throughput.templates)
    }

    /// Total number of combinations of the sweep, `None` on overflow.
    pub fn nb_combinations(&self) -> Option<usize> {
        self.samples_per_rate
            .checked_pow(4)?
            .checked_mul(self.initial_codons.len())
    }
}
