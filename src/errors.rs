//! Errors of the stalling model.
//!
//! Configuration and aggregation errors are fatal for a sweep, whereas
//! [`CombinationError`] is recorded per combination and the sweep carries on.
use thiserror::Error;

/// Invalid configuration, rejected before any sampling takes place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("the distribution of `{rate}` has mean {mean} and std {std}, the std must be finite and strictly positive")]
    Distribution { rate: &'static str, mean: f64, std: f64 },
    #[error("`{0}` cannot be empty")]
    Empty(&'static str),
    #[error("found {initial} initial conditions but {labels} stop codon labels")]
    LookupMismatch { initial: usize, labels: usize },
    #[error("invalid value for `{field}`: {value}")]
    Invalid { field: &'static str, value: f64 },
}

/// The integrator could not produce a trajectory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    #[error("step budget of {max_steps} steps exhausted at time {time}")]
    StepBudget { max_steps: usize, time: f64 },
    #[error("step size {step} underflowed at time {time}")]
    StepUnderflow { step: f64, time: f64 },
    #[error("state became non-finite at time {time}")]
    NonFinite { time: f64 },
    #[error("time points must be strictly increasing, found {previous} followed by {next}")]
    TimePoints { previous: f64, next: f64 },
}

/// The failure probability is undefined for these inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("the initial number of codons {0} cannot be used as a divisor")]
    InvalidInitialCondition(f64),
    #[error("negative base {base} raised to the non-integer exponent {exponent}")]
    NegativeBase { base: f64, exponent: f64 },
    #[error("non-finite probability from base {base} and exponent {exponent}")]
    NonFinite { base: f64, exponent: f64 },
}

/// Failure of a single combination of the sweep.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CombinationError {
    #[error(transparent)]
    Integration(#[from] IntegrationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("no successful combination for the initial condition {initial_codons} ({failed} failed)")]
    EmptyBucket { initial_codons: f64, failed: usize },
    #[error("expected {expected} outcomes for the initial condition {initial_codons}, found {found}")]
    BucketSize { initial_codons: f64, expected: usize, found: usize },
    #[error("outcome {index} has the initial condition {initial_codons} which is not configured")]
    UnknownInitialCondition { index: usize, initial_codons: f64 },
}
