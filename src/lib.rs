//! Kinetics of ribosomes stalled at stop codons, where a suppressor tRNA
//! (stRNA) competes with the release factor 1 (RF1).
//!
//! The rates of binding and unbinding of both factors are sampled from normal
//! distributions, the linear kinetics is integrated for each combination of
//! rates and initial number of codons, and the fraction of codons bound by the
//! stRNA at the end of the horizon gives the probability of reading through
//! all the stop codons of a gene.
//!
//! # Example
//! ```no_run
//! use stall_kinetics::{aggregate::aggregate, config::Config, sweep::Sweep};
//!
//! let sweep = Sweep::from_seed(Config::default(), 26).unwrap();
//! let outcomes = sweep.par_run();
//! let summary = aggregate(&sweep, &outcomes).unwrap();
//! for bucket in summary.buckets {
//!     println!("{} stop codons: {}", bucket.stop_codons, bucket.mean);
//! }
//! ```
pub mod aggregate;
pub mod config;
pub mod errors;
pub mod estimator;
pub mod kinetics;
pub mod sampler;
pub mod solver;
pub mod sweep;

#[doc(inline)]
pub use crate::config::Config;
#[doc(inline)]
pub use crate::kinetics::{SystemState, Trajectory};
#[doc(inline)]
pub use crate::sampler::RateSample;
