//! The probability of a read-through failure.
//!
//! The fraction of codons bound by the suppressor tRNA at the end of the
//! integration is the probability that a single stop codon is read through.
//! With `c0` codons, that is `c0 / reference_codons` stop codons, all of them
//! must be read through:
//!
//! ```text
//! prob = (codon_strna / c0) ^ (c0 / reference_codons)
//! ```
//!
//! The formula is not clamped: a fraction greater than one gives a
//! probability greater than one.
use crate::{errors::DomainError, kinetics::SystemState};

/// Compute the failure probability from the `final_state` of a trajectory
/// started with `initial_codons` unresolved codons.
pub fn failure_probability(
    final_state: &SystemState,
    initial_codons: f64,
    reference_codons: f64,
) -> Result<f64, DomainError> {
    if initial_codons == 0. || !initial_codons.is_finite() {
        return Err(DomainError::InvalidInitialCondition(initial_codons));
    }
    let base = final_state.codon_strna / initial_codons;
    let exponent = initial_codons / reference_codons;
    if base < 0. && exponent.fract() != 0. {
        return Err(DomainError::NegativeBase { base, exponent });
    }
    let prob = base.powf(exponent);
    if prob.is_finite() {
        Ok(prob)
    } else {
        Err(DomainError::NonFinite { base, exponent })
    }
}
