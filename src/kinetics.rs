//! The kinetic model of a ribosome stalled at a stop codon.
//!
//! An unresolved codon is either bound by a suppressor tRNA (stRNA), leading
//! to read-through, or by the release factor 1 (RF1), leading to termination.
//! Both bindings are reversible:
//!
//! ```text
//! d(codon)/dt       = su * codon_strna + ru * codon_rf1 - (sb + rb) * codon
//! d(codon_strna)/dt = sb * codon - su * codon_strna
//! d(codon_rf1)/dt   = rb * codon - ru * codon_rf1
//! ```
use nalgebra::{Matrix3, Vector3};
use serde::Serialize;

use crate::{
    config::SolverOptions,
    errors::IntegrationError,
    sampler::RateSample,
    solver::{OdeSystem, Rosenbrock23},
};

/// The number of codons in each state at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemState {
    /// Codons not bound by any factor
    pub codon: f64,
    /// Codons bound by the suppressor tRNA
    pub codon_strna: f64,
    /// Codons bound by the release factor 1
    pub codon_rf1: f64,
}

impl SystemState {
    pub fn new(codon: f64, codon_strna: f64, codon_rf1: f64) -> Self {
        SystemState { codon, codon_strna, codon_rf1 }
    }

    /// All the `initial_codons` are unresolved.
    pub fn unresolved(initial_codons: f64) -> Self {
        SystemState::new(initial_codons, 0., 0.)
    }

    pub fn total(&self) -> f64 {
        self.codon + self.codon_strna + self.codon_rf1
    }
}

impl From<SystemState> for Vector3<f64> {
    fn from(state: SystemState) -> Self {
        Vector3::new(state.codon, state.codon_strna, state.codon_rf1)
    }
}

impl From<Vector3<f64>> for SystemState {
    fn from(y: Vector3<f64>) -> Self {
        SystemState::new(y[0], y[1], y[2])
    }
}

/// The linear system for a fixed set of rates.
#[derive(Debug, Clone, Copy)]
pub struct StallKinetics {
    pub rates: RateSample,
}

impl StallKinetics {
    pub fn new(rates: RateSample) -> Self {
        StallKinetics { rates }
    }

    #[rustfmt::skip]
    fn matrix(&self) -> Matrix3<f64> {
        let RateSample { strna_bind, rf1_bind, strna_unbind, rf1_unbind } =
            self.rates;
        Matrix3::new(
            -(strna_bind + rf1_bind), strna_unbind, rf1_unbind,
            strna_bind, -strna_unbind, 0.,
            rf1_bind, 0., -rf1_unbind,
        )
    }

    pub fn derivatives(&self, state: &SystemState) -> SystemState {
        self.derivative(&Vector3::from(*state)).into()
    }

    /// The steady state reached from `total` codons, where
    /// `codon : codon_strna : codon_rf1 = 1 : sb / su : rb / ru`.
    ///
    /// Returns `None` when an unbinding rate is zero.
    pub fn equilibrium(&self, total: f64) -> Option<SystemState> {
        if self.rates.strna_unbind == 0. || self.rates.rf1_unbind == 0. {
            return None;
        }
        let strna = self.rates.strna_bind / self.rates.strna_unbind;
        let rf1 = self.rates.rf1_bind / self.rates.rf1_unbind;
        let codon = total / (1. + strna + rf1);
        Some(SystemState::new(codon, codon * strna, codon * rf1))
    }
}

impl OdeSystem for StallKinetics {
    fn derivative(&self, y: &Vector3<f64>) -> Vector3<f64> {
        self.matrix() * y
    }

    fn jacobian(&self, _y: &Vector3<f64>) -> Matrix3<f64> {
        self.matrix()
    }
}

/// The states of the system at each time point.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub time: Vec<f64>,
    pub states: Vec<SystemState>,
}

impl Trajectory {
    pub fn final_state(&self) -> Option<&SystemState> {
        self.states.last()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Integrate the kinetics with `rates` from `initial` over the `time` points.
pub fn integrate(
    rates: RateSample,
    initial: SystemState,
    time: &[f64],
    options: &SolverOptions,
) -> Result<Trajectory, IntegrationError> {
    let states = Rosenbrock23::new(*options)
        .solve(&StallKinetics::new(rates), initial.into(), time)?;
    Ok(Trajectory {
        time: time.to_vec(),
        states: states.into_iter().map(SystemState::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TimeGrid, test_util::PositiveRates};
    use quickcheck_macros::quickcheck;

    fn reference_rates() -> RateSample {
        RateSample::new(140., 34.4, 60.23, 0.19)
    }

    fn tight() -> SolverOptions {
        SolverOptions { rtol: 1e-10, atol: 1e-12, ..Default::default() }
    }

    #[test]
    fn jacobian_columns_sum_to_zero() {
        let kinetics = StallKinetics::new(reference_rates());
        let jacobian = kinetics.jacobian(&Vector3::zeros());
        for col in jacobian.column_iter() {
            assert!(col.sum().abs() < 1e-12);
        }
    }

    #[test]
    fn derivatives_at_start() {
        let kinetics = StallKinetics::new(reference_rates());
        let d = kinetics.derivatives(&SystemState::unresolved(200.));
        assert!((d.codon + (140. + 34.4) * 200.).abs() < 1e-9);
        assert!((d.codon_strna - 140. * 200.).abs() < 1e-9);
        assert!((d.codon_rf1 - 34.4 * 200.).abs() < 1e-9);
    }

    #[test]
    fn trajectory_has_one_state_per_time_point() {
        let time = TimeGrid::default().points();
        let trajectory = integrate(
            reference_rates(),
            SystemState::unresolved(200.),
            &time,
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(trajectory.len(), 3600);
        assert_eq!(trajectory.states[0], SystemState::unresolved(200.));
        assert_eq!(trajectory.time, time);
    }

    #[test]
    fn mass_is_conserved_with_reference_rates() {
        let time = TimeGrid::default().points();
        let trajectory = integrate(
            reference_rates(),
            SystemState::unresolved(3200.),
            &time,
            &SolverOptions::default(),
        )
        .unwrap();
        for state in trajectory.states {
            assert!(((state.total() - 3200.) / 3200.).abs() < 1e-6);
        }
    }

    #[test]
    fn reaches_equilibrium_at_horizon() {
        let kinetics = StallKinetics::new(reference_rates());
        let time = TimeGrid::default().points();
        let trajectory = integrate(
            reference_rates(),
            SystemState::unresolved(1000.),
            &time,
            &SolverOptions::default(),
        )
        .unwrap();
        let last = trajectory.final_state().unwrap();
        let expected = kinetics.equilibrium(1000.).unwrap();
        assert!((last.codon - expected.codon).abs() < 1e-6 * 1000.);
        assert!((last.codon_strna - expected.codon_strna).abs() < 1e-6 * 1000.);
        assert!((last.codon_rf1 - expected.codon_rf1).abs() < 1e-6 * 1000.);

        let d = kinetics.derivatives(last);
        for v in [d.codon, d.codon_strna, d.codon_rf1] {
            assert!(v.abs() < 1e-6 * 1000., "derivative {}", v);
        }
    }

    #[test]
    fn matches_closed_form_without_rf1() {
        // with no RF1, codon(t) = c0 (su + sb exp(-(sb + su) t)) / (sb + su)
        let (sb, su, c0) = (2., 1., 100.);
        let rates = RateSample::new(sb, 0., su, 0.);
        let time: Vec<f64> = (0..20).map(|t| t as f64 * 0.25).collect();
        let trajectory =
            integrate(rates, SystemState::unresolved(c0), &time, &tight())
                .unwrap();
        for (t, state) in time.iter().zip(&trajectory.states) {
            let codon = c0 * (su + sb * (-(sb + su) * t).exp()) / (sb + su);
            assert!(
                (state.codon - codon).abs() < 1e-4,
                "at {} expected {} got {}",
                t,
                codon,
                state.codon
            );
            assert!((state.codon_strna - (c0 - codon)).abs() < 1e-4);
            assert_eq!(state.codon_rf1, 0.);
        }
    }

    #[test]
    fn equilibrium_undefined_without_unbinding() {
        let kinetics = StallKinetics::new(RateSample::new(1., 1., 0., 1.));
        assert!(kinetics.equilibrium(100.).is_none());
    }

    #[quickcheck]
    fn mass_is_conserved(rates: PositiveRates, c0: u16) -> bool {
        let c0 = c0 as f64 + 1.;
        let time = TimeGrid { steps: 200, dt: 1. }.points();
        let trajectory = integrate(
            rates.0,
            SystemState::unresolved(c0),
            &time,
            &SolverOptions::default(),
        )
        .unwrap();
        trajectory
            .states
            .iter()
            .all(|state| ((state.total() - c0) / c0).abs() < 1e-6)
    }
}
