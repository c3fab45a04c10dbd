//! Adaptive integrator for stiff three-state ODE systems.
//!
//! The stalling kinetics mixes binding rates of the order of `10^2` per
//! minute with horizons of thousands of minutes, which makes explicit schemes
//! crawl. [`Rosenbrock23`] is the modified Rosenbrock pair of Shampine and
//! Reichelt (the `ode23s` scheme): second order, L-stable, with an embedded
//! third order error estimate used to adapt the step.
//!
//! Each step solves three linear systems with the same matrix
//! `W = I - h d J`, factorised once. When the columns of the Jacobian sum to
//! zero (closed exchange systems) so do all the stages, hence the total mass
//! is conserved up to rounding regardless of the tolerances.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Matrix3, Vector3};
//! use stall_kinetics::config::SolverOptions;
//! use stall_kinetics::solver::{OdeSystem, Rosenbrock23};
//!
//! struct Decay;
//!
//! impl OdeSystem for Decay {
//!     fn derivative(&self, y: &Vector3<f64>) -> Vector3<f64> {
//!         -y
//!     }
//!     fn jacobian(&self, _y: &Vector3<f64>) -> Matrix3<f64> {
//!         -Matrix3::identity()
//!     }
//! }
//!
//! let solver = Rosenbrock23::new(SolverOptions::default());
//! let states = solver
//!     .solve(&Decay, Vector3::new(1., 2., 3.), &[0., 1.])
//!     .unwrap();
//! assert!((states[1][0] - (-1f64).exp()).abs() < 1e-4);
//! ```
use std::f64::consts::SQRT_2;

use nalgebra::{Matrix3, Vector3};

use crate::{config::SolverOptions, errors::IntegrationError};

const D: f64 = 1. / (2. + SQRT_2);
const E32: f64 = 6. + SQRT_2;
const SAFETY: f64 = 0.8;
const GROWTH_CEIL: f64 = 5.;
const GROWTH_FLOOR: f64 = 0.2;
const SHRINK_FLOOR: f64 = 0.1;
const SHRINK_CEIL: f64 = 0.5;

/// A system `dy/dt = f(y)` with three state variables and no explicit time
/// dependency.
pub trait OdeSystem {
    fn derivative(&self, y: &Vector3<f64>) -> Vector3<f64>;
    /// The Jacobian `df/dy` evaluated at `y`.
    fn jacobian(&self, y: &Vector3<f64>) -> Matrix3<f64>;
}

fn is_finite(y: &Vector3<f64>) -> bool {
    y.iter().all(|v| v.is_finite())
}

#[derive(Debug, Clone, Copy)]
pub struct Rosenbrock23 {
    options: SolverOptions,
}

impl Rosenbrock23 {
    pub fn new(options: SolverOptions) -> Self {
        Rosenbrock23 { options }
    }

    /// Integrate `system` from `y0` at `time[0]` and return the state at
    /// every point of `time`, the first one being `y0`.
    ///
    /// The internal step is adapted to the tolerances but never crosses a
    /// requested time point, which are therefore hit exactly.
    pub fn solve<S: OdeSystem>(
        &self,
        system: &S,
        y0: Vector3<f64>,
        time: &[f64],
    ) -> Result<Vec<Vector3<f64>>, IntegrationError> {
        let mut states = Vec::with_capacity(time.len());
        let t0 = match time.first() {
            Some(t0) => *t0,
            None => return Ok(states),
        };
        if !is_finite(&y0) || !is_finite(&system.derivative(&y0)) {
            return Err(IntegrationError::NonFinite { time: t0 });
        }
        states.push(y0);
        if time.len() == 1 {
            return Ok(states);
        }

        let mut y = y0;
        let mut t = t0;
        let mut h = self.initial_step(system, &y0, time[1] - time[0]);
        let mut steps = 0usize;

        for window in time.windows(2) {
            let (previous, next) = (window[0], window[1]);
            if !(next > previous) {
                return Err(IntegrationError::TimePoints { previous, next });
            }
            while t < next {
                if steps == self.options.max_steps {
                    return Err(IntegrationError::StepBudget {
                        max_steps: self.options.max_steps,
                        time: t,
                    });
                }
                steps += 1;

                let remaining = next - t;
                let last = h >= remaining;
                let step = if last { remaining } else { h };

                match self.step(system, &y, step) {
                    Some((y_new, err)) if err <= 1. => {
                        if !is_finite(&y_new) {
                            return Err(IntegrationError::NonFinite {
                                time: t + step,
                            });
                        }
                        y = y_new;
                        let factor = if err == 0. {
                            GROWTH_CEIL
                        } else {
                            (SAFETY * err.powf(-1. / 3.))
                                .clamp(GROWTH_FLOOR, GROWTH_CEIL)
                        };
                        if last {
                            t = next;
                            // a step clipped to land on `next` must not
                            // shrink the following ones
                            h = h.max(step * factor);
                        } else {
                            t += step;
                            h = step * factor;
                        }
                    }
                    rejected => {
                        let factor = match rejected {
                            Some((_, err)) => (SAFETY * err.powf(-1. / 3.))
                                .clamp(SHRINK_FLOOR, SHRINK_CEIL),
                            None => SHRINK_CEIL,
                        };
                        h = step * factor;
                        if h < self.options.min_step * t.abs().max(1.) {
                            return Err(IntegrationError::StepUnderflow {
                                step: h,
                                time: t,
                            });
                        }
                    }
                }
            }
            states.push(y);
        }
        Ok(states)
    }

    /// One step of size `h` from `y`, returning the new state and the
    /// weighted error norm (accept when `<= 1`).
    ///
    /// Returns `None` when `W` is singular or the error is not finite.
    fn step<S: OdeSystem>(
        &self,
        system: &S,
        y: &Vector3<f64>,
        h: f64,
    ) -> Option<(Vector3<f64>, f64)> {
        let w = Matrix3::identity() - system.jacobian(y) * (h * D);
        let lu = w.lu();

        let f0 = system.derivative(y);
        let k1 = lu.solve(&f0)?;
        let f1 = system.derivative(&(y + k1 * (0.5 * h)));
        let k2 = lu.solve(&(f1 - k1))? + k1;
        let y_new = y + k2 * h;
        let f2 = system.derivative(&y_new);
        let k3 = lu.solve(&(f2 - (k2 - f1) * E32 - (k1 - f0) * 2.))?;

        let error = (k1 - k2 * 2. + k3) * (h / 6.);
        let mut err = 0f64;
        for i in 0..3 {
            let scale = self.options.atol
                + self.options.rtol * y[i].abs().max(y_new[i].abs());
            let e = error[i].abs() / scale;
            if !e.is_finite() {
                return None;
            }
            err = err.max(e);
        }
        Some((y_new, err))
    }

    fn initial_step<S: OdeSystem>(
        &self,
        system: &S,
        y0: &Vector3<f64>,
        span: f64,
    ) -> f64 {
        // the norm bounds the fastest time scale of the system
        let norm = system.jacobian(y0).abs().column_sum().max();
        if norm > 0. && norm.is_finite() {
            (0.5 * self.options.rtol.cbrt() / norm).min(span)
        } else {
            span
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Linear(Matrix3<f64>);

    impl OdeSystem for Linear {
        fn derivative(&self, y: &Vector3<f64>) -> Vector3<f64> {
            self.0 * y
        }

        fn jacobian(&self, _y: &Vector3<f64>) -> Matrix3<f64> {
            self.0
        }
    }

    fn solver() -> Rosenbrock23 {
        Rosenbrock23::new(SolverOptions::default())
    }

    fn tight_solver() -> Rosenbrock23 {
        Rosenbrock23::new(SolverOptions {
            rtol: 1e-10,
            atol: 1e-12,
            ..Default::default()
        })
    }

    #[test]
    fn exponential_decay() {
        let system = Linear(Matrix3::from_diagonal(&Vector3::new(
            -0.5, -1., -2.,
        )));
        let time: Vec<f64> = (0..=10).map(|t| t as f64).collect();
        let states = tight_solver()
            .solve(&system, Vector3::new(1., 1., 1.), &time)
            .unwrap();
        assert_eq!(states.len(), 11);
        for (t, state) in time.iter().zip(&states) {
            for (rate, got) in [0.5f64, 1., 2.].iter().zip(state.iter()) {
                let expected = (-rate * t).exp();
                assert!(
                    (got - expected).abs() < 1e-5,
                    "at time {} expected {} got {}",
                    t,
                    expected,
                    got
                );
            }
        }
    }

    #[test]
    fn stiff_decay_is_stable_with_large_outputs() {
        let system = Linear(Matrix3::from_diagonal(&Vector3::new(
            -1000., -0.1, 0.,
        )));
        let time = [0., 100.];
        let states =
            solver().solve(&system, Vector3::new(1., 1., 1.), &time).unwrap();
        assert!(states[1][0].abs() < 1e-8);
        assert!((states[1][1] - (-10f64).exp()).abs() < 1e-6);
        assert_eq!(states[1][2], 1.);
    }

    #[test]
    fn zero_columns_sum_conserves_mass() {
        let system = Linear(Matrix3::new(
            -3., 1., 0.5, //
            2., -1., 0., //
            1., 0., -0.5,
        ));
        let time: Vec<f64> = (0..50).map(|t| t as f64 * 0.5).collect();
        let states = solver()
            .solve(&system, Vector3::new(100., 0., 0.), &time)
            .unwrap();
        for state in states {
            assert!((state.sum() - 100.).abs() < 1e-9);
        }
    }

    #[test]
    fn first_state_is_the_initial_one() {
        let system = Linear(-Matrix3::identity());
        let y0 = Vector3::new(3., 2., 1.);
        let states = solver().solve(&system, y0, &[5., 6.]).unwrap();
        assert_eq!(states[0], y0);
    }

    #[test]
    fn no_time_points() {
        let system = Linear(-Matrix3::identity());
        let states =
            solver().solve(&system, Vector3::new(1., 1., 1.), &[]).unwrap();
        assert!(states.is_empty());
    }

    #[test]
    fn step_budget_is_reported() {
        let system = Linear(Matrix3::from_diagonal(&Vector3::new(
            -100., -100., -100.,
        )));
        let options = SolverOptions { max_steps: 5, ..Default::default() };
        let result = Rosenbrock23::new(options).solve(
            &system,
            Vector3::new(1., 1., 1.),
            &[0., 10.],
        );
        assert!(matches!(
            result,
            Err(IntegrationError::StepBudget { max_steps: 5, .. })
        ));
    }

    #[test]
    fn non_increasing_time_points_are_rejected() {
        let system = Linear(-Matrix3::identity());
        let result = solver().solve(
            &system,
            Vector3::new(1., 1., 1.),
            &[0., 1., 1.],
        );
        assert_eq!(
            result,
            Err(IntegrationError::TimePoints { previous: 1., next: 1. })
        );
    }

    #[test]
    fn non_finite_system_is_rejected() {
        let system = Linear(Matrix3::from_element(f64::NAN));
        let result =
            solver().solve(&system, Vector3::new(1., 1., 1.), &[0., 1.]);
        assert_eq!(result, Err(IntegrationError::NonFinite { time: 0. }));
    }

    #[test]
    fn blow_up_is_reported() {
        // grows like exp(1000 t), overflows long before t = 10
        let system = Linear(Matrix3::from_diagonal(&Vector3::new(
            1000., 0., 0.,
        )));
        let result =
            solver().solve(&system, Vector3::new(1., 1., 1.), &[0., 10.]);
        assert!(result.is_err());
    }
}
