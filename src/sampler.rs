//! Sampling of the rate constants.
use rand_distr::Distribution;
use rand_pcg::Pcg64Mcg;
use serde::Serialize;

use crate::{
    config::{Config, RateDistribution},
    errors::ConfigError,
};

/// The four rate constants used for one integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSample {
    pub strna_bind: f64,
    pub rf1_bind: f64,
    pub strna_unbind: f64,
    pub rf1_unbind: f64,
}

impl RateSample {
    pub fn new(
        strna_bind: f64,
        rf1_bind: f64,
        strna_unbind: f64,
        rf1_unbind: f64,
    ) -> Self {
        RateSample { strna_bind, rf1_bind, strna_unbind, rf1_unbind }
    }
}

/// The sampled values for each rate, the sweep takes their Cartesian
/// product.
#[derive(Debug, Clone, PartialEq)]
pub struct RateGrid {
    pub strna_bind: Vec<f64>,
    pub rf1_bind: Vec<f64>,
    pub strna_unbind: Vec<f64>,
    pub rf1_unbind: Vec<f64>,
}

impl RateGrid {
    /// Draw `config.samples_per_rate` values for each rate.
    ///
    /// The draws are taken in order: first all the stRNA binding rates, then
    /// RF1 binding, stRNA unbinding and RF1 unbinding.
    pub fn sample(
        config: &Config,
        rng: &mut Pcg64Mcg,
    ) -> Result<Self, ConfigError> {
        let n = config.samples_per_rate;
        if n == 0 {
            return Err(ConfigError::Empty("samples_per_rate"));
        }
        let rates = &config.rates;
        Ok(RateGrid {
            strna_bind: sample_rates(&rates.strna_bind, "strna_bind", n, rng)?,
            rf1_bind: sample_rates(&rates.rf1_bind, "rf1_bind", n, rng)?,
            strna_unbind: sample_rates(
                &rates.strna_unbind,
                "strna_unbind",
                n,
                rng,
            )?,
            rf1_unbind: sample_rates(&rates.rf1_unbind, "rf1_unbind", n, rng)?,
        })
    }

    /// The number of rate combinations, that is the product of the sizes of
    /// the four dimensions, `None` on overflow.
    pub fn nb_rate_samples(&self) -> Option<usize> {
        self.strna_bind
            .len()
            .checked_mul(self.rf1_bind.len())?
            .checked_mul(self.strna_unbind.len())?
            .checked_mul(self.rf1_unbind.len())
    }

    /// The `idx`-th combination of rates, with the stRNA binding rate
    /// varying the slowest and the RF1 unbinding rate the fastest.
    pub fn get(&self, idx: usize) -> Option<RateSample> {
        if idx >= self.nb_rate_samples()? {
            return None;
        }
        let l = idx % self.rf1_unbind.len();
        let rest = idx / self.rf1_unbind.len();
        let k = rest % self.strna_unbind.len();
        let rest = rest / self.strna_unbind.len();
        let j = rest % self.rf1_bind.len();
        let i = rest / self.rf1_bind.len();
        Some(RateSample::new(
            self.strna_bind[i],
            self.rf1_bind[j],
            self.strna_unbind[k],
            self.rf1_unbind[l],
        ))
    }
}

/// Draw `n` independent values from the normal `distribution` of `rate`.
pub fn sample_rates(
    distribution: &RateDistribution,
    rate: &'static str,
    n: usize,
    rng: &mut Pcg64Mcg,
) -> Result<Vec<f64>, ConfigError> {
    let normal = distribution.normal(rate)?;
    Ok(normal.sample_iter(rng).take(n).collect())
}
