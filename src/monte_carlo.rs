//! Monte Carlo risk simulation over random long-only weightings.
//!
//! Per-asset means and the sample covariance matrix are computed once; each
//! trial then costs one weighted sum and one K² quadratic form instead of a
//! full pass over the return history.

use crate::config::TRADING_DAYS;
use crate::covariance::{mean_returns, CovarianceMatrix};
use crate::error::AnalyticsResult;
use crate::portfolio::WeightVector;
use crate::returns::ReturnMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

/// Trials handled by one independently seeded RNG in a parallel run.
const TRIALS_PER_CHUNK: usize = 1_024;

/// One simulated portfolio: annualized expected return and volatility.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MonteCarloSample {
    #[serde(rename = "return")]
    pub expected_return: f64,
    pub volatility: f64,
}

/// Precomputed statistics for a fixed asset set.
#[derive(Clone, Debug)]
pub struct MonteCarloSimulator {
    mean_daily: Vec<f64>,
    covariance: Option<CovarianceMatrix>,
}

impl MonteCarloSimulator {
    /// Prepares the simulator; needs at least 2 days of returns when any
    /// asset is present. With no assets every run yields an empty cloud.
    pub fn new(returns: &ReturnMatrix) -> AnalyticsResult<Self> {
        if returns.num_assets() == 0 {
            return Ok(Self {
                mean_daily: Vec::new(),
                covariance: None,
            });
        }
        let covariance = CovarianceMatrix::estimate(returns)?;
        Ok(Self {
            mean_daily: mean_returns(returns),
            covariance: Some(covariance),
        })
    }

    pub fn num_assets(&self) -> usize {
        self.mean_daily.len()
    }

    pub fn covariance(&self) -> Option<&CovarianceMatrix> {
        self.covariance.as_ref()
    }

    /// Annualized return and volatility of one weighting.
    pub fn evaluate(&self, weights: &WeightVector) -> AnalyticsResult<MonteCarloSample> {
        let Some(cov) = &self.covariance else {
            return Ok(MonteCarloSample {
                expected_return: 0.0,
                volatility: 0.0,
            });
        };
        let variance = cov.quadratic_form(weights.as_slice())?;
        let expected_return: f64 = weights
            .as_slice()
            .iter()
            .zip(self.mean_daily.iter())
            .map(|(w, r)| w * r * TRADING_DAYS)
            .sum();

        Ok(MonteCarloSample {
            expected_return,
            volatility: (variance.max(0.0) * TRADING_DAYS).sqrt(),
        })
    }

    /// Runs `trials` simulations sequentially from the caller's RNG.
    pub fn run(&self, trials: usize, rng: &mut impl Rng) -> AnalyticsResult<Vec<MonteCarloSample>> {
        if self.num_assets() == 0 {
            return Ok(Vec::new());
        }
        (0..trials)
            .map(|_| self.evaluate(&WeightVector::random(self.num_assets(), rng)))
            .collect()
    }

    /// Runs `trials` simulations across the rayon pool.
    ///
    /// Trials are split into fixed-size chunks, each with its own `StdRng`
    /// derived from `seed` and the chunk index, so the cloud is reproducible
    /// for a given seed regardless of thread count. Sample order carries no
    /// meaning.
    pub fn run_parallel(&self, trials: usize, seed: u64) -> AnalyticsResult<Vec<MonteCarloSample>> {
        if self.num_assets() == 0 || trials == 0 {
            return Ok(Vec::new());
        }

        let num_chunks = trials.div_ceil(TRIALS_PER_CHUNK);
        let chunks: Vec<Vec<MonteCarloSample>> = (0..num_chunks)
            .into_par_iter()
            .map(|chunk| {
                let start = chunk * TRIALS_PER_CHUNK;
                let len = TRIALS_PER_CHUNK.min(trials - start);
                let mut rng = StdRng::seed_from_u64(chunk_seed(seed, chunk));
                self.run(len, &mut rng)
            })
            .collect::<AnalyticsResult<_>>()?;

        Ok(chunks.into_iter().flatten().collect())
    }
}

/// SplitMix64 step over `seed ^ chunk`, to decorrelate neighbouring chunk seeds.
fn chunk_seed(seed: u64, chunk: usize) -> u64 {
    let mut z = seed ^ (chunk as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Descriptive statistics of a Monte Carlo cloud, for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MonteCarloSummary {
    pub trials: usize,
    pub mean_return: f64,
    pub mean_volatility: f64,
    pub min_volatility: f64,
    pub max_volatility: f64,
    pub min_return: f64,
    pub max_return: f64,
}

impl MonteCarloSummary {
    pub fn from_samples(samples: &[MonteCarloSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let (min_volatility, max_volatility) = extent(samples.iter().map(|s| s.volatility));
        let (min_return, max_return) = extent(samples.iter().map(|s| s.expected_return));
        Some(Self {
            trials: samples.len(),
            mean_return: samples.iter().map(|s| s.expected_return).sum::<f64>() / n,
            mean_volatility: samples.iter().map(|s| s.volatility).sum::<f64>() / n,
            min_volatility,
            max_volatility,
            min_return,
            max_return,
        })
    }
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}
