use crate::config::TRADING_DAYS;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::returns::ReturnMatrix;
use rand::Rng;
use rand_distr::Open01;
use serde::Serialize;

/// Annualised volatility at or below this is treated as zero risk.
pub const MIN_VOLATILITY: f64 = 1e-8;

// ──────────────────────────────────────────────────────────────────────────────
// Weight Vector
// ──────────────────────────────────────────────────────────────────────────────

/// Non-negative asset weights summing to 1.0, in the caller's asset order.
///
/// The only ways to build one normalise at construction time, so the
/// invariant never needs checking afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    /// Normalises raw non-negative weights by their sum.
    pub fn normalized(raw: Vec<f64>) -> AnalyticsResult<Self> {
        if raw.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalyticsError::degenerate("weights must be finite and non-negative"));
        }
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return Err(AnalyticsError::degenerate("weights must have a positive sum"));
        }
        Ok(Self(raw.into_iter().map(|w| w / sum).collect()))
    }

    /// Draws `n` independent uniform(0,1) values and normalises them.
    ///
    /// `Open01` excludes 0, so the sum is always positive.
    pub fn random(n: usize, rng: &mut impl Rng) -> Self {
        let raw: Vec<f64> = (0..n).map(|_| rng.sample::<f64, _>(Open01)).collect();
        let sum: f64 = raw.iter().sum();
        Self(raw.into_iter().map(|v| v / sum).collect())
    }

    pub fn equal(n: usize) -> Self {
        Self(vec![1.0 / n as f64; n])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Portfolio Metrics
// ──────────────────────────────────────────────────────────────────────────────

/// Annualised return, volatility and Sharpe ratio of a weighted portfolio.
///
/// The risk-free rate is taken as 0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PortfolioMetrics {
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
}

impl PortfolioMetrics {
    /// Scores `weights` against the daily portfolio return series.
    ///
    /// Variance here is the population variance (denominator N), unlike the
    /// Bessel-corrected estimate in `covariance`.
    pub fn evaluate(weights: &WeightVector, returns: &ReturnMatrix) -> AnalyticsResult<Self> {
        if weights.len() != returns.num_assets() {
            return Err(AnalyticsError::DimensionMismatch {
                expected: returns.num_assets(),
                found: weights.len(),
            });
        }
        let num_days = returns.num_days();
        if num_days == 0 {
            return Err(AnalyticsError::insufficient(1, 0));
        }

        let daily: Vec<f64> = (0..num_days)
            .map(|k| returns.day(k).zip(weights.as_slice()).map(|(r, w)| w * r).sum())
            .collect();

        let n = num_days as f64;
        let mean = daily.iter().sum::<f64>() / n;
        let variance = daily.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

        let annual_volatility = (variance * TRADING_DAYS).sqrt();
        let annual_return = mean * TRADING_DAYS;
        // Constant returns leave a rounding residue in the variance.
        let sharpe_ratio = if annual_volatility > MIN_VOLATILITY {
            annual_return / annual_volatility
        } else {
            0.0
        };

        Ok(Self {
            annual_return,
            annual_volatility,
            sharpe_ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_weights_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..8 {
            for _ in 0..100 {
                let w = WeightVector::random(n, &mut rng);
                let sum: f64 = w.as_slice().iter().sum();
                assert_eq!(w.len(), n);
                assert!((sum - 1.0).abs() < 1e-9, "Weights should sum to 1.0, got {}", sum);
                assert!(w.as_slice().iter().all(|&v| v >= 0.0), "Weights should be non-negative");
            }
        }
    }

    #[test]
    fn test_single_asset_weight_is_one() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(WeightVector::random(1, &mut rng).as_slice(), &[1.0]);
    }

    #[test]
    fn test_normalized_rejects_bad_input() {
        assert!(WeightVector::normalized(vec![0.0, 0.0]).is_err());
        assert!(WeightVector::normalized(vec![1.0, -0.5]).is_err());
        assert!(WeightVector::normalized(vec![f64::NAN]).is_err());
        let w = WeightVector::normalized(vec![1.0, 3.0]).unwrap();
        assert_eq!(w.as_slice(), &[0.25, 0.75]);
    }

    #[test]
    fn test_metrics_population_variance() {
        // Single asset, daily returns 0.01 and -0.01: mean 0, population variance 1e-4.
        let returns = ReturnMatrix::from_columns(vec![vec![0.01, -0.01]]).unwrap();
        let m = PortfolioMetrics::evaluate(&WeightVector::equal(1), &returns).unwrap();
        assert!(m.annual_return.abs() < 1e-15);
        assert!((m.annual_volatility - (1e-4 * 252.0_f64).sqrt()).abs() < 1e-12);
        assert!(m.sharpe_ratio.abs() < 1e-12);
    }

    #[test]
    fn test_metrics_weighted_daily_returns() {
        let returns = ReturnMatrix::from_columns(vec![
            vec![0.02, 0.00, 0.01],
            vec![0.00, 0.02, 0.01],
        ])
        .unwrap();
        // Equal weights give a flat 1% per day.
        let m = PortfolioMetrics::evaluate(&WeightVector::equal(2), &returns).unwrap();
        assert!((m.annual_return - 0.01 * 252.0).abs() < 1e-12);
        assert!(m.annual_volatility < 1e-9);
    }

    #[test]
    fn test_zero_volatility_sharpe_is_zero() {
        let returns = ReturnMatrix::from_columns(vec![vec![0.125; 20]]).unwrap();
        let m = PortfolioMetrics::evaluate(&WeightVector::equal(1), &returns).unwrap();
        assert_eq!(m.annual_volatility, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);

        let flat = ReturnMatrix::from_columns(vec![vec![0.0; 20], vec![0.0; 20]]).unwrap();
        let m = PortfolioMetrics::evaluate(&WeightVector::equal(2), &flat).unwrap();
        assert_eq!(m.sharpe_ratio, 0.0);
        assert!(m.sharpe_ratio.is_finite());
    }

    #[test]
    fn test_constant_inexact_returns_sharpe_is_zero() {
        // 0.01 is not exact in binary, so the variance is a tiny positive residue.
        let returns = ReturnMatrix::from_columns(vec![vec![0.01; 252]]).unwrap();
        let m = PortfolioMetrics::evaluate(&WeightVector::equal(1), &returns).unwrap();
        assert!(m.annual_volatility <= MIN_VOLATILITY);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert!((m.annual_return - 0.01 * 252.0).abs() < 1e-9);

        let pair = ReturnMatrix::from_columns(vec![vec![0.01; 252], vec![0.03; 252]]).unwrap();
        let w = WeightVector::normalized(vec![0.3, 0.7]).unwrap();
        assert_eq!(PortfolioMetrics::evaluate(&w, &pair).unwrap().sharpe_ratio, 0.0);
    }

    #[test]
    fn test_metrics_dimension_mismatch() {
        let returns = ReturnMatrix::from_columns(vec![vec![0.01, 0.02]]).unwrap();
        assert!(matches!(
            PortfolioMetrics::evaluate(&WeightVector::equal(2), &returns),
            Err(AnalyticsError::DimensionMismatch { expected: 1, found: 2 })
        ));
    }
}
