use crate::error::{AnalyticsError, AnalyticsResult};
use crate::returns::ReturnMatrix;
use serde::Serialize;

/// Arithmetic mean of each asset's return column.
pub fn mean_returns(returns: &ReturnMatrix) -> Vec<f64> {
    let n = returns.num_days() as f64;
    returns
        .columns()
        .iter()
        .map(|c| c.iter().sum::<f64>() / n)
        .collect()
}

/// Square, symmetric sample covariance matrix of asset returns.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CovarianceMatrix {
    values: Vec<Vec<f64>>,
}

impl CovarianceMatrix {
    /// Sample covariance with the Bessel-corrected `N - 1` denominator.
    ///
    /// Only the upper triangle is accumulated; the lower one is mirrored.
    pub fn estimate(returns: &ReturnMatrix) -> AnalyticsResult<Self> {
        if returns.num_assets() == 0 {
            return Err(AnalyticsError::insufficient(1, 0));
        }
        let num_days = returns.num_days();
        if num_days < 2 {
            return Err(AnalyticsError::insufficient(2, num_days));
        }

        let means = mean_returns(returns);
        let n = returns.num_assets();
        let denom = num_days as f64 - 1.0;

        let mut values = vec![vec![0.0; n]; n];
        for i in 0..n {
            let ci = returns.column(i);
            for j in i..n {
                let cj = returns.column(j);
                let sum: f64 = ci
                    .iter()
                    .zip(cj.iter())
                    .map(|(ri, rj)| (ri - means[i]) * (rj - means[j]))
                    .sum();
                let covariance = sum / denom;
                values[i][j] = covariance;
                values[j][i] = covariance;
            }
        }

        Ok(Self { values })
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    /// Full quadratic form `wᵗ · Σ · w` over all K² terms.
    pub fn quadratic_form(&self, weights: &[f64]) -> AnalyticsResult<f64> {
        if weights.len() != self.dim() {
            return Err(AnalyticsError::DimensionMismatch {
                expected: self.dim(),
                found: weights.len(),
            });
        }
        Ok(self
            .values
            .iter()
            .zip(weights.iter())
            .map(|(row, wi)| wi * row.iter().zip(weights.iter()).map(|(c, wj)| c * wj).sum::<f64>())
            .sum())
    }
}
