use crate::error::AnalyticsResult;
use crate::portfolio::{PortfolioMetrics, WeightVector};
use crate::returns::ReturnMatrix;
use rand::Rng;
use serde::Serialize;

/// One sampled portfolio on the risk/return plane.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrontierPoint {
    pub risk: f64,
    #[serde(rename = "return")]
    pub expected_return: f64,
    pub sharpe_ratio: f64,
    pub weights: WeightVector,
}

impl FrontierPoint {
    fn from_metrics(weights: WeightVector, metrics: PortfolioMetrics) -> Self {
        Self {
            risk: metrics.annual_volatility,
            expected_return: metrics.annual_return,
            sharpe_ratio: metrics.sharpe_ratio,
            weights,
        }
    }
}

/// Approximates the efficient frontier with `samples` random portfolios.
///
/// Points come back sorted by ascending risk. An asset set with no columns
/// yields an empty frontier.
pub fn sample_frontier(
    returns: &ReturnMatrix,
    samples: usize,
    rng: &mut impl Rng,
) -> AnalyticsResult<Vec<FrontierPoint>> {
    let num_assets = returns.num_assets();
    if num_assets == 0 {
        return Ok(Vec::new());
    }

    let mut points = Vec::with_capacity(samples);
    for _ in 0..samples {
        let weights = WeightVector::random(num_assets, rng);
        let metrics = PortfolioMetrics::evaluate(&weights, returns)?;
        points.push(FrontierPoint::from_metrics(weights, metrics));
    }

    points.sort_by(|a, b| a.risk.total_cmp(&b.risk));
    Ok(points)
}

/// Point with the highest Sharpe ratio; ties keep the earliest point.
pub fn max_sharpe(points: &[FrontierPoint]) -> Option<&FrontierPoint> {
    points.iter().fold(None, |best: Option<&FrontierPoint>, p| match best {
        Some(b) if p.sharpe_ratio > b.sharpe_ratio => Some(p),
        None => Some(p),
        keep => keep,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn mock_returns(num_assets: usize, days: usize) -> ReturnMatrix {
        let mut rng = StdRng::seed_from_u64(11);
        let columns = (0..num_assets)
            .map(|i| {
                let drift = 0.0002 * (i as f64 + 1.0);
                (0..days).map(|_| drift + rng.gen_range(-0.02..0.02)).collect()
            })
            .collect();
        ReturnMatrix::from_columns(columns).unwrap()
    }

    fn point(sharpe_ratio: f64, risk: f64) -> FrontierPoint {
        FrontierPoint {
            risk,
            expected_return: sharpe_ratio * risk,
            sharpe_ratio,
            weights: WeightVector::equal(1),
        }
    }

    #[test]
    fn test_frontier_sorted_by_risk() {
        let returns = mock_returns(4, 252);
        let mut rng = StdRng::seed_from_u64(3);
        let points = sample_frontier(&returns, 50, &mut rng).unwrap();
        assert_eq!(points.len(), 50);
        assert!(points.windows(2).all(|w| w[0].risk <= w[1].risk));
        for p in &points {
            let sum: f64 = p.weights.as_slice().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert_eq!(p.weights.len(), 4);
            assert!(p.risk >= 0.0);
        }
    }

    #[test]
    fn test_frontier_matches_portfolio_metrics() {
        let returns = mock_returns(3, 100);
        let mut rng = StdRng::seed_from_u64(5);
        let points = sample_frontier(&returns, 10, &mut rng).unwrap();
        for p in &points {
            let m = PortfolioMetrics::evaluate(&p.weights, &returns).unwrap();
            assert_eq!(m.annual_volatility, p.risk);
            assert_eq!(m.annual_return, p.expected_return);
            assert_eq!(m.sharpe_ratio, p.sharpe_ratio);
        }
    }

    #[test]
    fn test_empty_asset_set() {
        let returns = ReturnMatrix::from_columns(Vec::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let points = sample_frontier(&returns, 50, &mut rng).unwrap();
        assert!(points.is_empty());
        assert!(max_sharpe(&points).is_none());
    }

    #[test]
    fn test_max_sharpe_picks_highest() {
        let points = vec![point(0.5, 0.1), point(1.5, 0.2), point(1.0, 0.3)];
        assert_eq!(max_sharpe(&points).unwrap().sharpe_ratio, 1.5);
    }

    #[test]
    fn test_max_sharpe_ties_keep_earliest() {
        let points = vec![point(0.2, 0.1), point(1.0, 0.2), point(1.0, 0.3)];
        let best = max_sharpe(&points).unwrap();
        assert_eq!(best.risk, 0.2);
    }

    #[test]
    fn test_max_sharpe_is_a_sampled_point() {
        let returns = mock_returns(3, 252);
        let mut rng = StdRng::seed_from_u64(9);
        let points = sample_frontier(&returns, 50, &mut rng).unwrap();
        let best = max_sharpe(&points).unwrap();
        assert!(points.iter().all(|p| p.sharpe_ratio <= best.sharpe_ratio));
    }
}
