use crate::config::AnalyticsConfig;
use crate::data::StockData;
use crate::error::AnalyticsResult;
use crate::frontier::{max_sharpe, sample_frontier, FrontierPoint};
use crate::indicators::{self, ReturnSeries};
use crate::monte_carlo::{MonteCarloSample, MonteCarloSimulator, MonteCarloSummary};
use crate::returns::{trailing_window, ReturnMatrix};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

// ──────────────────────────────────────────────────────────────────────────────
// Per-Symbol Analysis
// ──────────────────────────────────────────────────────────────────────────────

/// Latest value of each headline indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
}

impl IndicatorSnapshot {
    pub fn compute(prices: &[f64], config: &AnalyticsConfig) -> AnalyticsResult<Self> {
        let macd = indicators::macd(prices, config.macd_fast, config.macd_slow, config.macd_signal)?;
        Ok(Self {
            sma_short: indicators::latest(&indicators::sma(prices, config.sma_short)?),
            sma_long: indicators::latest(&indicators::sma(prices, config.sma_long)?),
            rsi: indicators::latest(&indicators::rsi(prices, config.rsi_period)?),
            macd: macd.latest_macd(),
            macd_signal: macd.latest_signal(),
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub close: f64,
}

/// Everything the presentation layer shows for one symbol.
#[derive(Clone, Debug, Serialize)]
pub struct StockAnalysis {
    pub symbol: String,
    pub latest: IndicatorSnapshot,
    pub daily_returns: ReturnSeries,
    pub prices: Vec<PricePoint>,
}

pub fn analyze_symbol(data: &StockData, config: &AnalyticsConfig) -> AnalyticsResult<StockAnalysis> {
    let closes = data.closes();
    let latest = IndicatorSnapshot::compute(&closes, config)?;
    let daily_returns = indicators::daily_returns(&closes)?;

    Ok(StockAnalysis {
        symbol: data.symbol.clone(),
        latest,
        daily_returns,
        prices: data
            .history
            .iter()
            .map(|c| PricePoint {
                date: c.date,
                close: c.close,
            })
            .collect(),
    })
}

#[derive(Clone, Debug, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchAnalysis {
    pub analyses: Vec<StockAnalysis>,
    pub failures: Vec<SymbolFailure>,
}

/// Analyzes each symbol independently; a failing symbol is logged, recorded
/// and left out, never aborting the rest of the batch.
pub fn analyze_batch(datasets: &[StockData], config: &AnalyticsConfig) -> BatchAnalysis {
    let mut batch = BatchAnalysis::default();
    for data in datasets {
        match analyze_symbol(data, config) {
            Ok(analysis) => {
                debug!("{}: {:?}", data.symbol, analysis.latest);
                batch.analyses.push(analysis);
            }
            Err(e) => {
                warn!("Skipping {}: {}", data.symbol, e);
                batch.failures.push(SymbolFailure {
                    symbol: data.symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    batch
}

// ──────────────────────────────────────────────────────────────────────────────
// Optimization
// ──────────────────────────────────────────────────────────────────────────────

/// Optimization output: frontier, max-Sharpe allocation and the raw risk cloud.
#[derive(Clone, Debug, Serialize)]
pub struct OptimizationReport {
    /// Asset order shared by every weight vector in the report.
    pub symbols: Vec<String>,
    pub frontier: Vec<FrontierPoint>,
    pub max_sharpe: Option<FrontierPoint>,
    /// (symbol, weight) of the max-Sharpe point.
    pub allocation: Vec<(String, f64)>,
    pub monte_carlo: Vec<MonteCarloSample>,
    pub monte_carlo_summary: Option<MonteCarloSummary>,
    pub excluded: Vec<SymbolFailure>,
}

/// Aligns every analysis to the trailing return window and builds the
/// matrix; symbols with too little history are excluded and reported.
///
/// Index 0 of a daily return series has no prior close, so only the
/// returns from index 1 on count towards the window: `window` returns need
/// `window + 1` closes.
pub fn aligned_returns(
    analyses: &[StockAnalysis],
    window: usize,
) -> AnalyticsResult<(Vec<String>, ReturnMatrix, Vec<SymbolFailure>)> {
    let mut symbols = Vec::with_capacity(analyses.len());
    let mut columns = Vec::with_capacity(analyses.len());
    let mut excluded = Vec::new();

    for a in analyses {
        let observed = a.daily_returns.get(1..).unwrap_or_default();
        match trailing_window(observed, window) {
            Ok(slice) => {
                symbols.push(a.symbol.clone());
                columns.push(slice.to_vec());
            }
            Err(e) => {
                warn!("Excluding {} from optimization: {}", a.symbol, e);
                excluded.push(SymbolFailure {
                    symbol: a.symbol.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok((symbols, ReturnMatrix::from_columns(columns)?, excluded))
}

/// Full optimization over the given analyses.
pub fn optimize(
    analyses: &[StockAnalysis],
    config: &AnalyticsConfig,
    rng: &mut impl Rng,
) -> Result<OptimizationReport> {
    let (symbols, returns, excluded) = aligned_returns(analyses, config.return_window)?;
    info!(
        "Optimizing {} assets over {} days ({} frontier samples, {} simulations)",
        symbols.len(),
        returns.num_days(),
        config.frontier_samples,
        config.simulations
    );

    let frontier = sample_frontier(&returns, config.frontier_samples, rng)?;
    let best = max_sharpe(&frontier).cloned();
    if best.is_none() {
        warn!("No frontier points; no max-Sharpe allocation available");
    }

    let allocation: Vec<(String, f64)> = best
        .as_ref()
        .map(|p| {
            symbols
                .iter()
                .cloned()
                .zip(p.weights.as_slice().iter().copied())
                .collect()
        })
        .unwrap_or_default();

    let seed = config.seed.unwrap_or_else(|| rng.r#gen());
    let simulator = MonteCarloSimulator::new(&returns)?;
    let monte_carlo = simulator.run_parallel(config.simulations, seed)?;
    let monte_carlo_summary = MonteCarloSummary::from_samples(&monte_carlo);

    Ok(OptimizationReport {
        symbols,
        frontier,
        max_sharpe: best,
        allocation,
        monte_carlo,
        monte_carlo_summary,
        excluded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn small_config() -> AnalyticsConfig {
        AnalyticsConfig {
            return_window: 100,
            frontier_samples: 20,
            simulations: 500,
            seed: Some(1),
            ..AnalyticsConfig::default()
        }
    }

    #[test]
    fn test_analyze_symbol_latest_values() {
        let data = StockData::new_mock_seeded("AAA", 260, 1);
        let cfg = AnalyticsConfig::default();
        let analysis = analyze_symbol(&data, &cfg).unwrap();
        let closes = data.closes();

        assert_eq!(analysis.daily_returns.len(), closes.len());
        assert_eq!(analysis.prices.len(), closes.len());
        let sma20 = closes[closes.len() - 20..].iter().sum::<f64>() / 20.0;
        assert!((analysis.latest.sma_short.unwrap() - sma20).abs() < 1e-9);
        assert!(analysis.latest.sma_long.is_some());
        assert!(analysis.latest.macd.is_some());
        assert!(analysis.latest.macd_signal.is_some());
        let rsi = analysis.latest.rsi.unwrap();
        assert!((0.0..=100.0).contains(&rsi));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let good = StockData::new_mock_seeded("GOOD", 120, 2);
        let short = StockData::new_mock_seeded("SHORT", 10, 3);
        let mut zero = StockData::new_mock_seeded("ZERO", 120, 4);
        zero.history[60].close = 0.0;

        let batch = analyze_batch(&[good, short, zero], &AnalyticsConfig::default());
        assert_eq!(batch.analyses.len(), 1);
        assert_eq!(batch.analyses[0].symbol, "GOOD");
        let failed: Vec<&str> = batch.failures.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(failed, vec!["SHORT", "ZERO"]);
    }

    #[test]
    fn test_optimize_end_to_end() {
        let cfg = small_config();
        let datasets: Vec<StockData> = (0..3)
            .map(|i| StockData::new_mock_seeded(&format!("S{}", i), 150, 10 + i))
            .chain(std::iter::once(StockData::new_mock_seeded("TINY", 60, 99)))
            .collect();
        let batch = analyze_batch(&datasets, &cfg);
        assert_eq!(batch.analyses.len(), 4);

        let mut rng = StdRng::seed_from_u64(5);
        let report = optimize(&batch.analyses, &cfg, &mut rng).unwrap();

        assert_eq!(report.symbols, vec!["S0", "S1", "S2"]);
        assert_eq!(report.excluded.len(), 1);
        assert_eq!(report.excluded[0].symbol, "TINY");
        assert_eq!(report.frontier.len(), 20);
        assert_eq!(report.monte_carlo.len(), 500);

        let best = report.max_sharpe.as_ref().unwrap();
        assert_eq!(report.allocation.len(), 3);
        let total: f64 = report.allocation.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(report.frontier.iter().all(|p| p.sharpe_ratio <= best.sharpe_ratio));
    }

    #[test]
    fn test_optimize_with_no_assets() {
        let mut rng = StdRng::seed_from_u64(0);
        let report = optimize(&[], &small_config(), &mut rng).unwrap();
        assert!(report.frontier.is_empty());
        assert!(report.max_sharpe.is_none());
        assert!(report.allocation.is_empty());
        assert!(report.monte_carlo.is_empty());
        assert!(report.monte_carlo_summary.is_none());
    }

    #[test]
    fn test_window_needs_one_more_close_than_returns() {
        let cfg = AnalyticsConfig::default();
        let datasets = vec![
            StockData::new_mock_seeded("B251", 251, 1),
            StockData::new_mock_seeded("B252", 252, 2),
            StockData::new_mock_seeded("B253", 253, 3),
        ];
        let batch = analyze_batch(&datasets, &cfg);
        assert_eq!(batch.analyses.len(), 3);

        let (symbols, returns, excluded) = aligned_returns(&batch.analyses, cfg.return_window).unwrap();
        assert_eq!(symbols, vec!["B253"]);
        assert_eq!(returns.num_days(), 252);
        let skipped: Vec<&str> = excluded.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(skipped, vec!["B251", "B252"]);

        // The first row is the return from close 0 to close 1, not the placeholder.
        let closes = datasets[2].closes();
        let first = returns.day(0).next().unwrap();
        assert!((first - (closes[1] - closes[0]) / closes[0]).abs() < 1e-15);
        assert_ne!(first, 0.0);
    }

    #[test]
    fn test_window_plus_one_closes_is_optimized() {
        let cfg = AnalyticsConfig::default();
        let datasets: Vec<StockData> = (0..2)
            .map(|i| StockData::new_mock_seeded(&format!("S{}", i), cfg.return_window + 1, 20 + i))
            .collect();
        let batch = analyze_batch(&datasets, &cfg);
        let mut rng = StdRng::seed_from_u64(8);
        let report = optimize(&batch.analyses, &AnalyticsConfig { simulations: 100, ..cfg }, &mut rng).unwrap();
        assert!(report.excluded.is_empty());
        assert!(report.max_sharpe.is_some());
    }

    #[test]
    fn test_report_serializes() {
        let cfg = small_config();
        let datasets = vec![
            StockData::new_mock_seeded("A", 150, 1),
            StockData::new_mock_seeded("B", 150, 2),
        ];
        let batch = analyze_batch(&datasets, &cfg);
        let mut rng = StdRng::seed_from_u64(3);
        let report = optimize(&batch.analyses, &cfg, &mut rng).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["max_sharpe"]["return"].is_number());
        assert_eq!(json["monte_carlo"].as_array().unwrap().len(), 500);
    }
}
