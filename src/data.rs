use crate::config::batch_fetch_delay_ms;
use crate::screener::StockProfile;
use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::prelude::*;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Cached chart responses younger than this are reused.
const CACHE_TTL_SECS: u64 = 86_400;
const CACHE_DIR: &str = ".cache";
const FETCH_ATTEMPTS: usize = 3;

/// Represents a single daily bar (OHLCV).
#[derive(Clone, Debug, Serialize)]
pub struct Candle {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Holds historical daily bars for a specific symbol, oldest first.
#[derive(Clone, Debug)]
pub struct StockData {
    pub symbol: String,
    pub history: Vec<Candle>,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooChart {
    result: Vec<YahooResult>,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooResult {
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Fetches daily history from Yahoo Finance, going through a 24h JSON cache.
///
/// # Arguments
/// * `symbol` - The stock ticker symbol (e.g., "AAPL").
/// * `range` - The time range to fetch (e.g., "1y", "5y").
pub async fn fetch_range(symbol: &str, range: &str) -> Result<StockData> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(anyhow::anyhow!("empty symbol"));
    }

    let cache_dir = Path::new(CACHE_DIR);
    if !cache_dir.exists() {
        std::fs::create_dir(cache_dir)?;
    }
    let cache_file = cache_dir.join(format!("{}_{}.json", symbol, range));

    let response: YahooChartResponse = if cache_file.exists() {
        let modified = std::fs::metadata(&cache_file)?.modified()?;
        let age = std::time::SystemTime::now().duration_since(modified)?;

        if age.as_secs() < CACHE_TTL_SECS {
            info!("Loading {} from cache...", symbol);
            let reader = std::io::BufReader::new(std::fs::File::open(&cache_file)?);
            serde_json::from_reader(reader)?
        } else {
            info!("Cache expired for {}, fetching...", symbol);
            fetch_from_api(&symbol, range, &cache_file).await?
        }
    } else {
        info!("Cache miss for {}, fetching...", symbol);
        fetch_from_api(&symbol, range, &cache_file).await?
    };

    chart_to_stock_data(&symbol, response)
}

/// Keeps only bars with every field present.
fn chart_to_stock_data(symbol: &str, response: YahooChartResponse) -> Result<StockData> {
    let result = response
        .chart
        .result
        .into_iter()
        .next()
        .ok_or(anyhow::anyhow!("No data found for {}", symbol))?;
    let quotes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or(anyhow::anyhow!("No quote block for {}", symbol))?;

    let mut history = Vec::with_capacity(result.timestamp.len());
    for (i, &timestamp) in result.timestamp.iter().enumerate() {
        let bar = (
            quotes.open.get(i).copied().flatten(),
            quotes.high.get(i).copied().flatten(),
            quotes.low.get(i).copied().flatten(),
            quotes.close.get(i).copied().flatten(),
            quotes.volume.get(i).copied().flatten(),
            Utc.timestamp_opt(timestamp, 0).single(),
        );
        if let (Some(open), Some(high), Some(low), Some(close), Some(volume), Some(date)) = bar {
            history.push(Candle {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }
    }

    Ok(StockData {
        symbol: symbol.to_string(),
        history,
    })
}

async fn fetch_from_api(symbol: &str, range: &str, cache_path: &Path) -> Result<YahooChartResponse> {
    let url = format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?range={}&interval=1d",
        symbol, range
    );

    let client = reqwest::Client::new();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match client.get(&url).header("User-Agent", "Mozilla/5.0").send().await {
            Ok(resp) => match resp.json::<YahooChartResponse>().await {
                Ok(resp_json) => {
                    let writer = std::io::BufWriter::new(std::fs::File::create(cache_path)?);
                    serde_json::to_writer(writer, &resp_json)?;
                    return Ok(resp_json);
                }
                Err(e) => {
                    if attempts >= FETCH_ATTEMPTS {
                        return Err(e.into());
                    }
                    warn!("Failed to parse JSON for {} (attempt {}/{}): {}", symbol, attempts, FETCH_ATTEMPTS, e);
                }
            },
            Err(e) => {
                if attempts >= FETCH_ATTEMPTS {
                    return Err(e.into());
                }
                warn!("Failed to fetch data for {} (attempt {}/{}): {}", symbol, attempts, FETCH_ATTEMPTS, e);
            }
        }

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    }
}

/// Fetches every symbol sequentially, keeping failures per symbol.
pub async fn fetch_universe(symbols: &[String], range: &str) -> Vec<(String, Result<StockData>)> {
    let delay_ms = batch_fetch_delay_ms();
    let mut out = Vec::with_capacity(symbols.len());

    for (idx, symbol) in symbols.iter().enumerate() {
        let result = fetch_range(symbol, range).await;
        if let Err(e) = &result {
            warn!("History fetch failed for {}: {}", symbol, e);
        }
        out.push((symbol.clone(), result));

        if idx + 1 < symbols.len() && delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
    }

    out
}

/// Reads screening profiles from a JSON array of `StockProfile`.
pub fn load_fundamentals(path: &Path) -> Result<Vec<StockProfile>> {
    let reader = std::io::BufReader::new(std::fs::File::open(path)?);
    let profiles: Vec<StockProfile> = serde_json::from_reader(reader)
        .map_err(|e| anyhow::anyhow!("Invalid fundamentals file {}: {}", path.display(), e))?;
    info!("Loaded fundamentals for {} symbols from {}", profiles.len(), path.display());
    Ok(profiles)
}

/// Shape of a synthetic price path: daily log returns are drawn from
/// `N(drift, volatility²)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MockParams {
    pub start_price: f64,
    pub drift: f64,
    pub volatility: f64,
}

impl Default for MockParams {
    fn default() -> Self {
        // Roughly 10% a year at 24% annualized volatility.
        Self {
            start_price: 100.0,
            drift: 0.0004,
            volatility: 0.015,
        }
    }
}

impl StockData {
    /// Closing prices in chronological order.
    pub fn closes(&self) -> Vec<f64> {
        self.history.iter().map(|c| c.close).collect()
    }

    pub fn new_mock_seeded(symbol: &str, days: usize, seed: u64) -> Self {
        Self::new_mock_with_params(symbol, days, seed, MockParams::default())
    }

    /// Seeded geometric random walk of `days` daily bars ending today.
    ///
    /// Prices stay strictly positive, so the series always yields valid returns.
    pub fn new_mock_with_params(symbol: &str, days: usize, seed: u64, params: MockParams) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut history = Vec::with_capacity(days);
        let mut close = params.start_price;
        let mut date = Utc::now() - Duration::days(days as i64);

        for _ in 0..days {
            let shock: f64 = rng.sample(StandardNormal);
            let open = close;
            close = open * (params.drift + params.volatility * shock).exp();
            let wick = params.volatility * 0.5;
            history.push(Candle {
                date,
                open,
                high: open.max(close) * (1.0 + rng.gen_range(0.0..=wick)),
                low: open.min(close) * (1.0 - rng.gen_range(0.0..=wick)),
                close,
                volume: rng.gen_range(1.0e5..5.0e6),
            });
            date += Duration::days(1);
        }

        Self {
            symbol: symbol.to_string(),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mock_seeded_is_reproducible() {
        let a = StockData::new_mock_seeded("TEST", 300, 9);
        let b = StockData::new_mock_seeded("TEST", 300, 9);
        assert_eq!(a.history.len(), 300);
        assert_eq!(a.closes(), b.closes());
        assert!(a.closes().iter().all(|c| *c > 0.0));
    }

    #[test]
    fn test_mock_params_shape_the_path() {
        let flat = MockParams {
            start_price: 50.0,
            drift: 0.001,
            volatility: 0.0,
        };
        let data = StockData::new_mock_with_params("FLAT", 10, 1, flat);
        let closes = data.closes();
        assert!((closes[9] - 50.0 * (0.01_f64).exp()).abs() < 1e-9);
        assert!(data.history.iter().all(|c| c.low <= c.open.min(c.close) && c.high >= c.open.max(c.close)));

        let calm = StockData::new_mock_with_params("CALM", 500, 2, MockParams { volatility: 0.005, ..MockParams::default() });
        let wild = StockData::new_mock_with_params("WILD", 500, 2, MockParams { volatility: 0.04, ..MockParams::default() });
        let spread = |d: &StockData| {
            let r = crate::indicators::daily_returns(&d.closes()).unwrap();
            r.iter().map(|x| x * x).sum::<f64>()
        };
        assert!(spread(&wild) > spread(&calm));
    }

    #[test]
    fn test_chart_to_stock_data_skips_incomplete_bars() {
        let json = r#"{"chart":{"result":[{"timestamp":[1700000000,1700086400,1700172800],
            "indicators":{"quote":[{"open":[1.0,2.0,3.0],"high":[1.5,2.5,3.5],
            "low":[0.5,1.5,2.5],"close":[1.2,null,3.2],"volume":[10.0,20.0,30.0]}]}}]}}"#;
        let response: YahooChartResponse = serde_json::from_str(json).unwrap();
        let data = chart_to_stock_data("abc", response).unwrap();
        assert_eq!(data.symbol, "abc");
        assert_eq!(data.closes(), vec![1.2, 3.2]);
    }

    #[test]
    fn test_chart_without_result_is_error() {
        let response: YahooChartResponse = serde_json::from_str(r#"{"chart":{"result":[]}}"#).unwrap();
        assert!(chart_to_stock_data("X", response).is_err());
    }

    #[test]
    fn test_load_fundamentals() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"symbol":"XOM","sector":"energy","fundamentals":{{"pe_ratio":12.5,"roe":0.19}}}},
               {{"symbol":"NEE","sector":"utilities"}}]"#
        )
        .unwrap();

        let profiles = load_fundamentals(file.path()).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].fundamentals.roe, Some(0.19));
        assert_eq!(profiles[1].fundamentals.pe_ratio, None);
    }

    #[test]
    fn test_load_fundamentals_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_fundamentals(file.path()).is_err());
    }
}
