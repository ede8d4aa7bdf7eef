use crate::screener::Sector;
use rayon::ThreadPoolBuilder;
use std::sync::OnceLock;
use tracing::{info, warn};

static RAYON_INIT: OnceLock<()> = OnceLock::new();

/// Sizes the global rayon pool used by the Monte Carlo simulator.
///
/// `QUANTSCREEN_THREADS` caps the pool; otherwise every logical core is used.
pub fn init_cpu_parallelism() {
    RAYON_INIT.get_or_init(|| {
        let num_threads = simulation_threads(num_cpus::get());
        match ThreadPoolBuilder::new().num_threads(num_threads).build_global() {
            Ok(_) => info!("Monte Carlo pool: {} threads", num_threads),
            Err(e) => warn!("Keeping existing rayon pool for Monte Carlo ({})", e),
        }
    });
}

fn simulation_threads(available: usize) -> usize {
    let available = available.max(1);
    env_usize("QUANTSCREEN_THREADS", 1, available).unwrap_or(available)
}

/// Annual trading days for annualization.
pub const TRADING_DAYS: f64 = 252.0;

pub const SMA_SHORT_PERIOD: usize = 20;
pub const SMA_LONG_PERIOD: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Trailing window of daily returns every optimized asset must cover.
pub const RETURN_WINDOW: usize = 252;
/// Random portfolios scored by the efficient frontier sampler.
pub const FRONTIER_SAMPLES: usize = 50;
/// Trials in the Monte Carlo risk simulation.
pub const MONTE_CARLO_SIMULATIONS: usize = 10_000;
/// Range of daily history requested from the data provider. One calendar
/// year holds about 251 sessions, short of `RETURN_WINDOW + 1` closes.
pub const HISTORY_RANGE: &str = "2y";
/// Default number of screened stocks kept per sector.
pub const PER_SECTOR: usize = 1;

/// Fixed screening universe: (symbol, sector).
pub const UNIVERSE: &[(&str, Sector)] = &[
    ("AAPL", Sector::Technology),
    ("MSFT", Sector::Technology),
    ("NVDA", Sector::Technology),
    ("ORCL", Sector::Technology),
    ("GOOGL", Sector::Communication),
    ("META", Sector::Communication),
    ("VZ", Sector::Communication),
    ("AMZN", Sector::ConsumerDiscretionary),
    ("HD", Sector::ConsumerDiscretionary),
    ("NKE", Sector::ConsumerDiscretionary),
    ("PG", Sector::ConsumerStaples),
    ("KO", Sector::ConsumerStaples),
    ("WMT", Sector::ConsumerStaples),
    ("JPM", Sector::Financials),
    ("BAC", Sector::Financials),
    ("V", Sector::Financials),
    ("JNJ", Sector::HealthCare),
    ("UNH", Sector::HealthCare),
    ("PFE", Sector::HealthCare),
    ("XOM", Sector::Energy),
    ("CVX", Sector::Energy),
    ("CAT", Sector::Industrials),
    ("HON", Sector::Industrials),
    ("UNP", Sector::Industrials),
    ("LIN", Sector::Materials),
    ("NEE", Sector::Utilities),
    ("DUK", Sector::Utilities),
    ("PLD", Sector::RealEstate),
];

/// Sector of a universe symbol, if it is part of the universe.
pub fn universe_sector(symbol: &str) -> Option<Sector> {
    UNIVERSE
        .iter()
        .find(|(s, _)| s.eq_ignore_ascii_case(symbol))
        .map(|(_, sector)| *sector)
}

/// Tunables for one analysis run.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyticsConfig {
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub return_window: usize,
    pub frontier_samples: usize,
    pub simulations: usize,
    /// Fixed seed for the Monte Carlo run; `None` draws one from the caller's RNG.
    pub seed: Option<u64>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            sma_short: SMA_SHORT_PERIOD,
            sma_long: SMA_LONG_PERIOD,
            rsi_period: RSI_PERIOD,
            macd_fast: MACD_FAST,
            macd_slow: MACD_SLOW,
            macd_signal: MACD_SIGNAL,
            return_window: RETURN_WINDOW,
            frontier_samples: FRONTIER_SAMPLES,
            simulations: MONTE_CARLO_SIMULATIONS,
            seed: None,
        }
    }
}

impl AnalyticsConfig {
    /// Defaults with `QUANTSCREEN_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_usize("QUANTSCREEN_FRONTIER_SAMPLES", 1, 100_000) {
            cfg.frontier_samples = v;
        }
        if let Some(v) = env_usize("QUANTSCREEN_MC_SIMULATIONS", 1, 5_000_000) {
            cfg.simulations = v;
        }
        if let Some(v) = env_usize("QUANTSCREEN_RETURN_WINDOW", 2, 5_000) {
            cfg.return_window = v;
        }
        if let Some(v) = std::env::var("QUANTSCREEN_SEED")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            cfg.seed = Some(v);
        }
        cfg
    }

    /// Fewest closes a symbol needs for every latest indicator to be defined.
    pub fn min_history(&self) -> usize {
        self.sma_long
            .max(self.rsi_period + 1)
            .max(self.macd_slow + self.macd_signal - 1)
    }
}

fn env_usize(key: &str, min: usize, max: usize) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(|v| v.clamp(min, max))
}

/// Delay between sequential history fetches, to stay under provider rate limits.
pub fn batch_fetch_delay_ms() -> u64 {
    std::env::var("QUANTSCREEN_BATCH_FETCH_DELAY_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|v| v.clamp(0, 5_000))
        .unwrap_or(350)
}
