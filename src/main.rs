use clap::Parser;
use quantscreen::analysis::{analyze_batch, optimize};
use quantscreen::config::{self, AnalyticsConfig, HISTORY_RANGE, PER_SECTOR, UNIVERSE};
use quantscreen::data::{self, StockData};
use quantscreen::report::{self, RunReport};
use quantscreen::screener::{screen, select_diversified, ScreeningCriteria, StockProfile};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "QuantScreen: fundamental screening, technical indicators and portfolio optimization",
    after_help = "EXAMPLES:
    # Screen the built-in universe with fundamentals from a file
    cargo run --release -- --fundamentals fundamentals.json

    # Optimize a fixed set of symbols, two per sector, 50k simulations
    cargo run --release -- --symbols AAPL,MSFT,XOM,JPM --per-sector 2 --simulations 50000

    # Offline run on synthetic prices
    cargo run --release -- --mock --seed 7 --json report.json"
)]
struct Args {
    /// Comma-separated symbols to consider (default: built-in universe)
    #[arg(long)]
    symbols: Option<String>,

    /// JSON file with per-symbol sector and fundamentals; enables fundamental screening
    #[arg(long)]
    fundamentals: Option<PathBuf>,

    /// History range requested from the data provider
    #[arg(long, default_value = HISTORY_RANGE)]
    range: String,

    /// Maximum screened stocks kept per sector
    #[arg(long, default_value_t = PER_SECTOR)]
    per_sector: usize,

    /// Random portfolios scored for the efficient frontier
    #[arg(long)]
    frontier_samples: Option<usize>,

    /// Monte Carlo trials
    #[arg(long)]
    simulations: Option<usize>,

    /// Trailing window of daily returns used for optimization
    #[arg(long)]
    window: Option<usize>,

    /// Seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Use synthetic price history instead of fetching
    #[arg(long)]
    mock: bool,

    /// Write the full report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

fn requested_symbols(args: &Args) -> Vec<String> {
    match &args.symbols {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        None => UNIVERSE.iter().map(|(s, _)| s.to_string()).collect(),
    }
}

/// Profiles for the requested symbols, plus the criteria to screen them with.
fn load_profiles(args: &Args, symbols: &[String]) -> anyhow::Result<(Vec<StockProfile>, ScreeningCriteria)> {
    if let Some(path) = &args.fundamentals {
        let profiles = data::load_fundamentals(path)?
            .into_iter()
            .filter(|p| symbols.iter().any(|s| s.eq_ignore_ascii_case(&p.symbol)))
            .collect();
        return Ok((profiles, ScreeningCriteria::default()));
    }

    warn!("No --fundamentals file given; fundamental thresholds disabled");
    let profiles = symbols
        .iter()
        .filter_map(|s| match config::universe_sector(s) {
            Some(sector) => Some(StockProfile {
                symbol: s.clone(),
                sector,
                fundamentals: Default::default(),
            }),
            None => {
                warn!("{} is not in the universe and has no fundamentals; skipping", s);
                None
            }
        })
        .collect();
    Ok((profiles, ScreeningCriteria::permissive()))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut cfg = AnalyticsConfig::from_env();
    if let Some(v) = args.frontier_samples {
        cfg.frontier_samples = v;
    }
    if let Some(v) = args.simulations {
        cfg.simulations = v;
    }
    if let Some(v) = args.window {
        cfg.return_window = v;
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }

    let symbols = requested_symbols(&args);
    let (profiles, criteria) = load_profiles(&args, &symbols)?;
    let passed = screen(&criteria, &profiles);
    let selected = select_diversified(&passed, args.per_sector);
    let selected_symbols: Vec<String> = selected.iter().map(|p| p.symbol.to_uppercase()).collect();
    info!(
        "Screened {} profiles: {} passed, {} selected across sectors: {:?}",
        profiles.len(),
        passed.len(),
        selected.len(),
        selected_symbols
    );

    let datasets: Vec<StockData> = if args.mock {
        selected_symbols
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let seed = cfg.seed.unwrap_or(0).wrapping_add(i as u64);
                StockData::new_mock_seeded(s, cfg.return_window.max(cfg.min_history()) + 1, seed)
            })
            .collect()
    } else {
        data::fetch_universe(&selected_symbols, &args.range)
            .await
            .into_iter()
            .filter_map(|(_, result)| result.ok())
            .collect()
    };

    let batch = analyze_batch(&datasets, &cfg);
    report::print_indicators(&batch);

    let mut rng = rand::thread_rng();
    let optimization = optimize(&batch.analyses, &cfg, &mut rng)?;
    report::print_optimization(&optimization);

    if let Some(path) = &args.json {
        report::write_json(
            path,
            &RunReport {
                screened: &selected_symbols,
                batch: &batch,
                optimization: &optimization,
            },
        )?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quantscreen=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    config::init_cpu_parallelism();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("Run failed: {:#}", e);
        std::process::exit(1);
    }
}
