use crate::analysis::{BatchAnalysis, OptimizationReport};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Full run output written by `--json`.
#[derive(Serialize)]
pub struct RunReport<'a> {
    pub screened: &'a [String],
    pub batch: &'a BatchAnalysis,
    pub optimization: &'a OptimizationReport,
}

pub fn write_json(path: &Path, report: &RunReport<'_>) -> Result<()> {
    let writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    info!("Wrote report to {}", path.display());
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Pretty-prints the latest indicator values per symbol.
pub fn print_indicators(batch: &BatchAnalysis) {
    println!("\n╔══════════════════════════════════════════════════════════════════════╗");
    println!("║                       Technical Indicators                           ║");
    println!("╠══════════════════════════════════════════════════════════════════════╣");
    println!("║  Symbol     Close    SMA20    SMA50     RSI      MACD    Signal      ║");
    println!("╠══════════════════════════════════════════════════════════════════════╣");

    for a in &batch.analyses {
        let close = a.prices.last().map(|p| p.close);
        println!(
            "║  {:<6} {:>9} {:>8} {:>8} {:>7} {:>9} {:>9}      ║",
            a.symbol,
            fmt_opt(close),
            fmt_opt(a.latest.sma_short),
            fmt_opt(a.latest.sma_long),
            fmt_opt(a.latest.rsi),
            fmt_opt(a.latest.macd),
            fmt_opt(a.latest.macd_signal),
        );
    }

    if !batch.failures.is_empty() {
        println!("╠══════════════════════════════════════════════════════════════════════╣");
        for f in &batch.failures {
            println!("║  {:<6} omitted: {:<52}  ║", f.symbol, f.reason);
        }
    }
    println!("╚══════════════════════════════════════════════════════════════════════╝");
}

/// Pretty-prints the max-Sharpe allocation and the risk cloud summary.
pub fn print_optimization(report: &OptimizationReport) {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║               Max-Sharpe Portfolio Allocation              ║");
    println!("╠════════════════════════════════════════════════════════════╣");

    match &report.max_sharpe {
        Some(best) => {
            println!(
                "║  Expected Annual Return : {:>+7.2}%                        ║",
                best.expected_return * 100.0
            );
            println!(
                "║  Expected Annual Vol    : {:>7.2}%                        ║",
                best.risk * 100.0
            );
            println!(
                "║  Sharpe Ratio           : {:>7.2}                         ║",
                best.sharpe_ratio
            );
            println!("╠════════════════════════════════════════════════════════════╣");

            let mut sorted = report.allocation.clone();
            sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (sym, w) in &sorted {
                println!("║  {:<6} {:>7.2}%                                           ║", sym, w * 100.0);
            }
        }
        None => {
            println!("║  No assets available for optimization.                     ║");
        }
    }

    if let Some(summary) = &report.monte_carlo_summary {
        println!("╠════════════════════════════════════════════════════════════╣");
        println!(
            "║  Monte Carlo ({:>7} trials)                                ║",
            summary.trials
        );
        println!(
            "║    Return  min {:>+7.2}%  mean {:>+7.2}%  max {:>+7.2}%     ║",
            summary.min_return * 100.0,
            summary.mean_return * 100.0,
            summary.max_return * 100.0
        );
        println!(
            "║    Vol     min {:>7.2}%  mean {:>7.2}%  max {:>7.2}%     ║",
            summary.min_volatility * 100.0,
            summary.mean_volatility * 100.0,
            summary.max_volatility * 100.0
        );
    }

    if !report.excluded.is_empty() {
        println!("╠════════════════════════════════════════════════════════════╣");
        for f in &report.excluded {
            println!("║  {:<6} excluded: {:<40}║", f.symbol, f.reason);
        }
    }

    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("⚠  Educational use only. Not financial advice.");
}
