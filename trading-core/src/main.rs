use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trading_core::{
    backtest::{LoggingObserver, WindowConfig, WindowRange},
    config::Settings,
    service::{BacktestReport, BacktestRequest, BacktestService, OptimizationReport, OptimizeRequest},
    source::{create_source, PriceSourceKind},
};

#[derive(Parser)]
#[command(name = "ma-cross")]
#[command(about = "Moving-average crossover backtester and window optimizer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one short/long window pair
    Backtest {
        #[arg(short, long, default_value = "TSLA")]
        symbol: String,
        #[arg(long, default_value = "2020-01-01")]
        start: NaiveDate,
        #[arg(long, default_value = "2024-12-31")]
        end: NaiveDate,
        /// Defaults to the configured control value
        #[arg(long)]
        short: Option<usize>,
        #[arg(long)]
        long: Option<usize>,
        #[arg(long)]
        capital: Option<f64>,
        /// Act on every raw signal instead of on changes only
        #[arg(long)]
        no_confirmation: bool,
        #[arg(long, value_parser = parse_source_kind)]
        source: Option<PriceSourceKind>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sweep a grid of window pairs and report the most profitable one
    Optimize {
        #[arg(short, long, default_value = "TSLA")]
        symbol: String,
        #[arg(long, default_value = "2020-01-01")]
        start: NaiveDate,
        #[arg(long, default_value = "2024-12-31")]
        end: NaiveDate,
        /// e.g. 5..=50 or 5..=50:5
        #[arg(long)]
        short: Option<WindowRange>,
        #[arg(long)]
        long: Option<WindowRange>,
        #[arg(long)]
        sequential: bool,
        #[arg(long)]
        top: Option<usize>,
        #[arg(long, value_parser = parse_source_kind)]
        source: Option<PriceSourceKind>,
        #[arg(long)]
        json: bool,
    },
}

fn parse_source_kind(s: &str) -> Result<PriceSourceKind, String> {
    match s.to_lowercase().as_str() {
        "synthetic" => Ok(PriceSourceKind::Synthetic),
        "external" | "yahoo" => Ok(PriceSourceKind::External),
        other => Err(format!("unknown price source '{}'", other)),
    }
}

fn build_service(mut settings: Settings, source: Option<PriceSourceKind>) -> BacktestService {
    if let Some(kind) = source {
        settings.source.kind = kind;
    }
    let source = create_source(&settings.source);
    info!("Using {} price source", source.name());
    BacktestService::new(source, settings)
}

fn print_backtest(report: &BacktestReport) {
    println!("\nBacktest Results: {} {} [{} .. {}]", report.symbol, report.windows, report.start, report.end);
    println!("Price Source:    {}", report.source);
    println!("Observations:    {}", report.prices.len());
    println!("Initial Capital: {}", report.summary.initial_capital);
    println!("Final Capital:   {}", report.summary.final_capital);
    println!("Profit:          {} ({}%)", report.summary.profit, report.summary.return_pct);
    println!("Total Trades:    {}", report.metrics.total_trades);
    println!("Win Rate:        {:.2}%", report.metrics.win_rate);
    println!("Max Drawdown:    {:.2}%", report.metrics.max_drawdown);
    println!("Sharpe Ratio:    {:.4}", report.metrics.sharpe_ratio);
    println!("\nTrade History:");
    for trade in &report.trades {
        let when = trade
            .timestamp
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| format!("#{}", trade.index));
        println!("{} {} {:.4} @ {:.2}", when, trade.side, trade.shares, trade.price);
    }
}

fn print_optimization(report: &OptimizationReport) {
    println!("\nOptimization Results: {} [{} .. {}]", report.symbol, report.start, report.end);
    println!("Price Source:    {} ({} observations)", report.source, report.observations);
    println!("Grid:            short {} x long {}", report.short_range, report.long_range);
    println!("Evaluated:       {} pairs in {} ms", report.evaluated, report.elapsed_ms);
    println!(
        "Best:            short={} long={} final capital {}",
        report.best_window.short_window, report.best_window.long_window, report.summary.final_capital
    );
    println!("\nLeaderboard:");
    for (rank, trial) in report.leaderboard.iter().enumerate() {
        println!("{:>3}. {:<14} {:.2}", rank + 1, trial.window.to_string(), trial.final_capital);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::new().context("Failed to load configuration")?;

    match cli.command {
        Commands::Backtest {
            symbol,
            start,
            end,
            short,
            long,
            capital,
            no_confirmation,
            source,
            json,
        } => {
            let service = build_service(settings, source);
            let defaults = service.default_windows();
            let windows = WindowConfig::new(
                short.unwrap_or(defaults.short_window),
                long.unwrap_or(defaults.long_window),
            );

            let report = service
                .run_backtest(BacktestRequest {
                    symbol,
                    start,
                    end,
                    windows: Some(windows),
                    initial_capital: capital,
                    use_confirmation: no_confirmation.then_some(false),
                })
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_backtest(&report);
            }
        }

        Commands::Optimize {
            symbol,
            start,
            end,
            short,
            long,
            sequential,
            top,
            source,
            json,
        } => {
            let progress_every = settings.optimizer.progress_every;
            let service = build_service(settings, source);

            let report = service
                .optimize(
                    OptimizeRequest {
                        symbol,
                        start,
                        end,
                        short_range: short,
                        long_range: long,
                        parallel: sequential.then_some(false),
                        top_n: top,
                    },
                    Arc::new(LoggingObserver::new(progress_every)),
                )
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_optimization(&report);
            }
        }
    }

    Ok(())
}
