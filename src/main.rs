//! Stockcast - cached stock quotes next to LSTM/transformer predictions
//!
//! # Usage
//! ```sh
//! MODE=mock cargo run -- weekly AAPL MSFT
//! MODE=live ALPHAVANTAGE_API_KEY=... cargo run -- retrain AAPL
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use stockcast::application::charts::{HourlyChart, Outlook, WeeklyChart};
use stockcast::application::predictions::ModelReport;
use stockcast::application::system::Application;
use stockcast::config::{Config, LogFormat};
use stockcast::domain::market::quotes::format_timestamp;
use stockcast::domain::market::MarketCalendar;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily closes against predicted daily averages
    Weekly {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Last trading day's session closes against hourly predictions
    Hourly { symbol: String },
    /// Predictions for the next trading day
    Outlook { symbol: String },
    /// Metrics of the latest training run
    Metrics { symbol: String },
    /// Run the predictor and merge its output
    Retrain { symbol: String },
    /// Last and next trading day
    Calendar {
        /// Reference instant (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
}

fn init_logging(format: LogFormat) {
    let filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).pretty())
            .init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .init(),
    }
}

fn cell(value: Option<&f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn print_weekly(chart: &WeeklyChart) {
    println!(
        "\n{}{}",
        chart.symbol,
        if chart.degraded { " (stale)" } else { "" }
    );
    println!("{:<12} {:>10} {:>10}", "date", "actual", "predicted");
    for (date, actual, predicted) in chart.chart.rows() {
        println!("{:<12} {:>10} {:>10}", date, cell(actual), cell(predicted));
    }
}

fn print_hourly(chart: &HourlyChart) {
    println!(
        "\n{} on {}{}",
        chart.symbol,
        chart.day,
        if chart.degraded { " (stale)" } else { "" }
    );
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>12}",
        "time", "actual", "average", "lstm", "transformer"
    );
    for (i, (time, actual, average)) in chart.chart.rows().enumerate() {
        println!(
            "{:<20} {:>10} {:>10} {:>10} {:>12}",
            format_timestamp(time),
            cell(actual),
            cell(average),
            cell(chart.lstm.get(i).and_then(Option::as_ref)),
            cell(chart.transformer.get(i).and_then(Option::as_ref)),
        );
    }
}

fn print_outlook(outlook: &Outlook) {
    println!("\n{} outlook for {}", outlook.symbol, outlook.day);
    println!(
        "{:<20} {:>10} {:>12} {:>10}",
        "time", "lstm", "transformer", "average"
    );
    for p in &outlook.predictions {
        println!(
            "{:<20} {:>10.2} {:>12.2} {:>10.2}",
            p.predicted_time, p.lstm_price, p.transformer_price, p.average_price
        );
    }
    println!("daily average: {}", cell(outlook.daily_average.as_ref()));
}

fn print_report(report: &ModelReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("Failed to render metrics")?
    );
    Ok(())
}

fn print_calendar(calendar: MarketCalendar, at: DateTime<Utc>) {
    println!("reference:    {} ({})", at.to_rfc3339(), calendar.timezone());
    println!("local date:   {}", calendar.local_date(at));
    println!("last trading: {}", calendar.last_trading_day(at));
    println!("next trading: {}", calendar.next_trading_day(at));
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_logging(config.observability.log_format);
    info!("Stockcast {} (Mode: {:?})", env!("CARGO_PKG_VERSION"), config.mode);

    if let Commands::Calendar { at } = &cli.command {
        let at = match at {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .with_context(|| format!("Invalid --at instant: {raw}"))?
                .with_timezone(&Utc),
            None => Utc::now(),
        };
        print_calendar(config.calendar(), at);
        return Ok(());
    }

    let app = Application::build(config).await?;

    match cli.command {
        Commands::Weekly { symbols } => {
            let mut failed = 0;
            for (symbol, chart) in app.dashboard.weekly_charts(&symbols).await {
                match chart {
                    Ok(chart) => print_weekly(&chart),
                    Err(e) => {
                        failed += 1;
                        error!("{}: {}", symbol, e);
                    }
                }
            }
            if failed == symbols.len() {
                anyhow::bail!("No data available for any requested symbol");
            }
        }
        Commands::Hourly { symbol } => print_hourly(&app.dashboard.hourly_chart(&symbol).await?),
        Commands::Outlook { symbol } => print_outlook(&app.dashboard.outlook(&symbol).await?),
        Commands::Metrics { symbol } => {
            print_report(&app.predictions.model_report(&symbol).await?)?
        }
        Commands::Retrain { symbol } => {
            let outcome = app.retrain.retrain(&symbol).await?;
            println!(
                "{}: {} predictions stored ({} replaced, {} appended)",
                outcome.document.symbol,
                outcome.document.predictions.len(),
                outcome.stats.replaced,
                outcome.stats.appended
            );
        }
        Commands::Calendar { .. } => {}
    }

    Ok(())
}
