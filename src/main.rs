use anyhow::{bail, Context};
use clap::Parser;
use kline_signals::services::signals::Indicator;
use kline_signals::services::IndicatorKind;
use kline_signals::types::{parse_timestamp, Period};
use kline_signals::{analyze_batch, AnalysisContext, AppError, CandleSeries, Config, StockInput};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Compute indicators and trading signals over vendor kline files.
#[derive(Parser)]
#[command(name = "kline-signals", version, about)]
struct Cli {
    /// Candle period as a vendor klt code (5, 15, 30, 60, 101) or text (5m, day)
    #[arg(long, default_value = "101")]
    period: String,

    /// Score signals against later session closes
    #[arg(long, default_value_t = false)]
    backtest: bool,

    /// Reference time for the signal window ("YYYY-MM-DD HH:MM")
    #[arg(long)]
    now: Option<String>,

    /// Also emit eligible candles without a suggestion
    #[arg(long, default_value_t = false)]
    all: bool,

    /// Print only this indicator's rows (rsi, macd, ma, volume_ma, sar, dmi, cyq)
    #[arg(long)]
    indicator: Option<String>,

    /// Write JSON to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON files of the form {code, marketId, decimalPlaces, priorClose, klines}
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn load_series(path: &PathBuf) -> anyhow::Result<CandleSeries> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let input: StockInput = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid kline JSON in {}", path.display()))?;
    Ok(input.into_series())
}

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kline_signals=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env();
    config.validate()?;

    let period = Period::from_str(&cli.period)
        .ok_or_else(|| AppError::UnknownPeriod(cli.period.clone()))?;
    let now = match cli.now.as_deref() {
        Some(raw) => match parse_timestamp(raw) {
            Some(ts) => Some(ts),
            None => bail!("Invalid --now timestamp: {}", raw),
        },
        None => None,
    };

    let series = cli
        .inputs
        .iter()
        .map(load_series)
        .collect::<anyhow::Result<Vec<_>>>()?;
    info!("Loaded {} series, period {}", series.len(), period);

    let json = match cli.indicator.as_deref() {
        Some(id) => {
            let kind = IndicatorKind::from_str(id)?;
            let indicator = kind.build(&config.indicators);
            let rows: Vec<serde_json::Value> = series
                .iter()
                .map(|s| {
                    if s.len() < indicator.min_periods() {
                        warn!(
                            "{}: {} needs {} candles, got {}",
                            s.info.code,
                            indicator.name(),
                            indicator.min_periods(),
                            s.len()
                        );
                    }
                    let output = indicator.compute(&s.candles);
                    serde_json::json!({
                        "code": s.info.code,
                        "indicator": kind.id(),
                        "rows": output.to_wire(s.info.decimal_places),
                    })
                })
                .collect();
            serde_json::to_string_pretty(&rows)?
        }
        None => {
            let ctx = AnalysisContext {
                period,
                backtest: cli.backtest,
                now,
                include_neutral: cli.all,
            };
            let reports = analyze_batch(&series, &ctx, &config);
            serde_json::to_string_pretty(&reports)?
        }
    };

    match cli.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Cannot write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
