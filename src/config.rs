use crate::error::{AppError, Result};
use crate::services::signals::indicators::ma::DEFAULT_MA_PERIODS;
use crate::services::signals::indicators::rsi::DEFAULT_RSI_PERIODS;
use crate::services::signals::indicators::volume_ma::DEFAULT_VOLUME_MA_PERIODS;
use crate::services::signals::indicators::{CyqConfig, RsiVariant};
use crate::types::{ThresholdEntry, ThresholdTable};
use std::env;
use std::path::Path;
use tracing::{info, warn};

/// RSI line the classifier reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsiLine {
    #[default]
    A,
    B,
    C,
}

impl RsiLine {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "a" | "rsi_a" | "0" => Some(Self::A),
            "b" | "rsi_b" | "1" => Some(Self::B),
            "c" | "rsi_c" | "2" => Some(Self::C),
            _ => None,
        }
    }
}

/// Parameters shared by every indicator computation.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub rsi_periods: [usize; 3],
    pub rsi_variant: RsiVariant,
    pub ma_periods: Vec<usize>,
    pub volume_ma_periods: Vec<usize>,
    pub cyq: CyqConfig,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_periods: DEFAULT_RSI_PERIODS,
            rsi_variant: RsiVariant::Accumulated,
            ma_periods: DEFAULT_MA_PERIODS.to_vec(),
            volume_ma_periods: DEFAULT_VOLUME_MA_PERIODS.to_vec(),
            cyq: CyqConfig::default(),
        }
    }
}

/// Signal classification window settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Width of the near-real-time window. `None` uses one candle period.
    pub realtime_minutes: Option<i64>,
    /// Tolerance used for daily candles and backtests.
    pub wide_days: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            realtime_minutes: None,
            wide_days: 3,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub indicators: IndicatorParams,
    pub rsi_line: RsiLine,
    pub window: WindowConfig,
    /// Rows scanned back for MACD trend events.
    pub trend_lookback: usize,
    /// Prior rows checked when classifying an MA55 breakthrough.
    pub ma55_lookback: usize,
    pub thresholds: ThresholdTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indicators: IndicatorParams::default(),
            rsi_line: RsiLine::A,
            window: WindowConfig::default(),
            trend_lookback: 7,
            ma55_lookback: 5,
            thresholds: ThresholdTable::default(),
        }
    }
}

/// Parse `"6,12,24"`.
fn parse_rsi_periods(s: &str) -> Option<[usize; 3]> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<Vec<usize>>>()?;
    match parts.as_slice() {
        [a, b, c] if *a > 0 && *b > 0 && *c > 0 => Some([*a, *b, *c]),
        _ => None,
    }
}

/// Read a threshold override file and apply it on top of the built-in table.
pub fn load_thresholds(path: impl AsRef<Path>) -> Result<ThresholdTable> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let overrides: Vec<ThresholdEntry> = serde_json::from_str(&raw)?;
    let mut table = ThresholdTable::default();
    table.apply(&overrides)?;
    info!(
        "Loaded {} threshold overrides from {}",
        overrides.len(),
        path.display()
    );
    Ok(table)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A threshold file that fails to load is reported and the built-in table
    /// is used instead.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let rsi_periods = env::var("RSI_PERIODS")
            .ok()
            .and_then(|s| parse_rsi_periods(&s))
            .unwrap_or(defaults.indicators.rsi_periods);

        let rsi_line = env::var("SIGNAL_RSI_LINE")
            .ok()
            .and_then(|s| RsiLine::from_str(&s))
            .unwrap_or(defaults.rsi_line);

        let realtime_minutes = env::var("REALTIME_WINDOW_MINUTES")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(|m| m.max(1));

        let wide_days = env::var("WIDE_WINDOW_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.window.wide_days);

        let trend_lookback = env::var("TREND_LOOKBACK")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.trend_lookback);

        let ma55_lookback = env::var("MA55_LOOKBACK")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.ma55_lookback);

        let cyq = CyqConfig {
            factor: env::var("CYQ_FACTOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.indicators.cyq.factor),
            range: env::var("CYQ_RANGE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.indicators.cyq.range),
        };

        let thresholds = match env::var("THRESHOLDS_FILE") {
            Ok(path) => load_thresholds(&path).unwrap_or_else(|e| {
                warn!("Ignoring threshold file {}: {}", path, e);
                ThresholdTable::default()
            }),
            Err(_) => defaults.thresholds,
        };

        Self {
            indicators: IndicatorParams {
                rsi_periods,
                cyq,
                ..defaults.indicators
            },
            rsi_line,
            window: WindowConfig {
                realtime_minutes,
                wide_days,
            },
            trend_lookback,
            ma55_lookback,
            thresholds,
        }
    }

    /// Reject settings the detectors cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.trend_lookback == 0 {
            return Err(AppError::Config("TREND_LOOKBACK must be positive".into()));
        }
        if self.indicators.cyq.factor < 2 {
            return Err(AppError::Config("CYQ_FACTOR must be at least 2".into()));
        }
        if self.indicators.cyq.range == 0 {
            return Err(AppError::Config("CYQ_RANGE must be positive".into()));
        }
        if self.window.wide_days < 0 {
            return Err(AppError::Config("WIDE_WINDOW_DAYS must not be negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Market, Period};

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.indicators.rsi_periods, [6, 12, 24]);
        assert_eq!(config.indicators.ma_periods, vec![5, 10, 20, 55, 233]);
        assert_eq!(config.rsi_line, RsiLine::A);
        assert_eq!(config.trend_lookback, 7);
        assert_eq!(config.ma55_lookback, 5);
        assert_eq!(config.window.wide_days, 3);
        assert!(config.window.realtime_minutes.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_rsi_periods() {
        assert_eq!(parse_rsi_periods("6,12,24"), Some([6, 12, 24]));
        assert_eq!(parse_rsi_periods(" 3, 5 ,8 "), Some([3, 5, 8]));
        assert_eq!(parse_rsi_periods("6,12"), None);
        assert_eq!(parse_rsi_periods("6,x,24"), None);
        assert_eq!(parse_rsi_periods("0,12,24"), None);
    }

    #[test]
    fn test_rsi_line_from_str() {
        assert_eq!(RsiLine::from_str("B"), Some(RsiLine::B));
        assert_eq!(RsiLine::from_str("rsi_c"), Some(RsiLine::C));
        assert_eq!(RsiLine::from_str("d"), None);
    }

    #[test]
    fn test_validate_rejects_zero_lookback() {
        let config = Config {
            trend_lookback: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_load_thresholds_override() {
        let path = env::temp_dir().join(format!("kline-thresholds-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"market":"A","period":"day","mustBuy":10,"buy":25,"sell":70,"mustSell":90}]"#,
        )
        .unwrap();
        let table = load_thresholds(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let day = table.get(Market::A, Period::Day).unwrap();
        assert_eq!(day.buy, 25.0);
        assert_eq!(table.len(), ThresholdTable::default().len());
    }

    #[test]
    fn test_load_thresholds_rejects_unordered() {
        let path = env::temp_dir().join(format!("kline-bad-thresholds-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"market":"HK","period":"5m","mustBuy":30,"buy":20,"sell":70,"mustSell":90}]"#,
        )
        .unwrap();
        let result = load_thresholds(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(AppError::InvalidThresholds(_))));
    }
}
