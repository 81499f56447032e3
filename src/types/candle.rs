use crate::error::{AppError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Exchange a stock trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    /// Shanghai / Shenzhen A-shares.
    #[serde(rename = "A")]
    A,
    /// Hong Kong.
    #[serde(rename = "HK")]
    Hk,
    /// US equities (quoted in Beijing time by the vendor).
    #[serde(rename = "US")]
    Us,
}

impl Market {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" | "CN" | "SH" | "SZ" => Some(Self::A),
            "HK" => Some(Self::Hk),
            "US" => Some(Self::Us),
            _ => None,
        }
    }

    /// Resolve the vendor market id.
    pub fn from_market_id(id: u32) -> Option<Self> {
        match id {
            0 | 1 => Some(Self::A),
            116 => Some(Self::Hk),
            105 | 106 | 107 => Some(Self::Us),
            _ => None,
        }
    }

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Hk => "HK",
            Self::Us => "US",
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Candle interval (vendor `klt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "60m")]
    Min60,
    #[serde(rename = "day")]
    Day,
}

impl Period {
    /// Parse from a `klt` code or textual form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "5" | "5m" | "m5" => Some(Self::Min5),
            "15" | "15m" | "m15" => Some(Self::Min15),
            "30" | "30m" | "m30" => Some(Self::Min30),
            "60" | "60m" | "m60" | "1h" => Some(Self::Min60),
            "101" | "day" | "d" | "1d" | "daily" => Some(Self::Day),
            _ => None,
        }
    }

    /// Vendor `klt` code.
    pub fn klt(&self) -> u32 {
        match self {
            Self::Min5 => 5,
            Self::Min15 => 15,
            Self::Min30 => 30,
            Self::Min60 => 60,
            Self::Day => 101,
        }
    }

    /// Interval length in minutes. A trading day counts as one calendar day.
    pub fn minutes(&self) -> i64 {
        match self {
            Self::Min5 => 5,
            Self::Min15 => 15,
            Self::Min30 => 30,
            Self::Min60 => 60,
            Self::Day => 24 * 60,
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, Self::Day)
    }

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Min5 => "5m",
            Self::Min15 => "15m",
            Self::Min30 => "30m",
            Self::Min60 => "60m",
            Self::Day => "day",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Vendor metadata attached to a candle series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfo {
    /// Stock code (e.g. "600519", "00700", "AAPL").
    pub code: String,
    /// Vendor market id.
    pub market_id: u32,
    /// Price precision used when formatting output values.
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

fn default_decimal_places() -> u32 {
    2
}

impl MarketInfo {
    pub fn new(code: impl Into<String>, market_id: u32, decimal_places: u32) -> Self {
        Self {
            code: code.into(),
            market_id,
            decimal_places,
        }
    }

    /// Market resolved from the vendor id.
    pub fn try_market(&self) -> Result<Market> {
        Market::from_market_id(self.market_id)
            .ok_or_else(|| AppError::UnknownMarket(self.market_id.to_string()))
    }

    /// Market resolved from the vendor id. Unknown ids fall back to A-shares.
    pub fn market(&self) -> Market {
        self.try_market().unwrap_or(Market::A)
    }
}

/// One OHLCV candle.
///
/// Numeric fields that failed to parse hold `NaN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub index: usize,
    /// Raw vendor date (`YYYY-MM-DD` or `YYYY-MM-DD HH:MM`).
    pub date: String,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub turnover: f64,
    pub amplitude: f64,
    pub change_percent: f64,
    pub change_amount: f64,
    /// Turnover rate in percent.
    pub turnover_rate: f64,
    pub pre_close: f64,
}

impl Candle {
    /// Parsed timestamp. Date-only candles resolve to midnight.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.date)
    }

    /// Mean of open, close, high and low.
    pub fn average_price(&self) -> f64 {
        (self.open + self.close + self.high + self.low) / 4.0
    }
}

/// Parse a vendor timestamp.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// An ordered candle series for one stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleSeries {
    pub info: MarketInfo,
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}
