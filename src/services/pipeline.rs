//! Per-stock analysis: indicators, signal classification, trend state,
//! MA55 breakthroughs and optional backtests.

use crate::config::Config;
use crate::services::backtester;
use crate::services::normalizer::normalize_series;
use crate::services::signals::indicators::{all_indicators, sma, IndicatorSet};
use crate::services::signals::ma55::MA55_PERIOD;
use crate::services::signals::{
    detect_ma55_breakthrough, Indicator, SignalClassifier, TimeWindow, TrendStateDetector,
};
use crate::types::{CandleSeries, IndicatorRow, Market, MarketInfo, Period, Signal};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Raw vendor payload for one stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInput {
    pub code: String,
    pub market_id: u32,
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    pub prior_close: f64,
    pub klines: Vec<String>,
}

fn default_decimal_places() -> u32 {
    2
}

impl StockInput {
    pub fn into_series(self) -> CandleSeries {
        let info = MarketInfo::new(self.code, self.market_id, self.decimal_places);
        normalize_series(info, &self.klines, self.prior_close)
    }
}

/// What to analyze and how.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisContext {
    pub period: Period,
    pub backtest: bool,
    /// Reference time for the eligibility window. Defaults to the last
    /// candle; a backtest without one replays the whole series.
    pub now: Option<NaiveDateTime>,
    /// Also emit eligible candles that produced no suggestion.
    pub include_neutral: bool,
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self {
            period: Period::Day,
            backtest: false,
            now: None,
            include_neutral: false,
        }
    }
}

/// Analysis output for one stock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReport {
    pub code: String,
    pub market: Market,
    pub period: Period,
    pub candles: usize,
    /// Wire rows per indicator id.
    pub indicators: BTreeMap<String, Vec<IndicatorRow>>,
    /// Indicators with fewer candles than they need; their rows are mostly `"-"`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warming_up: Vec<String>,
    pub signals: Vec<Signal>,
}

fn eligibility_window(series: &CandleSeries, ctx: &AnalysisContext, config: &Config) -> TimeWindow {
    let now = match ctx.now {
        Some(now) => Some(now),
        None if ctx.backtest => None,
        None => series.candles.last().and_then(|c| c.timestamp()),
    };
    match now {
        Some(now) => TimeWindow::for_period(now, ctx.period, ctx.backtest, &config.window),
        None => TimeWindow::unbounded(),
    }
}

/// Analyze one series.
pub fn analyze(series: &CandleSeries, ctx: &AnalysisContext, config: &Config) -> StockReport {
    let market = series.info.try_market().unwrap_or_else(|e| {
        warn!("{} for {}, treating as A-share", e, series.info.code);
        Market::A
    });
    let candles = &series.candles;
    let indicators = IndicatorSet::compute(candles, &config.indicators);
    let warming_up: Vec<String> = all_indicators(&config.indicators)
        .iter()
        .filter(|indicator| candles.len() < indicator.min_periods())
        .map(|indicator| indicator.id().to_string())
        .collect();
    if !warming_up.is_empty() {
        debug!(
            "{}: {} candles, still warming up: {}",
            series.info.code,
            candles.len(),
            warming_up.join(", ")
        );
    }

    let closes = series.closes();
    let rsi = indicators.rsi_line(config.rsi_line);
    let ma55 = indicators
        .ma_line(MA55_PERIOD)
        .unwrap_or_else(|| sma(&closes, MA55_PERIOD));

    let window = eligibility_window(series, ctx, config);
    let classifier = SignalClassifier::new(&config.thresholds);
    let detector = TrendStateDetector::new(config.trend_lookback);

    let signals: Vec<Signal> = classifier
        .scan(candles, &rsi, market, ctx.period, &window, ctx.backtest)
        .into_iter()
        .filter(|hit| hit.suggestion.is_some() || ctx.include_neutral)
        .map(|hit| {
            let candle = &candles[hit.index];
            let backtest = ctx.backtest.then(|| {
                backtester::evaluate(candles, hit.index, candle.close, market, ctx.period)
            });
            let trend_state = detector.detect(&indicators.macd, hit.index);
            debug!(
                "{} {} RSI {:.2} {} {}",
                series.info.code,
                candle.date,
                hit.rsi_value,
                hit.suggestion.map_or("-", |s| s.label()),
                trend_state.map_or("-", |t| t.state.label())
            );
            Signal {
                code: series.info.code.clone(),
                market,
                period: ctx.period,
                timestamp: candle.date.clone(),
                index: hit.index,
                price: candle.close,
                rsi_value: hit.rsi_value,
                suggestion: hit.suggestion,
                trend_state,
                ma55_breakthrough: detect_ma55_breakthrough(
                    &closes,
                    &ma55,
                    hit.index,
                    config.ma55_lookback,
                ),
                backtest_today_profit_pct: backtest.and_then(|b| b.today_profit_pct),
                backtest_next_day_profit_pct: backtest.and_then(|b| b.next_day_profit_pct),
            }
        })
        .collect();

    debug!(
        "{} {}: {} candles, {} signals",
        series.info.code,
        ctx.period,
        candles.len(),
        signals.len()
    );

    StockReport {
        code: series.info.code.clone(),
        market,
        period: ctx.period,
        candles: candles.len(),
        indicators: indicators.to_wire(series.info.decimal_places),
        warming_up,
        signals,
    }
}

/// Analyze many series in parallel. Output order follows input order.
pub fn analyze_batch(series: &[CandleSeries], ctx: &AnalysisContext, config: &Config) -> Vec<StockReport> {
    let reports: Vec<StockReport> = series.par_iter().map(|s| analyze(s, ctx, config)).collect();
    let total: usize = reports.iter().map(|r| r.signals.len()).sum();
    info!("Analyzed {} stocks, {} signals", reports.len(), total);
    reports
}
