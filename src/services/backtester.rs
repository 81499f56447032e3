//! Backtest Evaluator
//!
//! Scores a signal against later session-close prices:
//! - today: the close of the session the signal fired in
//! - next day: the close of the following session
//!
//! Intraday sessions end at a per-market close hour in Beijing time. US
//! sessions close after midnight and move by an hour with US daylight
//! saving time. Missing forward candles leave the matching field empty.

use crate::types::{Candle, Market, Period};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Forward returns of one signal, in percent of the close price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today_profit_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_day_profit_pct: Option<f64>,
}

impl BacktestResult {
    pub fn is_empty(&self) -> bool {
        self.today_profit_pct.is_none() && self.next_day_profit_pct.is_none()
    }
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `(close - entry) / close * 100`, rounded to 2 places. `None` for a zero
/// or non-finite result.
pub fn profit_pct(entry_price: f64, close: f64) -> Option<f64> {
    if close == 0.0 {
        return None;
    }
    let pct = round2((close - entry_price) / close * 100.0);
    pct.is_finite().then_some(pct)
}

/// Whether US Eastern daylight saving time is in effect on `date`: from the
/// second Sunday of March up to the first Sunday of November.
pub fn is_us_dst(date: NaiveDate) -> bool {
    let year = date.year();
    let start = NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2);
    let end = NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1);
    match (start, end) {
        (Some(start), Some(end)) => date >= start && date < end,
        _ => false,
    }
}

/// Beijing-time close of the session containing `ts`.
pub fn session_close(market: Market, ts: NaiveDateTime) -> Option<NaiveDateTime> {
    match market {
        Market::A => ts.date().and_hms_opt(15, 0, 0),
        Market::Hk => ts.date().and_hms_opt(16, 0, 0),
        Market::Us => {
            // A US session opens in the Beijing evening and closes the next
            // morning; shifting back 12h lands on the US trading date.
            let trading_date = (ts - Duration::hours(12)).date();
            let hour = if is_us_dst(trading_date) { 4 } else { 5 };
            let close_time = NaiveTime::from_hms_opt(hour, 0, 0)?;
            Some(trading_date.succ_opt()?.and_time(close_time))
        }
    }
}

/// Index of the closing candle of the session that contains `candles[from]`.
///
/// That is the candle stamped exactly at the close, or else the session's
/// last candle when later candles prove the session has ended.
fn locate_session_close(candles: &[Candle], from: usize, market: Market) -> Option<usize> {
    let start = candles.get(from)?.timestamp()?;
    let close = session_close(market, start)?;

    let mut last_in_session = None;
    for (j, candle) in candles.iter().enumerate().skip(from) {
        let Some(ts) = candle.timestamp() else {
            continue;
        };
        if ts == close {
            return Some(j);
        }
        if ts > close {
            return last_in_session;
        }
        last_in_session = Some(j);
    }
    None
}

/// Evaluate the signal at `index` entered at `entry_price`.
///
/// Daily candles use the signal candle and the candle after it. Intraday
/// candles use the session close candles.
pub fn evaluate(
    candles: &[Candle],
    index: usize,
    entry_price: f64,
    market: Market,
    period: Period,
) -> BacktestResult {
    let (today, next_day) = if period.is_intraday() {
        let today = locate_session_close(candles, index, market);
        let next_day = today.and_then(|j| locate_session_close(candles, j + 1, market));
        (today, next_day)
    } else {
        let today = (index < candles.len()).then_some(index);
        let next_day = (index + 1 < candles.len()).then_some(index + 1);
        (today, next_day)
    };

    if today.is_none() {
        debug!("No session close candle after index {}", index);
    } else if next_day.is_none() {
        debug!("No next-session close candle after index {}", index);
    }

    BacktestResult {
        today_profit_pct: today.and_then(|j| profit_pct(entry_price, candles[j].close)),
        next_day_profit_pct: next_day.and_then(|j| profit_pct(entry_price, candles[j].close)),
    }
}
