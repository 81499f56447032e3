//! RSI threshold classification and the eligibility window around "now".

use crate::config::WindowConfig;
use crate::types::{Candle, IndicatorValue, Market, Period, Suggestion, ThresholdTable, Thresholds};
use chrono::{Duration, NaiveDateTime};
use tracing::debug;

/// Classify one RSI value against a threshold quadruple.
///
/// Buy levels are checked first, then sell levels. Sell suggestions are
/// suppressed while backtesting. `NaN` never matches.
pub fn classify(value: f64, thresholds: &Thresholds, backtesting: bool) -> Option<Suggestion> {
    if value <= thresholds.must_buy {
        Some(Suggestion::MustBuy)
    } else if value <= thresholds.buy {
        Some(Suggestion::Buy)
    } else if value >= thresholds.must_sell && !backtesting {
        Some(Suggestion::MustSell)
    } else if value >= thresholds.sell && !backtesting {
        Some(Suggestion::Sell)
    } else {
        None
    }
}

/// Closed time range of candles eligible for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

impl TimeWindow {
    /// Every candle is eligible.
    pub fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Trailing window of `minutes` ending at `now`.
    pub fn realtime(now: NaiveDateTime, minutes: i64) -> Self {
        Self {
            start: Some(now - Duration::minutes(minutes.max(1))),
            end: Some(now),
        }
    }

    /// Trailing window of `days` ending at `now`.
    pub fn widened(now: NaiveDateTime, days: i64) -> Self {
        Self {
            start: Some(now - Duration::days(days.max(0))),
            end: Some(now),
        }
    }

    /// Window for `period`: daily candles and backtests use the widened
    /// tolerance, intraday alerting the narrow one.
    pub fn for_period(
        now: NaiveDateTime,
        period: Period,
        backtesting: bool,
        config: &WindowConfig,
    ) -> Self {
        if backtesting || !period.is_intraday() {
            Self::widened(now, config.wide_days)
        } else {
            let minutes = config.realtime_minutes.unwrap_or_else(|| period.minutes());
            Self::realtime(now, minutes)
        }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start.map_or(true, |start| ts >= start) && self.end.map_or(true, |end| ts <= end)
    }

    /// Candles without a parseable date are only eligible in an unbounded
    /// window.
    pub fn contains_candle(&self, candle: &Candle) -> bool {
        match candle.timestamp() {
            Some(ts) => self.contains(ts),
            None => self.start.is_none() && self.end.is_none(),
        }
    }
}

/// A candle whose RSI reading fell inside the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classified {
    pub index: usize,
    pub rsi_value: f64,
    pub suggestion: Option<Suggestion>,
}

/// Threshold classifier bound to a threshold table.
pub struct SignalClassifier<'a> {
    thresholds: &'a ThresholdTable,
}

impl<'a> SignalClassifier<'a> {
    pub fn new(thresholds: &'a ThresholdTable) -> Self {
        Self { thresholds }
    }

    /// Classify `value` with the `(market, period)` thresholds. Unknown
    /// combinations never produce a suggestion.
    pub fn classify(
        &self,
        market: Market,
        period: Period,
        value: f64,
        backtesting: bool,
    ) -> Option<Suggestion> {
        let thresholds = self.thresholds.get(market, period)?;
        classify(value, thresholds, backtesting)
    }

    /// Classify every defined RSI reading whose candle lies in `window`.
    pub fn scan(
        &self,
        candles: &[Candle],
        rsi: &[IndicatorValue],
        market: Market,
        period: Period,
        window: &TimeWindow,
        backtesting: bool,
    ) -> Vec<Classified> {
        let Some(thresholds) = self.thresholds.get(market, period) else {
            debug!("No thresholds for {} {}", market, period);
            return Vec::new();
        };

        candles
            .iter()
            .zip(rsi)
            .enumerate()
            .filter(|(_, (candle, _))| window.contains_candle(candle))
            .filter_map(|(index, (_, value))| {
                let rsi_value = value.value()?;
                Some(Classified {
                    index,
                    rsi_value,
                    suggestion: classify(rsi_value, thresholds, backtesting),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::candles_from_closes;
    use crate::types::parse_timestamp;

    fn a_day() -> Thresholds {
        Thresholds::new(15.0, 20.0, 75.0, 80.0).unwrap()
    }

    #[test]
    fn test_classify_precedence() {
        let t = a_day();
        assert_eq!(classify(14.0, &t, false), Some(Suggestion::MustBuy));
        assert_eq!(classify(15.0, &t, false), Some(Suggestion::MustBuy));
        assert_eq!(classify(18.0, &t, false), Some(Suggestion::Buy));
        assert_eq!(classify(76.0, &t, false), Some(Suggestion::Sell));
        assert_eq!(classify(81.0, &t, false), Some(Suggestion::MustSell));
        assert_eq!(classify(50.0, &t, false), None);
    }

    #[test]
    fn test_classify_backtest_suppresses_sells() {
        let t = a_day();
        assert_eq!(classify(14.0, &t, true), Some(Suggestion::MustBuy));
        assert_eq!(classify(76.0, &t, true), None);
        assert_eq!(classify(81.0, &t, true), None);
    }

    #[test]
    fn test_classify_nan_is_none() {
        assert_eq!(classify(f64::NAN, &a_day(), false), None);
    }

    #[test]
    fn test_classifier_uses_table() {
        let table = ThresholdTable::default();
        let classifier = SignalClassifier::new(&table);
        assert_eq!(
            classifier.classify(Market::A, Period::Day, 14.0, false),
            Some(Suggestion::MustBuy)
        );
        assert_eq!(
            classifier.classify(Market::Us, Period::Day, 24.0, false),
            Some(Suggestion::Buy)
        );
    }

    #[test]
    fn test_classifier_missing_entry() {
        let table = ThresholdTable::empty();
        let classifier = SignalClassifier::new(&table);
        assert_eq!(classifier.classify(Market::A, Period::Day, 1.0, false), None);
    }

    #[test]
    fn test_realtime_window() {
        let now = parse_timestamp("2025-01-01 10:00").unwrap();
        let window = TimeWindow::for_period(now, Period::Min5, false, &WindowConfig::default());
        assert!(window.contains(parse_timestamp("2025-01-01 09:55").unwrap()));
        assert!(window.contains(now));
        assert!(!window.contains(parse_timestamp("2025-01-01 09:50").unwrap()));
        assert!(!window.contains(parse_timestamp("2025-01-01 10:05").unwrap()));
    }

    #[test]
    fn test_widened_window_for_day_and_backtest() {
        let now = parse_timestamp("2025-01-10 15:00").unwrap();
        let config = WindowConfig::default();
        let day = TimeWindow::for_period(now, Period::Day, false, &config);
        assert!(day.contains(parse_timestamp("2025-01-08").unwrap()));
        assert!(!day.contains(parse_timestamp("2025-01-06").unwrap()));

        let backtest = TimeWindow::for_period(now, Period::Min5, true, &config);
        assert!(backtest.contains(parse_timestamp("2025-01-08 10:00").unwrap()));
    }

    #[test]
    fn test_scan_respects_window_and_undefined() {
        let candles = candles_from_closes(&[10.0, 9.0, 8.0, 7.0]);
        let rsi = vec![
            IndicatorValue::Undefined,
            IndicatorValue::Value(10.0),
            IndicatorValue::Value(50.0),
            IndicatorValue::Value(90.0),
        ];
        let table = ThresholdTable::default();
        let classifier = SignalClassifier::new(&table);
        let window = TimeWindow::realtime(parse_timestamp("2025-01-01 09:03").unwrap(), 2);

        let hits = classifier.scan(&candles, &rsi, Market::A, Period::Min5, &window, false);
        let indices: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(hits[0].suggestion, Some(Suggestion::MustBuy));
        assert_eq!(hits[1].suggestion, None);
        assert_eq!(hits[2].suggestion, Some(Suggestion::MustSell));

        let all = classifier.scan(&candles, &rsi, Market::A, Period::Min5, &TimeWindow::unbounded(), true);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].suggestion, None);
    }
}
