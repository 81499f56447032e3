//! Integration tests for normalization, signal classification, trend state,
//! MA55 breakthroughs and backtesting

use kline_signals::services::backtester::{evaluate, is_us_dst, session_close};
use kline_signals::services::normalizer::normalize;
use kline_signals::services::signals::indicators::{macd_points, sma};
use kline_signals::services::signals::trend_state::quadrant_state;
use kline_signals::services::signals::{classify, detect_ma55_breakthrough, TrendStateDetector};
use kline_signals::types::*;
use kline_signals::{analyze, AnalysisContext, Config, StockInput};

#[test]
fn test_normalize_pre_close_chain() {
    let rows = [
        "2025-01-01,43.0,43.3,43.4,42.8,100,4330,1.4",
        "2025-01-02,43.3,43.1,43.5,43.0,120,5172,1.15",
    ];
    let candles = normalize(&rows, 42.96);
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].pre_close, 42.96);
    assert_eq!(candles[1].pre_close, 43.3);
    assert_eq!(candles[0].volume, 100.0);
    assert_eq!(candles[1].amplitude, 1.15);
}

#[test]
fn test_normalize_reads_tail_by_offset() {
    let rows = [
        "2025-01-01,10,11,12,9,10.0,1.0,2.5,500,5500,30.0",
        "2025-01-02,11,12,13,10,9.09,1.0,3.1,x,88,9,600,7200,27.27",
    ];
    let candles = normalize(&rows, 10.0);
    assert_eq!(candles[0].volume, 500.0);
    assert_eq!(candles[0].turnover_rate, 2.5);
    assert_eq!(candles[1].volume, 600.0);
    assert_eq!(candles[1].turnover, 7200.0);
    assert_eq!(candles[1].amplitude, 27.27);
    assert_eq!(candles[1].turnover_rate, 3.1);
}

#[test]
fn test_normalize_malformed_fields_are_nan() {
    let candles = normalize(&["2025-01-01,-,abc,12,9,100,1000,3"], 10.0);
    assert_eq!(candles.len(), 1);
    assert!(candles[0].open.is_nan());
    assert!(candles[0].close.is_nan());
    assert_eq!(candles[0].high, 12.0);
}

#[test]
fn test_threshold_precedence_a_day() {
    let table = ThresholdTable::default();
    let t = table.get(Market::A, Period::Day).unwrap();
    assert_eq!(classify(14.0, t, false), Some(Suggestion::MustBuy));
    assert_eq!(classify(18.0, t, false), Some(Suggestion::Buy));
    assert_eq!(classify(76.0, t, false), Some(Suggestion::Sell));
    assert_eq!(classify(81.0, t, false), Some(Suggestion::MustSell));
    assert_eq!(classify(50.0, t, false), None);
}

#[test]
fn test_trend_quadrants() {
    assert_eq!(quadrant_state(-1.0, -2.0), TrendState::MediumStrong);
    assert_eq!(quadrant_state(0.5, -0.2), TrendState::ExtremelyStrong);
    assert_eq!(quadrant_state(1.0, 0.4), TrendState::Strong);
    assert_eq!(quadrant_state(0.4, 1.0), TrendState::MediumWeak);
    assert_eq!(quadrant_state(-0.3, 0.2), TrendState::ExtremelyWeak);
    assert_eq!(quadrant_state(-2.0, -1.0), TrendState::Weak);
}

#[test]
fn test_trend_state_on_price_cycle() {
    // Slow sine wave: MACD keeps cycling through every state.
    let closes: Vec<f64> = (0..400).map(|i| 100.0 + 20.0 * (i as f64 / 25.0).sin()).collect();
    let macd: Vec<MacdRow> = macd_points(&closes)
        .into_iter()
        .enumerate()
        .map(|(i, p)| MacdRow {
            date: i.to_string(),
            dif: IndicatorValue::new(p.dif),
            dea: IndicatorValue::new(p.dea),
            histogram: IndicatorValue::new(p.histogram),
        })
        .collect();

    let detector = TrendStateDetector::default();
    let readings: Vec<TrendReading> = detector
        .detect_all(&macd)
        .into_iter()
        .skip(50)
        .flatten()
        .collect();

    for state in TrendState::CYCLE {
        assert!(readings.iter().any(|r| r.state == state), "{:?} never seen", state);
    }

    // Every state change driven by an event follows the cycle.
    for pair in readings.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if prev.state != cur.state && cur.periods_ago == Some(0) {
            assert_eq!(prev.state.next(), cur.state);
        }
    }
}

#[test]
fn test_ma55_breakthrough_on_series() {
    let mut closes: Vec<f64> = (0..70).map(|i| 100.0 - i as f64 * 0.2).collect();
    closes.push(120.0);
    closes.push(121.0);
    let ma55 = sma(&closes, 55);
    assert_eq!(detect_ma55_breakthrough(&closes, &ma55, 69, 5), None);
    assert_eq!(
        detect_ma55_breakthrough(&closes, &ma55, 70, 5),
        Some(Ma55Breakthrough::FirstBreakThrough)
    );
    assert_eq!(
        detect_ma55_breakthrough(&closes, &ma55, 71, 5),
        Some(Ma55Breakthrough::LatestBreakThrough)
    );
}

fn daily(date: &str, close: f64) -> Candle {
    normalize(&[format!("{},{},{},{},{},100,1000,1", date, close, close, close, close)], close)
        .remove(0)
}

#[test]
fn test_backtest_round_trip() {
    let candles = vec![daily("2025-03-03", 11.0), daily("2025-03-04", 12.0)];
    let result = evaluate(&candles, 0, 10.0, Market::A, Period::Day);
    assert_eq!(result.today_profit_pct, Some(9.09));
    assert_eq!(result.next_day_profit_pct, Some(16.67));
}

#[test]
fn test_backtest_partial_result() {
    let candles = vec![daily("2025-03-03", 11.0)];
    let result = evaluate(&candles, 0, 10.0, Market::Hk, Period::Day);
    assert_eq!(result.today_profit_pct, Some(9.09));
    assert_eq!(result.next_day_profit_pct, None);
}

#[test]
fn test_us_session_uses_dst() {
    let summer = parse_timestamp("2025-06-02 22:30").unwrap();
    let winter = parse_timestamp("2025-12-01 23:30").unwrap();
    assert!(is_us_dst(summer.date()));
    assert!(!is_us_dst(winter.date()));
    assert_eq!(
        session_close(Market::Us, summer),
        parse_timestamp("2025-06-03 04:00")
    );
    assert_eq!(
        session_close(Market::Us, winter),
        parse_timestamp("2025-12-02 05:00")
    );
}

#[test]
fn test_analyze_from_json_input() {
    let start = chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    let mut klines = Vec::new();
    for i in 0..40 {
        let close = 30.0 - i as f64 * 0.4;
        klines.push(format!(
            "{},{:.2},{:.2},{:.2},{:.2},-1.3,-0.4,1.8,8000,240000,2.1",
            (start + chrono::Duration::days(i)).format("%Y-%m-%d"),
            close + 0.2,
            close,
            close + 0.5,
            close - 0.5
        ));
    }
    let input: StockInput = serde_json::from_value(serde_json::json!({
        "code": "00700",
        "marketId": 116,
        "decimalPlaces": 3,
        "priorClose": 30.4,
        "klines": klines,
    }))
    .unwrap();

    let series = input.into_series();
    let ctx = AnalysisContext {
        backtest: true,
        ..AnalysisContext::default()
    };
    let report = analyze(&series, &ctx, &Config::default());
    assert_eq!(report.market, Market::Hk);
    assert_eq!(report.candles, 40);
    let dates: Vec<_> = series.candles.iter().map(|c| c.timestamp().unwrap()).collect();
    assert!(dates.windows(2).all(|w| w[0] < w[1]));
    assert!(report
        .signals
        .iter()
        .all(|s| s.suggestion == Some(Suggestion::MustBuy)));
    assert_eq!(report.signals.len(), 39);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["signals"][0]["suggestion"], "必买");
    assert_eq!(json["indicators"]["rsi"][0][1], "-");
}
