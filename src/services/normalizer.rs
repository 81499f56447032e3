//! Candle normalizer.
//!
//! Turns vendor kline rows into an ordered [`Candle`] series. Rows look like
//! `date,open,close,high,low,[changePercent,changeAmount,turnoverRate,...],volume,turnover,amplitude`.
//! Vendors disagree on how many trailing columns they send, so volume,
//! turnover and amplitude are always read from the end of the row.

use crate::types::{Candle, CandleSeries, MarketInfo};
use tracing::{debug, warn};

/// Number of leading fixed columns (date + OHLC).
const FIXED_COLUMNS: usize = 5;

/// Columns read from the end of the row.
const TAIL_COLUMNS: usize = 3;

/// Parse one numeric field. Anything unparsable becomes `NaN`.
fn parse_field(raw: Option<&&str>) -> f64 {
    raw.map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != "-")
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Normalize raw rows into candles, filling `pre_close` from `prior_close`
/// for the first row and from the previous close afterwards.
pub fn normalize<S: AsRef<str>>(rows: &[S], prior_close: f64) -> Vec<Candle> {
    let mut candles: Vec<Candle> = Vec::with_capacity(rows.len());

    for raw in rows {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            warn!("Skipping empty kline row");
            continue;
        }

        let fields: Vec<&str> = raw.split(',').collect();
        if fields.len() < FIXED_COLUMNS + TAIL_COLUMNS {
            debug!("Short kline row ({} fields): {}", fields.len(), raw);
        }

        let trailing: &[&str] = fields.get(FIXED_COLUMNS..).unwrap_or(&[]);
        let (middle, tail): (&[&str], &[&str]) = if trailing.len() >= TAIL_COLUMNS {
            trailing.split_at(trailing.len() - TAIL_COLUMNS)
        } else {
            (&[], trailing)
        };
        let tail_field = |offset: usize| {
            // offset 0 = volume, 1 = turnover, 2 = amplitude
            if tail.len() == TAIL_COLUMNS {
                parse_field(tail.get(offset))
            } else {
                f64::NAN
            }
        };

        let close = parse_field(fields.get(2));
        let pre_close = candles.last().map(|c| c.close).unwrap_or(prior_close);

        let change_amount = match middle.get(1) {
            Some(_) => parse_field(middle.get(1)),
            None => close - pre_close,
        };
        let change_percent = match middle.first() {
            Some(_) => parse_field(middle.first()),
            None if pre_close != 0.0 => (close - pre_close) / pre_close * 100.0,
            None => f64::NAN,
        };

        candles.push(Candle {
            index: candles.len(),
            date: fields[0].trim().to_string(),
            open: parse_field(fields.get(1)),
            close,
            high: parse_field(fields.get(3)),
            low: parse_field(fields.get(4)),
            volume: tail_field(0),
            turnover: tail_field(1),
            amplitude: tail_field(2),
            change_percent,
            change_amount,
            turnover_rate: parse_field(middle.get(2)),
            pre_close,
        });
    }

    candles
}

/// Normalize rows into a series tagged with its market metadata.
pub fn normalize_series<S: AsRef<str>>(
    info: MarketInfo,
    rows: &[S],
    prior_close: f64,
) -> CandleSeries {
    let candles = normalize(rows, prior_close);
    debug!("Normalized {} candles for {}", candles.len(), info.code);
    CandleSeries { info, candles }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_close_carried_forward() {
        let rows = [
            "2025-01-01,43.0,43.3,43.4,42.8,1.2,0.5,0.8,100,4330,1.4",
            "2025-01-02,43.3,43.1,43.5,43.0,-0.4,-0.2,0.6,90,3879,1.1",
        ];
        let candles = normalize(&rows, 42.96);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].pre_close, 42.96);
        assert_eq!(candles[1].pre_close, 43.3);
        assert_eq!(candles[1].index, 1);
    }

    #[test]
    fn test_tail_fields_read_from_end() {
        // Two different vendor layouts, same tail.
        let long = ["2025-01-01,10,11,12,9,1.0,0.1,2.5,7,8,500,6000,30"];
        let short = ["2025-01-01,10,11,12,9,500,6000,30"];
        let a = &normalize(&long, 10.0)[0];
        let b = &normalize(&short, 10.0)[0];
        assert_eq!(a.volume, 500.0);
        assert_eq!(a.turnover, 6000.0);
        assert_eq!(a.amplitude, 30.0);
        assert_eq!(a.turnover_rate, 2.5);
        assert_eq!(b.volume, 500.0);
        assert_eq!(b.turnover, 6000.0);
        assert_eq!(b.amplitude, 30.0);
        assert!(b.turnover_rate.is_nan());
    }

    #[test]
    fn test_missing_change_fields_are_derived() {
        let rows = ["2025-01-01,10,11,12,9,500,6000,30"];
        let candle = &normalize(&rows, 10.0)[0];
        assert!((candle.change_amount - 1.0).abs() < 1e-12);
        assert!((candle.change_percent - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_fields_become_nan() {
        let rows = ["2025-01-01,abc,11,-,9,1,2,3,x,6000,30"];
        let candle = &normalize(&rows, 10.0)[0];
        assert!(candle.open.is_nan());
        assert!(candle.high.is_nan());
        assert!(candle.volume.is_nan());
        assert_eq!(candle.close, 11.0);
    }

    #[test]
    fn test_short_row_does_not_panic() {
        let rows = ["2025-01-01,10", ""];
        let candles = normalize(&rows, 10.0);
        assert_eq!(candles.len(), 1);
        assert!(candles[0].close.is_nan());
        assert!(candles[0].volume.is_nan());
    }
}
