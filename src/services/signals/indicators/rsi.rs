//! Relative Strength Index (RSI) indicator.

use crate::services::signals::indicators::IndicatorKind;
use crate::services::signals::{closes, Indicator};
use crate::types::{Candle, IndicatorOutput, IndicatorValue, RsiRow};

/// Default smoothing periods for lines A/B/C.
pub const DEFAULT_RSI_PERIODS: [usize; 3] = [6, 12, 24];

/// Which recurrence produces the RSI lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsiVariant {
    /// `UP[i] = up + UP[i-1] * (N-1)/N`.
    #[default]
    Accumulated,
    /// `UP[i] = up/N + UP[i-1] * (N-1)/N`.
    Smoothed,
}

/// RSI (Relative Strength Index) indicator.
///
/// Three lines smoothed over separate periods. Values range from 0-100; the
/// first row has no prior delta and is undefined, as is any row whose
/// smoothed absolute delta is zero.
pub struct Rsi {
    periods: [usize; 3],
    variant: RsiVariant,
}

impl Default for Rsi {
    fn default() -> Self {
        Self {
            periods: DEFAULT_RSI_PERIODS,
            variant: RsiVariant::Accumulated,
        }
    }
}

impl Rsi {
    pub fn new(periods: [usize; 3]) -> Self {
        Self {
            periods,
            variant: RsiVariant::Accumulated,
        }
    }

    pub fn with_variant(mut self, variant: RsiVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn periods(&self) -> [usize; 3] {
        self.periods
    }

    fn line(&self, closes: &[f64], period: usize) -> Vec<IndicatorValue> {
        match self.variant {
            RsiVariant::Accumulated => rsi_accumulated(closes, period),
            RsiVariant::Smoothed => rsi_smoothed(closes, period),
        }
    }
}

/// Split a close-to-close delta into (up, absolute) parts. `NaN` stays `NaN`.
fn split_delta(delta: f64) -> (f64, f64) {
    if delta.is_nan() {
        (f64::NAN, f64::NAN)
    } else {
        (delta.max(0.0), delta.abs())
    }
}

fn rsi_recurrence(closes: &[f64], period: usize, scale_input: bool) -> Vec<IndicatorValue> {
    let n = period.max(1) as f64;
    let keep = (n - 1.0) / n;
    let input_scale = if scale_input { 1.0 / n } else { 1.0 };

    let mut out = Vec::with_capacity(closes.len());
    let mut up_acc = 0.0;
    let mut dn_acc = 0.0;

    for (i, close) in closes.iter().enumerate() {
        if i == 0 {
            out.push(IndicatorValue::Undefined);
            continue;
        }
        let (up, dn) = split_delta(close - closes[i - 1]);
        up_acc = up * input_scale + up_acc * keep;
        dn_acc = dn * input_scale + dn_acc * keep;

        if dn_acc != 0.0 {
            out.push(IndicatorValue::new(up_acc / dn_acc * 100.0));
        } else {
            out.push(IndicatorValue::Undefined);
        }
    }

    out
}

/// RSI where the raw delta is added before decaying the running sums.
pub fn rsi_accumulated(closes: &[f64], period: usize) -> Vec<IndicatorValue> {
    rsi_recurrence(closes, period, false)
}

/// RSI where the delta is divided by the period before accumulating.
///
/// Kept alongside [`rsi_accumulated`]; both recurrences exist in production
/// call sites and neither has been confirmed as the reference.
pub fn rsi_smoothed(closes: &[f64], period: usize) -> Vec<IndicatorValue> {
    rsi_recurrence(closes, period, true)
}

impl Indicator for Rsi {
    fn id(&self) -> &str {
        "rsi"
    }

    fn name(&self) -> String {
        format!(
            "RSI ({}, {}, {})",
            self.periods[0], self.periods[1], self.periods[2]
        )
    }

    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Rsi
    }

    fn min_periods(&self) -> usize {
        2
    }

    fn compute(&self, candles: &[Candle]) -> IndicatorOutput {
        IndicatorOutput::Rsi(self.rows(candles))
    }
}

impl Rsi {
    /// Typed rows, one per candle.
    pub fn rows(&self, candles: &[Candle]) -> Vec<RsiRow> {
        let closes = closes(candles);
        let a = self.line(&closes, self.periods[0]);
        let b = self.line(&closes, self.periods[1]);
        let c = self.line(&closes, self.periods[2]);

        candles
            .iter()
            .enumerate()
            .map(|(i, candle)| RsiRow {
                date: candle.date.clone(),
                rsi_a: a[i],
                rsi_b: b[i],
                rsi_c: c[i],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::{candles_from_closes, wave_closes};

    #[test]
    fn test_rsi_first_row_undefined() {
        let values = rsi_accumulated(&[10.0, 11.0, 12.0], 6);
        assert_eq!(values[0], IndicatorValue::Undefined);
        assert!(values[1].is_defined());
    }

    #[test]
    fn test_rsi_flat_series_undefined() {
        let values = rsi_accumulated(&[10.0; 8], 6);
        assert!(values.iter().all(|v| !v.is_defined()));
    }

    #[test]
    fn test_rsi_uptrend_is_100() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let values = rsi_accumulated(&closes, 6);
        assert_eq!(values.last().unwrap().value(), Some(100.0));
    }

    #[test]
    fn test_rsi_downtrend_is_0() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let values = rsi_accumulated(&closes, 12);
        assert_eq!(values.last().unwrap().value(), Some(0.0));
    }

    #[test]
    fn test_rsi_bounds_on_wave() {
        let closes = wave_closes(200);
        for period in DEFAULT_RSI_PERIODS {
            for value in rsi_accumulated(&closes, period).iter().filter_map(|v| v.value()) {
                assert!((0.0..=100.0).contains(&value), "RSI out of bounds: {}", value);
            }
            for value in rsi_smoothed(&closes, period).iter().filter_map(|v| v.value()) {
                assert!((0.0..=100.0).contains(&value), "RSI out of bounds: {}", value);
            }
        }
    }

    #[test]
    fn test_rsi_known_values() {
        // up: 0,1,0 ; abs: 0,1,2 with N = 2
        // i=1: UP=0 DN=0 -> undefined
        // i=2: UP=1 DN=1 -> 100
        // i=3: UP=0.5 DN=2.5 -> 20
        let values = rsi_accumulated(&[10.0, 10.0, 11.0, 9.0], 2);
        assert_eq!(values[1], IndicatorValue::Undefined);
        assert_eq!(values[2].value(), Some(100.0));
        assert!((values[3].value().unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_nan_close_propagates_as_undefined() {
        let values = rsi_accumulated(&[10.0, 11.0, f64::NAN, 12.0], 6);
        assert!(values[1].is_defined());
        assert!(!values[2].is_defined());
        assert!(!values[3].is_defined());
    }

    #[test]
    fn test_rsi_indicator_rows() {
        let candles = candles_from_closes(&wave_closes(40));
        let rsi = Rsi::default();
        assert_eq!(rsi.id(), "rsi");
        assert_eq!(rsi.name(), "RSI (6, 12, 24)");
        match rsi.compute(&candles) {
            IndicatorOutput::Rsi(rows) => {
                assert_eq!(rows.len(), 40);
                assert_eq!(rows[0].rsi_a, IndicatorValue::Undefined);
                assert!(rows[39].rsi_a.is_defined());
                assert!(rows[39].rsi_c.is_defined());
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_rsi_variants_selectable() {
        let candles = candles_from_closes(&wave_closes(40));
        let smoothed = Rsi::new([3, 6, 9]).with_variant(RsiVariant::Smoothed);
        assert_eq!(smoothed.periods(), [3, 6, 9]);
        assert_eq!(smoothed.compute(&candles).len(), 40);
    }
}
