//! Parabolic SAR (Stop And Reverse) indicator.

use crate::services::signals::indicators::IndicatorKind;
use crate::services::signals::Indicator;
use crate::types::{Candle, IndicatorOutput, SarDirection, SarRow};

/// Trailing window used to seed and reseed the SAR.
pub const DEFAULT_SAR_WINDOW: usize = 9;
pub const DEFAULT_SAR_STEP: f64 = 0.02;
pub const DEFAULT_SAR_MAX: f64 = 0.2;

/// Per-series SAR state carried from one row to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarState {
    pub direction: SarDirection,
    /// Acceleration factor.
    pub af: f64,
    /// Extreme price of the current trend.
    pub extreme: f64,
    pub sar: f64,
}

/// Highest high and lowest low of a window, with the index of each.
/// Ties resolve to the most recent candle. `NaN` prices are skipped.
struct WindowExtremes {
    high: f64,
    high_index: usize,
    low: f64,
    low_index: usize,
}

fn window_extremes(candles: &[Candle], end: usize, window: usize) -> Option<WindowExtremes> {
    let start = (end + 1).saturating_sub(window);
    let mut ext = WindowExtremes {
        high: f64::NEG_INFINITY,
        high_index: start,
        low: f64::INFINITY,
        low_index: start,
    };
    for (j, candle) in candles.iter().enumerate().take(end + 1).skip(start) {
        if candle.high >= ext.high {
            ext.high = candle.high;
            ext.high_index = j;
        }
        if candle.low <= ext.low {
            ext.low = candle.low;
            ext.low_index = j;
        }
    }
    (ext.high.is_finite() && ext.low.is_finite()).then_some(ext)
}

/// Parabolic SAR indicator.
///
/// The first `window` rows are undefined. At index `window` the direction is
/// seeded from whichever window extreme is more recent: a recent high starts
/// an up trend with SAR at the window low, a recent low starts a down trend
/// with SAR at the window high. Every later row moves SAR toward the trend
/// extreme by the acceleration factor; when price crosses SAR the trend flips,
/// SAR is reseeded from the opposite window extreme and the factor resets.
pub struct Sar {
    window: usize,
    step: f64,
    max_af: f64,
}

impl Default for Sar {
    fn default() -> Self {
        Self::new(DEFAULT_SAR_WINDOW, DEFAULT_SAR_STEP, DEFAULT_SAR_MAX)
    }
}

impl Sar {
    pub fn new(window: usize, step: f64, max_af: f64) -> Self {
        Self {
            window: window.max(1),
            step,
            max_af,
        }
    }

    fn seed(&self, candles: &[Candle], i: usize) -> Option<SarState> {
        let ext = window_extremes(candles, i, self.window)?;
        let state = if ext.high_index >= ext.low_index {
            SarState {
                direction: SarDirection::Up,
                af: self.step,
                extreme: ext.high,
                sar: ext.low,
            }
        } else {
            SarState {
                direction: SarDirection::Down,
                af: self.step,
                extreme: ext.low,
                sar: ext.high,
            }
        };
        Some(state)
    }

    /// Advance the state by one candle.
    fn advance(&self, candles: &[Candle], i: usize, prev: SarState) -> SarState {
        let candle = &candles[i];
        let sar = prev.sar + prev.af * (prev.extreme - prev.sar);
        let mut next = SarState { sar, ..prev };

        let crossed = match prev.direction {
            SarDirection::Up => candle.low < sar,
            SarDirection::Down => candle.high > sar,
        };

        if crossed {
            let direction = prev.direction.flipped();
            let ext = window_extremes(candles, i, self.window);
            let (reseed, extreme) = match (direction, ext) {
                (SarDirection::Down, Some(e)) => (e.high, candle.low),
                (SarDirection::Up, Some(e)) => (e.low, candle.high),
                (SarDirection::Down, None) => (candle.high, candle.low),
                (SarDirection::Up, None) => (candle.low, candle.high),
            };
            next = SarState {
                direction,
                af: self.step,
                extreme,
                sar: reseed,
            };
        } else {
            let new_extreme = match prev.direction {
                SarDirection::Up => candle.high > prev.extreme,
                SarDirection::Down => candle.low < prev.extreme,
            };
            if new_extreme {
                next.extreme = match prev.direction {
                    SarDirection::Up => candle.high,
                    SarDirection::Down => candle.low,
                };
                next.af = (prev.af + self.step).min(self.max_af);
            }
        }

        next
    }

    /// Typed rows, one per candle.
    pub fn rows(&self, candles: &[Candle]) -> Vec<SarRow> {
        candles
            .iter()
            .zip(self.states(candles))
            .map(|(candle, state)| SarRow {
                date: candle.date.clone(),
                sar: state.map(|s| s.sar).into(),
                direction: state.map(|s| s.direction),
            })
            .collect()
    }

    /// Compute the SAR state at every row; `None` where undefined.
    pub fn states(&self, candles: &[Candle]) -> Vec<Option<SarState>> {
        let mut out = Vec::with_capacity(candles.len());
        let mut state: Option<SarState> = None;

        for (i, candle) in candles.iter().enumerate() {
            if i < self.window || candle.high.is_nan() || candle.low.is_nan() {
                out.push(None);
                continue;
            }
            state = match state {
                None => self.seed(candles, i),
                Some(prev) => Some(self.advance(candles, i, prev)),
            };
            out.push(state);
        }

        out
    }
}

impl Indicator for Sar {
    fn id(&self) -> &str {
        "sar"
    }

    fn name(&self) -> String {
        format!("SAR ({}, {}, {})", self.window, self.step, self.max_af)
    }

    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Sar
    }

    fn min_periods(&self) -> usize {
        self.window + 1
    }

    fn compute(&self, candles: &[Candle]) -> IndicatorOutput {
        IndicatorOutput::Sar(self.rows(candles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndicatorValue;
    use crate::services::signals::indicators::test_support::{candles_from_closes, wave_closes};

    #[test]
    fn test_sar_first_rows_undefined() {
        let candles = candles_from_closes(&wave_closes(30));
        let states = Sar::default().states(&candles);
        assert!(states[..9].iter().all(|s| s.is_none()));
        assert!(states[9].is_some());
    }

    #[test]
    fn test_sar_uptrend_seeds_up() {
        let closes: Vec<f64> = (0..20).map(|i| 10.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        let state = Sar::default().states(&candles)[9].unwrap();
        assert_eq!(state.direction, SarDirection::Up);
        assert!(state.sar <= candles[9].low);
    }

    #[test]
    fn test_sar_downtrend_seeds_down() {
        let closes: Vec<f64> = (0..20).map(|i| 50.0 - i as f64).collect();
        let candles = candles_from_closes(&closes);
        let state = Sar::default().states(&candles)[9].unwrap();
        assert_eq!(state.direction, SarDirection::Down);
        assert!(state.sar >= candles[9].high);
    }

    #[test]
    fn test_sar_acceleration_capped() {
        let closes: Vec<f64> = (0..80).map(|i| 10.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        let states = Sar::default().states(&candles);
        let last = states.last().unwrap().unwrap();
        assert_eq!(last.direction, SarDirection::Up);
        assert!((last.af - DEFAULT_SAR_MAX).abs() < 1e-12);
    }

    #[test]
    fn test_sar_flip_lands_on_correct_side() {
        let candles = candles_from_closes(&wave_closes(300));
        let states = Sar::default().states(&candles);
        let mut flips = 0;
        for i in 1..states.len() {
            if let (Some(prev), Some(cur)) = (states[i - 1], states[i]) {
                if prev.direction != cur.direction {
                    flips += 1;
                    assert!((cur.af - DEFAULT_SAR_STEP).abs() < 1e-12);
                    match cur.direction {
                        SarDirection::Up => assert!(cur.sar <= candles[i].close),
                        SarDirection::Down => assert!(cur.sar >= candles[i].close),
                    }
                }
            }
        }
        assert!(flips > 0, "wave series should flip at least once");
    }

    #[test]
    fn test_sar_rows() {
        let candles = candles_from_closes(&wave_closes(30));
        match Sar::default().compute(&candles) {
            IndicatorOutput::Sar(rows) => {
                assert_eq!(rows.len(), 30);
                assert_eq!(rows[0].sar, IndicatorValue::Undefined);
                assert!(rows[0].direction.is_none());
                assert!(rows[20].sar.is_defined());
            }
            other => panic!("unexpected output {:?}", other),
        }
    }
}
