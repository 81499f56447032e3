//! Simple Moving Average (MA) indicator.

use crate::services::signals::indicators::IndicatorKind;
use crate::services::signals::{closes, Indicator};
use crate::types::{Candle, IndicatorOutput, IndicatorValue, MaRow};

/// Default close-price periods.
pub const DEFAULT_MA_PERIODS: [usize; 5] = [5, 10, 20, 55, 233];

/// Arithmetic mean of the trailing `period` values.
///
/// Rows before index `period - 1` are undefined. A `NaN` inside the window
/// makes only that window undefined.
pub fn sma(values: &[f64], period: usize) -> Vec<IndicatorValue> {
    let period = period.max(1);
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return IndicatorValue::Undefined;
            }
            let window = &values[i + 1 - period..=i];
            IndicatorValue::new(window.iter().sum::<f64>() / period as f64)
        })
        .collect()
}

/// Build one row per candle from several precomputed lines.
pub(crate) fn zip_lines(candles: &[Candle], lines: &[Vec<IndicatorValue>]) -> Vec<MaRow> {
    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| MaRow {
            date: candle.date.clone(),
            values: lines.iter().map(|line| line[i]).collect(),
        })
        .collect()
}

/// MA (Simple Moving Average) over closing prices for several periods.
pub struct MovingAverage {
    periods: Vec<usize>,
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self::new(DEFAULT_MA_PERIODS.to_vec())
    }
}

impl MovingAverage {
    pub fn new(periods: Vec<usize>) -> Self {
        Self { periods }
    }

    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    /// Typed rows, one value per configured period.
    pub fn rows(&self, candles: &[Candle]) -> Vec<MaRow> {
        let closes = closes(candles);
        let lines: Vec<Vec<IndicatorValue>> =
            self.periods.iter().map(|&p| sma(&closes, p)).collect();
        zip_lines(candles, &lines)
    }

    /// Position of `period` in this indicator's rows.
    pub fn column(&self, period: usize) -> Option<usize> {
        self.periods.iter().position(|&p| p == period)
    }
}

impl Indicator for MovingAverage {
    fn id(&self) -> &str {
        "ma"
    }

    fn name(&self) -> String {
        let periods: Vec<String> = self.periods.iter().map(|p| p.to_string()).collect();
        format!("MA ({})", periods.join(", "))
    }

    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Ma
    }

    fn min_periods(&self) -> usize {
        self.periods.iter().copied().min().unwrap_or(1)
    }

    fn compute(&self, candles: &[Candle]) -> IndicatorOutput {
        IndicatorOutput::Ma(self.rows(candles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::{candles_from_closes, wave_closes};

    #[test]
    fn test_sma_definition_boundary() {
        let closes = wave_closes(300);
        for period in DEFAULT_MA_PERIODS {
            let line = sma(&closes, period);
            for (i, value) in line.iter().enumerate() {
                if i < period - 1 {
                    assert!(!value.is_defined(), "MA{} defined at {}", period, i);
                } else {
                    assert!(value.is_defined(), "MA{} undefined at {}", period, i);
                }
            }
        }
    }

    #[test]
    fn test_sma_values() {
        let line = sma(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 5);
        assert_eq!(line[4].value(), Some(3.0));
        assert_eq!(line[5].value(), Some(4.0));
    }

    #[test]
    fn test_sma_nan_only_poisons_its_window() {
        let line = sma(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(!line[1].is_defined());
        assert!(!line[2].is_defined());
        assert_eq!(line[3].value(), Some(3.5));
    }

    #[test]
    fn test_moving_average_columns() {
        let candles = candles_from_closes(&wave_closes(60));
        let ma = MovingAverage::new(vec![5, 55]);
        assert_eq!(ma.column(55), Some(1));
        assert_eq!(ma.name(), "MA (5, 55)");
        match ma.compute(&candles) {
            IndicatorOutput::Ma(rows) => {
                assert_eq!(rows.len(), 60);
                assert!(rows[4].values[0].is_defined());
                assert!(!rows[53].values[1].is_defined());
                assert!(rows[54].values[1].is_defined());
            }
            other => panic!("unexpected output {:?}", other),
        }
    }
}
