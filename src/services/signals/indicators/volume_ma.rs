//! Volume moving average (MAVOL) indicator.

use super::ma::{sma, zip_lines};
use crate::services::signals::indicators::IndicatorKind;
use crate::services::signals::Indicator;
use crate::types::{Candle, IndicatorOutput, IndicatorValue, MaRow};

pub const DEFAULT_VOLUME_MA_PERIODS: [usize; 2] = [5, 10];

/// Simple moving average of traded volume.
pub struct VolumeMa {
    periods: Vec<usize>,
}

impl Default for VolumeMa {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME_MA_PERIODS.to_vec())
    }
}

impl VolumeMa {
    pub fn new(periods: Vec<usize>) -> Self {
        Self { periods }
    }

    pub fn rows(&self, candles: &[Candle]) -> Vec<MaRow> {
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        let lines: Vec<Vec<IndicatorValue>> =
            self.periods.iter().map(|&p| sma(&volumes, p)).collect();
        zip_lines(candles, &lines)
    }
}

impl Indicator for VolumeMa {
    fn id(&self) -> &str {
        "volume_ma"
    }

    fn name(&self) -> String {
        let periods: Vec<String> = self.periods.iter().map(|p| p.to_string()).collect();
        format!("MAVOL ({})", periods.join(", "))
    }

    fn kind(&self) -> IndicatorKind {
        IndicatorKind::VolumeMa
    }

    fn min_periods(&self) -> usize {
        self.periods.iter().copied().min().unwrap_or(1)
    }

    fn compute(&self, candles: &[Candle]) -> IndicatorOutput {
        IndicatorOutput::VolumeMa(self.rows(candles))
    }
}
