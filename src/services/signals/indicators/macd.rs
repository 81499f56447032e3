//! MACD (Moving Average Convergence Divergence) indicator.

use crate::services::signals::indicators::IndicatorKind;
use crate::services::signals::{closes, Indicator};
use crate::types::{Candle, IndicatorOutput, IndicatorValue, MacdRow};

/// Raw MACD values at one candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub dif: f64,
    pub dea: f64,
    pub histogram: f64,
}

/// MACD indicator with the 12/26/9 exponential weights.
///
/// - `AX = (2*close + 11*AX') / 13`
/// - `BX = (2*close + 25*BX') / 27`
/// - `DIF = AX - BX`, `DEA = (2*DIF + 8*DEA') / 10`
/// - `histogram = (DIF - DEA) * 2`
///
/// Row 0 is seeded with `AX = BX = close` and `DIF = DEA = 0`.
#[derive(Default)]
pub struct Macd;

impl Macd {
    pub fn new() -> Self {
        Self
    }
}

/// Compute the raw MACD recurrence over closing prices.
pub fn macd_points(closes: &[f64]) -> Vec<MacdPoint> {
    let mut points = Vec::with_capacity(closes.len());
    let mut ax = 0.0;
    let mut bx = 0.0;
    let mut dea = 0.0;

    for (i, &close) in closes.iter().enumerate() {
        let dif = if i == 0 {
            ax = close;
            bx = close;
            dea = 0.0;
            0.0
        } else {
            ax = (2.0 * close + 11.0 * ax) / 13.0;
            bx = (2.0 * close + 25.0 * bx) / 27.0;
            let dif = ax - bx;
            dea = (2.0 * dif + 8.0 * dea) / 10.0;
            dif
        };

        points.push(MacdPoint {
            dif,
            dea,
            histogram: (dif - dea) * 2.0,
        });
    }

    points
}

impl Indicator for Macd {
    fn id(&self) -> &str {
        "macd"
    }

    fn name(&self) -> String {
        "MACD (12, 26, 9)".to_string()
    }

    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Macd
    }

    fn min_periods(&self) -> usize {
        1
    }

    fn compute(&self, candles: &[Candle]) -> IndicatorOutput {
        IndicatorOutput::Macd(self.rows(candles))
    }
}

impl Macd {
    /// Typed rows, one per candle.
    pub fn rows(&self, candles: &[Candle]) -> Vec<MacdRow> {
        candles
            .iter()
            .zip(macd_points(&closes(candles)))
            .map(|(candle, p)| MacdRow {
                date: candle.date.clone(),
                dif: IndicatorValue::new(p.dif),
                dea: IndicatorValue::new(p.dea),
                histogram: IndicatorValue::new(p.histogram),
            })
            .collect()
    }
}
