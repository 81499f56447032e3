//! Directional Movement Index (DMI) with ADX and ADXR.

use crate::services::signals::indicators::IndicatorKind;
use crate::services::signals::Indicator;
use crate::types::{Candle, DmiRow, IndicatorOutput};

pub const DEFAULT_DMI_PERIOD: usize = 14;
pub const DEFAULT_ADX_PERIOD: usize = 6;

/// DMI indicator.
///
/// True range, +DM and -DM are Wilder-smoothed over `period` candles:
/// - `PDI = +DM / TR * 100`, `MDI = -DM / TR * 100`
/// - `ADX = MA(|PDI - MDI| / (PDI + MDI) * 100, adx_period)`
/// - `ADXR = (ADX + ADX[adx_period ago]) / 2`
///
/// A zero true range yields 0 for both directional lines.
pub struct Dmi {
    period: usize,
    adx_period: usize,
}

impl Default for Dmi {
    fn default() -> Self {
        Self::new(DEFAULT_DMI_PERIOD, DEFAULT_ADX_PERIOD)
    }
}

/// Wilder smoothing: seeded with the sum of the first `period` inputs, then
/// `S = S - S/period + x`.
struct WilderSum {
    period: usize,
    count: usize,
    value: f64,
}

impl WilderSum {
    fn new(period: usize) -> Self {
        Self {
            period,
            count: 0,
            value: 0.0,
        }
    }

    /// Feed one input; returns the smoothed sum once seeded.
    fn push(&mut self, x: f64) -> Option<f64> {
        if self.count < self.period {
            self.value += x;
            self.count += 1;
            return (self.count == self.period).then_some(self.value);
        }
        self.value = self.value - self.value / self.period as f64 + x;
        Some(self.value)
    }
}

fn true_range(current: &Candle, previous: &Candle) -> f64 {
    let hl = current.high - current.low;
    let hc = (current.high - previous.close).abs();
    let lc = (current.low - previous.close).abs();
    if hl.is_nan() || hc.is_nan() || lc.is_nan() {
        return f64::NAN;
    }
    hl.max(hc).max(lc)
}

fn directional_movement(current: &Candle, previous: &Candle) -> (f64, f64) {
    let hd = current.high - previous.high;
    let ld = previous.low - current.low;
    if hd.is_nan() || ld.is_nan() {
        return (f64::NAN, f64::NAN);
    }
    let plus = if hd > 0.0 && hd > ld { hd } else { 0.0 };
    let minus = if ld > 0.0 && ld > hd { ld } else { 0.0 };
    (plus, minus)
}

fn ratio_pct(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den * 100.0
    }
}

impl Dmi {
    pub fn new(period: usize, adx_period: usize) -> Self {
        Self {
            period: period.max(1),
            adx_period: adx_period.max(1),
        }
    }

    /// Typed rows, one per candle.
    pub fn rows(&self, candles: &[Candle]) -> Vec<DmiRow> {
        let n = candles.len();
        let mut pdi = vec![None; n];
        let mut mdi = vec![None; n];
        let mut dx: Vec<Option<f64>> = vec![None; n];

        let mut tr_sum = WilderSum::new(self.period);
        let mut plus_sum = WilderSum::new(self.period);
        let mut minus_sum = WilderSum::new(self.period);

        for i in 1..n {
            let tr = true_range(&candles[i], &candles[i - 1]);
            let (plus, minus) = directional_movement(&candles[i], &candles[i - 1]);
            let smoothed = (tr_sum.push(tr), plus_sum.push(plus), minus_sum.push(minus));
            if let (Some(tr), Some(plus), Some(minus)) = smoothed {
                let p = ratio_pct(plus, tr);
                let m = ratio_pct(minus, tr);
                pdi[i] = Some(p);
                mdi[i] = Some(m);
                dx[i] = Some(ratio_pct((p - m).abs(), p + m));
            }
        }

        let adx: Vec<Option<f64>> = (0..n)
            .map(|i| {
                if i + 1 < self.adx_period {
                    return None;
                }
                let window = &dx[i + 1 - self.adx_period..=i];
                let total: Option<f64> = window.iter().copied().sum();
                total.map(|t| t / self.adx_period as f64)
            })
            .collect();

        (0..n)
            .map(|i| {
                let adxr = match (adx[i], i.checked_sub(self.adx_period).and_then(|j| adx[j])) {
                    (Some(now), Some(then)) => Some((now + then) / 2.0),
                    _ => None,
                };
                DmiRow {
                    date: candles[i].date.clone(),
                    pdi: pdi[i].into(),
                    mdi: mdi[i].into(),
                    adx: adx[i].into(),
                    adxr: adxr.into(),
                }
            })
            .collect()
    }
}

impl Indicator for Dmi {
    fn id(&self) -> &str {
        "dmi"
    }

    fn name(&self) -> String {
        format!("DMI ({}, {})", self.period, self.adx_period)
    }

    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Dmi
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn compute(&self, candles: &[Candle]) -> IndicatorOutput {
        IndicatorOutput::Dmi(self.rows(candles))
    }
}
