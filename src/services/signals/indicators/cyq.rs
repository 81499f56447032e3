//! Chip / cost distribution (CYQ).
//!
//! Models how much of the float last changed hands at each price level over a
//! trailing window. Each day every bucket decays by `(1 - turnover)` and the
//! day's turnover is spread over `[low, high]` as a triangle peaking at the
//! day's average price. All bucket arithmetic uses `Decimal` so long decay
//! chains do not drift.

use crate::error::{AppError, Result};
use crate::services::signals::indicators::IndicatorKind;
use crate::services::signals::Indicator;
use crate::types::{Candle, CyqRow, IndicatorOutput, IndicatorValue};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_CYQ_FACTOR: usize = 150;
pub const DEFAULT_CYQ_RANGE: usize = 120;

const MIN_ACCURACY: Decimal = dec!(0.01);
const EPSILON: Decimal = dec!(0.00000001);

/// Bucket count and trailing window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyqConfig {
    pub factor: usize,
    pub range: usize,
}

impl Default for CyqConfig {
    fn default() -> Self {
        Self {
            factor: DEFAULT_CYQ_FACTOR,
            range: DEFAULT_CYQ_RANGE,
        }
    }
}

/// One day's prices converted to `Decimal`.
#[derive(Debug, Clone, Copy)]
struct DayPrices {
    high: Decimal,
    low: Decimal,
    avg: Decimal,
    /// Turnover as a fraction in `[0, 1]`.
    turnover: Decimal,
}

impl DayPrices {
    /// `None` when any input is not a finite number.
    fn from_candle(candle: &Candle) -> Option<Self> {
        let high = Decimal::from_f64(candle.high)?;
        let low = Decimal::from_f64(candle.low)?;
        let open = Decimal::from_f64(candle.open)?;
        let close = Decimal::from_f64(candle.close)?;
        let rate = Decimal::from_f64(candle.turnover_rate)?;
        Some(Self {
            high,
            low,
            avg: (open + close + high + low) / dec!(4),
            turnover: (rate / dec!(100)).max(Decimal::ZERO).min(Decimal::ONE),
        })
    }
}

/// Symmetric price band holding `percent` of all chips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcentrationBand {
    pub percent: f64,
    pub low: Decimal,
    pub high: Decimal,
    /// `(high - low) / (high + low)`; smaller means more concentrated.
    pub concentration: Decimal,
}

/// Chip distribution over a fixed bucket grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipDistribution {
    min_price: Decimal,
    accuracy: Decimal,
    masses: Vec<Decimal>,
}

impl ChipDistribution {
    /// Empty distribution covering `[min_price, max_price]` with `factor` buckets.
    pub fn new(min_price: Decimal, max_price: Decimal, factor: usize) -> Self {
        let factor = factor.max(2);
        let span = (max_price - min_price).max(Decimal::ZERO);
        let accuracy = (span / Decimal::from(factor - 1)).max(MIN_ACCURACY);
        Self {
            min_price,
            accuracy,
            masses: vec![Decimal::ZERO; factor],
        }
    }

    /// Build the distribution at `index` from the trailing `config.range`
    /// candles. `None` when no candle in the window has usable prices.
    pub fn compute(candles: &[Candle], index: usize, config: CyqConfig) -> Option<Self> {
        let end = index.min(candles.len().checked_sub(1)?);
        let start = (end + 1).saturating_sub(config.range.max(1));
        let days: Vec<DayPrices> = candles[start..=end]
            .iter()
            .filter_map(DayPrices::from_candle)
            .collect();

        let min_price = days.iter().map(|d| d.low).min()?;
        let max_price = days.iter().map(|d| d.high).max()?;

        let mut dist = Self::new(min_price, max_price, config.factor);
        for day in &days {
            dist.accumulate(day);
        }
        Some(dist)
    }

    /// Decay existing chips by the candle's turnover, then add its own.
    /// Candles without usable prices are ignored.
    pub fn add_day(&mut self, candle: &Candle) {
        if let Some(day) = DayPrices::from_candle(candle) {
            self.accumulate(&day);
        }
    }

    fn bucket_of(&self, price: Decimal) -> Option<usize> {
        ((price - self.min_price) / self.accuracy).floor().to_usize()
    }

    /// Put the whole day's turnover into the bucket holding its average price.
    fn add_spike(&mut self, day: &DayPrices) {
        let last = self.masses.len() - 1;
        let spike = Decimal::from(last) * day.turnover / dec!(2);
        let j = self.bucket_of(day.avg).unwrap_or(0);
        self.masses[j.min(last)] += spike;
    }

    fn accumulate(&mut self, day: &DayPrices) {
        let keep = Decimal::ONE - day.turnover;
        for mass in self.masses.iter_mut() {
            *mass *= keep;
        }

        let last = self.masses.len() - 1;

        if day.high == day.low {
            self.add_spike(day);
            return;
        }

        let peak = dec!(2) / (day.high - day.low);
        let from = ((day.low - self.min_price) / self.accuracy).ceil().max(Decimal::ZERO).to_usize();
        let to = ((day.high - self.min_price) / self.accuracy).floor().to_usize();
        let (Some(from), Some(to)) = (from, to) else {
            self.add_spike(day);
            return;
        };
        // Range narrower than one bucket: no grid point inside [low, high].
        if from > to.min(last) {
            self.add_spike(day);
            return;
        }

        for j in from..=to.min(last) {
            let price = self.min_price + self.accuracy * Decimal::from(j);
            let weight = if price <= day.avg {
                if (day.avg - day.low).abs() < EPSILON {
                    peak
                } else {
                    (price - day.low) / (day.avg - day.low) * peak
                }
            } else if (day.high - day.avg).abs() < EPSILON {
                peak
            } else {
                (day.high - price) / (day.high - day.avg) * peak
            };
            self.masses[j] += weight.max(Decimal::ZERO) * day.turnover;
        }
    }

    pub fn masses(&self) -> &[Decimal] {
        &self.masses
    }

    /// Price at the lower edge of bucket `i`.
    pub fn bucket_price(&self, i: usize) -> Decimal {
        self.min_price + self.accuracy * Decimal::from(i)
    }

    pub fn bucket_prices(&self) -> Vec<Decimal> {
        (0..self.masses.len()).map(|i| self.bucket_price(i)).collect()
    }

    pub fn accuracy(&self) -> Decimal {
        self.accuracy
    }

    pub fn total_mass(&self) -> Decimal {
        self.masses.iter().copied().sum()
    }

    /// Price of the first bucket at which cumulative mass exceeds `threshold`.
    pub fn cost_at_cumulative_mass(&self, threshold: Decimal) -> Option<Decimal> {
        let mut sum = Decimal::ZERO;
        for (i, &mass) in self.masses.iter().enumerate() {
            if sum + mass > threshold {
                return Some(self.bucket_price(i));
            }
            sum += mass;
        }
        None
    }

    /// Average cost: the price splitting chip mass in half.
    pub fn average_cost(&self) -> Option<Decimal> {
        self.cost_at_cumulative_mass(self.total_mass() / dec!(2))
    }

    /// Fraction of chips priced at or below `price`.
    pub fn profit_ratio(&self, price: Decimal) -> Decimal {
        let total = self.total_mass();
        if total.is_zero() {
            return Decimal::ZERO;
        }
        let below: Decimal = self
            .masses
            .iter()
            .enumerate()
            .filter(|(i, _)| price >= self.bucket_price(*i))
            .map(|(_, &m)| m)
            .sum();
        below / total
    }

    /// Band around the median holding `percent` of the chips.
    ///
    /// Fails when `percent` lies outside `[0, 1]`.
    pub fn concentration_band(&self, percent: f64) -> Result<ConcentrationBand> {
        if !(0.0..=1.0).contains(&percent) {
            return Err(AppError::PercentOutOfRange(percent));
        }
        let p = Decimal::from_f64(percent).ok_or(AppError::PercentOutOfRange(percent))?;
        let total = self.total_mass();
        let top = self.bucket_price(self.masses.len() - 1);

        let low = self
            .cost_at_cumulative_mass(total * (Decimal::ONE - p) / dec!(2))
            .unwrap_or(top);
        let high = self
            .cost_at_cumulative_mass(total * (Decimal::ONE + p) / dec!(2))
            .unwrap_or(top);

        let sum = low + high;
        let concentration = if sum.is_zero() {
            Decimal::ZERO
        } else {
            (high - low) / sum
        };

        Ok(ConcentrationBand {
            percent,
            low,
            high,
            concentration,
        })
    }

    /// Summary row at `close`.
    fn summary(&self, date: &str, close: f64) -> CyqRow {
        let to_value = |d: Decimal| IndicatorValue::from(d.to_f64());
        let ratio = Decimal::from_f64(close)
            .map(|price| to_value(self.profit_ratio(price)))
            .unwrap_or_default();
        let band90 = self.concentration_band(0.9).ok();
        let band70 = self.concentration_band(0.7).ok();

        CyqRow {
            date: date.to_string(),
            profit_ratio: ratio,
            avg_cost: self.average_cost().map(to_value).unwrap_or_default(),
            band90_low: band90.map(|b| to_value(b.low)).unwrap_or_default(),
            band90_high: band90.map(|b| to_value(b.high)).unwrap_or_default(),
            concentration90: band90.map(|b| to_value(b.concentration)).unwrap_or_default(),
            band70_low: band70.map(|b| to_value(b.low)).unwrap_or_default(),
            band70_high: band70.map(|b| to_value(b.high)).unwrap_or_default(),
            concentration70: band70.map(|b| to_value(b.concentration)).unwrap_or_default(),
        }
    }
}

/// CYQ indicator: one distribution summary per candle.
pub struct Cyq {
    config: CyqConfig,
}

impl Default for Cyq {
    fn default() -> Self {
        Self::new(CyqConfig::default())
    }
}

impl Cyq {
    pub fn new(config: CyqConfig) -> Self {
        Self { config }
    }

    /// Distribution summary at every candle.
    pub fn rows(&self, candles: &[Candle]) -> Vec<CyqRow> {
        candles
            .iter()
            .enumerate()
            .map(|(i, candle)| match ChipDistribution::compute(candles, i, self.config) {
                Some(dist) if !dist.total_mass().is_zero() => {
                    dist.summary(&candle.date, candle.close)
                }
                _ => empty_row(&candle.date),
            })
            .collect()
    }
}

fn empty_row(date: &str) -> CyqRow {
    CyqRow {
        date: date.to_string(),
        profit_ratio: IndicatorValue::Undefined,
        avg_cost: IndicatorValue::Undefined,
        band90_low: IndicatorValue::Undefined,
        band90_high: IndicatorValue::Undefined,
        concentration90: IndicatorValue::Undefined,
        band70_low: IndicatorValue::Undefined,
        band70_high: IndicatorValue::Undefined,
        concentration70: IndicatorValue::Undefined,
    }
}

impl Indicator for Cyq {
    fn id(&self) -> &str {
        "cyq"
    }

    fn name(&self) -> String {
        format!("CYQ ({}, {})", self.config.factor, self.config.range)
    }

    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Cyq
    }

    fn min_periods(&self) -> usize {
        1
    }

    fn compute(&self, candles: &[Candle]) -> IndicatorOutput {
        IndicatorOutput::Cyq(self.rows(candles))
    }
}
