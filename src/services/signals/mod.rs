//! Trading signals service module.
//!
//! Provides technical indicator calculations, RSI threshold classification,
//! MACD trend-state detection and MA55 breakthrough detection.

pub mod classifier;
pub mod indicators;
pub mod ma55;
pub mod trend_state;

pub use classifier::{classify, SignalClassifier, TimeWindow};
pub use indicators::{IndicatorKind, IndicatorSet};
pub use ma55::detect_ma55_breakthrough;
pub use trend_state::TrendStateDetector;

use crate::types::{Candle, IndicatorOutput};

/// Trait for implementing technical indicators.
///
/// Every indicator is a left-to-right scan producing exactly one row per
/// candle. Rows that lack history hold undefined values.
pub trait Indicator: Send + Sync {
    /// Unique identifier for this indicator.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> String;

    /// Kind used for dispatch.
    fn kind(&self) -> IndicatorKind;

    /// Number of candles needed before the first defined row.
    fn min_periods(&self) -> usize;

    /// Compute the indicator over a candle series.
    fn compute(&self, candles: &[Candle]) -> IndicatorOutput;
}

/// Closing prices of a candle slice.
pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
