//! Technical indicator implementations.

pub mod cyq;
pub mod dmi;
pub mod ma;
pub mod macd;
pub mod rsi;
pub mod sar;
pub mod volume_ma;

pub use cyq::{ChipDistribution, ConcentrationBand, Cyq, CyqConfig};
pub use dmi::Dmi;
pub use ma::{sma, MovingAverage};
pub use macd::{macd_points, Macd, MacdPoint};
pub use rsi::{rsi_accumulated, rsi_smoothed, Rsi, RsiVariant};
pub use sar::{Sar, SarState};
pub use volume_ma::VolumeMa;

use super::Indicator;
use crate::config::{IndicatorParams, RsiLine};
use crate::error::{AppError, Result};
use crate::types::{
    Candle, CyqRow, DmiRow, IndicatorOutput, IndicatorRow, IndicatorValue, MaRow, MacdRow, RsiRow,
    SarRow,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Indicator kinds available for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Rsi,
    Macd,
    Ma,
    VolumeMa,
    Sar,
    Dmi,
    Cyq,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 7] = [
        Self::Rsi,
        Self::Macd,
        Self::Ma,
        Self::VolumeMa,
        Self::Sar,
        Self::Dmi,
        Self::Cyq,
    ];

    /// Parse from string.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rsi" => Ok(Self::Rsi),
            "macd" => Ok(Self::Macd),
            "ma" | "sma" => Ok(Self::Ma),
            "volume_ma" | "mavol" | "vol" => Ok(Self::VolumeMa),
            "sar" => Ok(Self::Sar),
            "dmi" | "adx" => Ok(Self::Dmi),
            "cyq" => Ok(Self::Cyq),
            other => Err(AppError::UnknownIndicator(other.to_string())),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Rsi => "rsi",
            Self::Macd => "macd",
            Self::Ma => "ma",
            Self::VolumeMa => "volume_ma",
            Self::Sar => "sar",
            Self::Dmi => "dmi",
            Self::Cyq => "cyq",
        }
    }

    /// Build the indicator for this kind.
    pub fn build(&self, params: &IndicatorParams) -> Box<dyn Indicator> {
        match self {
            Self::Rsi => Box::new(Rsi::new(params.rsi_periods).with_variant(params.rsi_variant)),
            Self::Macd => Box::new(Macd::new()),
            Self::Ma => Box::new(MovingAverage::new(params.ma_periods.clone())),
            Self::VolumeMa => Box::new(VolumeMa::new(params.volume_ma_periods.clone())),
            Self::Sar => Box::new(Sar::default()),
            Self::Dmi => Box::new(Dmi::default()),
            Self::Cyq => Box::new(Cyq::new(params.cyq)),
        }
    }

    pub fn compute(&self, candles: &[Candle], params: &IndicatorParams) -> IndicatorOutput {
        self.build(params).compute(candles)
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Get all available indicators.
pub fn all_indicators(params: &IndicatorParams) -> Vec<Box<dyn Indicator>> {
    IndicatorKind::ALL.iter().map(|kind| kind.build(params)).collect()
}

/// Every indicator computed over one series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub rsi: Vec<RsiRow>,
    pub macd: Vec<MacdRow>,
    pub ma: Vec<MaRow>,
    pub ma_periods: Vec<usize>,
    pub volume_ma: Vec<MaRow>,
    pub sar: Vec<SarRow>,
    pub dmi: Vec<DmiRow>,
    pub cyq: Vec<CyqRow>,
}

impl IndicatorSet {
    /// Compute all indicators. They are independent given the same candles
    /// and run on the rayon pool.
    pub fn compute(candles: &[Candle], params: &IndicatorParams) -> Self {
        let rsi = Rsi::new(params.rsi_periods).with_variant(params.rsi_variant);
        let ma = MovingAverage::new(params.ma_periods.clone());
        let volume_ma = VolumeMa::new(params.volume_ma_periods.clone());
        let cyq = Cyq::new(params.cyq);

        let ((rsi_rows, macd_rows), ((ma_rows, volume_rows), (sar_rows, (dmi_rows, cyq_rows)))) =
            rayon::join(
                || rayon::join(|| rsi.rows(candles), || Macd::new().rows(candles)),
                || {
                    rayon::join(
                        || rayon::join(|| ma.rows(candles), || volume_ma.rows(candles)),
                        || {
                            rayon::join(
                                || Sar::default().rows(candles),
                                || rayon::join(|| Dmi::default().rows(candles), || cyq.rows(candles)),
                            )
                        },
                    )
                },
            );

        debug!("Computed indicators over {} candles", candles.len());

        Self {
            rsi: rsi_rows,
            macd: macd_rows,
            ma: ma_rows,
            ma_periods: params.ma_periods.clone(),
            volume_ma: volume_rows,
            sar: sar_rows,
            dmi: dmi_rows,
            cyq: cyq_rows,
        }
    }

    pub fn len(&self) -> usize {
        self.macd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }

    pub fn output(&self, kind: IndicatorKind) -> IndicatorOutput {
        match kind {
            IndicatorKind::Rsi => IndicatorOutput::Rsi(self.rsi.clone()),
            IndicatorKind::Macd => IndicatorOutput::Macd(self.macd.clone()),
            IndicatorKind::Ma => IndicatorOutput::Ma(self.ma.clone()),
            IndicatorKind::VolumeMa => IndicatorOutput::VolumeMa(self.volume_ma.clone()),
            IndicatorKind::Sar => IndicatorOutput::Sar(self.sar.clone()),
            IndicatorKind::Dmi => IndicatorOutput::Dmi(self.dmi.clone()),
            IndicatorKind::Cyq => IndicatorOutput::Cyq(self.cyq.clone()),
        }
    }

    /// Wire rows per indicator id, values rounded to `decimals`.
    pub fn to_wire(&self, decimals: u32) -> BTreeMap<String, Vec<IndicatorRow>> {
        IndicatorKind::ALL
            .iter()
            .map(|kind| (kind.id().to_string(), self.output(*kind).to_wire(decimals)))
            .collect()
    }

    /// One RSI line across the series.
    pub fn rsi_line(&self, line: RsiLine) -> Vec<IndicatorValue> {
        self.rsi
            .iter()
            .map(|row| match line {
                RsiLine::A => row.rsi_a,
                RsiLine::B => row.rsi_b,
                RsiLine::C => row.rsi_c,
            })
            .collect()
    }

    /// The close-price MA line for `period`, if it was computed.
    pub fn ma_line(&self, period: usize) -> Option<Vec<IndicatorValue>> {
        let column = self.ma_periods.iter().position(|&p| p == period)?;
        Some(self.ma.iter().map(|row| row.values[column]).collect())
    }
}
