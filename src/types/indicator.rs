use serde::de::{self, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wire marker for a value that cannot be computed yet.
pub const UNDEFINED_MARKER: &str = "-";

/// A single indicator reading: a finite number or undefined.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum IndicatorValue {
    Value(f64),
    #[default]
    Undefined,
}

impl IndicatorValue {
    /// Wrap a raw computation result. `NaN` and infinities become undefined.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value)
        } else {
            Self::Undefined
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Round to `decimals` places.
    pub fn round(self, decimals: u32) -> Self {
        match self {
            Self::Value(v) => {
                let factor = 10f64.powi(decimals as i32);
                Self::new((v * factor).round() / factor)
            }
            Self::Undefined => Self::Undefined,
        }
    }
}

impl From<Option<f64>> for IndicatorValue {
    fn from(value: Option<f64>) -> Self {
        value.map(Self::new).unwrap_or(Self::Undefined)
    }
}

impl Serialize for IndicatorValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::Undefined => serializer.serialize_str(UNDEFINED_MARKER),
        }
    }
}

struct IndicatorValueVisitor;

impl<'de> Visitor<'de> for IndicatorValueVisitor {
    type Value = IndicatorValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a number or \"{}\"", UNDEFINED_MARKER)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<IndicatorValue, E> {
        Ok(IndicatorValue::new(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<IndicatorValue, E> {
        Ok(IndicatorValue::new(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<IndicatorValue, E> {
        Ok(IndicatorValue::new(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<IndicatorValue, E> {
        if v == UNDEFINED_MARKER {
            return Ok(IndicatorValue::Undefined);
        }
        v.parse::<f64>()
            .map(IndicatorValue::new)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_unit<E: de::Error>(self) -> Result<IndicatorValue, E> {
        Ok(IndicatorValue::Undefined)
    }
}

impl<'de> Deserialize<'de> for IndicatorValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IndicatorValueVisitor)
    }
}

/// Wire row: `[date, value, value, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub date: String,
    pub values: Vec<IndicatorValue>,
}

impl Serialize for IndicatorRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len() + 1))?;
        seq.serialize_element(&self.date)?;
        for value in &self.values {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

/// RSI row for the three smoothing periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsiRow {
    pub date: String,
    pub rsi_a: IndicatorValue,
    pub rsi_b: IndicatorValue,
    pub rsi_c: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdRow {
    pub date: String,
    pub dif: IndicatorValue,
    pub dea: IndicatorValue,
    pub histogram: IndicatorValue,
}

/// Moving average row, one value per configured period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaRow {
    pub date: String,
    pub values: Vec<IndicatorValue>,
}

/// Parabolic SAR trend direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SarDirection {
    Up,
    Down,
}

impl SarDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Numeric wire encoding: 1 for up, -1 for down.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Up => 1.0,
            Self::Down => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarRow {
    pub date: String,
    pub sar: IndicatorValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<SarDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmiRow {
    pub date: String,
    pub pdi: IndicatorValue,
    pub mdi: IndicatorValue,
    pub adx: IndicatorValue,
    pub adxr: IndicatorValue,
}

/// Chip distribution summary at one candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyqRow {
    pub date: String,
    /// Fraction of chips priced at or below the close.
    pub profit_ratio: IndicatorValue,
    pub avg_cost: IndicatorValue,
    pub band90_low: IndicatorValue,
    pub band90_high: IndicatorValue,
    pub concentration90: IndicatorValue,
    pub band70_low: IndicatorValue,
    pub band70_high: IndicatorValue,
    pub concentration70: IndicatorValue,
}

/// Output of one indicator over a whole series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum IndicatorOutput {
    Rsi(Vec<RsiRow>),
    Macd(Vec<MacdRow>),
    Ma(Vec<MaRow>),
    VolumeMa(Vec<MaRow>),
    Sar(Vec<SarRow>),
    Dmi(Vec<DmiRow>),
    Cyq(Vec<CyqRow>),
}

impl IndicatorOutput {
    pub fn len(&self) -> usize {
        match self {
            Self::Rsi(rows) => rows.len(),
            Self::Macd(rows) => rows.len(),
            Self::Ma(rows) | Self::VolumeMa(rows) => rows.len(),
            Self::Sar(rows) => rows.len(),
            Self::Dmi(rows) => rows.len(),
            Self::Cyq(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into `[date, ...values]` rows, rounding to `decimals`.
    ///
    /// Ratios carry two extra places so fractions stay readable.
    pub fn to_wire(&self, decimals: u32) -> Vec<IndicatorRow> {
        let r = |v: IndicatorValue| v.round(decimals);
        let ratio = |v: IndicatorValue| v.round(decimals + 2);
        match self {
            Self::Rsi(rows) => rows
                .iter()
                .map(|row| IndicatorRow {
                    date: row.date.clone(),
                    values: vec![r(row.rsi_a), r(row.rsi_b), r(row.rsi_c)],
                })
                .collect(),
            Self::Macd(rows) => rows
                .iter()
                .map(|row| IndicatorRow {
                    date: row.date.clone(),
                    values: vec![ratio(row.dif), ratio(row.dea), ratio(row.histogram)],
                })
                .collect(),
            Self::Ma(rows) | Self::VolumeMa(rows) => rows
                .iter()
                .map(|row| IndicatorRow {
                    date: row.date.clone(),
                    values: row.values.iter().copied().map(r).collect(),
                })
                .collect(),
            Self::Sar(rows) => rows
                .iter()
                .map(|row| IndicatorRow {
                    date: row.date.clone(),
                    values: vec![
                        r(row.sar),
                        row.direction.map(SarDirection::as_f64).into(),
                    ],
                })
                .collect(),
            Self::Dmi(rows) => rows
                .iter()
                .map(|row| IndicatorRow {
                    date: row.date.clone(),
                    values: vec![r(row.pdi), r(row.mdi), r(row.adx), r(row.adxr)],
                })
                .collect(),
            Self::Cyq(rows) => rows
                .iter()
                .map(|row| IndicatorRow {
                    date: row.date.clone(),
                    values: vec![
                        ratio(row.profit_ratio),
                        r(row.avg_cost),
                        r(row.band90_low),
                        r(row.band90_high),
                        ratio(row.concentration90),
                        r(row.band70_low),
                        r(row.band70_high),
                        ratio(row.concentration70),
                    ],
                })
                .collect(),
        }
    }
}
