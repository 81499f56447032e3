use crate::error::{AppError, Result};
use crate::types::{Market, Period};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trading suggestion derived from an RSI reading.
///
/// The serialized tokens are consumed verbatim by notification and
/// persistence collaborators and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suggestion {
    #[serde(rename = "必买")]
    MustBuy,
    #[serde(rename = "买入")]
    Buy,
    #[serde(rename = "卖出")]
    Sell,
    #[serde(rename = "必卖")]
    MustSell,
}

impl Suggestion {
    /// Get the stable display token.
    pub fn label(&self) -> &'static str {
        match self {
            Suggestion::MustBuy => "必买",
            Suggestion::Buy => "买入",
            Suggestion::Sell => "卖出",
            Suggestion::MustSell => "必卖",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Suggestion::MustBuy | Suggestion::Buy)
    }
}

/// MACD trend state. The states form a fixed cycle starting at `Weak`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendState {
    Weak,
    MediumStrong,
    ExtremelyStrong,
    Strong,
    MediumWeak,
    ExtremelyWeak,
}

impl TrendState {
    /// All states in cycle order.
    pub const CYCLE: [TrendState; 6] = [
        TrendState::Weak,
        TrendState::MediumStrong,
        TrendState::ExtremelyStrong,
        TrendState::Strong,
        TrendState::MediumWeak,
        TrendState::ExtremelyWeak,
    ];

    /// The state that follows this one in the cycle.
    pub fn next(&self) -> Self {
        match self {
            TrendState::Weak => TrendState::MediumStrong,
            TrendState::MediumStrong => TrendState::ExtremelyStrong,
            TrendState::ExtremelyStrong => TrendState::Strong,
            TrendState::Strong => TrendState::MediumWeak,
            TrendState::MediumWeak => TrendState::ExtremelyWeak,
            TrendState::ExtremelyWeak => TrendState::Weak,
        }
    }

    /// States entered by a golden cross and held while DIF stays above DEA.
    pub fn is_strong(&self) -> bool {
        matches!(
            self,
            TrendState::MediumStrong | TrendState::ExtremelyStrong | TrendState::Strong
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrendState::Weak => "弱势",
            TrendState::MediumStrong => "中强",
            TrendState::ExtremelyStrong => "极强",
            TrendState::Strong => "强势",
            TrendState::MediumWeak => "中弱",
            TrendState::ExtremelyWeak => "极弱",
        }
    }
}

/// A DIF/DEA crossing event that moves the trend cycle forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendEvent {
    /// DIF crosses above DEA while both are negative.
    LowGoldenCross,
    DifCrossAboveZero,
    DeaCrossAboveZero,
    /// DIF crosses below DEA while both are positive.
    HighDeadCross,
    DifCrossBelowZero,
    DeaCrossBelowZero,
}

impl TrendEvent {
    pub const ALL: [TrendEvent; 6] = [
        TrendEvent::LowGoldenCross,
        TrendEvent::DifCrossAboveZero,
        TrendEvent::DeaCrossAboveZero,
        TrendEvent::HighDeadCross,
        TrendEvent::DifCrossBelowZero,
        TrendEvent::DeaCrossBelowZero,
    ];

    /// The state this event transitions into.
    pub fn target_state(&self) -> TrendState {
        match self {
            TrendEvent::LowGoldenCross => TrendState::MediumStrong,
            TrendEvent::DifCrossAboveZero => TrendState::ExtremelyStrong,
            TrendEvent::DeaCrossAboveZero => TrendState::Strong,
            TrendEvent::HighDeadCross => TrendState::MediumWeak,
            TrendEvent::DifCrossBelowZero => TrendState::ExtremelyWeak,
            TrendEvent::DeaCrossBelowZero => TrendState::Weak,
        }
    }
}

/// Whether a golden cross is the first one in the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossOccurrence {
    First,
    Latest,
}

/// Result of trend-state detection at one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReading {
    pub state: TrendState,
    /// Event the state was inferred from. `None` when the quadrant fallback
    /// was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TrendEvent>,
    /// Rows between the trigger and the evaluated row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods_ago: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden_cross: Option<CrossOccurrence>,
}

/// Close-over-MA55 breakthrough classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ma55Breakthrough {
    FirstBreakThrough,
    LatestBreakThrough,
}

/// A classified signal at one candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub code: String,
    pub market: Market,
    pub period: Period,
    /// Candle date the signal fired on.
    pub timestamp: String,
    pub index: usize,
    /// Close price at the signal candle.
    pub price: f64,
    pub rsi_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_state: Option<TrendReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma55_breakthrough: Option<Ma55Breakthrough>,
    /// Profit at the signal's own session close. For daily candles that
    /// close is the entry price, so the value is always `0.0`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtest_today_profit_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtest_next_day_profit_pct: Option<f64>,
}

/// RSI thresholds for one market and period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub must_buy: f64,
    pub buy: f64,
    pub sell: f64,
    pub must_sell: f64,
}

impl Thresholds {
    /// Create a validated quadruple (`must_buy <= buy < sell <= must_sell`).
    pub fn new(must_buy: f64, buy: f64, sell: f64, must_sell: f64) -> Result<Self> {
        let thresholds = Self {
            must_buy,
            buy,
            sell,
            must_sell,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        let ordered = self.must_buy <= self.buy && self.buy < self.sell && self.sell <= self.must_sell;
        if ordered {
            Ok(())
        } else {
            Err(AppError::InvalidThresholds(format!(
                "expected mustBuy <= buy < sell <= mustSell, got {}/{}/{}/{}",
                self.must_buy, self.buy, self.sell, self.must_sell
            )))
        }
    }
}

/// One entry of a threshold override file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdEntry {
    pub market: Market,
    pub period: Period,
    #[serde(flatten)]
    pub thresholds: Thresholds,
}

/// Static `(market, period)` threshold table. Read-only during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    entries: HashMap<(Market, Period), Thresholds>,
}

impl ThresholdTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, market: Market, period: Period) -> Option<&Thresholds> {
        self.entries.get(&(market, period))
    }

    /// Insert or replace an entry after validating it.
    pub fn insert(&mut self, market: Market, period: Period, thresholds: Thresholds) -> Result<()> {
        thresholds.validate()?;
        self.entries.insert((market, period), thresholds);
        Ok(())
    }

    /// Apply override entries on top of this table.
    pub fn apply(&mut self, overrides: &[ThresholdEntry]) -> Result<()> {
        for entry in overrides {
            self.insert(entry.market, entry.period, entry.thresholds)?;
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<ThresholdEntry> {
        let mut entries: Vec<ThresholdEntry> = self
            .entries
            .iter()
            .map(|(&(market, period), &thresholds)| ThresholdEntry {
                market,
                period,
                thresholds,
            })
            .collect();
        entries.sort_by_key(|e| (e.market.name(), e.period.klt()));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        use Market::*;
        use Period::*;

        // (market, period, mustBuy, buy, sell, mustSell)
        let rows: [(Market, Period, f64, f64, f64, f64); 15] = [
            (A, Min5, 10.0, 20.0, 80.0, 90.0),
            (A, Min15, 12.0, 20.0, 80.0, 88.0),
            (A, Min30, 15.0, 20.0, 80.0, 85.0),
            (A, Min60, 15.0, 20.0, 78.0, 85.0),
            (A, Day, 15.0, 20.0, 75.0, 80.0),
            (Hk, Min5, 10.0, 18.0, 82.0, 90.0),
            (Hk, Min15, 12.0, 20.0, 80.0, 88.0),
            (Hk, Min30, 15.0, 22.0, 78.0, 85.0),
            (Hk, Min60, 15.0, 22.0, 78.0, 85.0),
            (Hk, Day, 15.0, 20.0, 75.0, 80.0),
            (Us, Min5, 10.0, 20.0, 80.0, 90.0),
            (Us, Min15, 12.0, 20.0, 80.0, 88.0),
            (Us, Min30, 15.0, 20.0, 80.0, 85.0),
            (Us, Min60, 15.0, 22.0, 78.0, 85.0),
            (Us, Day, 18.0, 25.0, 72.0, 80.0),
        ];

        let entries = rows
            .into_iter()
            .map(|(market, period, must_buy, buy, sell, must_sell)| {
                (
                    (market, period),
                    Thresholds {
                        must_buy,
                        buy,
                        sell,
                        must_sell,
                    },
                )
            })
            .collect();

        Self { entries }
    }
}
