//! MACD trend-state detection.
//!
//! The trend moves through a fixed six-state cycle driven by DIF/DEA
//! crossings. The detector scans a short lookback for the most recent
//! crossing event, infers the state it leads into and checks that the
//! current DIF/DEA pattern still agrees. Otherwise the state is read
//! straight from the current DIF/DEA quadrant.

use crate::types::{CrossOccurrence, MacdRow, TrendEvent, TrendReading, TrendState};

pub const DEFAULT_TREND_LOOKBACK: usize = 7;

/// DIF at or above DEA.
fn is_golden(dif: f64, dea: f64) -> bool {
    dif >= dea
}

/// State implied by the signs and order of DIF and DEA alone.
pub fn quadrant_state(dif: f64, dea: f64) -> TrendState {
    match (dif >= 0.0, dea >= 0.0) {
        (false, false) if is_golden(dif, dea) => TrendState::MediumStrong,
        (false, false) => TrendState::Weak,
        (true, false) => TrendState::ExtremelyStrong,
        (true, true) if is_golden(dif, dea) => TrendState::Strong,
        (true, true) => TrendState::MediumWeak,
        (false, true) => TrendState::ExtremelyWeak,
    }
}

/// Whether `event` happened between `prev` and `cur` (each `(dif, dea)`).
fn occurred(event: TrendEvent, prev: (f64, f64), cur: (f64, f64)) -> bool {
    let (d0, e0) = prev;
    let (d1, e1) = cur;
    match event {
        TrendEvent::LowGoldenCross => !is_golden(d0, e0) && is_golden(d1, e1) && d1 < 0.0 && e1 < 0.0,
        TrendEvent::DifCrossAboveZero => d0 < 0.0 && d1 >= 0.0,
        TrendEvent::DeaCrossAboveZero => e0 < 0.0 && e1 >= 0.0,
        TrendEvent::HighDeadCross => is_golden(d0, e0) && !is_golden(d1, e1) && d1 > 0.0 && e1 > 0.0,
        TrendEvent::DifCrossBelowZero => d0 >= 0.0 && d1 < 0.0,
        TrendEvent::DeaCrossBelowZero => e0 >= 0.0 && e1 < 0.0,
    }
}

/// Whether the current DIF/DEA still matches `state`: the sign pattern of
/// the state and its cross polarity (golden for strong states, dead for
/// weak ones).
fn consistent(state: TrendState, dif: f64, dea: f64) -> bool {
    if state.is_strong() != is_golden(dif, dea) {
        return false;
    }
    match state {
        TrendState::MediumStrong => dif < 0.0,
        TrendState::ExtremelyStrong => dif >= 0.0 && dea < 0.0,
        TrendState::Strong => dea >= 0.0,
        TrendState::MediumWeak => dif >= 0.0,
        TrendState::ExtremelyWeak => dif < 0.0 && dea >= 0.0,
        TrendState::Weak => dea < 0.0,
    }
}

fn dif_dea(row: &MacdRow) -> Option<(f64, f64)> {
    Some((row.dif.value()?, row.dea.value()?))
}

/// Trend-state detector over MACD rows.
#[derive(Debug, Clone, Copy)]
pub struct TrendStateDetector {
    lookback: usize,
}

impl Default for TrendStateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TREND_LOOKBACK)
    }
}

impl TrendStateDetector {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Events found at row `k`, comparing rows `k - 1` and `k`.
    fn events_at(&self, macd: &[MacdRow], k: usize) -> Vec<TrendEvent> {
        if k == 0 {
            return Vec::new();
        }
        let (Some(prev), Some(cur)) = (dif_dea(&macd[k - 1]), dif_dea(&macd[k])) else {
            return Vec::new();
        };
        TrendEvent::ALL
            .into_iter()
            .filter(|&event| occurred(event, prev, cur))
            .collect()
    }

    /// Detect the trend state at `index`. `None` when the row is missing or
    /// its DIF/DEA are undefined.
    pub fn detect(&self, macd: &[MacdRow], index: usize) -> Option<TrendReading> {
        let (dif, dea) = dif_dea(macd.get(index)?)?;
        let first = (index + 1).saturating_sub(self.lookback);

        let mut golden_crosses = 0usize;
        let mut latest: Option<(usize, Vec<TrendEvent>)> = None;
        for k in first..=index {
            let events = self.events_at(macd, k);
            if events.contains(&TrendEvent::LowGoldenCross) {
                golden_crosses += 1;
            }
            if !events.is_empty() {
                latest = Some((k, events));
            }
        }

        let inferred = latest.and_then(|(k, events)| {
            events
                .into_iter()
                .find(|event| consistent(event.target_state(), dif, dea))
                .map(|event| (k, event))
        });

        let reading = match inferred {
            Some((k, event)) => TrendReading {
                state: event.target_state(),
                trigger: Some(event),
                periods_ago: Some(index - k),
                golden_cross: (event == TrendEvent::LowGoldenCross).then(|| {
                    if golden_crosses > 1 {
                        CrossOccurrence::Latest
                    } else {
                        CrossOccurrence::First
                    }
                }),
            },
            None => TrendReading {
                state: quadrant_state(dif, dea),
                trigger: None,
                periods_ago: None,
                golden_cross: None,
            },
        };

        Some(reading)
    }

    /// Detect at every row.
    pub fn detect_all(&self, macd: &[MacdRow]) -> Vec<Option<TrendReading>> {
        (0..macd.len()).map(|i| self.detect(macd, i)).collect()
    }
}
