//! Close-over-MA55 breakthrough detection.

use crate::types::{IndicatorValue, Ma55Breakthrough};

pub const MA55_PERIOD: usize = 55;
pub const DEFAULT_MA55_LOOKBACK: usize = 5;

fn breaks_through(close: f64, ma: IndicatorValue) -> bool {
    ma.value().is_some_and(|ma| close >= ma)
}

/// Classify the breakthrough at `index`.
///
/// Emits nothing unless `close >= MA55` at `index`. The breakthrough is the
/// first one when none of the previous `lookback` rows also closed at or
/// above their MA55.
pub fn detect_ma55_breakthrough(
    closes: &[f64],
    ma55: &[IndicatorValue],
    index: usize,
    lookback: usize,
) -> Option<Ma55Breakthrough> {
    let at = |i: usize| match (closes.get(i), ma55.get(i)) {
        (Some(&close), Some(&ma)) => breaks_through(close, ma),
        _ => false,
    };

    if !at(index) {
        return None;
    }

    let repeated = (index.saturating_sub(lookback)..index).any(at);
    if repeated {
        Some(Ma55Breakthrough::LatestBreakThrough)
    } else {
        Some(Ma55Breakthrough::FirstBreakThrough)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::sma;

    fn line(values: &[f64]) -> Vec<IndicatorValue> {
        values.iter().map(|&v| IndicatorValue::new(v)).collect()
    }

    #[test]
    fn test_no_breakthrough_below_ma() {
        let closes = [9.0, 9.0, 9.0];
        let ma = line(&[10.0, 10.0, 10.0]);
        assert_eq!(detect_ma55_breakthrough(&closes, &ma, 2, 5), None);
    }

    #[test]
    fn test_first_breakthrough() {
        let closes = [9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 10.0];
        let ma = line(&[10.0; 7]);
        assert_eq!(
            detect_ma55_breakthrough(&closes, &ma, 6, 5),
            Some(Ma55Breakthrough::FirstBreakThrough)
        );
    }

    #[test]
    fn test_latest_breakthrough() {
        let closes = [9.0, 11.0, 9.0, 9.0, 9.0, 9.0, 10.5];
        let ma = line(&[10.0; 7]);
        assert_eq!(
            detect_ma55_breakthrough(&closes, &ma, 6, 5),
            Some(Ma55Breakthrough::LatestBreakThrough)
        );
        // The earlier breakthrough at row 1 is outside a 4-row lookback.
        assert_eq!(
            detect_ma55_breakthrough(&closes, &ma, 6, 4),
            Some(Ma55Breakthrough::FirstBreakThrough)
        );
    }

    #[test]
    fn test_undefined_ma_never_breaks() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64 * 0.1).collect();
        let ma = sma(&closes, MA55_PERIOD);
        assert_eq!(detect_ma55_breakthrough(&closes, &ma, 53, 5), None);
        // First defined MA55 row: earlier rows have no MA and do not count.
        assert_eq!(
            detect_ma55_breakthrough(&closes, &ma, 54, 5),
            Some(Ma55Breakthrough::FirstBreakThrough)
        );
        assert_eq!(
            detect_ma55_breakthrough(&closes, &ma, 59, 5),
            Some(Ma55Breakthrough::LatestBreakThrough)
        );
    }

    #[test]
    fn test_out_of_range_index() {
        assert_eq!(detect_ma55_breakthrough(&[1.0], &line(&[1.0]), 3, 5), None);
    }
}
