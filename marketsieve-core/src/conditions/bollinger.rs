//! Bollinger band touch conditions.

use super::{Condition, ConditionResult};
use crate::domain::{closes, Bar};
use crate::indicators::bollinger;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_STD_MULT: f64 = 2.0;
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Close at or below the lower band, within a relative tolerance.
///
/// Matches when (close - lower) / lower <= tolerance, so a close just
/// above the band still counts as a touch.
#[derive(Debug, Clone)]
pub struct BbLowerTouch {
    period: usize,
    std_mult: f64,
    tolerance: f64,
    name: String,
}

impl BbLowerTouch {
    pub fn new(period: usize, std_mult: f64, tolerance: f64) -> Self {
        assert!(period >= 2, "BbLowerTouch period must be >= 2");
        Self {
            period,
            std_mult,
            tolerance,
            name: format!("bb_lower_touch_{period}d"),
        }
    }
}

impl Default for BbLowerTouch {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_STD_MULT, DEFAULT_TOLERANCE)
    }
}

impl Condition for BbLowerTouch {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.period + 50
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.period {
            return ConditionResult::insufficient_data(&self.name);
        }
        let bands = bollinger(&closes(bars), self.period, self.std_mult);
        let last = bars.len() - 1;
        let lower = bands.lower[last];
        if lower.is_nan() || lower <= 0.0 {
            return ConditionResult::insufficient_data(&self.name);
        }
        let close = bars[last].close;
        let distance = (close - lower) / lower;
        ConditionResult::new(&self.name, distance <= self.tolerance)
            .with_value("current_price", close)
            .with_value("lower_band", lower)
            .with_value("middle_band", bands.middle[last])
            .with_value("distance", distance)
    }
}

/// Close at or above the upper band, within a relative tolerance.
///
/// Matches when (upper - close) / upper <= tolerance.
#[derive(Debug, Clone)]
pub struct BbUpperTouch {
    period: usize,
    std_mult: f64,
    tolerance: f64,
    name: String,
}

impl BbUpperTouch {
    pub fn new(period: usize, std_mult: f64, tolerance: f64) -> Self {
        assert!(period >= 2, "BbUpperTouch period must be >= 2");
        Self {
            period,
            std_mult,
            tolerance,
            name: format!("bb_upper_touch_{period}d"),
        }
    }
}

impl Default for BbUpperTouch {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_STD_MULT, DEFAULT_TOLERANCE)
    }
}

impl Condition for BbUpperTouch {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.period + 50
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.period {
            return ConditionResult::insufficient_data(&self.name);
        }
        let bands = bollinger(&closes(bars), self.period, self.std_mult);
        let last = bars.len() - 1;
        let upper = bands.upper[last];
        if upper.is_nan() || upper <= 0.0 {
            return ConditionResult::insufficient_data(&self.name);
        }
        let close = bars[last].close;
        let distance = (upper - close) / upper;
        ConditionResult::new(&self.name, distance <= self.tolerance)
            .with_value("current_price", close)
            .with_value("upper_band", upper)
            .with_value("middle_band", bands.middle[last])
            .with_value("distance", distance)
    }
}
