//! Moving-average conditions: touch, distance, and crossovers.
//!
//! Lookback convention: `period + 50` padding so the MA has settled well
//! before the last bar; crossovers use `max(short, long) + 50`.

use super::{Condition, ConditionResult};
use crate::domain::{closes, Bar};
use crate::indicators::sma;

/// Close within `tolerance` (fractional) of the period MA.
#[derive(Debug, Clone)]
pub struct MaTouch {
    period: usize,
    tolerance: f64,
    name: String,
}

impl MaTouch {
    pub const DEFAULT_PERIOD: usize = 20;
    pub const DEFAULT_TOLERANCE: f64 = 0.02;

    pub fn new(period: usize, tolerance: f64) -> Self {
        assert!(period >= 1, "MaTouch period must be >= 1");
        Self {
            period,
            tolerance,
            name: format!("ma_touch_{period}d"),
        }
    }
}

impl Default for MaTouch {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD, Self::DEFAULT_TOLERANCE)
    }
}

impl Condition for MaTouch {
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
        let close = closes(bars);
        let ma = sma(&close, self.period);
        let current = close[close.len() - 1];
        let ma_value = ma[ma.len() - 1];
        if ma_value.is_nan() || ma_value == 0.0 {
            return ConditionResult::insufficient_data(&self.name);
        }

        let distance_pct = (current - ma_value).abs() / ma_value;
        ConditionResult::new(&self.name, distance_pct <= self.tolerance)
            .with_value("current_price", current)
            .with_value("ma_value", ma_value)
            .with_value("ma_period", self.period as f64)
            .with_value("distance_pct", distance_pct)
            .with_value("tolerance", self.tolerance)
    }
}

/// Close above the period MA by at least `min_distance_pct` (fractional).
#[derive(Debug, Clone)]
pub struct AboveMa {
    period: usize,
    min_distance_pct: f64,
    name: String,
}

impl AboveMa {
    pub fn new(period: usize, min_distance_pct: f64) -> Self {
        assert!(period >= 1, "AboveMa period must be >= 1");
        Self {
            period,
            min_distance_pct,
            name: format!("above_ma_{period}d"),
        }
    }
}

impl Condition for AboveMa {
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
        let close = closes(bars);
        let ma = sma(&close, self.period);
        let current = close[close.len() - 1];
        let ma_value = ma[ma.len() - 1];
        if ma_value.is_nan() || ma_value == 0.0 {
            return ConditionResult::insufficient_data(&self.name);
        }

        let distance_pct = (current - ma_value) / ma_value;
        ConditionResult::new(&self.name, distance_pct >= self.min_distance_pct)
            .with_value("current_price", current)
            .with_value("ma_value", ma_value)
            .with_value("ma_period", self.period as f64)
            .with_value("distance_pct", distance_pct)
    }
}

/// Close below the period MA by at least `max_distance_pct` (fractional,
/// usually zero or negative).
#[derive(Debug, Clone)]
pub struct BelowMa {
    period: usize,
    max_distance_pct: f64,
    name: String,
}

impl BelowMa {
    pub fn new(period: usize, max_distance_pct: f64) -> Self {
        assert!(period >= 1, "BelowMa period must be >= 1");
        Self {
            period,
            max_distance_pct,
            name: format!("below_ma_{period}d"),
        }
    }
}

impl Condition for BelowMa {
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
        let close = closes(bars);
        let ma = sma(&close, self.period);
        let current = close[close.len() - 1];
        let ma_value = ma[ma.len() - 1];
        if ma_value.is_nan() || ma_value == 0.0 {
            return ConditionResult::insufficient_data(&self.name);
        }

        let distance_pct = (current - ma_value) / ma_value;
        ConditionResult::new(&self.name, distance_pct <= self.max_distance_pct)
            .with_value("current_price", current)
            .with_value("ma_value", ma_value)
            .with_value("ma_period", self.period as f64)
            .with_value("distance_pct", distance_pct)
    }
}

/// Which direction a crossover scan looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrossDirection {
    Up,
    Down,
}

/// Shared crossover scan: walk back through the last `lookback_days` bars
/// and report the first (most recent) bar where the short MA crossed the
/// long MA in `direction`. `cross_day` counts bars back from today (1 =
/// crossed on today's bar).
fn scan_cross(
    name: &str,
    bars: &[Bar],
    short_period: usize,
    long_period: usize,
    lookback_days: usize,
    direction: CrossDirection,
) -> ConditionResult {
    if bars.len() < long_period + lookback_days {
        return ConditionResult::insufficient_data(name);
    }
    let close = closes(bars);
    let short_ma = sma(&close, short_period);
    let long_ma = sma(&close, long_period);
    let n = close.len();

    let mut cross_day = None;
    for i in 1..=lookback_days {
        let prev_short = short_ma[n - i - 1];
        let prev_long = long_ma[n - i - 1];
        let curr_short = short_ma[n - i];
        let curr_long = long_ma[n - i];
        if prev_short.is_nan() || prev_long.is_nan() || curr_short.is_nan() || curr_long.is_nan() {
            continue;
        }
        let crossed = match direction {
            CrossDirection::Up => prev_short <= prev_long && curr_short > curr_long,
            CrossDirection::Down => prev_short >= prev_long && curr_short < curr_long,
        };
        if crossed {
            cross_day = Some(i);
            break;
        }
    }

    let mut result = ConditionResult::new(name, cross_day.is_some())
        .with_value("short_ma", short_ma[n - 1])
        .with_value("long_ma", long_ma[n - 1])
        .with_value("short_period", short_period as f64)
        .with_value("long_period", long_period as f64);
    if let Some(day) = cross_day {
        result = result.with_value("cross_day", day as f64);
    }
    result
}

/// Golden cross: short MA crossed above long MA within the last
/// `lookback_days` bars.
#[derive(Debug, Clone)]
pub struct MaCrossUp {
    short_period: usize,
    long_period: usize,
    lookback_days: usize,
    name: String,
}

impl MaCrossUp {
    pub fn new(short_period: usize, long_period: usize, lookback_days: usize) -> Self {
        assert!(
            short_period >= 1 && long_period > short_period,
            "MaCrossUp requires 1 <= short < long"
        );
        assert!(lookback_days >= 1, "MaCrossUp lookback_days must be >= 1");
        Self {
            short_period,
            long_period,
            lookback_days,
            name: format!("ma_cross_up_{short_period}_{long_period}"),
        }
    }
}

impl Condition for MaCrossUp {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.long_period.max(self.short_period) + 50
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        scan_cross(
            &self.name,
            bars,
            self.short_period,
            self.long_period,
            self.lookback_days,
            CrossDirection::Up,
        )
    }
}

/// Dead cross: short MA crossed below long MA within the last
/// `lookback_days` bars.
#[derive(Debug, Clone)]
pub struct MaCrossDown {
    short_period: usize,
    long_period: usize,
    lookback_days: usize,
    name: String,
}

impl MaCrossDown {
    pub fn new(short_period: usize, long_period: usize, lookback_days: usize) -> Self {
        assert!(
            short_period >= 1 && long_period > short_period,
            "MaCrossDown requires 1 <= short < long"
        );
        assert!(lookback_days >= 1, "MaCrossDown lookback_days must be >= 1");
        Self {
            short_period,
            long_period,
            lookback_days,
            name: format!("ma_cross_down_{short_period}_{long_period}"),
        }
    }
}

impl Condition for MaCrossDown {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.long_period.max(self.short_period) + 50
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        scan_cross(
            &self.name,
            bars,
            self.short_period,
            self.long_period,
            self.lookback_days,
            CrossDirection::Down,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn ma_touch_exact_ma_has_zero_distance() {
        // Closes chosen so close[-1] == sma20 exactly: constant series.
        let bars = make_bars(&[100.0; 30]);
        let result = MaTouch::new(20, 0.02).evaluate("TEST", &bars);
        assert!(result.matched);
        assert_eq!(result.value("distance_pct"), Some(0.0));
    }

    #[test]
    fn ma_touch_outside_tolerance() {
        // 29 bars at 100, last bar at 110: ma20 ≈ 100.5, distance ≈ 9.4%
        let mut closes = vec![100.0; 30];
        closes[29] = 110.0;
        let bars = make_bars(&closes);
        let result = MaTouch::new(20, 0.02).evaluate("TEST", &bars);
        assert!(!result.matched);
        assert!(result.value("distance_pct").unwrap() > 0.02);
    }

    #[test]
    fn above_ma_positive_distance() {
        let mut closes = vec![100.0; 30];
        closes[29] = 110.0;
        let bars = make_bars(&closes);
        assert!(AboveMa::new(20, 0.0).evaluate("TEST", &bars).matched);
        assert!(!BelowMa::new(20, 0.0).evaluate("TEST", &bars).matched);
    }

    #[test]
    fn below_ma_negative_distance() {
        let mut closes = vec![100.0; 30];
        closes[29] = 90.0;
        let bars = make_bars(&closes);
        assert!(BelowMa::new(20, 0.0).evaluate("TEST", &bars).matched);
        assert!(!AboveMa::new(20, 0.0).evaluate("TEST", &bars).matched);
    }

    /// Series where the 5-bar MA crosses above the 20-bar MA exactly two
    /// bars before the end.
    ///
    /// Steady decline (140, 139, ..., 103) keeps ma5 below ma20; a jump
    /// to 160 on the last two bars lifts ma5 through ma20 on the bar 37
    /// to bar 38 transition: ma5 goes 105.0 -> 115.6 while ma20 goes
    /// 112.5 -> 114.4.
    fn cross_up_series() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..40).map(|i| 140.0 - i as f64).collect();
        closes[38] = 160.0;
        closes[39] = 160.0;
        closes
    }

    #[test]
    fn ma_cross_up_reports_cross_day() {
        let bars = make_bars(&cross_up_series());
        let result = MaCrossUp::new(5, 20, 5).evaluate("TEST", &bars);
        assert!(result.matched, "expected a cross: {result:?}");
        assert_eq!(result.value("cross_day"), Some(2.0));
    }

    #[test]
    fn ma_cross_up_no_cross_no_match() {
        let bars = make_bars(&[100.0; 40]);
        let result = MaCrossUp::new(5, 20, 5).evaluate("TEST", &bars);
        assert!(!result.matched);
        assert_eq!(result.value("cross_day"), None);
    }

    #[test]
    fn ma_cross_down_mirrors_up() {
        // Mirror the rally into a selloff.
        let closes: Vec<f64> = cross_up_series().iter().map(|c| 200.0 - c).collect();
        let bars = make_bars(&closes);
        assert!(MaCrossDown::new(5, 20, 5).evaluate("TEST", &bars).matched);
        assert!(!MaCrossUp::new(5, 20, 5).evaluate("TEST", &bars).matched);
    }

    #[test]
    fn cross_short_series_degrades() {
        let bars = make_bars(&[100.0; 10]);
        let result = MaCrossUp::new(5, 20, 5).evaluate("TEST", &bars);
        assert!(!result.matched);
        assert!(result.error.is_some());
    }

    #[test]
    fn lookbacks_follow_convention() {
        assert_eq!(MaTouch::new(20, 0.02).required_lookback(), 70);
        assert_eq!(MaCrossUp::new(20, 60, 5).required_lookback(), 110);
    }
}
