//! Volume conditions: absolute floor, above-average, and spike.
//!
//! `VolumeAboveAvg` averages the last `period` bars including today;
//! `VolumeSpike` averages the `period` bars before today. A spike is a
//! one-day anomaly, so today must not dilute its own baseline.

use super::{Condition, ConditionResult};
use crate::domain::Bar;

pub const DEFAULT_AVG_PERIOD: usize = 20;
pub const DEFAULT_AVG_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_SPIKE_MULTIPLIER: f64 = 2.0;

/// Today's volume at or above an absolute share count.
#[derive(Debug, Clone)]
pub struct MinVolume {
    min_volume: u64,
    name: String,
}

impl MinVolume {
    pub fn new(min_volume: u64) -> Self {
        Self {
            min_volume,
            name: format!("min_volume_{min_volume}"),
        }
    }
}

impl Condition for MinVolume {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        1
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        let Some(last) = bars.last() else {
            return ConditionResult::insufficient_data(&self.name);
        };
        ConditionResult::new(&self.name, last.volume >= self.min_volume)
            .with_value("current_volume", last.volume as f64)
            .with_value("min_volume", self.min_volume as f64)
    }
}

/// Today's volume at or above `multiplier` times the trailing average.
///
/// The average window includes today.
#[derive(Debug, Clone)]
pub struct VolumeAboveAvg {
    period: usize,
    multiplier: f64,
    name: String,
}

impl VolumeAboveAvg {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "VolumeAboveAvg period must be >= 1");
        Self {
            period,
            multiplier,
            name: format!("volume_above_avg_{multiplier}x"),
        }
    }
}

impl Default for VolumeAboveAvg {
    fn default() -> Self {
        Self::new(DEFAULT_AVG_PERIOD, DEFAULT_AVG_MULTIPLIER)
    }
}

impl Condition for VolumeAboveAvg {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.period + 10
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.period {
            return ConditionResult::insufficient_data(&self.name);
        }
        let window = &bars[bars.len() - self.period..];
        let avg = window.iter().map(|b| b.volume as f64).sum::<f64>() / self.period as f64;
        if avg == 0.0 {
            return ConditionResult::degraded(&self.name, "zero average volume");
        }
        let current = bars[bars.len() - 1].volume as f64;
        let ratio = current / avg;
        ConditionResult::new(&self.name, ratio >= self.multiplier)
            .with_value("current_volume", current)
            .with_value("avg_volume", avg)
            .with_value("ratio", ratio)
    }
}

/// Today's volume at or above `multiplier` times the average of the
/// `period` bars *before* today.
#[derive(Debug, Clone)]
pub struct VolumeSpike {
    period: usize,
    multiplier: f64,
    name: String,
}

impl VolumeSpike {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "VolumeSpike period must be >= 1");
        Self {
            period,
            multiplier,
            name: format!("volume_spike_{multiplier}x"),
        }
    }
}

impl Default for VolumeSpike {
    fn default() -> Self {
        Self::new(DEFAULT_AVG_PERIOD, DEFAULT_SPIKE_MULTIPLIER)
    }
}

impl Condition for VolumeSpike {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.period + 10
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.period + 1 {
            return ConditionResult::insufficient_data(&self.name);
        }
        let end = bars.len() - 1;
        let window = &bars[end - self.period..end];
        let avg = window.iter().map(|b| b.volume as f64).sum::<f64>() / self.period as f64;
        if avg == 0.0 {
            return ConditionResult::degraded(&self.name, "zero average volume");
        }
        let current = bars[end].volume as f64;
        let ratio = current / avg;
        ConditionResult::new(&self.name, ratio >= self.multiplier)
            .with_value("current_volume", current)
            .with_value("avg_volume", avg)
            .with_value("ratio", ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars_with_volume;

    fn flat_bars(volumes: &[u64]) -> Vec<crate::domain::Bar> {
        make_bars_with_volume(&vec![100.0; volumes.len()], volumes)
    }

    #[test]
    fn min_volume_checks_last_bar() {
        let bars = flat_bars(&[500, 2000]);
        assert!(MinVolume::new(1000).evaluate("TEST", &bars).matched);
        assert!(!MinVolume::new(3000).evaluate("TEST", &bars).matched);
    }

    #[test]
    fn above_avg_includes_today_in_baseline() {
        // 4 bars at 1000 plus today at 4000: avg = 1600, ratio = 2.5
        let bars = flat_bars(&[1000, 1000, 1000, 1000, 4000]);
        let result = VolumeAboveAvg::new(5, 2.0).evaluate("TEST", &bars);
        assert!(result.matched);
        assert_eq!(result.value("avg_volume"), Some(1600.0));
        assert_eq!(result.value("ratio"), Some(2.5));
    }

    #[test]
    fn spike_excludes_today_from_baseline() {
        // Same series through a spike baseline: avg of the 5 prior bars
        // is 1000, so today's 4000 is a clean 4x.
        let bars = flat_bars(&[1000, 1000, 1000, 1000, 1000, 4000]);
        let result = VolumeSpike::new(5, 3.0).evaluate("TEST", &bars);
        assert!(result.matched);
        assert_eq!(result.value("avg_volume"), Some(1000.0));
        assert_eq!(result.value("ratio"), Some(4.0));
    }

    #[test]
    fn spike_needs_one_more_bar_than_above_avg() {
        let bars = flat_bars(&[1000, 1000, 1000, 1000, 4000]);
        assert!(VolumeAboveAvg::new(5, 1.0).evaluate("TEST", &bars).matched);
        let result = VolumeSpike::new(5, 1.0).evaluate("TEST", &bars);
        assert!(!result.matched);
        assert!(result.error.is_some());
    }

    #[test]
    fn zero_average_degrades_instead_of_dividing() {
        let bars = flat_bars(&[0, 0, 0, 0, 0, 4000]);
        let result = VolumeSpike::new(5, 2.0).evaluate("TEST", &bars);
        assert!(!result.matched);
        assert_eq!(result.error.as_deref(), Some("zero average volume"));
    }
}
