//! RSI threshold conditions.

use super::{Condition, ConditionResult};
use crate::domain::{closes, Bar};
use crate::indicators::rsi;

pub const DEFAULT_PERIOD: usize = 14;
pub const DEFAULT_OVERSOLD: f64 = 30.0;
pub const DEFAULT_OVERBOUGHT: f64 = 70.0;

fn last_rsi(bars: &[Bar], period: usize) -> Option<f64> {
    if bars.len() < period + 1 {
        return None;
    }
    let series = rsi(&closes(bars), period);
    let last = *series.last()?;
    if last.is_nan() {
        None
    } else {
        Some(last)
    }
}

/// RSI at or below an oversold threshold.
#[derive(Debug, Clone)]
pub struct RsiOversold {
    period: usize,
    threshold: f64,
    name: String,
}

impl RsiOversold {
    pub fn new(period: usize, threshold: f64) -> Self {
        assert!(period >= 1, "RsiOversold period must be >= 1");
        Self {
            period,
            threshold,
            name: format!("rsi_oversold_{threshold}"),
        }
    }
}

impl Default for RsiOversold {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_OVERSOLD)
    }
}

impl Condition for RsiOversold {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.period + 50
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        let Some(value) = last_rsi(bars, self.period) else {
            return ConditionResult::insufficient_data(&self.name);
        };
        ConditionResult::new(&self.name, value <= self.threshold)
            .with_value("rsi", value)
            .with_value("threshold", self.threshold)
    }
}

/// RSI at or above an overbought threshold.
#[derive(Debug, Clone)]
pub struct RsiOverbought {
    period: usize,
    threshold: f64,
    name: String,
}

impl RsiOverbought {
    pub fn new(period: usize, threshold: f64) -> Self {
        assert!(period >= 1, "RsiOverbought period must be >= 1");
        Self {
            period,
            threshold,
            name: format!("rsi_overbought_{threshold}"),
        }
    }
}

impl Default for RsiOverbought {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_OVERBOUGHT)
    }
}

impl Condition for RsiOverbought {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.period + 50
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        let Some(value) = last_rsi(bars, self.period) else {
            return ConditionResult::insufficient_data(&self.name);
        };
        ConditionResult::new(&self.name, value >= self.threshold)
            .with_value("rsi", value)
            .with_value("threshold", self.threshold)
    }
}

/// RSI inside an inclusive [min, max] band. Useful for filtering to the
/// neutral zone between oversold and overbought.
#[derive(Debug, Clone)]
pub struct RsiRange {
    period: usize,
    min_rsi: f64,
    max_rsi: f64,
    name: String,
}

impl RsiRange {
    pub fn new(period: usize, min_rsi: f64, max_rsi: f64) -> Self {
        assert!(period >= 1, "RsiRange period must be >= 1");
        assert!(min_rsi <= max_rsi, "RsiRange min must be <= max");
        Self {
            period,
            min_rsi,
            max_rsi,
            name: format!("rsi_range_{min_rsi}_{max_rsi}"),
        }
    }
}

impl Default for RsiRange {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_OVERSOLD, DEFAULT_OVERBOUGHT)
    }
}

impl Condition for RsiRange {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.period + 50
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        let Some(value) = last_rsi(bars, self.period) else {
            return ConditionResult::insufficient_data(&self.name);
        };
        let matched = value >= self.min_rsi && value <= self.max_rsi;
        ConditionResult::new(&self.name, matched)
            .with_value("rsi", value)
            .with_value("min_rsi", self.min_rsi)
            .with_value("max_rsi", self.max_rsi)
    }
}
