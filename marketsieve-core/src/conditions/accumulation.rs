//! Quiet-accumulation conditions.
//!
//! Layer 1 primitives describe a quiet base: tight Bollinger width, low
//! volume, flat price, and slow-turning OBV / stochastic / VPCI. Layer 2
//! divergences pair a flat or falling price with a rising indicator,
//! the classic footprint of accumulation before a markup.

use super::{Condition, ConditionResult};
use crate::domain::{closes, Bar};
use crate::indicators::{bollinger_width, obv, stochastic, vpci};

/// Direction of an indicator trend check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    fn as_str(self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
        }
    }
}

fn bool_value(v: bool) -> f64 {
    if v {
        1.0
    } else {
        0.0
    }
}

/// High-low range of the trailing `period` bars as a percentage of the
/// average close. None when the average close is zero.
fn range_pct(bars: &[Bar], period: usize) -> Option<f64> {
    let window = &bars[bars.len() - period..];
    let high_max = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low_min = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let avg_close = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
    if avg_close == 0.0 {
        None
    } else {
        Some((high_max - low_min) / avg_close * 100.0)
    }
}

/// Bollinger band width at or below a maximum percentage (squeeze).
#[derive(Debug, Clone)]
pub struct BbWidthBelow {
    max_width_pct: f64,
    period: usize,
    std_mult: f64,
    name: String,
}

impl BbWidthBelow {
    pub fn new(max_width_pct: f64, period: usize, std_mult: f64) -> Self {
        assert!(period >= 2, "BbWidthBelow period must be >= 2");
        Self {
            max_width_pct,
            period,
            std_mult,
            name: format!("bb_width_below_{max_width_pct}pct"),
        }
    }
}

impl Default for BbWidthBelow {
    fn default() -> Self {
        Self::new(10.0, 20, 2.0)
    }
}

impl Condition for BbWidthBelow {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.period + 20
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.period {
            return ConditionResult::insufficient_data(&self.name);
        }
        let width = bollinger_width(&closes(bars), self.period, self.std_mult);
        let current = width[width.len() - 1];
        if current.is_nan() {
            return ConditionResult::insufficient_data(&self.name);
        }
        ConditionResult::new(&self.name, current <= self.max_width_pct)
            .with_value("bb_width_pct", current)
            .with_value("max_width_pct", self.max_width_pct)
    }
}

/// Today's volume at or below a fraction of the trailing average.
///
/// The average excludes today, so a quiet day is measured against the
/// regime it sits in.
#[derive(Debug, Clone)]
pub struct VolumeBelowAvg {
    multiplier: f64,
    period: usize,
    name: String,
}

impl VolumeBelowAvg {
    pub fn new(multiplier: f64, period: usize) -> Self {
        assert!(period >= 1, "VolumeBelowAvg period must be >= 1");
        Self {
            multiplier,
            period,
            name: format!("volume_below_{multiplier}x_avg"),
        }
    }
}

impl Default for VolumeBelowAvg {
    fn default() -> Self {
        Self::new(0.8, 20)
    }
}

impl Condition for VolumeBelowAvg {
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
        ConditionResult::new(&self.name, ratio <= self.multiplier)
            .with_value("current_volume", current)
            .with_value("avg_volume", avg)
            .with_value("ratio", ratio)
    }
}

/// High-low range of the trailing window at or below a percentage of
/// the average close (sideways price).
#[derive(Debug, Clone)]
pub struct PriceFlat {
    max_range_pct: f64,
    period: usize,
    name: String,
}

impl PriceFlat {
    pub fn new(max_range_pct: f64, period: usize) -> Self {
        assert!(period >= 1, "PriceFlat period must be >= 1");
        Self {
            max_range_pct,
            period,
            name: format!("price_flat_{max_range_pct}pct_{period}d"),
        }
    }
}

impl Default for PriceFlat {
    fn default() -> Self {
        Self::new(5.0, 20)
    }
}

impl Condition for PriceFlat {
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
        let Some(range) = range_pct(bars, self.period) else {
            return ConditionResult::degraded(&self.name, "zero average price");
        };
        ConditionResult::new(&self.name, range <= self.max_range_pct)
            .with_value("range_pct", range)
            .with_value("max_range_pct", self.max_range_pct)
    }
}

/// OBV moved in the given direction over the trailing `lookback` bars.
#[derive(Debug, Clone)]
pub struct ObvTrend {
    direction: TrendDirection,
    lookback: usize,
    name: String,
}

impl ObvTrend {
    pub fn new(direction: TrendDirection, lookback: usize) -> Self {
        assert!(lookback >= 1, "ObvTrend lookback must be >= 1");
        Self {
            direction,
            lookback,
            name: format!("obv_trend_{}_{}d", direction.as_str(), lookback),
        }
    }
}

impl Default for ObvTrend {
    fn default() -> Self {
        Self::new(TrendDirection::Up, 20)
    }
}

impl Condition for ObvTrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.lookback + 20
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.lookback + 1 {
            return ConditionResult::insufficient_data(&self.name);
        }
        let series = obv(bars);
        let now = series[series.len() - 1];
        let past = series[series.len() - 1 - self.lookback];
        if now.is_nan() || past.is_nan() {
            return ConditionResult::insufficient_data(&self.name);
        }
        let change = now - past;
        let change_pct = if past != 0.0 {
            change / past.abs() * 100.0
        } else {
            0.0
        };
        let matched = match self.direction {
            TrendDirection::Up => change > 0.0,
            TrendDirection::Down => change < 0.0,
        };
        ConditionResult::new(&self.name, matched)
            .with_value("obv_now", now)
            .with_value("obv_past", past)
            .with_value("obv_change", change)
            .with_value("obv_change_pct", change_pct)
    }
}

/// Stochastic %K at or below (or at or above) a threshold.
#[derive(Debug, Clone)]
pub struct StochasticLevel {
    threshold: f64,
    below: bool,
    k_period: usize,
    d_period: usize,
    name: String,
}

impl StochasticLevel {
    pub fn below(threshold: f64, k_period: usize, d_period: usize) -> Self {
        Self::new(threshold, true, k_period, d_period)
    }

    pub fn above(threshold: f64, k_period: usize, d_period: usize) -> Self {
        Self::new(threshold, false, k_period, d_period)
    }

    fn new(threshold: f64, below: bool, k_period: usize, d_period: usize) -> Self {
        assert!(k_period >= 1 && d_period >= 1, "stochastic periods must be >= 1");
        let side = if below { "below" } else { "above" };
        Self {
            threshold,
            below,
            k_period,
            d_period,
            name: format!("stoch_{side}_{threshold}"),
        }
    }
}

impl Default for StochasticLevel {
    fn default() -> Self {
        Self::below(20.0, 14, 3)
    }
}

impl Condition for StochasticLevel {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.k_period + self.d_period + 20
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.k_period + self.d_period {
            return ConditionResult::insufficient_data(&self.name);
        }
        let s = stochastic(bars, self.k_period, self.d_period);
        let k = s.k[s.k.len() - 1];
        if k.is_nan() {
            return ConditionResult::insufficient_data(&self.name);
        }
        let matched = if self.below {
            k <= self.threshold
        } else {
            k >= self.threshold
        };
        let mut result = ConditionResult::new(&self.name, matched)
            .with_value("stoch_k", k)
            .with_value("threshold", self.threshold);
        let d = s.d[s.d.len() - 1];
        if !d.is_nan() {
            result = result.with_value("stoch_d", d);
        }
        result
    }
}

/// VPCI moved in the given direction over the trailing `lookback` bars.
#[derive(Debug, Clone)]
pub struct VpciTrend {
    direction: TrendDirection,
    short_period: usize,
    long_period: usize,
    lookback: usize,
    name: String,
}

impl VpciTrend {
    pub fn new(
        direction: TrendDirection,
        short_period: usize,
        long_period: usize,
        lookback: usize,
    ) -> Self {
        assert!(
            short_period >= 1 && short_period < long_period,
            "VpciTrend needs short_period < long_period"
        );
        assert!(lookback >= 1, "VpciTrend lookback must be >= 1");
        Self {
            direction,
            short_period,
            long_period,
            lookback,
            name: format!("vpci_trend_{}_{}d", direction.as_str(), lookback),
        }
    }
}

impl Default for VpciTrend {
    fn default() -> Self {
        Self::new(TrendDirection::Up, 5, 20, 10)
    }
}

impl Condition for VpciTrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.long_period + self.lookback + 20
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.long_period + self.lookback {
            return ConditionResult::insufficient_data(&self.name);
        }
        let series = vpci(bars, self.short_period, self.long_period);
        let now = series[series.len() - 1];
        let past = series[series.len() - 1 - self.lookback];
        if now.is_nan() || past.is_nan() {
            return ConditionResult::insufficient_data(&self.name);
        }
        let change = now - past;
        let matched = match self.direction {
            TrendDirection::Up => change > 0.0,
            TrendDirection::Down => change < 0.0,
        };
        ConditionResult::new(&self.name, matched)
            .with_value("vpci_now", now)
            .with_value("vpci_past", past)
            .with_value("vpci_change", change)
    }
}

/// Flat price with rising OBV over the same window.
#[derive(Debug, Clone)]
pub struct ObvDivergence {
    price_max_range_pct: f64,
    obv_min_change_pct: f64,
    period: usize,
    name: String,
}

impl ObvDivergence {
    pub fn new(price_max_range_pct: f64, obv_min_change_pct: f64, period: usize) -> Self {
        assert!(period >= 1, "ObvDivergence period must be >= 1");
        Self {
            price_max_range_pct,
            obv_min_change_pct,
            period,
            name: format!("obv_divergence_{period}d"),
        }
    }
}

impl Default for ObvDivergence {
    fn default() -> Self {
        Self::new(5.0, 5.0, 20)
    }
}

impl Condition for ObvDivergence {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.period + 30
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.period + 1 {
            return ConditionResult::insufficient_data(&self.name);
        }
        let Some(price_range) = range_pct(bars, self.period) else {
            return ConditionResult::degraded(&self.name, "zero average price");
        };
        let price_flat = price_range <= self.price_max_range_pct;

        let series = obv(bars);
        let now = series[series.len() - 1];
        let past = series[series.len() - 1 - self.period];
        if now.is_nan() || past.is_nan() {
            return ConditionResult::insufficient_data(&self.name);
        }
        let obv_change_pct = if past != 0.0 {
            (now - past) / past.abs() * 100.0
        } else {
            0.0
        };
        let obv_up = obv_change_pct >= self.obv_min_change_pct;

        ConditionResult::new(&self.name, price_flat && obv_up)
            .with_value("price_range_pct", price_range)
            .with_value("price_flat", bool_value(price_flat))
            .with_value("obv_change_pct", obv_change_pct)
            .with_value("obv_up", bool_value(obv_up))
    }
}

/// Bullish stochastic divergence: price makes an equal or lower low
/// while %K makes a higher low.
///
/// The trailing `lookback` window is split in half and the minima of
/// the halves compared.
#[derive(Debug, Clone)]
pub struct StochasticDivergence {
    k_period: usize,
    d_period: usize,
    lookback: usize,
    divergence_threshold_pct: f64,
    name: String,
}

impl StochasticDivergence {
    pub fn new(
        k_period: usize,
        d_period: usize,
        lookback: usize,
        divergence_threshold_pct: f64,
    ) -> Self {
        assert!(lookback >= 4, "StochasticDivergence lookback must be >= 4");
        Self {
            k_period,
            d_period,
            lookback,
            divergence_threshold_pct,
            name: format!("stoch_divergence_{lookback}d"),
        }
    }
}

impl Default for StochasticDivergence {
    fn default() -> Self {
        Self::new(14, 3, 20, 5.0)
    }
}

impl Condition for StochasticDivergence {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.k_period + self.d_period + self.lookback + 20
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.k_period + self.d_period + self.lookback {
            return ConditionResult::insufficient_data(&self.name);
        }
        let s = stochastic(bars, self.k_period, self.d_period);
        let start = bars.len() - self.lookback;
        let half = self.lookback / 2;

        let close_min = |range: std::ops::Range<usize>| {
            bars[range].iter().map(|b| b.close).fold(f64::MAX, f64::min)
        };
        let stoch_min = |range: std::ops::Range<usize>| {
            s.k[range]
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .fold(f64::MAX, f64::min)
        };

        let price_low_first = close_min(start..start + half);
        let price_low_second = close_min(start + half..bars.len());
        let stoch_low_first = stoch_min(start..start + half);
        let stoch_low_second = stoch_min(start + half..bars.len());
        if stoch_low_first == f64::MAX || stoch_low_second == f64::MAX {
            return ConditionResult::insufficient_data(&self.name);
        }

        let price_lower_or_flat =
            price_low_second <= price_low_first * (1.0 + self.divergence_threshold_pct / 100.0);
        let stoch_higher = stoch_low_second > stoch_low_first;

        ConditionResult::new(&self.name, price_lower_or_flat && stoch_higher)
            .with_value("price_low_first", price_low_first)
            .with_value("price_low_second", price_low_second)
            .with_value("stoch_low_first", stoch_low_first)
            .with_value("stoch_low_second", stoch_low_second)
            .with_value("price_lower_or_flat", bool_value(price_lower_or_flat))
            .with_value("stoch_higher", bool_value(stoch_higher))
    }
}

/// Flat price with rising VPCI over the same window.
#[derive(Debug, Clone)]
pub struct VpciDivergence {
    price_max_range_pct: f64,
    short_period: usize,
    long_period: usize,
    lookback: usize,
    name: String,
}

impl VpciDivergence {
    pub fn new(
        price_max_range_pct: f64,
        short_period: usize,
        long_period: usize,
        lookback: usize,
    ) -> Self {
        assert!(
            short_period >= 1 && short_period < long_period,
            "VpciDivergence needs short_period < long_period"
        );
        assert!(lookback >= 1, "VpciDivergence lookback must be >= 1");
        Self {
            price_max_range_pct,
            short_period,
            long_period,
            lookback,
            name: format!("vpci_divergence_{lookback}d"),
        }
    }
}

impl Default for VpciDivergence {
    fn default() -> Self {
        Self::new(5.0, 5, 20, 20)
    }
}

impl Condition for VpciDivergence {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.long_period + self.lookback + 30
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.long_period + self.lookback {
            return ConditionResult::insufficient_data(&self.name);
        }
        let Some(price_range) = range_pct(bars, self.lookback) else {
            return ConditionResult::degraded(&self.name, "zero average price");
        };
        let price_flat = price_range <= self.price_max_range_pct;

        let series = vpci(bars, self.short_period, self.long_period);
        let now = series[series.len() - 1];
        let past = series[series.len() - 1 - self.lookback];
        if now.is_nan() || past.is_nan() {
            return ConditionResult::insufficient_data(&self.name);
        }
        let vpci_up = now > past;

        ConditionResult::new(&self.name, price_flat && vpci_up)
            .with_value("price_range_pct", price_range)
            .with_value("price_flat", bool_value(price_flat))
            .with_value("vpci_now", now)
            .with_value("vpci_past", past)
            .with_value("vpci_up", bool_value(vpci_up))
    }
}
