//! Price-level conditions: absolute bounds and N-day change.

use super::{Condition, ConditionResult};
use crate::domain::Bar;

/// Close at or above a floor price.
#[derive(Debug, Clone)]
pub struct MinPrice {
    min_price: f64,
    name: String,
}

impl MinPrice {
    pub fn new(min_price: f64) -> Self {
        Self {
            min_price,
            name: format!("min_price_{min_price}"),
        }
    }
}

impl Condition for MinPrice {
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
        ConditionResult::new(&self.name, last.close >= self.min_price)
            .with_value("current_price", last.close)
            .with_value("min_price", self.min_price)
    }
}

/// Close at or below a ceiling price.
#[derive(Debug, Clone)]
pub struct MaxPrice {
    max_price: f64,
    name: String,
}

impl MaxPrice {
    pub fn new(max_price: f64) -> Self {
        Self {
            max_price,
            name: format!("max_price_{max_price}"),
        }
    }
}

impl Condition for MaxPrice {
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
        ConditionResult::new(&self.name, last.close <= self.max_price)
            .with_value("current_price", last.close)
            .with_value("max_price", self.max_price)
    }
}

/// Close inside an inclusive [min, max] band.
#[derive(Debug, Clone)]
pub struct PriceRange {
    min_price: f64,
    max_price: f64,
    name: String,
}

impl PriceRange {
    pub fn new(min_price: f64, max_price: f64) -> Self {
        Self {
            min_price,
            max_price,
            name: format!("price_range_{min_price}_{max_price}"),
        }
    }
}

impl Condition for PriceRange {
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
        let matched = last.close >= self.min_price && last.close <= self.max_price;
        ConditionResult::new(&self.name, matched)
            .with_value("current_price", last.close)
            .with_value("min_price", self.min_price)
            .with_value("max_price", self.max_price)
    }
}

/// Percentage change over `days` bars within an optional [min, max] band.
///
/// change_pct = (close[-1] - close[-1-days]) / close[-1-days] * 100.
#[derive(Debug, Clone)]
pub struct PriceChange {
    days: usize,
    min_change_pct: Option<f64>,
    max_change_pct: Option<f64>,
    name: String,
}

impl PriceChange {
    pub fn new(days: usize, min_change_pct: Option<f64>, max_change_pct: Option<f64>) -> Self {
        assert!(days >= 1, "PriceChange days must be >= 1");
        Self {
            days,
            min_change_pct,
            max_change_pct,
            name: format!("price_change_{days}d"),
        }
    }
}

impl Condition for PriceChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.days + 10
    }

    fn evaluate(&self, _symbol: &str, bars: &[Bar]) -> ConditionResult {
        if bars.len() < self.days + 1 {
            return ConditionResult::insufficient_data(&self.name);
        }
        let current = bars[bars.len() - 1].close;
        let past = bars[bars.len() - 1 - self.days].close;
        if past == 0.0 || past.is_nan() || current.is_nan() {
            return ConditionResult::insufficient_data(&self.name);
        }
        let change_pct = (current - past) / past * 100.0;

        let mut matched = true;
        if let Some(min) = self.min_change_pct {
            matched = matched && change_pct >= min;
        }
        if let Some(max) = self.max_change_pct {
            matched = matched && change_pct <= max;
        }

        ConditionResult::new(&self.name, matched)
            .with_value("current_price", current)
            .with_value("past_price", past)
            .with_value("change_pct", change_pct)
            .with_value("days", self.days as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn min_price_matches_at_or_above() {
        let bars = make_bars(&[90.0, 100.0]);
        assert!(MinPrice::new(100.0).evaluate("TEST", &bars).matched);
        assert!(!MinPrice::new(101.0).evaluate("TEST", &bars).matched);
    }

    #[test]
    fn max_price_matches_at_or_below() {
        let bars = make_bars(&[90.0, 100.0]);
        assert!(MaxPrice::new(100.0).evaluate("TEST", &bars).matched);
        assert!(!MaxPrice::new(99.0).evaluate("TEST", &bars).matched);
    }

    #[test]
    fn price_range_is_inclusive() {
        let bars = make_bars(&[90.0, 100.0]);
        assert!(PriceRange::new(100.0, 100.0).evaluate("TEST", &bars).matched);
        assert!(!PriceRange::new(50.0, 99.0).evaluate("TEST", &bars).matched);
    }

    #[test]
    fn empty_series_degrades() {
        let result = MinPrice::new(10.0).evaluate("TEST", &[]);
        assert!(!result.matched);
        assert!(result.error.is_some());
    }

    #[test]
    fn price_change_computes_pct() {
        // 100 -> 110 over 2 days = +10%
        let bars = make_bars(&[100.0, 105.0, 110.0]);
        let cond = PriceChange::new(2, Some(5.0), None);
        let result = cond.evaluate("TEST", &bars);
        assert!(result.matched);
        assert!((result.value("change_pct").unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn price_change_respects_upper_bound() {
        let bars = make_bars(&[100.0, 105.0, 110.0]);
        let cond = PriceChange::new(2, None, Some(5.0));
        assert!(!cond.evaluate("TEST", &bars).matched);
    }

    #[test]
    fn price_change_short_series_degrades() {
        let bars = make_bars(&[100.0, 110.0]);
        let result = PriceChange::new(5, Some(0.0), None).evaluate("TEST", &bars);
        assert!(!result.matched);
        assert!(result.error.is_some());
    }
}
