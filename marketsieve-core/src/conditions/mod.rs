//! Condition abstraction — composable predicates over price series.
//!
//! Every screening condition implements the `Condition` trait: a name,
//! a required lookback (the minimum trailing bars needed to evaluate
//! without degradation), and an `evaluate` that always produces a
//! `ConditionResult` — insufficient history is reported as a non-match
//! with an error detail, never as a panic or an `Err`.
//!
//! Concrete conditions are stateless and `Send + Sync`, so a single
//! instance is safely shared across the screener's worker pool.

pub mod accumulation;
pub mod bollinger;
pub mod composite;
pub mod factory;
pub mod ma;
pub mod price;
pub mod rsi;
pub mod volume;

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Bar;

pub use accumulation::{
    BbWidthBelow, ObvDivergence, ObvTrend, PriceFlat, StochasticDivergence, StochasticLevel,
    TrendDirection, VolumeBelowAvg, VpciDivergence, VpciTrend,
};
pub use bollinger::{BbLowerTouch, BbUpperTouch};
pub use composite::{AllOf, AnyOf, Not};
pub use factory::{build_condition, build_conditions, ConditionSpec, FactoryError};
pub use ma::{AboveMa, BelowMa, MaCrossDown, MaCrossUp, MaTouch};
pub use price::{MaxPrice, MinPrice, PriceChange, PriceRange};
pub use rsi::{RsiOverbought, RsiOversold, RsiRange};
pub use volume::{MinVolume, VolumeAboveAvg, VolumeSpike};

/// Error detail message used by every condition when the series is too
/// short or an indicator value is NaN.
pub const INSUFFICIENT_DATA: &str = "insufficient data";

/// A screening predicate over a price series.
///
/// Implementations evaluate against the *last* bar of the series unless
/// documented otherwise, and must never panic on short input.
pub trait Condition: Send + Sync {
    /// Human-readable name, parameter-qualified (e.g. "ma_touch_20d").
    fn name(&self) -> &str;

    /// Minimum number of trailing bars needed for indicators to settle
    /// to non-NaN values at the last position.
    fn required_lookback(&self) -> usize;

    /// Evaluate against `bars` (ascending by date, last bar = today).
    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> ConditionResult;
}

/// Outcome of evaluating one condition against one series.
///
/// Immutable once produced. Composite conditions nest their children's
/// results in `children` so a report can show every contribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionResult {
    pub matched: bool,
    pub condition_name: String,
    /// Scalar values that fed the match decision (current_price, ma_value, ...).
    pub values: BTreeMap<String, f64>,
    /// Set when evaluation degraded (insufficient history, NaN indicator).
    pub error: Option<String>,
    /// Sub-results, populated by composite conditions only.
    pub children: Vec<ConditionResult>,
    pub timestamp: NaiveDateTime,
}

impl ConditionResult {
    pub fn new(name: impl Into<String>, matched: bool) -> Self {
        Self {
            matched,
            condition_name: name.into(),
            values: BTreeMap::new(),
            error: None,
            children: Vec::new(),
            timestamp: Utc::now().naive_utc(),
        }
    }

    /// Non-match carrying the standard insufficient-data detail.
    pub fn insufficient_data(name: impl Into<String>) -> Self {
        Self::degraded(name, INSUFFICIENT_DATA)
    }

    /// Non-match carrying an arbitrary degradation message.
    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut result = Self::new(name, false);
        result.error = Some(message.into());
        result
    }

    pub fn with_value(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn with_children(mut self, children: Vec<ConditionResult>) -> Self {
        self.children = children;
        self
    }

    /// Convenience accessor for a named detail value.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}
