//! Condition factory — converts declarative `ConditionSpec`s into
//! runtime trait objects.
//!
//! Specs come from TOML condition-set files. Supplied params merge over
//! per-kind defaults; an unknown kind, a missing required param, or a
//! malformed composite is a hard error at construction, never deferred
//! to evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::accumulation::{
    BbWidthBelow, ObvDivergence, ObvTrend, PriceFlat, StochasticDivergence, StochasticLevel,
    TrendDirection, VolumeBelowAvg, VpciDivergence, VpciTrend,
};
use super::bollinger::{BbLowerTouch, BbUpperTouch};
use super::composite::{AllOf, AnyOf, Not};
use super::ma::{AboveMa, BelowMa, MaCrossDown, MaCrossUp, MaTouch};
use super::price::{MaxPrice, MinPrice, PriceChange, PriceRange};
use super::rsi::{RsiOverbought, RsiOversold, RsiRange};
use super::volume::{MinVolume, VolumeAboveAvg, VolumeSpike};
use super::Condition;

/// Declarative description of one condition, possibly composite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default)]
    pub children: Vec<ConditionSpec>,
}

/// Errors that can occur during condition construction.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("unknown condition kind: {0}")]
    UnknownKind(String),
    #[error("{kind}: missing required param `{param}`")]
    MissingParam { kind: String, param: String },
    #[error("{kind}: {message}")]
    InvalidParam { kind: String, message: String },
    #[error("{kind}: expected {expected} children, got {got}")]
    ChildArity {
        kind: String,
        expected: &'static str,
        got: usize,
    },
}

/// Extract a named f64 parameter, falling back to `default`.
fn param(spec: &ConditionSpec, name: &str, default: f64) -> f64 {
    spec.params.get(name).copied().unwrap_or(default)
}

/// Extract a named usize parameter, falling back to `default`.
fn param_usize(spec: &ConditionSpec, name: &str, default: usize) -> usize {
    spec.params
        .get(name)
        .copied()
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// Extract a required f64 parameter.
fn required(spec: &ConditionSpec, name: &str) -> Result<f64, FactoryError> {
    spec.params
        .get(name)
        .copied()
        .ok_or_else(|| FactoryError::MissingParam {
            kind: spec.kind.clone(),
            param: name.to_string(),
        })
}

fn no_children(spec: &ConditionSpec) -> Result<(), FactoryError> {
    if spec.children.is_empty() {
        Ok(())
    } else {
        Err(FactoryError::ChildArity {
            kind: spec.kind.clone(),
            expected: "0",
            got: spec.children.len(),
        })
    }
}

fn optional(spec: &ConditionSpec, name: &str) -> Option<f64> {
    spec.params.get(name).copied()
}

/// Bollinger band width multiplier; `std` and `std_mult` both name it.
fn std_param(spec: &ConditionSpec) -> f64 {
    optional(spec, "std")
        .or_else(|| optional(spec, "std_mult"))
        .unwrap_or(2.0)
}

/// Build one condition from its spec.
pub fn build_condition(spec: &ConditionSpec) -> Result<Box<dyn Condition>, FactoryError> {
    match spec.kind.as_str() {
        "all_of" => Ok(Box::new(AllOf::new(build_conditions(&spec.children)?))),
        "any_of" => Ok(Box::new(AnyOf::new(build_conditions(&spec.children)?))),
        "not" => {
            if spec.children.len() != 1 {
                return Err(FactoryError::ChildArity {
                    kind: spec.kind.clone(),
                    expected: "1",
                    got: spec.children.len(),
                });
            }
            Ok(Box::new(Not::new(build_condition(&spec.children[0])?)))
        }
        "min_price" => {
            no_children(spec)?;
            Ok(Box::new(MinPrice::new(required(spec, "min_price")?)))
        }
        "max_price" => {
            no_children(spec)?;
            Ok(Box::new(MaxPrice::new(required(spec, "max_price")?)))
        }
        "price_range" => {
            no_children(spec)?;
            let min = required(spec, "min_price")?;
            let max = required(spec, "max_price")?;
            if min > max {
                return Err(FactoryError::InvalidParam {
                    kind: spec.kind.clone(),
                    message: format!("min_price {min} exceeds max_price {max}"),
                });
            }
            Ok(Box::new(PriceRange::new(min, max)))
        }
        "price_change" => {
            no_children(spec)?;
            let days = required(spec, "days")? as usize;
            if days == 0 {
                return Err(FactoryError::InvalidParam {
                    kind: spec.kind.clone(),
                    message: "days must be >= 1".to_string(),
                });
            }
            let min = optional(spec, "min_change_pct");
            let max = optional(spec, "max_change_pct");
            if min.is_none() && max.is_none() {
                return Err(FactoryError::MissingParam {
                    kind: spec.kind.clone(),
                    param: "min_change_pct or max_change_pct".to_string(),
                });
            }
            Ok(Box::new(PriceChange::new(days, min, max)))
        }
        "ma_touch" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 20);
            let tolerance = param(spec, "tolerance", 0.02);
            Ok(Box::new(MaTouch::new(period, tolerance)))
        }
        "above_ma" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 20);
            let min_distance_pct = param(spec, "min_distance_pct", 0.0);
            Ok(Box::new(AboveMa::new(period, min_distance_pct)))
        }
        "below_ma" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 20);
            let max_distance_pct = param(spec, "max_distance_pct", 0.0);
            Ok(Box::new(BelowMa::new(period, max_distance_pct)))
        }
        "ma_cross_up" | "ma_cross_down" => {
            no_children(spec)?;
            let short = param_usize(spec, "short_period", 20);
            let long = param_usize(spec, "long_period", 60);
            let lookback = param_usize(spec, "lookback_days", 5);
            if short >= long {
                return Err(FactoryError::InvalidParam {
                    kind: spec.kind.clone(),
                    message: format!("short_period {short} must be < long_period {long}"),
                });
            }
            if spec.kind == "ma_cross_up" {
                Ok(Box::new(MaCrossUp::new(short, long, lookback)))
            } else {
                Ok(Box::new(MaCrossDown::new(short, long, lookback)))
            }
        }
        "rsi_oversold" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 14);
            let threshold = param(spec, "threshold", 30.0);
            Ok(Box::new(RsiOversold::new(period, threshold)))
        }
        "rsi_overbought" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 14);
            let threshold = param(spec, "threshold", 70.0);
            Ok(Box::new(RsiOverbought::new(period, threshold)))
        }
        "rsi_range" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 14);
            let min = param(spec, "min_rsi", 30.0);
            let max = param(spec, "max_rsi", 70.0);
            if min > max {
                return Err(FactoryError::InvalidParam {
                    kind: spec.kind.clone(),
                    message: format!("min_rsi {min} exceeds max_rsi {max}"),
                });
            }
            Ok(Box::new(RsiRange::new(period, min, max)))
        }
        "bb_lower_touch" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 20);
            let tolerance = param(spec, "tolerance", 0.01);
            Ok(Box::new(BbLowerTouch::new(period, std_param(spec), tolerance)))
        }
        "bb_upper_touch" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 20);
            let tolerance = param(spec, "tolerance", 0.01);
            Ok(Box::new(BbUpperTouch::new(period, std_param(spec), tolerance)))
        }
        "min_volume" => {
            no_children(spec)?;
            let min = required(spec, "min_volume")?;
            if min < 0.0 {
                return Err(FactoryError::InvalidParam {
                    kind: spec.kind.clone(),
                    message: "min_volume must be >= 0".to_string(),
                });
            }
            Ok(Box::new(MinVolume::new(min as u64)))
        }
        "volume_above_avg" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 20);
            let multiplier = param(spec, "multiplier", 1.5);
            Ok(Box::new(VolumeAboveAvg::new(period, multiplier)))
        }
        "volume_spike" => {
            no_children(spec)?;
            let period = param_usize(spec, "period", 20);
            let multiplier = param(spec, "multiplier", 2.0);
            Ok(Box::new(VolumeSpike::new(period, multiplier)))
        }
        "bb_width_below" => {
            no_children(spec)?;
            let max_width = param(spec, "max_width_pct", 10.0);
            let period = param_usize(spec, "period", 20);
            Ok(Box::new(BbWidthBelow::new(max_width, period, std_param(spec))))
        }
        "volume_below_avg" => {
            no_children(spec)?;
            let multiplier = param(spec, "multiplier", 0.8);
            let period = param_usize(spec, "period", 20);
            Ok(Box::new(VolumeBelowAvg::new(multiplier, period)))
        }
        "price_flat" => {
            no_children(spec)?;
            let max_range = param(spec, "max_range_pct", 5.0);
            let period = param_usize(spec, "period", 20);
            Ok(Box::new(PriceFlat::new(max_range, period)))
        }
        "obv_trend_up" | "obv_trend_down" => {
            no_children(spec)?;
            let lookback = param_usize(spec, "lookback", 20);
            let direction = if spec.kind == "obv_trend_up" {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            };
            Ok(Box::new(ObvTrend::new(direction, lookback)))
        }
        "stoch_below" | "stoch_above" => {
            no_children(spec)?;
            let threshold = param(spec, "threshold", 20.0);
            let k_period = param_usize(spec, "k_period", 14);
            let d_period = param_usize(spec, "d_period", 3);
            if spec.kind == "stoch_below" {
                Ok(Box::new(StochasticLevel::below(threshold, k_period, d_period)))
            } else {
                Ok(Box::new(StochasticLevel::above(threshold, k_period, d_period)))
            }
        }
        "vpci_trend_up" | "vpci_trend_down" => {
            no_children(spec)?;
            let short = param_usize(spec, "short_period", 5);
            let long = param_usize(spec, "long_period", 20);
            let lookback = param_usize(spec, "lookback", 10);
            if short >= long {
                return Err(FactoryError::InvalidParam {
                    kind: spec.kind.clone(),
                    message: format!("short_period {short} must be < long_period {long}"),
                });
            }
            let direction = if spec.kind == "vpci_trend_up" {
                TrendDirection::Up
            } else {
                TrendDirection::Down
            };
            Ok(Box::new(VpciTrend::new(direction, short, long, lookback)))
        }
        "obv_divergence" => {
            no_children(spec)?;
            let price_max = param(spec, "price_max_range_pct", 5.0);
            let obv_min = param(spec, "obv_min_change_pct", 5.0);
            let period = param_usize(spec, "period", 20);
            Ok(Box::new(ObvDivergence::new(price_max, obv_min, period)))
        }
        "stoch_divergence" => {
            no_children(spec)?;
            let k_period = param_usize(spec, "k_period", 14);
            let d_period = param_usize(spec, "d_period", 3);
            let lookback = param_usize(spec, "lookback", 20);
            let threshold = param(spec, "divergence_threshold_pct", 5.0);
            if lookback < 4 {
                return Err(FactoryError::InvalidParam {
                    kind: spec.kind.clone(),
                    message: "lookback must be >= 4".to_string(),
                });
            }
            Ok(Box::new(StochasticDivergence::new(
                k_period, d_period, lookback, threshold,
            )))
        }
        "vpci_divergence" => {
            no_children(spec)?;
            let price_max = param(spec, "price_max_range_pct", 5.0);
            let short = param_usize(spec, "short_period", 5);
            let long = param_usize(spec, "long_period", 20);
            let lookback = param_usize(spec, "lookback", 20);
            if short >= long {
                return Err(FactoryError::InvalidParam {
                    kind: spec.kind.clone(),
                    message: format!("short_period {short} must be < long_period {long}"),
                });
            }
            Ok(Box::new(VpciDivergence::new(price_max, short, long, lookback)))
        }
        other => Err(FactoryError::UnknownKind(other.to_string())),
    }
}

/// Build a whole condition set. Fails on the first bad spec.
pub fn build_conditions(specs: &[ConditionSpec]) -> Result<Vec<Box<dyn Condition>>, FactoryError> {
    specs.iter().map(build_condition).collect()
}
