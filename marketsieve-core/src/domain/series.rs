//! Column extraction helpers for bar slices.
//!
//! Indicator functions take pre-extracted `&[f64]` columns (or `&[Bar]`
//! where volume is needed), so conditions extract once and reuse.

use super::bar::Bar;

/// Close column.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// High column.
pub fn highs(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.high).collect()
}

/// Low column.
pub fn lows(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.low).collect()
}

/// Volume column as f64, for rolling means.
pub fn volumes_f64(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume as f64).collect()
}

/// True if dates are strictly ascending (implies no duplicates).
pub fn is_ascending(bars: &[Bar]) -> bool {
    bars.windows(2).all(|w| w[0].date < w[1].date)
}
