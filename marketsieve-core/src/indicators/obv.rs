//! On-Balance Volume (OBV).
//!
//! Cumulative signed volume: add today's volume when the close rose,
//! subtract it when the close fell, carry forward when flat. OBV[0] = 0.

use crate::domain::Bar;

/// OBV of `bars`. Defined from the first bar onward (no front padding),
/// except that a NaN close taints everything after it.
pub fn obv(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];

    if n == 0 {
        return result;
    }
    if bars[0].close.is_nan() {
        return result;
    }

    result[0] = 0.0;
    let mut running = 0.0;
    for i in 1..n {
        let curr = bars[i].close;
        let prev = bars[i - 1].close;
        if curr.is_nan() || prev.is_nan() {
            return result;
        }
        if curr > prev {
            running += bars[i].volume as f64;
        } else if curr < prev {
            running -= bars[i].volume as f64;
        }
        result[i] = running;
    }

    result
}
