//! Stochastic oscillator (%K / %D).
//!
//! %K = (close - lowest_low(k_period)) / (highest_high - lowest_low) * 100
//! %D = SMA(%K, d_period)
//! A flat high/low window (zero range) yields %K = 50.

use super::sma::sma;
use crate::domain::Bar;

/// The %K and %D series, same length as the input, NaN-padded.
#[derive(Debug, Clone)]
pub struct Stochastic {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

/// Stochastic oscillator over a rolling high/low window.
pub fn stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> Stochastic {
    let n = bars.len();
    let mut k = vec![f64::NAN; n];

    if k_period == 0 || n < k_period {
        return Stochastic {
            d: vec![f64::NAN; n],
            k,
        };
    }

    for i in (k_period - 1)..n {
        let window = &bars[(i + 1 - k_period)..=i];
        if window.iter().any(|b| b.is_void()) {
            continue;
        }
        let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let range = highest - lowest;
        k[i] = if range == 0.0 {
            50.0
        } else {
            (bars[i].close - lowest) / range * 100.0
        };
    }

    let d = sma(&k, d_period);
    Stochastic { k, d }
}
