//! Volume Price Confirmation Indicator (VPCI) and its VWMA building block.
//!
//! VPCI = VPC * VPR * VM where
//!   VPC = VWMA(long) - SMA(long)          (volume price confirmation)
//!   VPR = VWMA(short) / SMA(short)        (volume price ratio)
//!   VM  = SMA(vol, short) / SMA(vol, long) (volume multiplier)
//! Positive, rising VPCI means volume confirms the price trend.

use super::sma::sma;
use crate::domain::{volumes_f64, Bar};

/// Volume-weighted moving average of closes over `period`.
pub fn vwma(bars: &[Bar], period: usize) -> Vec<f64> {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &bars[(i + 1 - period)..=i];
        if window.iter().any(|b| b.close.is_nan()) {
            continue;
        }
        let vol_sum: f64 = window.iter().map(|b| b.volume as f64).sum();
        if vol_sum == 0.0 {
            continue;
        }
        let weighted: f64 = window.iter().map(|b| b.close * b.volume as f64).sum();
        result[i] = weighted / vol_sum;
    }

    result
}

/// VPCI of `bars` with the given short and long periods.
pub fn vpci(bars: &[Bar], short_period: usize, long_period: usize) -> Vec<f64> {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];

    if short_period == 0 || long_period == 0 || n < long_period {
        return result;
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let vols = volumes_f64(bars);

    let vwma_long = vwma(bars, long_period);
    let vwma_short = vwma(bars, short_period);
    let sma_long = sma(&closes, long_period);
    let sma_short = sma(&closes, short_period);
    let vol_sma_short = sma(&vols, short_period);
    let vol_sma_long = sma(&vols, long_period);

    for i in 0..n {
        let parts = [
            vwma_long[i],
            vwma_short[i],
            sma_long[i],
            sma_short[i],
            vol_sma_short[i],
            vol_sma_long[i],
        ];
        if parts.iter().any(|v| v.is_nan()) {
            continue;
        }
        if sma_short[i] == 0.0 || vol_sma_long[i] == 0.0 {
            continue;
        }
        let vpc = vwma_long[i] - sma_long[i];
        let vpr = vwma_short[i] / sma_short[i];
        let vm = vol_sma_short[i] / vol_sma_long[i];
        result[i] = vpc * vpr * vm;
    }

    result
}
