//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! Middle = SMA(period); upper/lower = middle ± mult * stddev(period).
//! Uses population stddev (divide by N).

/// The three bands, same length as the input, NaN-padded.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Bollinger Bands of `values` over `period` with `mult` standard deviations.
pub fn bollinger(values: &[f64], period: usize, mult: f64) -> BollingerBands {
    let n = values.len();
    let mut middle = vec![f64::NAN; n];
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];

    if period == 0 || n < period {
        return BollingerBands {
            middle,
            upper,
            lower,
        };
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|v| {
                let d = v - mean;
                d * d
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        middle[i] = mean;
        upper[i] = mean + mult * stddev;
        lower[i] = mean - mult * stddev;
    }

    BollingerBands {
        middle,
        upper,
        lower,
    }
}

/// Band width as a percentage of the middle band: (upper - lower) / middle * 100.
pub fn bollinger_width(values: &[f64], period: usize, mult: f64) -> Vec<f64> {
    let bands = bollinger(values, period, mult);
    let n = values.len();
    let mut width = vec![f64::NAN; n];
    for i in 0..n {
        let (m, u, l) = (bands.middle[i], bands.upper[i], bands.lower[i]);
        if !m.is_nan() && !u.is_nan() && !l.is_nan() && m != 0.0 {
            width[i] = (u - l) / m * 100.0;
        }
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn bollinger_middle_is_sma() {
        let bands = bollinger(&[10.0, 11.0, 12.0, 13.0, 14.0], 3, 2.0);
        assert!(bands.middle[1].is_nan());
        assert_approx(bands.middle[2], 11.0, DEFAULT_EPSILON);
        assert_approx(bands.middle[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_bands_symmetric() {
        let bands = bollinger(&[10.0, 11.0, 12.0, 13.0, 14.0], 3, 2.0);
        for i in 2..5 {
            let half_width = bands.upper[i] - bands.middle[i];
            assert_approx(bands.middle[i] - bands.lower[i], half_width, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn bollinger_constant_price_zero_width() {
        let bands = bollinger(&[100.0; 4], 3, 2.0);
        assert_approx(bands.upper[2], 100.0, DEFAULT_EPSILON);
        assert_approx(bands.lower[2], 100.0, DEFAULT_EPSILON);
        let width = bollinger_width(&[100.0; 4], 3, 2.0);
        assert_approx(width[3], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_nan_propagation() {
        let bands = bollinger(&[10.0, 11.0, f64::NAN, 13.0], 3, 2.0);
        assert!(bands.upper[2].is_nan());
        assert!(bands.upper[3].is_nan()); // window includes the NaN at 2
    }
}
