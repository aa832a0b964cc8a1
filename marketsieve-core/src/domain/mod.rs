//! Domain types — the OHLCV bar and price-series helpers.

pub mod bar;
pub mod series;

pub use bar::Bar;
pub use series::{closes, highs, is_ascending, lows, volumes_f64};
