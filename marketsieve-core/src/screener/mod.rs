//! Screening orchestrator — runs a condition set over a ticker universe.
//!
//! One data fetch per ticker sized to the deepest condition lookback,
//! then every condition evaluated against the same series. Tickers are
//! processed on a private rayon pool so one screener's parallelism never
//! contends with another's. Per-ticker failures are logged and omitted;
//! a run only fails outright on configuration errors.

pub mod export;

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conditions::{Condition, ConditionResult};
use crate::data::{BarProvider, DataError, Universe};

pub use export::export_csv;

/// Errors that fail a whole screening run.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("screener has no conditions")]
    NoConditions,

    #[error("failed to build worker pool: {0}")]
    Pool(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("csv export error: {0}")]
    Export(String),
}

/// Outcome of screening one ticker. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub symbol: String,
    pub display_name: String,
    /// True when every top-level condition matched.
    pub matched: bool,
    pub results: Vec<ConditionResult>,
    pub current_price: f64,
    pub current_volume: u64,
    pub timestamp: NaiveDateTime,
}

impl ScreeningResult {
    /// Names of the top-level conditions that matched.
    pub fn matched_names(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.matched)
            .map(|r| r.condition_name.as_str())
            .collect()
    }
}

pub struct Screener {
    conditions: Vec<Arc<dyn Condition>>,
    provider: Arc<dyn BarProvider>,
    max_workers: usize,
}

impl Screener {
    pub fn new(conditions: Vec<Arc<dyn Condition>>, provider: Arc<dyn BarProvider>) -> Self {
        Self {
            conditions,
            provider,
            max_workers: 4,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Deepest lookback over all conditions; the per-ticker fetch size.
    pub fn required_days(&self) -> usize {
        self.conditions
            .iter()
            .map(|c| c.required_lookback())
            .max()
            .unwrap_or(0)
    }

    /// Screen a list of tickers, returning only full matches.
    ///
    /// Result order is unspecified.
    pub fn run(&self, tickers: &[&str]) -> Result<Vec<ScreeningResult>, ScreenError> {
        let named: Vec<(&str, &str)> = tickers.iter().map(|t| (*t, *t)).collect();
        self.run_named(&named)
    }

    /// Screen a universe, carrying its display names into the results.
    pub fn run_universe(&self, universe: &Universe) -> Result<Vec<ScreeningResult>, ScreenError> {
        let named: Vec<(&str, &str)> = universe
            .tickers
            .iter()
            .map(|t| (t.symbol.as_str(), universe.display_name(&t.symbol)))
            .collect();
        self.run_named(&named)
    }

    /// Screen one ticker. Unlike `run`, data failures are hard errors
    /// and the result comes back whether or not it matched.
    pub fn run_single(&self, ticker: &str) -> Result<ScreeningResult, ScreenError> {
        if self.conditions.is_empty() {
            return Err(ScreenError::NoConditions);
        }
        let days = self.required_days();
        let bars = self.provider.get(ticker, days, false)?;
        if bars.is_empty() {
            return Err(ScreenError::Data(DataError::NoData {
                symbol: ticker.to_string(),
            }));
        }
        Ok(self.evaluate(ticker, ticker, &bars))
    }

    fn run_named(&self, tickers: &[(&str, &str)]) -> Result<Vec<ScreeningResult>, ScreenError> {
        if self.conditions.is_empty() {
            return Err(ScreenError::NoConditions);
        }
        let days = self.required_days();
        info!(
            tickers = tickers.len(),
            conditions = self.conditions.len(),
            days,
            "screening"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ScreenError::Pool(e.to_string()))?;

        let matches: Vec<ScreeningResult> = pool.install(|| {
            tickers
                .par_iter()
                .filter_map(|&(symbol, display)| self.screen_one(symbol, display, days))
                .filter(|r| r.matched)
                .collect()
        });

        info!(matches = matches.len(), "screening complete");
        Ok(matches)
    }

    fn screen_one(&self, symbol: &str, display: &str, days: usize) -> Option<ScreeningResult> {
        let bars = match self.provider.get(symbol, days, false) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol, error = %e, "skipping ticker, data unavailable");
                return None;
            }
        };
        // Below half the required history nothing useful can evaluate.
        // The max(1) keeps empty series out even when every condition
        // looks back a single bar.
        if bars.len() < (days / 2).max(1) {
            debug!(symbol, bars = bars.len(), required = days, "skipping ticker, short history");
            return None;
        }
        Some(self.evaluate(symbol, display, &bars))
    }

    fn evaluate(&self, symbol: &str, display: &str, bars: &[crate::domain::Bar]) -> ScreeningResult {
        let results: Vec<ConditionResult> = self
            .conditions
            .iter()
            .map(|c| c.evaluate(symbol, bars))
            .collect();
        let matched = results.iter().all(|r| r.matched);
        let last = &bars[bars.len() - 1];
        ScreeningResult {
            symbol: symbol.to_string(),
            display_name: display.to_string(),
            matched,
            results,
            current_price: last.close,
            current_volume: last.volume,
            timestamp: Utc::now().naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::MinPrice;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    struct FixedProvider {
        bars: Vec<Bar>,
    }

    impl BarProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn get(&self, _symbol: &str, days: usize, _force: bool) -> Result<Vec<Bar>, DataError> {
            let mut bars = self.bars.clone();
            if bars.len() > days {
                bars.drain(..bars.len() - days);
            }
            Ok(bars)
        }
    }

    fn flat_bars(n: usize, close: f64) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        (0..n)
            .map(|i| Bar {
                date: base + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn empty_condition_list_is_hard_error() {
        let provider = Arc::new(FixedProvider {
            bars: flat_bars(10, 100.0),
        });
        let screener = Screener::new(vec![], provider);
        assert!(matches!(screener.run(&["A"]), Err(ScreenError::NoConditions)));
        assert!(matches!(
            screener.run_single("A"),
            Err(ScreenError::NoConditions)
        ));
    }

    #[test]
    fn run_keeps_only_matches() {
        let provider = Arc::new(FixedProvider {
            bars: flat_bars(10, 100.0),
        });
        let screener = Screener::new(
            vec![Arc::new(MinPrice::new(50.0)) as Arc<dyn Condition>],
            provider,
        );
        let results = screener.run(&["A", "B"]).unwrap();
        assert_eq!(results.len(), 2);

        let provider = Arc::new(FixedProvider {
            bars: flat_bars(10, 10.0),
        });
        let screener = Screener::new(
            vec![Arc::new(MinPrice::new(50.0)) as Arc<dyn Condition>],
            provider,
        );
        assert!(screener.run(&["A"]).unwrap().is_empty());
    }

    #[test]
    fn empty_series_is_skipped_not_fatal() {
        let provider = Arc::new(FixedProvider { bars: Vec::new() });
        let screener = Screener::new(
            vec![Arc::new(MinPrice::new(50.0)) as Arc<dyn Condition>],
            provider,
        );
        assert!(screener.run(&["A", "B"]).unwrap().is_empty());
    }

    #[test]
    fn run_single_returns_non_matches_too() {
        let provider = Arc::new(FixedProvider {
            bars: flat_bars(10, 10.0),
        });
        let screener = Screener::new(
            vec![Arc::new(MinPrice::new(50.0)) as Arc<dyn Condition>],
            provider,
        );
        let result = screener.run_single("A").unwrap();
        assert!(!result.matched);
        assert_eq!(result.current_price, 10.0);
    }
}
