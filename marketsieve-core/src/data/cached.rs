//! Caching provider — read-through layer over an upstream provider.
//!
//! Fresh cache entries with enough history are served directly. On a
//! miss (or `force_refresh`) the upstream is fetched after a fixed
//! inter-request delay and the result written back. When the upstream
//! fails but a stale entry exists, the stale entry is served with a
//! warning rather than failing the whole screen.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::cache::CsvCache;
use super::provider::{BarProvider, DataError};
use crate::domain::Bar;

/// Minimum cached fraction of the requested bars before the entry
/// counts as sufficient.
const MIN_COVERAGE: f64 = 0.7;

pub struct CachingProvider {
    cache: CsvCache,
    upstream: Arc<dyn BarProvider>,
    request_delay: Duration,
}

impl CachingProvider {
    pub fn new(cache: CsvCache, upstream: Arc<dyn BarProvider>) -> Self {
        Self {
            cache,
            upstream,
            request_delay: Duration::from_millis(500),
        }
    }

    pub fn with_request_delay(mut self, request_delay: Duration) -> Self {
        self.request_delay = request_delay;
        self
    }

    pub fn cache(&self) -> &CsvCache {
        &self.cache
    }

    fn trim(mut bars: Vec<Bar>, days: usize) -> Vec<Bar> {
        if bars.len() > days {
            bars.drain(..bars.len() - days);
        }
        bars
    }

    fn load_cached(&self, symbol: &str, days: usize) -> Option<Vec<Bar>> {
        let bars = self.cache.load(symbol).ok()?;
        if (bars.len() as f64) < days as f64 * MIN_COVERAGE {
            debug!(
                symbol,
                cached = bars.len(),
                requested = days,
                "cache entry too short, refetching"
            );
            return None;
        }
        Some(Self::trim(bars, days))
    }
}

impl BarProvider for CachingProvider {
    fn name(&self) -> &str {
        "cached"
    }

    fn get(&self, symbol: &str, days: usize, force_refresh: bool) -> Result<Vec<Bar>, DataError> {
        if !force_refresh && self.cache.is_fresh(symbol) {
            if let Some(bars) = self.load_cached(symbol, days) {
                debug!(symbol, bars = bars.len(), "cache hit");
                return Ok(bars);
            }
        }

        std::thread::sleep(self.request_delay);
        match self.upstream.get(symbol, days, force_refresh) {
            Ok(bars) => {
                if let Err(e) = self.cache.store(symbol, &bars) {
                    warn!(symbol, error = %e, "failed to write cache entry");
                }
                Ok(Self::trim(bars, days))
            }
            Err(fetch_err) => {
                // Stale data beats no data for screening purposes.
                if let Some(bars) = self.load_cached(symbol, days) {
                    warn!(symbol, error = %fetch_err, "upstream failed, serving stale cache");
                    return Ok(bars);
                }
                Err(fetch_err)
            }
        }
    }
}
