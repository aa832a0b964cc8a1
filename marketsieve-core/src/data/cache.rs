//! CSV cache layer — one file per symbol plus a JSON metadata sidecar.
//!
//! Layout: `{cache_dir}/{SYMBOL}.csv` + `{cache_dir}/{SYMBOL}.meta.json`
//!
//! Writes are atomic (write to .tmp, rename into place), so concurrent
//! refreshes of the same symbol race safely: the last writer wins and
//! readers always see a complete file. Staleness defaults to 18 hours,
//! long enough to survive a trading day but not a session boundary.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::provider::DataError;
use crate::domain::{is_ascending, Bar};

/// Default staleness window in hours (market close to next pre-open).
pub const DEFAULT_STALE_HOURS: i64 = 18;

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub cached_at: NaiveDateTime,
}

/// Cache status for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub cached: bool,
    pub fresh: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: Option<usize>,
}

/// The CSV cache.
pub struct CsvCache {
    cache_dir: PathBuf,
    stale_after: Duration,
}

impl CsvCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            stale_after: Duration::hours(DEFAULT_STALE_HOURS),
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Symbols like `005930.KS` must not produce dotted extensions.
    fn safe_symbol(symbol: &str) -> String {
        symbol.replace(['.', '/'], "_")
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.csv", Self::safe_symbol(symbol)))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.meta.json", Self::safe_symbol(symbol)))
    }

    /// Write bars for a symbol to the cache, replacing any previous entry.
    pub fn store(&self, symbol: &str, bars: &[Bar]) -> Result<(), DataError> {
        let (first, last) = match (bars.first(), bars.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(DataError::CacheError("no bars to cache".into())),
        };
        if !is_ascending(bars) {
            return Err(DataError::CacheError(format!(
                "bars for {symbol} are not strictly ascending by date"
            )));
        }

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("create cache dir: {e}")))?;

        let path = self.csv_path(symbol);
        let tmp_path = path.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&tmp_path)
            .map_err(|e| DataError::CacheError(format!("create temp file: {e}")))?;
        for bar in bars {
            writer
                .serialize(bar)
                .map_err(|e| DataError::CacheError(format!("serialize bar: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| DataError::CacheError(format!("flush: {e}")))?;
        drop(writer);

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: first.date,
            end_date: last.date,
            bar_count: bars.len(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        let meta_tmp = self.meta_path(symbol).with_extension("json.tmp");
        fs::write(&meta_tmp, meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;
        fs::rename(&meta_tmp, self.meta_path(symbol)).map_err(|e| {
            let _ = fs::remove_file(&meta_tmp);
            DataError::CacheError(format!("meta rename failed: {e}"))
        })?;

        Ok(())
    }

    /// Load all cached bars for a symbol, ascending by date.
    pub fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| DataError::CacheError(format!("open cache file: {e}")))?;
        let mut bars = Vec::new();
        for record in reader.deserialize() {
            let bar: Bar =
                record.map_err(|e| DataError::CacheError(format!("parse cached bar: {e}")))?;
            bars.push(bar);
        }

        if bars.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    /// Read a symbol's metadata sidecar, if present and parseable.
    pub fn meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Whether the cached entry was written within the staleness window.
    pub fn is_fresh(&self, symbol: &str) -> bool {
        self.is_fresh_at(symbol, chrono::Local::now().naive_local())
    }

    /// Freshness against an injected clock.
    pub fn is_fresh_at(&self, symbol: &str, now: NaiveDateTime) -> bool {
        match self.meta(symbol) {
            Some(meta) => now.signed_duration_since(meta.cached_at) <= self.stale_after,
            None => false,
        }
    }

    /// Cache status for a set of symbols.
    pub fn status(&self, symbols: &[&str]) -> Vec<CacheStatus> {
        symbols
            .iter()
            .map(|sym| {
                let meta = self.meta(sym);
                CacheStatus {
                    symbol: sym.to_string(),
                    cached: meta.is_some(),
                    fresh: self.is_fresh(sym),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    bar_count: meta.as_ref().map(|m| m.bar_count),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_bars() -> Vec<Bar> {
        vec![
            Bar {
                date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                open: 100.0,
                high: 102.0,
                low: 99.0,
                close: 101.0,
                volume: 1000,
            },
            Bar {
                date: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
                open: 101.0,
                high: 103.0,
                low: 100.0,
                close: 102.0,
                volume: 1100,
            },
        ]
    }

    #[test]
    fn store_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(dir.path());

        cache.store("SPY", &sample_bars()).unwrap();
        let loaded = cache.load("SPY").unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(loaded[1].close, 102.0);
    }

    #[test]
    fn load_missing_symbol_is_no_data() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(dir.path());
        assert!(matches!(
            cache.load("NONE"),
            Err(DataError::NoData { .. })
        ));
    }

    #[test]
    fn store_rejects_unsorted_bars() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(dir.path());
        let mut bars = sample_bars();
        bars.reverse();
        assert!(cache.store("SPY", &bars).is_err());
    }

    #[test]
    fn meta_sidecar_describes_entry() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(dir.path());
        cache.store("SPY", &sample_bars()).unwrap();

        let meta = cache.meta("SPY").unwrap();
        assert_eq!(meta.symbol, "SPY");
        assert_eq!(meta.bar_count, 2);
        assert_eq!(meta.end_date, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
    }

    #[test]
    fn freshness_window() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(dir.path());
        cache.store("SPY", &sample_bars()).unwrap();

        let now = chrono::Local::now().naive_local();
        assert!(cache.is_fresh_at("SPY", now));
        assert!(!cache.is_fresh_at("SPY", now + Duration::hours(19)));
        assert!(!cache.is_fresh_at("MISSING", now));
    }

    #[test]
    fn dotted_symbols_get_safe_filenames() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(dir.path());
        cache.store("005930.KS", &sample_bars()).unwrap();

        assert!(dir.path().join("005930_KS.csv").exists());
        assert_eq!(cache.load("005930.KS").unwrap().len(), 2);
    }

    #[test]
    fn status_reports_cached_and_missing() {
        let dir = TempDir::new().unwrap();
        let cache = CsvCache::new(dir.path());
        cache.store("SPY", &sample_bars()).unwrap();

        let statuses = cache.status(&["SPY", "QQQ"]);
        assert!(statuses[0].cached && statuses[0].fresh);
        assert!(!statuses[1].cached);
    }
}
