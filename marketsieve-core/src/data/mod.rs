//! Market data layer: provider trait, CSV cache, Yahoo source, and the
//! read-through caching provider the screener is normally wired with.

pub mod cache;
pub mod cached;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use cache::{CacheMeta, CacheStatus, CsvCache, DEFAULT_STALE_HOURS};
pub use cached::CachingProvider;
pub use provider::{BarProvider, DataError};
pub use universe::{Universe, UniverseEntry};
pub use yahoo::YahooProvider;
