//! Live price monitor.
//!
//! A background thread polls a quote source on a fixed interval, runs
//! the trigger checker over each batch, and streams everything to the
//! caller over an `mpsc` channel. Shutdown is a stop flag the thread
//! observes between short sleeps, so `stop()` returns promptly even
//! with a long polling interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::data::DataError;
use crate::trigger::{TriggerChecker, TriggerEvent};

/// One quote observation.
#[derive(Debug, Clone)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub price: f64,
    /// Percent change versus the previous close, when the source has it.
    pub change_pct: Option<f64>,
    pub timestamp: NaiveDateTime,
}

/// Source of current quotes. Implemented over the bar provider in
/// production and over fixtures in tests.
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;

    /// Current quotes for the given symbols. Symbols the source cannot
    /// quote are simply absent from the result.
    fn quotes(&self, symbols: &[String]) -> Result<Vec<PriceSnapshot>, DataError>;
}

/// Quote source over a bar provider: last close is the price, change
/// percent comes from the previous close. Daily-bar granularity, which
/// is what the polling watch loop works with.
pub struct ProviderQuoteSource {
    provider: Arc<dyn crate::data::BarProvider>,
}

impl ProviderQuoteSource {
    pub fn new(provider: Arc<dyn crate::data::BarProvider>) -> Self {
        Self { provider }
    }
}

impl QuoteSource for ProviderQuoteSource {
    fn name(&self) -> &str {
        "bar_provider"
    }

    fn quotes(&self, symbols: &[String]) -> Result<Vec<PriceSnapshot>, DataError> {
        let now = Utc::now().naive_utc();
        let mut snapshots = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let bars = match self.provider.get(symbol, 5, true) {
                Ok(bars) => bars,
                Err(e) => {
                    debug!(symbol, error = %e, "no quote for symbol");
                    continue;
                }
            };
            let Some(last) = bars.last() else { continue };
            let change_pct = bars
                .len()
                .checked_sub(2)
                .map(|i| &bars[i])
                .filter(|prev| prev.close != 0.0)
                .map(|prev| (last.close - prev.close) / prev.close * 100.0);
            snapshots.push(PriceSnapshot {
                symbol: symbol.clone(),
                price: last.close,
                change_pct,
                timestamp: now,
            });
        }
        Ok(snapshots)
    }
}

/// What the monitor thread streams back.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// One polling pass worth of quotes.
    Snapshot(Vec<PriceSnapshot>),
    /// A trigger fired on this pass.
    Triggered(TriggerEvent),
    /// The source failed this pass; polling continues.
    SourceError(String),
    /// The thread is exiting. Always the last event sent.
    Stopped,
}

/// Handle to a running monitor thread.
pub struct MonitorHandle {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Signal the thread to stop and wait for it to exit.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("monitor thread panicked before join");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_finished()).unwrap_or(true)
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub struct PriceMonitor {
    source: Arc<dyn QuoteSource>,
    symbols: Vec<String>,
    interval: Duration,
}

impl PriceMonitor {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

    pub fn new(source: Arc<dyn QuoteSource>, symbols: Vec<String>) -> Self {
        Self {
            source,
            symbols,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start polling. The thread owns the checker; observe its firings
    /// through the channel or through callbacks registered before spawn.
    pub fn spawn(self, checker: TriggerChecker, tx: Sender<MonitorEvent>) -> MonitorHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("marketsieve-monitor".into())
            .spawn(move || {
                monitor_loop(self, checker, tx, stop_flag);
            })
            .ok();
        if handle.is_none() {
            warn!("failed to spawn monitor thread");
            stop.store(true, Ordering::Relaxed);
        }
        MonitorHandle { stop, handle }
    }
}

fn monitor_loop(
    monitor: PriceMonitor,
    mut checker: TriggerChecker,
    tx: Sender<MonitorEvent>,
    stop: Arc<AtomicBool>,
) {
    info!(
        source = monitor.source.name(),
        symbols = monitor.symbols.len(),
        interval_secs = monitor.interval.as_secs(),
        "monitor started"
    );

    while !stop.load(Ordering::Relaxed) {
        match monitor.source.quotes(&monitor.symbols) {
            Ok(snapshots) => {
                let prices: Vec<(&str, f64)> = snapshots
                    .iter()
                    .map(|s| (s.symbol.as_str(), s.price))
                    .collect();
                let changes: Vec<(&str, f64)> = snapshots
                    .iter()
                    .filter_map(|s| s.change_pct.map(|c| (s.symbol.as_str(), c)))
                    .collect();

                for event in checker.check_with_change(&prices, &changes) {
                    if tx.send(MonitorEvent::Triggered(event)).is_err() {
                        // Receiver gone, nothing left to monitor for.
                        info!("monitor channel closed, stopping");
                        return;
                    }
                }
                if tx.send(MonitorEvent::Snapshot(snapshots)).is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!(error = %e, "quote poll failed");
                if tx.send(MonitorEvent::SourceError(e.to_string())).is_err() {
                    return;
                }
            }
        }

        sleep_interruptible(monitor.interval, &stop);
    }

    info!("monitor stopped");
    let _ = tx.send(MonitorEvent::Stopped);
}

/// Sleep in 100ms slices so the stop flag is observed quickly.
fn sleep_interruptible(total: Duration, stop: &AtomicBool) {
    let slice = Duration::from_millis(100);
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
        let step = remaining.min(slice);
        thread::sleep(step);
        remaining -= step;
    }
}
