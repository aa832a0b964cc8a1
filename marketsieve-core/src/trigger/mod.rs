//! Price trigger checker — a cooldown-gated alert state machine.
//!
//! Registrations are immutable `TriggerSpec`s; runtime state lives in
//! separate `TriggerState` snapshots keyed by an opaque `TriggerId`.
//! Every transition replaces the snapshot rather than mutating shared
//! fields, so callers can read a consistent state at any time. The
//! checker itself is not internally synchronized; `check` takes
//! `&mut self`.
//!
//! A trigger fires when its predicate holds, it is enabled, and its
//! cooldown has lapsed. Non-recurring triggers disable themselves after
//! the first fire. Checks are idempotent per call: no price history is
//! kept beyond the cooldown timestamp.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// What a trigger watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    PriceAbove,
    PriceBelow,
    /// Within `tolerance` of the target (absolute; 1% of target when 0).
    PriceNear,
    StopLoss,
    TakeProfit,
    ChangePctAbove,
    ChangePctBelow,
}

impl TriggerKind {
    /// Change-percent kinds are only evaluated by `check_with_change`.
    fn uses_change_pct(self) -> bool {
        matches!(self, TriggerKind::ChangePctAbove | TriggerKind::ChangePctBelow)
    }
}

/// Immutable trigger registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub symbol: String,
    pub kind: TriggerKind,
    pub target: f64,
    #[serde(default)]
    pub tolerance: f64,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,
}

fn default_cooldown_minutes() -> i64 {
    60
}

impl TriggerSpec {
    pub fn new(symbol: impl Into<String>, kind: TriggerKind, target: f64) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            target,
            tolerance: 0.0,
            recurring: false,
            cooldown_minutes: 60,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn recurring(mut self, cooldown_minutes: i64) -> Self {
        self.recurring = true;
        self.cooldown_minutes = cooldown_minutes;
        self
    }

    /// Evaluate against a current price. Returns the event message on a hit.
    fn matches_price(&self, price: f64) -> Option<String> {
        let symbol = &self.symbol;
        let target = self.target;
        match self.kind {
            TriggerKind::PriceAbove if price >= target => {
                Some(format!("{symbol} price ({price:.2}) reached target ({target:.2})"))
            }
            TriggerKind::PriceBelow if price <= target => {
                Some(format!("{symbol} price ({price:.2}) dropped to target ({target:.2})"))
            }
            TriggerKind::PriceNear => {
                let tolerance = if self.tolerance > 0.0 {
                    self.tolerance
                } else {
                    target * 0.01
                };
                if (price - target).abs() <= tolerance {
                    Some(format!("{symbol} price ({price:.2}) near target ({target:.2})"))
                } else {
                    None
                }
            }
            TriggerKind::StopLoss if price <= target => {
                Some(format!("STOP LOSS: {symbol} ({price:.2}) hit stop ({target:.2})"))
            }
            TriggerKind::TakeProfit if price >= target => {
                Some(format!("TAKE PROFIT: {symbol} ({price:.2}) reached target ({target:.2})"))
            }
            _ => None,
        }
    }

    /// Evaluate against a day-change percentage.
    fn matches_change(&self, change_pct: f64) -> Option<String> {
        let symbol = &self.symbol;
        let target = self.target;
        match self.kind {
            TriggerKind::ChangePctAbove if change_pct >= target => Some(format!(
                "{symbol} change ({change_pct:.1}%) exceeded {target:.1}%"
            )),
            TriggerKind::ChangePctBelow if change_pct <= target => Some(format!(
                "{symbol} change ({change_pct:.1}%) dropped below {target:.1}%"
            )),
            _ => None,
        }
    }
}

/// Runtime state snapshot of one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerState {
    pub enabled: bool,
    pub last_fired: Option<NaiveDateTime>,
    pub fire_count: u32,
}

impl TriggerState {
    fn fresh() -> Self {
        Self {
            enabled: true,
            last_fired: None,
            fire_count: 0,
        }
    }

    fn can_fire(&self, spec: &TriggerSpec, now: NaiveDateTime) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_fired {
            Some(last) => now >= last + Duration::minutes(spec.cooldown_minutes),
            None => true,
        }
    }

    /// The post-fire snapshot.
    fn after_fire(&self, spec: &TriggerSpec, now: NaiveDateTime) -> Self {
        Self {
            enabled: spec.recurring,
            last_fired: Some(now),
            fire_count: self.fire_count + 1,
        }
    }
}

/// Opaque handle to a registered trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerId(u64);

/// A trigger firing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub id: TriggerId,
    pub symbol: String,
    pub kind: TriggerKind,
    pub target: f64,
    pub actual: f64,
    pub message: String,
    pub timestamp: NaiveDateTime,
}

type Callback = Box<dyn Fn(&TriggerEvent) + Send>;

struct Entry {
    id: TriggerId,
    spec: TriggerSpec,
    state: TriggerState,
}

/// The trigger checker.
pub struct TriggerChecker {
    entries: Vec<Entry>,
    callbacks: Vec<Callback>,
    event_log: Vec<TriggerEvent>,
    next_id: u64,
}

impl Default for TriggerChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerChecker {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            callbacks: Vec::new(),
            event_log: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a trigger; returns a handle for state queries.
    pub fn add(&mut self, spec: TriggerSpec) -> TriggerId {
        let id = TriggerId(self.next_id);
        self.next_id += 1;
        info!(symbol = %spec.symbol, kind = ?spec.kind, target = spec.target, "trigger added");
        self.entries.push(Entry {
            id,
            spec,
            state: TriggerState::fresh(),
        });
        id
    }

    /// Remove triggers for a symbol (all kinds, or one). Returns the
    /// number removed.
    pub fn remove(&mut self, symbol: &str, kind: Option<TriggerKind>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| {
            e.spec.symbol != symbol || kind.is_some_and(|k| e.spec.kind != k)
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            info!(symbol, removed, "triggers removed");
        }
        removed
    }

    /// Register a callback invoked synchronously on every firing.
    pub fn on_fired(&mut self, callback: impl Fn(&TriggerEvent) + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /// State snapshot for a trigger, if it still exists.
    pub fn state(&self, id: TriggerId) -> Option<TriggerState> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.state)
    }

    /// Spec for a trigger, if it still exists.
    pub fn spec(&self, id: TriggerId) -> Option<&TriggerSpec> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.spec)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check current prices against all price triggers.
    pub fn check(&mut self, prices: &[(&str, f64)]) -> Vec<TriggerEvent> {
        self.check_at(chrono::Local::now().naive_local(), prices)
    }

    /// `check` against an injected clock.
    pub fn check_at(&mut self, now: NaiveDateTime, prices: &[(&str, f64)]) -> Vec<TriggerEvent> {
        let mut events = Vec::new();
        for i in 0..self.entries.len() {
            let entry = &self.entries[i];
            if entry.spec.kind.uses_change_pct() || !entry.state.can_fire(&entry.spec, now) {
                continue;
            }
            let Some(&(_, price)) = prices.iter().find(|(s, _)| *s == entry.spec.symbol) else {
                continue;
            };
            if let Some(message) = entry.spec.matches_price(price) {
                events.push(self.fire(i, price, message, now));
            }
        }
        events
    }

    /// Check prices and day-change percentages together.
    pub fn check_with_change(
        &mut self,
        prices: &[(&str, f64)],
        changes: &[(&str, f64)],
    ) -> Vec<TriggerEvent> {
        self.check_with_change_at(chrono::Local::now().naive_local(), prices, changes)
    }

    /// `check_with_change` against an injected clock.
    pub fn check_with_change_at(
        &mut self,
        now: NaiveDateTime,
        prices: &[(&str, f64)],
        changes: &[(&str, f64)],
    ) -> Vec<TriggerEvent> {
        let mut events = self.check_at(now, prices);
        for i in 0..self.entries.len() {
            let entry = &self.entries[i];
            if !entry.spec.kind.uses_change_pct() || !entry.state.can_fire(&entry.spec, now) {
                continue;
            }
            let Some(&(_, change_pct)) = changes.iter().find(|(s, _)| *s == entry.spec.symbol)
            else {
                continue;
            };
            if let Some(message) = entry.spec.matches_change(change_pct) {
                events.push(self.fire(i, change_pct, message, now));
            }
        }
        events
    }

    /// Last `limit` events, oldest first.
    pub fn events(&self, limit: usize) -> &[TriggerEvent] {
        let start = self.event_log.len().saturating_sub(limit);
        &self.event_log[start..]
    }

    pub fn clear_events(&mut self) {
        self.event_log.clear();
    }

    /// Re-enable every trigger and wipe fire history.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.state = TriggerState::fresh();
        }
    }

    fn fire(&mut self, index: usize, actual: f64, message: String, now: NaiveDateTime) -> TriggerEvent {
        let entry = &mut self.entries[index];
        entry.state = entry.state.after_fire(&entry.spec, now);

        let event = TriggerEvent {
            id: entry.id,
            symbol: entry.spec.symbol.clone(),
            kind: entry.spec.kind,
            target: entry.spec.target,
            actual,
            message,
            timestamp: now,
        };
        info!(symbol = %event.symbol, message = %event.message, "trigger fired");
        self.event_log.push(event.clone());

        for callback in &self.callbacks {
            // One bad callback must not starve the rest.
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(&event))) {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(symbol = %event.symbol, detail, "trigger callback panicked");
            }
        }

        event
    }
}
