//! Pre-trade risk rule engine.
//!
//! Structurally the mirror of the screening conditions: every rule is a
//! predicate over a `RiskContext`, all rules run on every validation
//! (no short-circuit), and the aggregate reports everything it found.
//! BLOCK violations veto the order; WARNING and INFO are advisory.

pub mod manager;
pub mod rules;

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub use manager::RiskManager;
pub use rules::{
    DailyLossLimitRule, MaxDailyTradesRule, MaxPositionRule, MinCashRule, SectorLimitRule,
};

/// Severity of a rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Block,
    Warning,
    Info,
}

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// An existing holding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub quantity: u64,
    pub avg_price: f64,
}

/// Everything a rule may inspect about the proposed order and the
/// portfolio it lands in.
#[derive(Debug, Clone)]
pub struct RiskContext {
    pub portfolio_value: f64,
    pub cash_balance: f64,
    pub positions: BTreeMap<String, Position>,

    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub price: f64,

    pub daily_pnl: f64,
    pub daily_trades: u32,

    pub sector: Option<String>,
    pub sector_positions: BTreeMap<String, f64>,
}

impl RiskContext {
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u64,
        price: f64,
        portfolio_value: f64,
        cash_balance: f64,
    ) -> Self {
        Self {
            portfolio_value,
            cash_balance,
            positions: BTreeMap::new(),
            symbol: symbol.into(),
            side,
            quantity,
            price,
            daily_pnl: 0.0,
            daily_trades: 0,
            sector: None,
            sector_positions: BTreeMap::new(),
        }
    }

    pub fn with_positions(mut self, positions: BTreeMap<String, Position>) -> Self {
        self.positions = positions;
        self
    }

    pub fn with_daily(mut self, daily_pnl: f64, daily_trades: u32) -> Self {
        self.daily_pnl = daily_pnl;
        self.daily_trades = daily_trades;
        self
    }

    pub fn with_sector(
        mut self,
        sector: impl Into<String>,
        sector_positions: BTreeMap<String, f64>,
    ) -> Self {
        self.sector = Some(sector.into());
        self.sector_positions = sector_positions;
        self
    }

    /// Notional value of the proposed order.
    pub fn order_value(&self) -> f64 {
        self.quantity as f64 * self.price
    }

    /// Current value of the holding in the order's symbol.
    pub fn current_position_value(&self) -> f64 {
        self.positions
            .get(&self.symbol)
            .map(|p| p.quantity as f64 * p.avg_price)
            .unwrap_or(0.0)
    }

    /// Expected position value after the order executes.
    pub fn position_after_order(&self) -> f64 {
        let current = self.current_position_value();
        match self.side {
            OrderSide::Buy => current + self.order_value(),
            OrderSide::Sell => (current - self.order_value()).max(0.0),
        }
    }
}

/// One rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskViolation {
    pub rule_name: String,
    pub level: RiskLevel,
    pub message: String,
    pub details: BTreeMap<String, f64>,
}

impl RiskViolation {
    pub fn new(rule_name: impl Into<String>, level: RiskLevel, message: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            level,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: f64) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Aggregate outcome of running every rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskValidationResult {
    /// True when no BLOCK-level violation was found.
    pub allowed: bool,
    pub violations: Vec<RiskViolation>,
    pub warnings: Vec<RiskViolation>,
    pub timestamp: NaiveDateTime,
}

impl RiskValidationResult {
    pub(crate) fn from_findings(findings: Vec<RiskViolation>) -> Self {
        let (violations, warnings): (Vec<_>, Vec<_>) = findings
            .into_iter()
            .partition(|v| v.level == RiskLevel::Block);
        Self {
            allowed: violations.is_empty(),
            violations,
            warnings,
            timestamp: Utc::now().naive_utc(),
        }
    }
}

/// A pre-trade risk predicate.
pub trait RiskRule: Send + Sync {
    fn name(&self) -> &str;

    /// Returns a violation when the rule is breached, None when clean.
    fn validate(&self, context: &RiskContext) -> Option<RiskViolation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_value_and_position_projection() {
        let mut positions = BTreeMap::new();
        positions.insert(
            "AAPL".to_string(),
            Position {
                quantity: 10,
                avg_price: 100.0,
            },
        );
        let ctx = RiskContext::new("AAPL", OrderSide::Buy, 5, 200.0, 10_000.0, 5_000.0)
            .with_positions(positions.clone());
        assert_eq!(ctx.order_value(), 1000.0);
        assert_eq!(ctx.current_position_value(), 1000.0);
        assert_eq!(ctx.position_after_order(), 2000.0);

        let sell = RiskContext::new("AAPL", OrderSide::Sell, 50, 100.0, 10_000.0, 5_000.0)
            .with_positions(positions);
        // Selling more than held floors at zero.
        assert_eq!(sell.position_after_order(), 0.0);
    }

    #[test]
    fn result_partition_sets_allowed() {
        let result = RiskValidationResult::from_findings(vec![
            RiskViolation::new("a", RiskLevel::Warning, "w"),
            RiskViolation::new("b", RiskLevel::Block, "b"),
        ]);
        assert!(!result.allowed);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.warnings.len(), 1);

        let clean = RiskValidationResult::from_findings(vec![RiskViolation::new(
            "a",
            RiskLevel::Info,
            "i",
        )]);
        assert!(clean.allowed);
    }
}
