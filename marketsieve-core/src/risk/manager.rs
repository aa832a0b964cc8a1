//! Rule aggregation and the validation entry point.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{NaiveDateTime, Utc};
use tracing::{error, warn};

use super::rules::{DailyLossLimitRule, MaxDailyTradesRule, MaxPositionRule, MinCashRule};
use super::{OrderSide, RiskContext, RiskRule, RiskValidationResult, RiskViolation};

/// One validation that produced at least one finding, kept for review.
#[derive(Debug, Clone)]
pub struct ViolationRecord {
    pub symbol: String,
    pub side: OrderSide,
    pub result: RiskValidationResult,
    pub timestamp: NaiveDateTime,
}

/// Runs every registered rule against a proposed order.
///
/// Rules never see each other's output and all of them run on every
/// validation. A rule that panics is logged and skipped so one bad rule
/// cannot take down order validation.
pub struct RiskManager {
    rules: Vec<Box<dyn RiskRule>>,
    violation_log: Vec<ViolationRecord>,
}

impl RiskManager {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            violation_log: Vec::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn RiskRule>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Removes every rule with the given name. Returns how many went.
    pub fn remove_rule(&mut self, name: &str) -> usize {
        let before = self.rules.len();
        self.rules.retain(|r| r.name() != name);
        before - self.rules.len()
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule. An empty rule set allows everything.
    pub fn validate(&mut self, context: &RiskContext) -> RiskValidationResult {
        let mut findings: Vec<RiskViolation> = Vec::new();
        for rule in &self.rules {
            match catch_unwind(AssertUnwindSafe(|| rule.validate(context))) {
                Ok(Some(violation)) => findings.push(violation),
                Ok(None) => {}
                Err(payload) => {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(rule = rule.name(), reason, "risk rule panicked, skipping");
                }
            }
        }

        let result = RiskValidationResult::from_findings(findings);
        if !result.allowed {
            warn!(
                symbol = %context.symbol,
                violations = result.violations.len(),
                "order blocked by risk rules"
            );
        }
        if !result.violations.is_empty() || !result.warnings.is_empty() {
            self.violation_log.push(ViolationRecord {
                symbol: context.symbol.clone(),
                side: context.side,
                result: result.clone(),
                timestamp: Utc::now().naive_utc(),
            });
        }
        result
    }

    /// Validate an order against a portfolio with no open positions and
    /// a clean daily slate. Callers with richer state build a
    /// `RiskContext` and use `validate` directly.
    pub fn validate_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: u64,
        price: f64,
        portfolio_value: f64,
        cash_balance: f64,
    ) -> RiskValidationResult {
        let context = RiskContext::new(symbol, side, quantity, price, portfolio_value, cash_balance);
        self.validate(&context)
    }

    /// The most recent records, oldest first.
    pub fn violation_log(&self, limit: usize) -> &[ViolationRecord] {
        let start = self.violation_log.len().saturating_sub(limit);
        &self.violation_log[start..]
    }

    pub fn clear_violation_log(&mut self) {
        self.violation_log.clear();
    }
}

/// The standard retail preset: position cap, daily loss halt, cash
/// floor, and trade-count cap. Sector limits need sector tagging the
/// caller may not have, so that rule is opt-in.
impl Default for RiskManager {
    fn default() -> Self {
        let mut manager = Self::new();
        manager
            .add_rule(Box::new(MaxPositionRule::default()))
            .add_rule(Box::new(DailyLossLimitRule::default()))
            .add_rule(Box::new(MinCashRule::default()))
            .add_rule(Box::new(MaxDailyTradesRule::default()));
        manager
    }
}
