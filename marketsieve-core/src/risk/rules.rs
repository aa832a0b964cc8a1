//! The built-in risk rules.
//!
//! Every rule guards against a zero or negative portfolio value before
//! computing ratios, so a freshly opened account never divides by zero.

use super::{OrderSide, RiskContext, RiskLevel, RiskRule, RiskViolation};

/// Blocks a buy that would push one symbol past a share of the portfolio.
pub struct MaxPositionRule {
    max_pct: f64,
    level: RiskLevel,
}

impl MaxPositionRule {
    pub const DEFAULT_MAX_PCT: f64 = 20.0;

    pub fn new(max_pct: f64) -> Self {
        assert!(max_pct > 0.0, "max position pct must be positive");
        Self {
            max_pct,
            level: RiskLevel::Block,
        }
    }

    pub fn with_level(mut self, level: RiskLevel) -> Self {
        self.level = level;
        self
    }
}

impl Default for MaxPositionRule {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_PCT)
    }
}

impl RiskRule for MaxPositionRule {
    fn name(&self) -> &str {
        "max_position"
    }

    fn validate(&self, context: &RiskContext) -> Option<RiskViolation> {
        if context.side != OrderSide::Buy || context.portfolio_value <= 0.0 {
            return None;
        }
        let after = context.position_after_order();
        let pct = after / context.portfolio_value * 100.0;
        if pct > self.max_pct {
            return Some(
                RiskViolation::new(
                    self.name(),
                    self.level,
                    format!(
                        "{} would be {:.1}% of portfolio, limit is {:.1}%",
                        context.symbol, pct, self.max_pct
                    ),
                )
                .with_detail("position_pct", pct)
                .with_detail("max_pct", self.max_pct)
                .with_detail("position_value", after),
            );
        }
        None
    }
}

/// Blocks all new orders once the day's realized loss crosses a limit.
pub struct DailyLossLimitRule {
    max_loss_pct: f64,
    level: RiskLevel,
}

impl DailyLossLimitRule {
    pub const DEFAULT_MAX_LOSS_PCT: f64 = 3.0;

    pub fn new(max_loss_pct: f64) -> Self {
        assert!(max_loss_pct > 0.0, "loss limit pct must be positive");
        Self {
            max_loss_pct,
            level: RiskLevel::Block,
        }
    }

    pub fn with_level(mut self, level: RiskLevel) -> Self {
        self.level = level;
        self
    }
}

impl Default for DailyLossLimitRule {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_LOSS_PCT)
    }
}

impl RiskRule for DailyLossLimitRule {
    fn name(&self) -> &str {
        "daily_loss_limit"
    }

    fn validate(&self, context: &RiskContext) -> Option<RiskViolation> {
        if context.portfolio_value <= 0.0 || context.daily_pnl >= 0.0 {
            return None;
        }
        let loss_pct = (context.daily_pnl / context.portfolio_value * 100.0).abs();
        if loss_pct >= self.max_loss_pct {
            return Some(
                RiskViolation::new(
                    self.name(),
                    self.level,
                    format!(
                        "daily loss {:.1}% has reached the {:.1}% limit, trading halted",
                        loss_pct, self.max_loss_pct
                    ),
                )
                .with_detail("daily_loss_pct", loss_pct)
                .with_detail("max_loss_pct", self.max_loss_pct)
                .with_detail("daily_pnl", context.daily_pnl),
            );
        }
        None
    }
}

/// Warns when a buy would concentrate too much of the portfolio in one
/// sector. Passes silently when the order carries no sector tag.
pub struct SectorLimitRule {
    max_pct: f64,
    level: RiskLevel,
}

impl SectorLimitRule {
    pub const DEFAULT_MAX_PCT: f64 = 30.0;

    pub fn new(max_pct: f64) -> Self {
        assert!(max_pct > 0.0, "sector limit pct must be positive");
        Self {
            max_pct,
            level: RiskLevel::Warning,
        }
    }

    pub fn with_level(mut self, level: RiskLevel) -> Self {
        self.level = level;
        self
    }
}

impl Default for SectorLimitRule {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_PCT)
    }
}

impl RiskRule for SectorLimitRule {
    fn name(&self) -> &str {
        "sector_limit"
    }

    fn validate(&self, context: &RiskContext) -> Option<RiskViolation> {
        if context.side != OrderSide::Buy || context.portfolio_value <= 0.0 {
            return None;
        }
        let sector = context.sector.as_deref()?;
        let current = context
            .sector_positions
            .get(sector)
            .copied()
            .unwrap_or(0.0);
        let pct = (current + context.order_value()) / context.portfolio_value * 100.0;
        if pct > self.max_pct {
            return Some(
                RiskViolation::new(
                    self.name(),
                    self.level,
                    format!(
                        "sector {} would be {:.1}% of portfolio, limit is {:.1}%",
                        sector, pct, self.max_pct
                    ),
                )
                .with_detail("sector_pct", pct)
                .with_detail("max_pct", self.max_pct),
            );
        }
        None
    }
}

/// Warns when a buy would drop the cash reserve below a floor.
pub struct MinCashRule {
    min_pct: f64,
    level: RiskLevel,
}

impl MinCashRule {
    pub const DEFAULT_MIN_PCT: f64 = 10.0;

    pub fn new(min_pct: f64) -> Self {
        assert!(min_pct >= 0.0, "cash floor pct must not be negative");
        Self {
            min_pct,
            level: RiskLevel::Warning,
        }
    }

    pub fn with_level(mut self, level: RiskLevel) -> Self {
        self.level = level;
        self
    }
}

impl Default for MinCashRule {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_PCT)
    }
}

impl RiskRule for MinCashRule {
    fn name(&self) -> &str {
        "min_cash"
    }

    fn validate(&self, context: &RiskContext) -> Option<RiskViolation> {
        if context.side != OrderSide::Buy || context.portfolio_value <= 0.0 {
            return None;
        }
        let cash_after = context.cash_balance - context.order_value();
        let pct = cash_after / context.portfolio_value * 100.0;
        if pct < self.min_pct {
            return Some(
                RiskViolation::new(
                    self.name(),
                    self.level,
                    format!(
                        "cash would fall to {:.1}% of portfolio, floor is {:.1}%",
                        pct, self.min_pct
                    ),
                )
                .with_detail("cash_pct", pct)
                .with_detail("min_pct", self.min_pct)
                .with_detail("cash_after", cash_after),
            );
        }
        None
    }
}

/// Warns once the day's trade count reaches a cap. Counts both sides.
pub struct MaxDailyTradesRule {
    max_trades: u32,
    level: RiskLevel,
}

impl MaxDailyTradesRule {
    pub const DEFAULT_MAX_TRADES: u32 = 10;

    pub fn new(max_trades: u32) -> Self {
        assert!(max_trades > 0, "trade cap must be positive");
        Self {
            max_trades,
            level: RiskLevel::Warning,
        }
    }

    pub fn with_level(mut self, level: RiskLevel) -> Self {
        self.level = level;
        self
    }
}

impl Default for MaxDailyTradesRule {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_TRADES)
    }
}

impl RiskRule for MaxDailyTradesRule {
    fn name(&self) -> &str {
        "max_daily_trades"
    }

    fn validate(&self, context: &RiskContext) -> Option<RiskViolation> {
        if context.daily_trades >= self.max_trades {
            return Some(
                RiskViolation::new(
                    self.name(),
                    self.level,
                    format!(
                        "{} trades today, cap is {}",
                        context.daily_trades, self.max_trades
                    ),
                )
                .with_detail("daily_trades", context.daily_trades as f64)
                .with_detail("max_trades", self.max_trades as f64),
            );
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::Position;
    use std::collections::BTreeMap;

    fn buy_context(quantity: u64, price: f64) -> RiskContext {
        RiskContext::new("AAPL", OrderSide::Buy, quantity, price, 10_000.0, 5_000.0)
    }

    #[test]
    fn max_position_blocks_oversized_buy() {
        let rule = MaxPositionRule::default();
        // 25% of a 10k portfolio.
        let violation = rule.validate(&buy_context(25, 100.0)).unwrap();
        assert_eq!(violation.level, RiskLevel::Block);
        assert_eq!(violation.details["position_pct"], 25.0);

        // 15% passes.
        assert!(rule.validate(&buy_context(15, 100.0)).is_none());
    }

    #[test]
    fn max_position_counts_existing_holding() {
        let mut positions = BTreeMap::new();
        positions.insert(
            "AAPL".to_string(),
            Position {
                quantity: 15,
                avg_price: 100.0,
            },
        );
        let ctx = buy_context(10, 100.0).with_positions(positions);
        // 1500 held + 1000 order = 25% of 10k.
        assert!(MaxPositionRule::default().validate(&ctx).is_some());
    }

    #[test]
    fn max_position_ignores_sells() {
        let ctx = RiskContext::new("AAPL", OrderSide::Sell, 50, 100.0, 10_000.0, 5_000.0);
        assert!(MaxPositionRule::default().validate(&ctx).is_none());
    }

    #[test]
    fn daily_loss_limit_triggers_at_boundary() {
        let rule = DailyLossLimitRule::default();
        let at_limit = buy_context(1, 100.0).with_daily(-300.0, 0);
        assert!(rule.validate(&at_limit).is_some());

        let under = buy_context(1, 100.0).with_daily(-299.0, 0);
        assert!(rule.validate(&under).is_none());

        let profit = buy_context(1, 100.0).with_daily(500.0, 0);
        assert!(rule.validate(&profit).is_none());
    }

    #[test]
    fn sector_limit_needs_sector_tag() {
        let rule = SectorLimitRule::default();
        // 40% order with no sector tag passes silently.
        assert!(rule.validate(&buy_context(40, 100.0)).is_none());

        let mut sectors = BTreeMap::new();
        sectors.insert("tech".to_string(), 2_500.0);
        let tagged = buy_context(10, 100.0).with_sector("tech", sectors);
        // 2500 + 1000 = 35% of 10k.
        let violation = rule.validate(&tagged).unwrap();
        assert_eq!(violation.level, RiskLevel::Warning);
    }

    #[test]
    fn min_cash_warns_below_floor() {
        let rule = MinCashRule::default();
        // 5000 cash - 4500 order = 5% of portfolio.
        let violation = rule.validate(&buy_context(45, 100.0)).unwrap();
        assert_eq!(violation.level, RiskLevel::Warning);

        // 5000 - 3000 = 20% stays above the 10% floor.
        assert!(rule.validate(&buy_context(30, 100.0)).is_none());
    }

    #[test]
    fn max_daily_trades_counts_boundary_inclusive() {
        let rule = MaxDailyTradesRule::default();
        assert!(rule.validate(&buy_context(1, 100.0).with_daily(0.0, 10)).is_some());
        assert!(rule.validate(&buy_context(1, 100.0).with_daily(0.0, 9)).is_none());
    }
}
