//! MarketSieve Core — screening engine, market data layer, price
//! triggers, and pre-trade risk rules.
//!
//! The pieces fit together like this:
//! - Domain types (daily OHLCV bars, series helpers)
//! - Indicator kernels over close/volume series
//! - Composable screening conditions with a factory for config-driven
//!   condition trees
//! - A parallel screening orchestrator over a ticker universe
//! - Provider trait + CSV cache + Yahoo chart source for market data
//! - Price trigger state machine and a polling monitor thread
//! - Risk rule engine for pre-trade order validation

pub mod conditions;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod monitor;
pub mod risk;
pub mod screener;
pub mod trigger;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything that crosses the screener's rayon
    /// pool or the monitor thread boundary is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();

        require_send::<conditions::ConditionResult>();
        require_sync::<conditions::ConditionResult>();

        require_send::<screener::ScreeningResult>();
        require_sync::<screener::ScreeningResult>();

        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<data::Universe>();
        require_sync::<data::Universe>();

        require_send::<trigger::TriggerSpec>();
        require_sync::<trigger::TriggerSpec>();
        require_send::<trigger::TriggerEvent>();
        require_sync::<trigger::TriggerEvent>();

        require_send::<monitor::PriceSnapshot>();
        require_sync::<monitor::PriceSnapshot>();
        require_send::<monitor::MonitorEvent>();
        require_sync::<monitor::MonitorEvent>();

        require_send::<risk::RiskContext>();
        require_sync::<risk::RiskContext>();
        require_send::<risk::RiskValidationResult>();
        require_sync::<risk::RiskValidationResult>();
    }

    /// Architecture contract: conditions evaluate over bars alone, with
    /// no portfolio or data-provider parameter. If the trait ever grows
    /// one, this stops compiling.
    #[test]
    fn condition_trait_sees_only_bars() {
        fn _check_trait_object_builds(
            condition: &dyn conditions::Condition,
            bars: &[domain::Bar],
        ) -> conditions::ConditionResult {
            condition.evaluate("TEST", bars)
        }
    }
}
