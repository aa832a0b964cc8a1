//! Boolean composition of conditions.
//!
//! Composites always evaluate every child (no short-circuit) so the
//! result carries a complete per-child breakdown, and they never match
//! on an empty child list. Lookback is the maximum over children.

use super::{Condition, ConditionResult};
use crate::domain::Bar;

/// Matches when every child matches. Empty list never matches.
pub struct AllOf {
    children: Vec<Box<dyn Condition>>,
    name: String,
}

impl AllOf {
    pub fn new(children: Vec<Box<dyn Condition>>) -> Self {
        let name = compose_name("and", &children);
        Self { children, name }
    }
}

impl Condition for AllOf {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        max_lookback(&self.children)
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> ConditionResult {
        let results: Vec<ConditionResult> = self
            .children
            .iter()
            .map(|c| c.evaluate(symbol, bars))
            .collect();
        let matched = !results.is_empty() && results.iter().all(|r| r.matched);
        ConditionResult::new(&self.name, matched).with_children(results)
    }
}

/// Matches when at least one child matches. Empty list never matches.
pub struct AnyOf {
    children: Vec<Box<dyn Condition>>,
    name: String,
}

impl AnyOf {
    pub fn new(children: Vec<Box<dyn Condition>>) -> Self {
        let name = compose_name("or", &children);
        Self { children, name }
    }
}

impl Condition for AnyOf {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        max_lookback(&self.children)
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> ConditionResult {
        let results: Vec<ConditionResult> = self
            .children
            .iter()
            .map(|c| c.evaluate(symbol, bars))
            .collect();
        let matched = results.iter().any(|r| r.matched);
        ConditionResult::new(&self.name, matched).with_children(results)
    }
}

/// Inverts its child. A degraded child result stays degraded rather
/// than turning into a match.
pub struct Not {
    child: Box<dyn Condition>,
    name: String,
}

impl Not {
    pub fn new(child: Box<dyn Condition>) -> Self {
        let name = format!("not({})", child.name());
        Self { child, name }
    }
}

impl Condition for Not {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_lookback(&self) -> usize {
        self.child.required_lookback()
    }

    fn evaluate(&self, symbol: &str, bars: &[Bar]) -> ConditionResult {
        let inner = self.child.evaluate(symbol, bars);
        if let Some(error) = inner.error.clone() {
            return ConditionResult::degraded(&self.name, error).with_children(vec![inner]);
        }
        ConditionResult::new(&self.name, !inner.matched).with_children(vec![inner])
    }
}

fn compose_name(op: &str, children: &[Box<dyn Condition>]) -> String {
    let parts: Vec<&str> = children.iter().map(|c| c.name()).collect();
    format!("{op}({})", parts.join(", "))
}

fn max_lookback(children: &[Box<dyn Condition>]) -> usize {
    children
        .iter()
        .map(|c| c.required_lookback())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{MaxPrice, MinPrice, RsiOversold};
    use crate::indicators::make_bars;

    #[test]
    fn all_of_requires_every_child() {
        let bars = make_bars(&[90.0, 100.0]);
        let both = AllOf::new(vec![
            Box::new(MinPrice::new(50.0)),
            Box::new(MaxPrice::new(150.0)),
        ]);
        assert!(both.evaluate("TEST", &bars).matched);

        let one_fails = AllOf::new(vec![
            Box::new(MinPrice::new(50.0)),
            Box::new(MaxPrice::new(99.0)),
        ]);
        let result = one_fails.evaluate("TEST", &bars);
        assert!(!result.matched);
        assert_eq!(result.children.len(), 2);
        assert!(result.children[0].matched);
        assert!(!result.children[1].matched);
    }

    #[test]
    fn any_of_needs_one_match() {
        let bars = make_bars(&[90.0, 100.0]);
        let either = AnyOf::new(vec![
            Box::new(MinPrice::new(500.0)),
            Box::new(MaxPrice::new(150.0)),
        ]);
        assert!(either.evaluate("TEST", &bars).matched);

        let neither = AnyOf::new(vec![
            Box::new(MinPrice::new(500.0)),
            Box::new(MaxPrice::new(50.0)),
        ]);
        assert!(!neither.evaluate("TEST", &bars).matched);
    }

    #[test]
    fn empty_composites_never_match() {
        let bars = make_bars(&[100.0]);
        assert!(!AllOf::new(vec![]).evaluate("TEST", &bars).matched);
        assert!(!AnyOf::new(vec![]).evaluate("TEST", &bars).matched);
    }

    #[test]
    fn not_inverts_child() {
        let bars = make_bars(&[90.0, 100.0]);
        let inverted = Not::new(Box::new(MinPrice::new(500.0)));
        let result = inverted.evaluate("TEST", &bars);
        assert!(result.matched);
        assert_eq!(result.children.len(), 1);
    }

    #[test]
    fn not_keeps_degraded_child_degraded() {
        // 3 bars cannot settle a 14-period RSI; inverting must not turn
        // missing data into a match.
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        let inverted = Not::new(Box::new(RsiOversold::default()));
        let result = inverted.evaluate("TEST", &bars);
        assert!(!result.matched);
        assert!(result.error.is_some());
    }

    #[test]
    fn lookback_is_max_over_children() {
        let composite = AllOf::new(vec![
            Box::new(MinPrice::new(10.0)),
            Box::new(RsiOversold::default()),
        ]);
        assert_eq!(composite.required_lookback(), 64);
    }

    #[test]
    fn nested_composites_nest_children() {
        let bars = make_bars(&[90.0, 100.0]);
        let nested = AllOf::new(vec![
            Box::new(MinPrice::new(50.0)),
            Box::new(AnyOf::new(vec![
                Box::new(MaxPrice::new(150.0)),
                Box::new(MinPrice::new(500.0)),
            ])),
        ]);
        let result = nested.evaluate("TEST", &bars);
        assert!(result.matched);
        assert_eq!(result.children[1].children.len(), 2);
    }
}
