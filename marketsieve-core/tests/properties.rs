//! Property tests: conditions never panic on arbitrary series, short
//! series degrade instead of matching, and composite algebra holds.

use chrono::NaiveDate;
use proptest::prelude::*;

use marketsieve_core::conditions::{
    AllOf, AnyOf, BbLowerTouch, Condition, MaCrossUp, MaTouch, MinPrice, Not, RsiOversold,
    VolumeSpike,
};
use marketsieve_core::domain::Bar;

fn bars_from(closes: &[f64], volumes: &[u64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| Bar {
            date: base + chrono::Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume,
        })
        .collect()
}

fn all_conditions() -> Vec<Box<dyn Condition>> {
    vec![
        Box::new(MinPrice::new(100.0)),
        Box::new(MaTouch::default()),
        Box::new(MaCrossUp::new(5, 20, 5)),
        Box::new(RsiOversold::default()),
        Box::new(BbLowerTouch::default()),
        Box::new(VolumeSpike::default()),
    ]
}

proptest! {
    /// Any series, any length. Evaluation must complete, and a result
    /// is either a clean verdict or a degraded non-match, never both.
    #[test]
    fn evaluation_never_panics(
        closes in prop::collection::vec(0.01f64..10_000.0, 0..80),
        volumes in prop::collection::vec(0u64..10_000_000, 0..80),
    ) {
        let n = closes.len().min(volumes.len());
        let bars = bars_from(&closes[..n], &volumes[..n]);
        for condition in all_conditions() {
            let result = condition.evaluate("PROP", &bars);
            if result.error.is_some() {
                prop_assert!(!result.matched);
            }
        }
    }

    /// Below the advertised lookback every indicator-backed condition
    /// degrades rather than matching.
    #[test]
    fn short_series_degrade(
        closes in prop::collection::vec(1.0f64..1_000.0, 0..10),
    ) {
        let volumes = vec![1000u64; closes.len()];
        let bars = bars_from(&closes, &volumes);
        for condition in [
            Box::new(MaTouch::default()) as Box<dyn Condition>,
            Box::new(RsiOversold::default()),
            Box::new(BbLowerTouch::default()),
        ] {
            prop_assert!(bars.len() < condition.required_lookback());
            let result = condition.evaluate("PROP", &bars);
            prop_assert!(!result.matched);
            prop_assert!(result.error.is_some());
        }
    }

    /// Composite lookback is the deepest child's lookback.
    #[test]
    fn composite_lookback_is_max_of_children(
        threshold in 1.0f64..100.0,
    ) {
        let all = AllOf::new(vec![
            Box::new(MinPrice::new(threshold)),
            Box::new(RsiOversold::default()),
            Box::new(MaTouch::default()),
        ]);
        prop_assert_eq!(
            all.required_lookback(),
            RsiOversold::default().required_lookback().max(
                MaTouch::default().required_lookback()
            )
        );
    }

    /// De Morgan on a two-condition set: not(any(a, b)) matches exactly
    /// when all(not(a), not(b)) matches, on series long enough that
    /// neither side degrades.
    #[test]
    fn de_morgan_holds_on_full_series(
        closes in prop::collection::vec(50.0f64..150.0, 80..100),
    ) {
        let volumes = vec![1000u64; closes.len()];
        let bars = bars_from(&closes, &volumes);

        let lhs = Not::new(Box::new(AnyOf::new(vec![
            Box::new(MinPrice::new(100.0)),
            Box::new(RsiOversold::default()),
        ])));
        let rhs = AllOf::new(vec![
            Box::new(Not::new(Box::new(MinPrice::new(100.0)))),
            Box::new(Not::new(Box::new(RsiOversold::default()))),
        ]);

        let left = lhs.evaluate("PROP", &bars);
        let right = rhs.evaluate("PROP", &bars);
        prop_assert!(left.error.is_none());
        prop_assert_eq!(left.matched, right.matched);
    }

    /// Double negation restores the verdict on non-degraded input.
    #[test]
    fn double_negation_is_identity(
        closes in prop::collection::vec(50.0f64..150.0, 1..40),
    ) {
        let volumes = vec![1000u64; closes.len()];
        let bars = bars_from(&closes, &volumes);

        let plain = MinPrice::new(100.0).evaluate("PROP", &bars);
        let doubled = Not::new(Box::new(Not::new(Box::new(MinPrice::new(100.0)))))
            .evaluate("PROP", &bars);
        prop_assert_eq!(plain.matched, doubled.matched);
    }
}

#[test]
fn empty_composites_never_match() {
    let bars = bars_from(&[100.0; 30], &[1000; 30]);
    assert!(!AllOf::new(vec![]).evaluate("T", &bars).matched);
    assert!(!AnyOf::new(vec![]).evaluate("T", &bars).matched);
}
