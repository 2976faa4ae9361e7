//! Property tests for the price register's merge rule.
//!
//! The rule has to be safe to apply in any delivery order and safe to
//! replay, otherwise clients fed by an unordered at-most-once bus could
//! end up with different boards.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, TimeDelta};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tickerdesk::{ClientId, PricePoint, PriceRegister, Symbol};

// A client's clock never reuses an instant, so two distinct writes never
// share (origin, observed_at). The price is derived from that pair to
// keep the invariant: a generated collision is a replay of one write,
// never a second write with different bytes.
fn arb_point() -> impl Strategy<Value = PricePoint> {
    (
        prop::sample::select(vec!["GOOG", "TSLA", "AMZN", "META", "NVDA"]),
        prop::sample::select(vec![("client-a", 1i64), ("client-b", 2), ("client-c", 3)]),
        0i64..500,
    )
        .prop_map(|(symbol, (origin, origin_rank), at_secs)| PricePoint {
            symbol: Symbol::new(symbol),
            price: Decimal::new(10_000 + at_secs * 31 + origin_rank, 2),
            observed_at: DateTime::UNIX_EPOCH + TimeDelta::seconds(at_secs),
            origin: ClientId::new(origin),
        })
}

fn merge_all(points: &[PricePoint]) -> PriceRegister {
    let mut register = PriceRegister::new();
    for point in points {
        register.merge(point.clone());
    }
    register
}

proptest! {
    #[test]
    fn merge_is_order_independent(
        (original, shuffled) in prop::collection::vec(arb_point(), 0..40)
            .prop_flat_map(|points| {
                let original = points.clone();
                (Just(original), Just(points).prop_shuffle())
            })
    ) {
        prop_assert_eq!(merge_all(&original), merge_all(&shuffled));
    }

    #[test]
    fn replaying_every_point_changes_nothing(
        points in prop::collection::vec(arb_point(), 0..40)
    ) {
        let register = merge_all(&points);
        let mut replayed = register.clone();
        for point in &points {
            replayed.merge(point.clone());
        }
        prop_assert_eq!(register, replayed);
    }

    #[test]
    fn visible_timestamps_never_regress(
        points in prop::collection::vec(arb_point(), 1..40)
    ) {
        let mut register = PriceRegister::new();
        for point in &points {
            let before = register.get(&point.symbol).map(|p| p.observed_at);
            register.merge(point.clone());
            let after = register.get(&point.symbol).map(|p| p.observed_at);
            if let (Some(before), Some(after)) = (before, after) {
                prop_assert!(after >= before);
            }
        }
    }
}
