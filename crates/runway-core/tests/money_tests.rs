use proptest::prelude::*;
use runway_core::money::Money;
use runway_core::RunwayError;
use rust_decimal_macros::dec;

// ===========================================================================
// Money algebra
// ===========================================================================

fn php(minor: i64) -> Money {
    Money::of(minor, "PHP").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// a + b - b == a
    #[test]
    fn add_then_subtract_round_trips(
        a in -1_000_000_000_000i64..1_000_000_000_000i64,
        b in -1_000_000_000_000i64..1_000_000_000_000i64,
    ) {
        let (a, b) = (php(a), php(b));
        prop_assert_eq!(a.add(&b).unwrap().subtract(&b).unwrap(), a);
    }

    /// a + b == b + a
    #[test]
    fn addition_commutes(
        a in -1_000_000_000_000i64..1_000_000_000_000i64,
        b in -1_000_000_000_000i64..1_000_000_000_000i64,
    ) {
        let (a, b) = (php(a), php(b));
        prop_assert_eq!(a.add(&b).unwrap(), b.add(&a).unwrap());
    }

    /// Wire form keeps every field
    #[test]
    fn json_round_trip(minor in any::<i64>()) {
        let m = Money::of(minor, "USD").unwrap();
        let back: Money = serde_json::from_str(&serde_json::to_string(&m).unwrap()).unwrap();
        prop_assert_eq!(back, m);
    }
}

#[test]
fn test_mismatched_currency_fails_every_binary_op() {
    let a = php(100);
    let b = Money::of(100, "USD").unwrap();
    assert!(matches!(a.add(&b), Err(RunwayError::CurrencyMismatch { .. })));
    assert!(matches!(a.subtract(&b), Err(RunwayError::CurrencyMismatch { .. })));
    assert!(matches!(a.less_than(&b), Err(RunwayError::CurrencyMismatch { .. })));
    assert!(matches!(a.greater_than_or_equal(&b), Err(RunwayError::CurrencyMismatch { .. })));
}

#[test]
fn test_rounding_is_half_away_from_zero() {
    // 1.00 / 3 = 0.333.. -> 0.33; 0.05 * 0.5 = 0.025 -> 0.03
    assert_eq!(php(100).divide(dec!(3)).unwrap(), php(33));
    assert_eq!(php(5).multiply(dec!(0.5)).unwrap(), php(3));
    assert_eq!(php(-5).multiply(dec!(0.5)).unwrap(), php(-3));
}
