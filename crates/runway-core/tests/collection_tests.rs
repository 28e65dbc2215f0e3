use pretty_assertions::assert_eq;
use proptest::prelude::*;
use runway_core::expenses::{Expense, ExpenseBreakdown, ExpenseKind};
use runway_core::funding::{DebtTerms, FundingEvent, FundingManager};
use runway_core::money::Money;
use runway_core::period::{Frequency, Period, YearMonth};
use runway_core::{JsonModel, RunwayError};
use rust_decimal_macros::dec;

fn ym(s: &str) -> YearMonth {
    s.parse().unwrap()
}

fn php(major: i64) -> Money {
    Money::of(major * 100, "PHP").unwrap()
}

fn year() -> Period {
    Period::parse("2024-01", "2024-12").unwrap()
}

fn assert_breakdown_fresh(b: &ExpenseBreakdown) {
    let cached = b.aggregates().unwrap().clone();
    assert_eq!(cached, b.compute_aggregates().unwrap());
    // Second read hits the memo and must not drift
    assert_eq!(b.aggregates().unwrap(), &cached);
}

fn assert_manager_fresh(m: &FundingManager) {
    let cached = m.aggregates().unwrap().clone();
    assert_eq!(cached, m.compute_aggregates().unwrap());
    assert_eq!(m.aggregates().unwrap(), &cached);
}

// ===========================================================================
// ExpenseBreakdown memo freshness
// ===========================================================================

#[test]
fn test_breakdown_aggregates_fresh_after_every_mutation() {
    let period = year();
    let mut b = ExpenseBreakdown::new("PHP".parse().unwrap(), period);
    assert_breakdown_fresh(&b);

    b.add(Expense::recurring("rent", "Rent", php(1_000), Frequency::Monthly, &period).unwrap())
        .unwrap();
    assert_breakdown_fresh(&b);

    b.add(Expense::capital("van", "Van", php(24_000), ym("2024-04"), 24, Some(php(4_000))).unwrap())
        .unwrap();
    assert_breakdown_fresh(&b);

    let mut rent = b.get("rent").unwrap().clone();
    rent.amount = php(1_200);
    b.update(rent).unwrap();
    assert_breakdown_fresh(&b);
    assert_eq!(b.aggregates().unwrap().recurring_total, php(14_400));

    b.update_period(ym("2024-01"), ym("2024-06")).unwrap();
    assert_breakdown_fresh(&b);

    b.remove("van").unwrap();
    assert_breakdown_fresh(&b);

    b.clear();
    assert_breakdown_fresh(&b);
    assert_eq!(b.aggregates().unwrap().count, 0);
}

#[test]
fn test_breakdown_errors_leave_state_unchanged() {
    let period = year();
    let mut b = ExpenseBreakdown::new("PHP".parse().unwrap(), period);
    b.add(Expense::one_time("audit", "Audit", php(5_000), ym("2024-11")).unwrap())
        .unwrap();
    let before = b.clone();

    assert!(matches!(b.remove("nope"), Err(RunwayError::EntityNotFound { .. })));
    let ghost = Expense::one_time("ghost", "Ghost", php(1), ym("2024-01")).unwrap();
    assert!(matches!(b.update(ghost), Err(RunwayError::EntityNotFound { .. })));
    assert!(matches!(
        b.update_period(ym("2024-12"), ym("2024-01")),
        Err(RunwayError::InvalidPeriod { .. })
    ));
    assert_eq!(b, before);
}

// ===========================================================================
// Period reconciliation
// ===========================================================================

#[test]
fn test_reconciliation_drops_and_regenerates() {
    let period = year();
    let mut b = ExpenseBreakdown::new("PHP".parse().unwrap(), period);
    b.add(Expense::recurring("saas", "SaaS", php(300), Frequency::Quarterly, &period).unwrap())
        .unwrap();
    b.add(Expense::one_time("launch", "Launch", php(8_000), ym("2024-02")).unwrap())
        .unwrap();
    b.add(Expense::one_time("audit", "Audit", php(5_000), ym("2024-11")).unwrap())
        .unwrap();

    let report = b.set_period(Period::parse("2024-06", "2025-05").unwrap());
    assert_eq!(report.dropped, vec!["launch".to_string()]);
    assert_eq!(report.regenerated, 1);
    assert_eq!(
        b.get("saas").unwrap().schedule().unwrap(),
        &[ym("2024-06"), ym("2024-09"), ym("2024-12"), ym("2025-03")]
    );
    assert_eq!(b.get("saas").unwrap().amount, php(300));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    /// After set_period every one-time/capital month lies in the new period
    /// and every recurring schedule ticks exactly through it.
    #[test]
    fn reconciliation_postconditions(
        start_offset in 0i32..24,
        len in 1u32..24,
        purchase_offsets in prop::collection::vec(0i32..24, 1..6),
    ) {
        let original = Period::parse("2024-01", "2025-12").unwrap();
        let mut b = ExpenseBreakdown::new("PHP".parse().unwrap(), original);
        b.add(Expense::recurring("r", "Recurring", php(100), Frequency::Monthly, &original).unwrap()).unwrap();
        for (i, off) in purchase_offsets.iter().enumerate() {
            let month = ym("2024-01").offset(*off);
            let e = if i % 2 == 0 {
                Expense::one_time(format!("o{i}"), "One-off", php(10), month).unwrap()
            } else {
                Expense::capital(format!("c{i}"), "Asset", php(1_200), month, 12, None).unwrap()
            };
            b.add(e).unwrap();
        }

        let new_period = Period::starting_at(ym("2024-01").offset(start_offset), len).unwrap();
        b.set_period(new_period);

        for e in b.get_all() {
            match &e.kind {
                ExpenseKind::Recurring { schedule, .. } => {
                    prop_assert_eq!(schedule.clone(), new_period.months());
                }
                _ => prop_assert!(new_period.contains(e.effective_month().unwrap())),
            }
        }
        prop_assert_eq!(b.aggregates().unwrap().clone(), b.compute_aggregates().unwrap());
    }
}

// ===========================================================================
// FundingManager
// ===========================================================================

#[test]
fn test_manager_aggregates_fresh_after_every_mutation() {
    let mut m = FundingManager::new("PHP".parse().unwrap(), year());
    assert_manager_fresh(&m);

    m.add(FundingEvent::equity("seed", "Seed", php(30_000), ym("2024-01")).unwrap())
        .unwrap();
    assert_manager_fresh(&m);
    assert_eq!(m.aggregates().unwrap().non_repayable_ratio, dec!(1));

    m.add(
        FundingEvent::debt(
            "loan",
            "Loan",
            php(10_000),
            ym("2024-06"),
            DebtTerms::new(dec!(0.10), ym("2025-06")),
        )
        .unwrap(),
    )
    .unwrap();
    assert_manager_fresh(&m);
    assert_eq!(m.aggregates().unwrap().debt_ratio, dec!(0.25));

    m.set_period(Period::parse("2024-03", "2024-12").unwrap());
    assert_manager_fresh(&m);
    assert_eq!(m.aggregates().unwrap().debt_ratio, dec!(1));

    m.remove("loan").unwrap();
    assert_manager_fresh(&m);
    assert_eq!(m.aggregates().unwrap().debt_ratio, dec!(0));
}

#[test]
fn test_collections_round_trip_json() {
    let period = year();
    let mut b = ExpenseBreakdown::new("PHP".parse().unwrap(), period);
    b.add(
        Expense::recurring("rent", "Rent", php(1_000), Frequency::Monthly, &period)
            .unwrap()
            .with_category("Facilities")
            .with_bounds(Some(ym("2024-03")), None, &period)
            .unwrap(),
    )
    .unwrap();
    b.add(Expense::capital("pc", "PC", php(3_000), ym("2024-02"), 36, Some(php(300))).unwrap())
        .unwrap();
    assert_eq!(ExpenseBreakdown::parse_from_json(&b.to_json().unwrap()).unwrap(), b);

    let mut m = FundingManager::new("PHP".parse().unwrap(), period);
    m.add(
        FundingEvent::debt(
            "loan",
            "Loan",
            php(10_000),
            ym("2024-02"),
            DebtTerms::new(dec!(0.08), ym("2025-02")).with_grace_period(2),
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(FundingManager::parse_from_json(&m.to_json().unwrap()).unwrap(), m);
}
