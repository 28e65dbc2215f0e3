use std::cell::OnceCell;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::event::{FundingEvent, FundingType};
use crate::error::RunwayError;
use crate::money::{CurrencyCode, Money};
use crate::period::{Period, YearMonth};
use crate::types::{Rate, ReconcileReport};
use crate::RunwayResult;

const ENTITY: &str = "FundingEvent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingAggregates {
    pub count: usize,
    pub total_funding: Money,
    pub total_equity: Money,
    pub total_debt: Money,
    pub total_grants: Money,
    /// total_debt / total_funding, 0 when nothing is raised
    pub debt_ratio: Rate,
    /// (equity + grants) / total_funding, 0 when nothing is raised
    pub non_repayable_ratio: Rate,
}

/// Funding events of one currency over one period. Same ownership and memo
/// contract as [`crate::expenses::ExpenseBreakdown`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ManagerRepr")]
pub struct FundingManager {
    currency: CurrencyCode,
    period: Period,
    events: Vec<FundingEvent>,
    #[serde(skip)]
    memo: OnceCell<FundingAggregates>,
}

#[derive(Deserialize)]
struct ManagerRepr {
    currency: CurrencyCode,
    period: Period,
    #[serde(default)]
    events: Vec<FundingEvent>,
}

impl TryFrom<ManagerRepr> for FundingManager {
    type Error = RunwayError;

    fn try_from(repr: ManagerRepr) -> Result<Self, Self::Error> {
        let mut manager = FundingManager::new(repr.currency, repr.period);
        for event in repr.events {
            manager.add(event)?;
        }
        Ok(manager)
    }
}

impl PartialEq for FundingManager {
    fn eq(&self, other: &Self) -> bool {
        self.currency == other.currency && self.period == other.period && self.events == other.events
    }
}

impl FundingManager {
    pub fn new(currency: CurrencyCode, period: Period) -> Self {
        FundingManager {
            currency,
            period,
            events: Vec::new(),
            memo: OnceCell::new(),
        }
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn add(&mut self, event: FundingEvent) -> RunwayResult<()> {
        self.admit(&event)?;
        if self.position(&event.id).is_some() {
            return Err(RunwayError::DuplicateEntity {
                entity: ENTITY.into(),
                id: event.id,
            });
        }
        self.events.push(event);
        self.invalidate();
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> RunwayResult<FundingEvent> {
        let idx = self
            .position(id)
            .ok_or_else(|| RunwayError::not_found(ENTITY, id))?;
        let removed = self.events.remove(idx);
        self.invalidate();
        Ok(removed)
    }

    pub fn update(&mut self, event: FundingEvent) -> RunwayResult<()> {
        let idx = self
            .position(&event.id)
            .ok_or_else(|| RunwayError::not_found(ENTITY, &event.id))?;
        self.admit(&event)?;
        self.events[idx] = event;
        self.invalidate();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.invalidate();
    }

    /// Move to `period`, dropping events received outside it. Destructive;
    /// dropped ids are reported rather than raised.
    pub fn set_period(&mut self, period: Period) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        self.events.retain(|event| {
            let keep = period.contains(event.month);
            if !keep {
                report.dropped.push(event.id.clone());
            }
            keep
        });
        if !report.dropped.is_empty() {
            debug!(period = %period, dropped = ?report.dropped, "funding reconciliation dropped events");
        }
        self.period = period;
        self.invalidate();
        report
    }

    pub fn update_period(&mut self, start: YearMonth, end: YearMonth) -> RunwayResult<ReconcileReport> {
        let period = Period::new(start, end)?;
        Ok(self.set_period(period))
    }

    pub fn get(&self, id: &str) -> Option<&FundingEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn get_all(&self) -> &[FundingEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn by_kind(&self, funding_type: FundingType) -> Vec<&FundingEvent> {
        self.events
            .iter()
            .filter(|e| e.funding_type() == funding_type)
            .collect()
    }

    /// Cash received in `month` across every event.
    pub fn funding_for_month(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(self.events.iter(), |e| Ok(e.cash_in_for_month(month)))
    }

    /// Debt payments (initial payments, installments, amortization) due in `month`.
    pub fn debt_service_for_month(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(self.debts(), |e| e.payment_for_month(month))
    }

    pub fn interest_for_month(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(self.debts(), |e| e.interest_for_month(month))
    }

    pub fn outstanding_debt_at(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(self.debts(), |e| e.outstanding_at(month))
    }

    /// Outstanding debt for each month of the period.
    pub fn outstanding_debt_schedule(&self) -> RunwayResult<Vec<(YearMonth, Money)>> {
        self.period
            .months()
            .into_iter()
            .map(|m| Ok((m, self.outstanding_debt_at(m)?)))
            .collect()
    }

    pub fn aggregates(&self) -> RunwayResult<&FundingAggregates> {
        if let Some(cached) = self.memo.get() {
            return Ok(cached);
        }
        let fresh = self.compute_aggregates()?;
        Ok(self.memo.get_or_init(|| fresh))
    }

    pub fn compute_aggregates(&self) -> RunwayResult<FundingAggregates> {
        let of_type = |t: FundingType| {
            self.sum_over(
                self.events.iter().filter(move |e| e.funding_type() == t),
                |e| Ok(e.amount.clone()),
            )
        };
        let total_equity = of_type(FundingType::Equity)?;
        let total_debt = of_type(FundingType::Debt)?;
        let total_grants = of_type(FundingType::Grant)?;
        let total_funding = total_equity.add(&total_debt)?.add(&total_grants)?;

        let ratio = |part: &Money| -> Rate {
            if total_funding.is_zero() {
                Decimal::ZERO
            } else {
                Decimal::from(part.minor_units()) / Decimal::from(total_funding.minor_units())
            }
        };
        let debt_ratio = ratio(&total_debt);
        let non_repayable_ratio = ratio(&total_equity.add(&total_grants)?);

        Ok(FundingAggregates {
            count: self.events.len(),
            total_funding,
            total_equity,
            total_debt,
            total_grants,
            debt_ratio,
            non_repayable_ratio,
        })
    }

    pub fn is_memoized(&self) -> bool {
        self.memo.get().is_some()
    }

    fn debts(&self) -> impl Iterator<Item = &FundingEvent> {
        self.events.iter().filter(|e| e.is_repayable())
    }

    fn invalidate(&mut self) {
        self.memo.take();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.events.iter().position(|e| e.id == id)
    }

    fn admit(&self, event: &FundingEvent) -> RunwayResult<()> {
        event.validate()?;
        event.amount.ensure_currency(&self.currency)?;
        if !self.period.contains(event.month) {
            return Err(RunwayError::invalid(
                "month",
                format!(
                    "Funding '{}' is dated {} outside the period {}",
                    event.id, event.month, self.period
                ),
            ));
        }
        Ok(())
    }

    fn sum_over<'a, I, F>(&self, mut items: I, f: F) -> RunwayResult<Money>
    where
        I: Iterator<Item = &'a FundingEvent>,
        F: Fn(&FundingEvent) -> RunwayResult<Money>,
    {
        items.try_fold(Money::zero(self.currency.clone()), |acc, e| acc.add(&f(e)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funding::event::DebtTerms;
    use rust_decimal_macros::dec;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn php(major: i64) -> Money {
        Money::of(major * 100, "PHP").unwrap()
    }

    fn sample() -> FundingManager {
        let mut m = FundingManager::new("PHP".parse().unwrap(), Period::parse("2024-01", "2024-12").unwrap());
        m.add(FundingEvent::equity("seed", "Seed round", php(50_000), ym("2024-01")).unwrap())
            .unwrap();
        m.add(FundingEvent::grant("dost", "Innovation grant", php(10_000), ym("2024-03")).unwrap())
            .unwrap();
        m.add(
            FundingEvent::debt(
                "bank",
                "Bank loan",
                php(40_000),
                ym("2024-02"),
                DebtTerms::new(Decimal::ZERO, ym("2024-06")),
            )
            .unwrap(),
        )
        .unwrap();
        m
    }

    #[test]
    fn test_ratios() {
        let m = sample();
        let agg = m.aggregates().unwrap();
        assert_eq!(agg.total_funding, php(100_000));
        assert_eq!(agg.debt_ratio, dec!(0.4));
        assert_eq!(agg.non_repayable_ratio, dec!(0.6));
        assert_eq!(agg, &m.compute_aggregates().unwrap());
    }

    #[test]
    fn test_empty_ratios_are_zero() {
        let m = FundingManager::new("PHP".parse().unwrap(), Period::parse("2024-01", "2024-12").unwrap());
        let agg = m.aggregates().unwrap();
        assert_eq!(agg.debt_ratio, Decimal::ZERO);
        assert_eq!(agg.non_repayable_ratio, Decimal::ZERO);
    }

    #[test]
    fn test_outstanding_and_service() {
        let m = sample();
        assert!(m.outstanding_debt_at(ym("2024-01")).unwrap().is_zero());
        assert_eq!(m.outstanding_debt_at(ym("2024-02")).unwrap(), php(40_000));
        assert_eq!(m.outstanding_debt_at(ym("2024-03")).unwrap(), php(30_000));
        assert_eq!(m.debt_service_for_month(ym("2024-03")).unwrap(), php(10_000));
        assert!(m.outstanding_debt_at(ym("2024-06")).unwrap().is_zero());
        assert_eq!(m.funding_for_month(ym("2024-03")).unwrap(), php(10_000));
    }

    #[test]
    fn test_update_invalidates_memo() {
        let mut m = sample();
        m.aggregates().unwrap();
        let mut seed = m.get("seed").unwrap().clone();
        seed.amount = php(60_000);
        m.update(seed).unwrap();
        assert!(!m.is_memoized());
        assert_eq!(m.aggregates().unwrap().total_equity, php(60_000));
    }

    #[test]
    fn test_set_period_drops_events() {
        let mut m = sample();
        let report = m.set_period(Period::parse("2024-02", "2024-12").unwrap());
        assert_eq!(report.dropped, vec!["seed".to_string()]);
        assert_eq!(m.len(), 2);
        assert_eq!(m.aggregates().unwrap().debt_ratio, dec!(0.8));
    }

    #[test]
    fn test_json_round_trip() {
        let m = sample();
        let json = serde_json::to_string(&m).unwrap();
        let back: FundingManager = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
