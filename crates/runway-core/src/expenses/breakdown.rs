use std::cell::OnceCell;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::expense::{Expense, ExpenseType};
use crate::error::RunwayError;
use crate::money::{CurrencyCode, Money};
use crate::period::{Period, YearMonth};
use crate::types::ReconcileReport;
use crate::RunwayResult;

const ENTITY: &str = "Expense";

/// Derived totals over the whole breakdown period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseAggregates {
    pub count: usize,
    /// Cash out across every month of the period
    pub total: Money,
    /// `total` spread over the months of the period
    pub monthly_average: Money,
    pub recurring_total: Money,
    pub one_time_total: Money,
    pub capital_total: Money,
    pub tax_deductible_total: Money,
}

/// Expenses of one currency over one period.
///
/// Mutating methods take `&mut self`, so a breakdown has exactly one writer at
/// a time; share it by cloning. Aggregates are memoized: every mutation clears
/// the memo and the next [`ExpenseBreakdown::aggregates`] call recomputes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "BreakdownRepr")]
pub struct ExpenseBreakdown {
    currency: CurrencyCode,
    period: Period,
    expenses: Vec<Expense>,
    #[serde(skip)]
    memo: OnceCell<ExpenseAggregates>,
}

#[derive(Deserialize)]
struct BreakdownRepr {
    currency: CurrencyCode,
    period: Period,
    #[serde(default)]
    expenses: Vec<Expense>,
}

impl TryFrom<BreakdownRepr> for ExpenseBreakdown {
    type Error = RunwayError;

    fn try_from(repr: BreakdownRepr) -> Result<Self, Self::Error> {
        let mut breakdown = ExpenseBreakdown::new(repr.currency, repr.period);
        for expense in repr.expenses {
            breakdown.add(expense)?;
        }
        Ok(breakdown)
    }
}

impl PartialEq for ExpenseBreakdown {
    fn eq(&self, other: &Self) -> bool {
        self.currency == other.currency
            && self.period == other.period
            && self.expenses == other.expenses
    }
}

impl ExpenseBreakdown {
    pub fn new(currency: CurrencyCode, period: Period) -> Self {
        ExpenseBreakdown {
            currency,
            period,
            expenses: Vec::new(),
            memo: OnceCell::new(),
        }
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Add an expense. Recurring schedules are regenerated against the
    /// breakdown period; one-time and capital months must lie inside it.
    pub fn add(&mut self, mut expense: Expense) -> RunwayResult<()> {
        self.admit(&mut expense)?;
        if self.position(&expense.id).is_some() {
            return Err(RunwayError::DuplicateEntity {
                entity: ENTITY.into(),
                id: expense.id,
            });
        }
        self.expenses.push(expense);
        self.invalidate();
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> RunwayResult<Expense> {
        let idx = self
            .position(id)
            .ok_or_else(|| RunwayError::not_found(ENTITY, id))?;
        let removed = self.expenses.remove(idx);
        self.invalidate();
        Ok(removed)
    }

    /// Replace the expense with the same id as a whole.
    pub fn update(&mut self, mut expense: Expense) -> RunwayResult<()> {
        let idx = self
            .position(&expense.id)
            .ok_or_else(|| RunwayError::not_found(ENTITY, &expense.id))?;
        self.admit(&mut expense)?;
        self.expenses[idx] = expense;
        self.invalidate();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.expenses.clear();
        self.invalidate();
    }

    /// Move the breakdown to `period`.
    ///
    /// Destructive and not reversible: recurring expenses keep their identity
    /// and amount but get a fresh schedule, while one-time and capital
    /// expenses dated outside the new period are dropped. The dropped ids are
    /// reported; dropping is not an error.
    pub fn set_period(&mut self, period: Period) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        self.expenses.retain_mut(|expense| match expense.effective_month() {
            Some(month) if !period.contains(month) => {
                report.dropped.push(expense.id.clone());
                false
            }
            Some(_) => true,
            None => {
                expense.regenerate_schedule(&period);
                report.regenerated += 1;
                true
            }
        });
        if !report.dropped.is_empty() {
            debug!(
                period = %period,
                dropped = ?report.dropped,
                "expense period reconciliation dropped items"
            );
        }
        self.period = period;
        self.invalidate();
        report
    }

    pub fn update_period(&mut self, start: YearMonth, end: YearMonth) -> RunwayResult<ReconcileReport> {
        let period = Period::new(start, end)?;
        Ok(self.set_period(period))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    pub fn get_all(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }

    pub fn by_type(&self, expense_type: ExpenseType) -> Vec<&Expense> {
        self.expenses
            .iter()
            .filter(|e| e.expense_type() == expense_type)
            .collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&Expense> {
        self.expenses
            .iter()
            .filter(|e| e.category.as_deref() == Some(category))
            .collect()
    }

    pub fn tax_deductible(&self) -> Vec<&Expense> {
        self.expenses.iter().filter(|e| e.tax_deductible).collect()
    }

    pub fn group_by_type(&self) -> BTreeMap<ExpenseType, Vec<&Expense>> {
        let mut groups: BTreeMap<ExpenseType, Vec<&Expense>> = BTreeMap::new();
        for expense in &self.expenses {
            groups.entry(expense.expense_type()).or_default().push(expense);
        }
        groups
    }

    /// Cash out across the whole period.
    pub fn total_expenses(&self) -> RunwayResult<Money> {
        self.sum_over(self.expenses.iter(), |e| e.total_over(&self.period))
    }

    pub fn monthly_cash_out(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(self.expenses.iter(), |e| Ok(e.cash_out_for_month(month)))
    }

    /// Recognized expense for `month` (capital items contribute depreciation).
    pub fn monthly_expense(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(self.expenses.iter(), |e| e.expense_for_month(month))
    }

    /// Recognized expense for `month` without depreciation.
    pub fn monthly_operating_expense(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(
            self.expenses
                .iter()
                .filter(|e| e.expense_type() != ExpenseType::Capital),
            |e| e.expense_for_month(month),
        )
    }

    pub fn monthly_depreciation(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(self.expenses.iter(), |e| e.depreciation_for_month(month))
    }

    /// Recognized expense for `month` that reduces taxable income.
    pub fn monthly_deductible_expense(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(
            self.expenses.iter().filter(|e| e.tax_deductible),
            |e| e.expense_for_month(month),
        )
    }

    /// Net book value of every capital item through `month` inclusive.
    pub fn net_assets_up_to(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(self.expenses.iter(), |e| e.net_book_value_up_to(month))
    }

    pub fn depreciation_up_to(&self, month: YearMonth) -> RunwayResult<Money> {
        self.sum_over(self.expenses.iter(), |e| e.accumulated_depreciation_up_to(month))
    }

    /// The `n` largest expenses by per-occurrence amount.
    pub fn top_by_amount(&self, n: usize) -> Vec<&Expense> {
        let mut sorted: Vec<&Expense> = self.expenses.iter().collect();
        sorted.sort_by(|a, b| b.amount.minor_units().cmp(&a.amount.minor_units()));
        sorted.truncate(n);
        sorted
    }

    /// The `n` largest cash outflows in `month`; items with nothing due are skipped.
    pub fn top_by_month_cash_out(&self, month: YearMonth, n: usize) -> Vec<(&Expense, Money)> {
        let mut due: Vec<(&Expense, Money)> = self
            .expenses
            .iter()
            .map(|e| (e, e.cash_out_for_month(month)))
            .filter(|(_, m)| m.is_positive())
            .collect();
        due.sort_by(|a, b| b.1.minor_units().cmp(&a.1.minor_units()));
        due.truncate(n);
        due
    }

    /// Cash out for each month of the period.
    pub fn cash_out_schedule(&self) -> RunwayResult<Vec<(YearMonth, Money)>> {
        self.period
            .months()
            .into_iter()
            .map(|m| Ok((m, self.monthly_cash_out(m)?)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    /// Memoized aggregates. Always equal to [`Self::compute_aggregates`].
    pub fn aggregates(&self) -> RunwayResult<&ExpenseAggregates> {
        if let Some(cached) = self.memo.get() {
            return Ok(cached);
        }
        let fresh = self.compute_aggregates()?;
        Ok(self.memo.get_or_init(|| fresh))
    }

    /// Fresh fold over the live collection.
    pub fn compute_aggregates(&self) -> RunwayResult<ExpenseAggregates> {
        let of_type = |t: ExpenseType| {
            self.sum_over(
                self.expenses.iter().filter(move |e| e.expense_type() == t),
                |e| e.total_over(&self.period),
            )
        };
        let total = self.total_expenses()?;
        let monthly_average = total.divide(Decimal::from(self.period.len() as u64))?;
        Ok(ExpenseAggregates {
            count: self.expenses.len(),
            monthly_average,
            recurring_total: of_type(ExpenseType::Recurring)?,
            one_time_total: of_type(ExpenseType::OneTime)?,
            capital_total: of_type(ExpenseType::Capital)?,
            tax_deductible_total: self.sum_over(
                self.expenses.iter().filter(|e| e.tax_deductible),
                |e| e.total_over(&self.period),
            )?,
            total,
        })
    }

    pub fn is_memoized(&self) -> bool {
        self.memo.get().is_some()
    }

    fn invalidate(&mut self) {
        self.memo.take();
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.expenses.iter().position(|e| e.id == id)
    }

    fn admit(&self, expense: &mut Expense) -> RunwayResult<()> {
        expense.validate()?;
        expense.amount.ensure_currency(&self.currency)?;
        if let Some(month) = expense.effective_month() {
            if !self.period.contains(month) {
                return Err(RunwayError::invalid(
                    "month",
                    format!(
                        "Expense '{}' is dated {} outside the period {}",
                        expense.id, month, self.period
                    ),
                ));
            }
        }
        expense.regenerate_schedule(&self.period);
        Ok(())
    }

    fn sum_over<'a, I, F>(&self, mut items: I, f: F) -> RunwayResult<Money>
    where
        I: Iterator<Item = &'a Expense>,
        F: Fn(&Expense) -> RunwayResult<Money>,
    {
        items.try_fold(Money::zero(self.currency.clone()), |acc, e| acc.add(&f(e)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Frequency;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn php(major: i64) -> Money {
        Money::of(major * 100, "PHP").unwrap()
    }

    fn sample() -> ExpenseBreakdown {
        let period = Period::parse("2024-01", "2024-12").unwrap();
        let mut b = ExpenseBreakdown::new("PHP".parse().unwrap(), period);
        b.add(Expense::recurring("rent", "Rent", php(1_000), Frequency::Monthly, &period).unwrap())
            .unwrap();
        b.add(Expense::one_time("setup", "Setup", php(2_500), ym("2024-02")).unwrap())
            .unwrap();
        b.add(
            Expense::capital("laptop", "Laptop", php(12_000), ym("2024-03"), 12, None)
                .unwrap()
                .with_tax_deductible(false),
        )
        .unwrap();
        b
    }

    #[test]
    fn test_aggregates_match_fresh_fold() {
        let b = sample();
        let cached = b.aggregates().unwrap().clone();
        assert_eq!(cached, b.compute_aggregates().unwrap());
        assert_eq!(cached.total, php(12_000 + 2_500 + 12_000));
        assert_eq!(cached.recurring_total, php(12_000));
        assert_eq!(cached.capital_total, php(12_000));
        assert_eq!(cached.tax_deductible_total, php(14_500));
        assert_eq!(cached.monthly_average, php(2_208).add(&Money::of(33, "PHP").unwrap()).unwrap());
    }

    #[test]
    fn test_mutation_clears_memo() {
        let mut b = sample();
        b.aggregates().unwrap();
        assert!(b.is_memoized());
        b.remove("setup").unwrap();
        assert!(!b.is_memoized());
        assert_eq!(b.aggregates().unwrap().count, 2);
    }

    #[test]
    fn test_add_rejects_foreign_currency_and_duplicates() {
        let mut b = sample();
        let usd = Expense::one_time("usd", "Fee", Money::of(100, "USD").unwrap(), ym("2024-01")).unwrap();
        assert!(matches!(b.add(usd), Err(RunwayError::CurrencyMismatch { .. })));
        let dup = Expense::one_time("rent", "Dup", php(1), ym("2024-01")).unwrap();
        assert!(matches!(b.add(dup), Err(RunwayError::DuplicateEntity { .. })));
        let outside = Expense::one_time("late", "Late", php(1), ym("2025-01")).unwrap();
        assert!(b.add(outside).is_err());
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn test_unknown_id_errors() {
        let mut b = sample();
        assert!(matches!(b.remove("nope"), Err(RunwayError::EntityNotFound { .. })));
        let ghost = Expense::one_time("ghost", "Ghost", php(1), ym("2024-01")).unwrap();
        assert!(matches!(b.update(ghost), Err(RunwayError::EntityNotFound { .. })));
    }

    #[test]
    fn test_monthly_cash_out_vs_expense() {
        let b = sample();
        assert_eq!(b.monthly_cash_out(ym("2024-03")).unwrap(), php(13_000));
        assert_eq!(b.monthly_expense(ym("2024-03")).unwrap(), php(2_000));
        assert_eq!(b.monthly_operating_expense(ym("2024-03")).unwrap(), php(1_000));
        assert_eq!(b.net_assets_up_to(ym("2024-08")).unwrap(), php(6_000));
    }

    #[test]
    fn test_top_n() {
        let b = sample();
        let top = b.top_by_amount(2);
        assert_eq!(top[0].id, "laptop");
        assert_eq!(top[1].id, "setup");
        let due = b.top_by_month_cash_out(ym("2024-02"), 5);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].0.id, "setup");
    }

    #[test]
    fn test_set_period_drops_and_regenerates() {
        let mut b = sample();
        let report = b.set_period(Period::parse("2024-03", "2024-06").unwrap());
        assert_eq!(report.dropped, vec!["setup".to_string()]);
        assert_eq!(report.regenerated, 1);
        assert_eq!(b.get("rent").unwrap().schedule().unwrap().len(), 4);
        assert!(b.get("laptop").is_some());
        assert_eq!(b.aggregates().unwrap().count, 2);
    }

    #[test]
    fn test_update_period_validates() {
        let mut b = sample();
        assert!(matches!(
            b.update_period(ym("2024-09"), ym("2024-01")),
            Err(RunwayError::InvalidPeriod { .. })
        ));
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn test_json_round_trip_is_lossless() {
        let b = sample();
        let json = serde_json::to_string(&b).unwrap();
        let back: ExpenseBreakdown = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(!json.contains("memo"));
    }
}
