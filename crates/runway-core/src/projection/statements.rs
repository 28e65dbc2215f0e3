//! Period statements folded over a projection: EBITDA, net income, taxes and
//! the balance snapshot. Revenue and expenses are re-derived from the model
//! for every month present in the cashflow sequence.

use serde::{Deserialize, Serialize};

use super::cashflow::{Cashflow, TaxBreakdown};
use super::engine::derive_taxes;
use super::model::RunwayModel;
use crate::error::RunwayError;
use crate::money::Money;
use crate::period::YearMonth;
use crate::RunwayResult;

/// Position at the end of one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub month: YearMonth,
    pub cash: Money,
    /// Net book value of capital items
    pub assets_net: Money,
    /// Outstanding debt principal
    pub liabilities: Money,
    /// `assets_net + cash - liabilities`
    pub equity: Money,
    /// Cumulative net cashflow through `month`
    pub retained_earnings: Money,
}

/// Income-statement totals over the months of a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub months: usize,
    pub revenue: Money,
    /// Includes depreciation
    pub recognized_expenses: Money,
    pub depreciation: Money,
    pub ebitda: Money,
    pub vat: Money,
    pub percentage_tax: Money,
    pub income_tax: Money,
    pub total_taxes: Money,
    pub net_income: Money,
}

pub fn generate_balance_snapshot(
    model: &RunwayModel,
    month: YearMonth,
    cashflows: &[Cashflow],
) -> RunwayResult<BalanceSnapshot> {
    let idx = locate(cashflows, month)?;
    let cash = cashflows[idx].ending_cash().clone();
    let assets_net = model.expenses.net_assets_up_to(month)?;
    let liabilities = model.funding.outstanding_debt_at(month)?;
    let equity = assets_net.add(&cash)?.subtract(&liabilities)?;
    let retained_earnings = Money::sum(
        cashflows[..=idx].iter().map(Cashflow::net),
        cash.currency(),
    )?;

    Ok(BalanceSnapshot {
        month,
        cash,
        assets_net,
        liabilities,
        equity,
        retained_earnings,
    })
}

/// Revenue minus recognized expenses, excluding depreciation.
pub fn get_ebitda_across_period(model: &RunwayModel, cashflows: &[Cashflow]) -> RunwayResult<Money> {
    Ok(period_totals(model, cashflows)?.ebitda)
}

/// Revenue minus recognized expenses (with depreciation), VAT, percentage
/// tax and income tax.
pub fn get_net_income_across_period(
    model: &RunwayModel,
    cashflows: &[Cashflow],
) -> RunwayResult<Money> {
    Ok(period_totals(model, cashflows)?.net_income)
}

pub fn get_total_taxes_across_period(
    model: &RunwayModel,
    cashflows: &[Cashflow],
) -> RunwayResult<Money> {
    Ok(period_totals(model, cashflows)?.total_taxes)
}

/// The month's attached taxes, or freshly derived ones when the projection
/// was generated without taxes.
pub fn get_taxes_for_month(
    model: &RunwayModel,
    cashflows: &[Cashflow],
    month: YearMonth,
) -> RunwayResult<TaxBreakdown> {
    let idx = locate(cashflows, month)?;
    taxes_of(model, &cashflows[idx])
}

pub fn period_totals(model: &RunwayModel, cashflows: &[Cashflow]) -> RunwayResult<PeriodTotals> {
    if cashflows.is_empty() {
        return Err(RunwayError::EmptyProjection);
    }
    let zero = Money::zero(model.currency.clone());
    let mut totals = PeriodTotals {
        months: cashflows.len(),
        revenue: zero.clone(),
        recognized_expenses: zero.clone(),
        depreciation: zero.clone(),
        ebitda: zero.clone(),
        vat: zero.clone(),
        percentage_tax: zero.clone(),
        income_tax: zero.clone(),
        total_taxes: zero.clone(),
        net_income: zero,
    };

    for cf in cashflows {
        let month = cf.month();
        let revenue = model.revenue_for_month(month)?;
        let expense = model.expenses.monthly_expense(month)?;
        let depreciation = model.expenses.monthly_depreciation(month)?;
        let taxes = taxes_of(model, cf)?;

        let ebitda = revenue.subtract(&expense.subtract(&depreciation)?)?;
        let net_income = revenue
            .subtract(&expense)?
            .subtract(&taxes.vat)?
            .subtract(&taxes.percentage_tax)?
            .subtract(&taxes.income_tax)?;

        totals.revenue = totals.revenue.add(&revenue)?;
        totals.recognized_expenses = totals.recognized_expenses.add(&expense)?;
        totals.depreciation = totals.depreciation.add(&depreciation)?;
        totals.ebitda = totals.ebitda.add(&ebitda)?;
        totals.vat = totals.vat.add(&taxes.vat)?;
        totals.percentage_tax = totals.percentage_tax.add(&taxes.percentage_tax)?;
        totals.income_tax = totals.income_tax.add(&taxes.income_tax)?;
        totals.total_taxes = totals.total_taxes.add(&taxes.total)?;
        totals.net_income = totals.net_income.add(&net_income)?;
    }
    Ok(totals)
}

fn taxes_of(model: &RunwayModel, cashflow: &Cashflow) -> RunwayResult<TaxBreakdown> {
    match cashflow.taxes() {
        Some(taxes) => Ok(taxes.clone()),
        None => derive_taxes(model, cashflow.month()),
    }
}

fn locate(cashflows: &[Cashflow], month: YearMonth) -> RunwayResult<usize> {
    if cashflows.is_empty() {
        return Err(RunwayError::EmptyProjection);
    }
    cashflows
        .iter()
        .position(|cf| cf.month() == month)
        .ok_or(RunwayError::MonthNotFound(month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expenses::Expense;
    use crate::period::{Frequency, Period};
    use crate::projection::generate_monthly_cashflow;
    use crate::revenue::RevenueStream;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn php(major: i64) -> Money {
        Money::of(major * 100, "PHP").unwrap()
    }

    fn model() -> RunwayModel {
        let period = Period::parse("2024-01", "2024-06").unwrap();
        let mut model = RunwayModel::new("Shop", php(20_000), period);
        model
            .add_revenue(
                RevenueStream::recurring("sales", "Sales", php(4_000), Frequency::Monthly, ym("2024-01"))
                    .unwrap(),
            )
            .unwrap();
        model
            .expenses
            .add(Expense::recurring("rent", "Rent", php(1_000), Frequency::Monthly, &period).unwrap())
            .unwrap();
        model
            .expenses
            .add(Expense::capital("oven", "Oven", php(12_000), ym("2024-01"), 12, None).unwrap())
            .unwrap();
        model
    }

    #[test]
    fn test_ebitda_excludes_depreciation() {
        let m = model();
        let cfs = generate_monthly_cashflow(&m, 6, None, true).unwrap();
        // 6 * (4000 - 1000)
        assert_eq!(get_ebitda_across_period(&m, &cfs).unwrap(), php(18_000));
        let totals = period_totals(&m, &cfs).unwrap();
        assert_eq!(totals.depreciation, php(6_000));
        assert_eq!(totals.recognized_expenses, php(12_000));
    }

    #[test]
    fn test_net_income_subtracts_taxes() {
        let m = model();
        let cfs = generate_monthly_cashflow(&m, 6, None, true).unwrap();
        // Monthly: pct 120, income tax (4000 - 2000 - 120) * 0.25 = 470
        assert_eq!(get_total_taxes_across_period(&m, &cfs).unwrap(), php(6 * 590));
        // 6 * (4000 - 2000 - 120 - 470)
        assert_eq!(get_net_income_across_period(&m, &cfs).unwrap(), php(6 * 1_410));
    }

    #[test]
    fn test_taxes_for_month_derives_when_absent() {
        let m = model();
        let cfs = generate_monthly_cashflow(&m, 6, None, false).unwrap();
        let t = get_taxes_for_month(&m, &cfs, ym("2024-02")).unwrap();
        assert_eq!(t.income_tax, php(470));
        assert!(matches!(
            get_taxes_for_month(&m, &cfs, ym("2025-01")),
            Err(RunwayError::MonthNotFound(_))
        ));
        assert!(matches!(
            get_taxes_for_month(&m, &[], ym("2024-01")),
            Err(RunwayError::EmptyProjection)
        ));
    }

    #[test]
    fn test_balance_snapshot() {
        let m = model();
        let cfs = generate_monthly_cashflow(&m, 6, None, false).unwrap();
        let snap = generate_balance_snapshot(&m, ym("2024-06"), &cfs).unwrap();
        // 20000 - 12000 + 6 * 3000
        assert_eq!(snap.cash, php(26_000));
        assert_eq!(snap.assets_net, php(6_000));
        assert!(snap.liabilities.is_zero());
        assert_eq!(snap.equity, php(32_000));
        assert_eq!(snap.retained_earnings, php(6_000));
    }
}
