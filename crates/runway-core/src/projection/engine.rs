use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cashflow::{Cashflow, TaxBreakdown};
use super::model::{ProjectionOptions, RunwayModel};
use super::tax::calculate_taxes;
use crate::error::RunwayError;
use crate::funding::FundingEvent;
use crate::money::Money;
use crate::period::YearMonth;
use crate::RunwayResult;

// ---------------------------------------------------------------------------
// Cashflow generation
// ---------------------------------------------------------------------------

/// Walk `months` months from `start_month` (default: the first month of the
/// expense period), producing one [`Cashflow`] per month.
///
/// `cash_in` is revenue plus funding received, `cash_out` is expense cash out.
/// With `include_taxes` each month carries a [`TaxBreakdown`]; taxes never
/// reduce cash.
pub fn generate_monthly_cashflow(
    model: &RunwayModel,
    months: u32,
    start_month: Option<YearMonth>,
    include_taxes: bool,
) -> RunwayResult<Vec<Cashflow>> {
    let options = ProjectionOptions {
        include_taxes,
        ..ProjectionOptions::default()
    };
    generate_monthly_cashflow_with(model, months, start_month, &options)
}

pub fn generate_monthly_cashflow_with(
    model: &RunwayModel,
    months: u32,
    start_month: Option<YearMonth>,
    options: &ProjectionOptions,
) -> RunwayResult<Vec<Cashflow>> {
    if months == 0 {
        return Err(RunwayError::invalid("months", "Projection needs at least one month"));
    }
    model.validate()?;

    let start = start_month.unwrap_or_else(|| model.default_start());
    let mut cashflows = Vec::with_capacity(months as usize);
    let mut previous = model.starting_cash.clone();

    for i in 0..months {
        let month = start.offset(i as i32);
        let cash_in = model
            .revenue_for_month(month)?
            .add(&model.funding.funding_for_month(month)?)?;
        let mut cash_out = model.expenses.monthly_cash_out(month)?;
        if options.include_debt_service {
            cash_out = cash_out.add(&model.funding.debt_service_for_month(month)?)?;
        }

        let mut cashflow = Cashflow::new(month, cash_in, cash_out, &previous)?;
        if options.include_taxes {
            cashflow = cashflow.with_taxes(derive_taxes(model, month)?);
        }
        previous = cashflow.ending_cash().clone();
        cashflows.push(cashflow);
    }

    debug!(
        model = %model.name,
        start = %start,
        months,
        ending_cash = %previous,
        "generated monthly cashflow"
    );
    Ok(cashflows)
}

/// Taxes for `month` re-derived from the model.
pub(crate) fn derive_taxes(model: &RunwayModel, month: YearMonth) -> RunwayResult<TaxBreakdown> {
    calculate_taxes(
        &model.revenue_for_month(month)?,
        &model.expenses.monthly_deductible_expense(month)?,
        &model.tax,
    )
}

/// Inject `events` into an existing projection.
///
/// Each event's amount is added to the `cash_in` of its month and the ending
/// cash chain is rebuilt from the first month forward. Events dated outside
/// the projection are ignored.
pub fn project_funding(
    cashflows: &[Cashflow],
    events: &[FundingEvent],
) -> RunwayResult<Vec<Cashflow>> {
    let first = cashflows.first().ok_or(RunwayError::EmptyProjection)?;
    let currency = first.ending_cash().currency().clone();

    let mut injected: BTreeMap<YearMonth, Money> = BTreeMap::new();
    for event in events {
        if !cashflows.iter().any(|cf| cf.month() == event.month) {
            debug!(event = %event.id, month = %event.month, "funding outside projection ignored");
            continue;
        }
        let bucket = injected
            .entry(event.month)
            .or_insert_with(|| Money::zero(currency.clone()));
        *bucket = bucket.add(&event.amount)?;
    }

    let mut previous = first.opening_cash()?;
    let mut rebuilt = Vec::with_capacity(cashflows.len());
    for cf in cashflows {
        let mut next = cf.clone();
        let cash_in = match injected.get(&cf.month()) {
            Some(extra) => cf.cash_in().add(extra)?,
            None => cf.cash_in().clone(),
        };
        next.update_cash(cash_in, cf.cash_out().clone(), &previous)?;
        previous = next.ending_cash().clone();
        rebuilt.push(next);
    }
    Ok(rebuilt)
}

// ---------------------------------------------------------------------------
// Runway
// ---------------------------------------------------------------------------

/// Index of the first month whose ending cash is zero or below; the length
/// of the sequence when cash stays positive throughout.
pub fn calculate_runway(cashflows: &[Cashflow]) -> usize {
    cashflows
        .iter()
        .position(|cf| !cf.ending_cash().is_positive())
        .unwrap_or(cashflows.len())
}

/// Headline figures of a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub months: usize,
    pub runway_months: usize,
    /// First month with ending cash <= 0
    pub insolvency_month: Option<YearMonth>,
    pub lowest_cash: Money,
    pub lowest_cash_month: YearMonth,
    pub total_cash_in: Money,
    pub total_cash_out: Money,
    /// Average monthly net outflow, zero when the projection is cash positive
    pub average_monthly_burn: Money,
    pub ending_cash: Money,
}

pub fn summarize_projection(cashflows: &[Cashflow]) -> RunwayResult<ProjectionSummary> {
    let first = cashflows.first().ok_or(RunwayError::EmptyProjection)?;
    let currency = first.ending_cash().currency();

    let total_cash_in = Money::sum(cashflows.iter().map(Cashflow::cash_in), currency)?;
    let total_cash_out = Money::sum(cashflows.iter().map(Cashflow::cash_out), currency)?;

    let mut lowest = first;
    for cf in &cashflows[1..] {
        if cf.ending_cash().less_than(lowest.ending_cash())? {
            lowest = cf;
        }
    }

    let net_outflow = total_cash_out.subtract(&total_cash_in)?;
    let average_monthly_burn = if net_outflow.is_positive() {
        net_outflow.divide(Decimal::from(cashflows.len() as u64))?
    } else {
        Money::zero(currency.clone())
    };

    let runway_months = calculate_runway(cashflows);
    let last = &cashflows[cashflows.len() - 1];
    Ok(ProjectionSummary {
        months: cashflows.len(),
        runway_months,
        insolvency_month: cashflows.get(runway_months).map(Cashflow::month),
        lowest_cash: lowest.ending_cash().clone(),
        lowest_cash_month: lowest.month(),
        total_cash_in,
        total_cash_out,
        average_monthly_burn,
        ending_cash: last.ending_cash().clone(),
    })
}
