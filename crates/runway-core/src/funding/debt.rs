//! Month-by-month amortization of a debt funding event.
//!
//! The receipt month pays any initial payment. The grace period that follows
//! neither accrues nor amortizes. Afterwards interest is capitalized on each
//! compounding boundary and every month repays `balance / months_remaining`,
//! so the balance reaches zero at maturity. Installment-plan entries replace
//! the computed payment for their month.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::event::{DebtTerms, FundingEvent};
use crate::money::Money;
use crate::period::YearMonth;
use crate::RunwayResult;

/// A single month of the debt schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtMonth {
    pub month: YearMonth,
    pub opening_balance: Money,
    pub interest: Money,
    pub payment: Money,
    pub closing_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSchedule {
    pub event_id: String,
    pub months: Vec<DebtMonth>,
    pub total_interest: Money,
    pub total_paid: Money,
}

impl DebtSchedule {
    fn row(&self, month: YearMonth) -> Option<&DebtMonth> {
        let first = self.months.first()?.month;
        let idx = first.months_until(month);
        if idx < 0 {
            return None;
        }
        self.months.get(idx as usize)
    }

    fn zero(&self) -> Money {
        Money::zero(self.total_paid.currency().clone())
    }

    /// Balance after `month`'s payment. Zero before receipt; the final
    /// closing balance carries past maturity.
    pub fn outstanding_at(&self, month: YearMonth) -> Money {
        match (self.months.first(), self.months.last()) {
            (Some(first), _) if month < first.month => self.zero(),
            (_, Some(last)) if month > last.month => last.closing_balance.clone(),
            _ => self
                .row(month)
                .map(|r| r.closing_balance.clone())
                .unwrap_or_else(|| self.zero()),
        }
    }

    pub fn payment_for_month(&self, month: YearMonth) -> Money {
        self.row(month)
            .map(|r| r.payment.clone())
            .unwrap_or_else(|| self.zero())
    }

    pub fn interest_for_month(&self, month: YearMonth) -> Money {
        self.row(month)
            .map(|r| r.interest.clone())
            .unwrap_or_else(|| self.zero())
    }
}

/// Build the schedule from the receipt month through maturity.
pub fn build_debt_schedule(event: &FundingEvent, terms: &DebtTerms) -> RunwayResult<DebtSchedule> {
    let currency = event.amount.currency().clone();
    let zero = Money::zero(currency.clone());
    let total_months = event.month.months_until(terms.maturity).max(0) as u32;

    let mut months = Vec::with_capacity(total_months as usize + 1);
    let mut total_interest = zero.clone();
    let mut total_paid = zero.clone();

    // Receipt month: only the initial payment moves the balance
    let initial = terms.initial_payment.clone().unwrap_or_else(|| zero.clone());
    let mut balance = event.amount.subtract(&initial)?;
    total_paid = total_paid.add(&initial)?;
    months.push(DebtMonth {
        month: event.month,
        opening_balance: event.amount.clone(),
        interest: zero.clone(),
        payment: initial,
        closing_balance: balance.clone(),
    });

    let periodic_rate = terms
        .compounding
        .step_months()
        .map(|step| (step, terms.interest_rate * Decimal::from(step) / Decimal::from(12)));

    for k in 1..=total_months {
        let month = event.month.offset(k as i32);
        let opening = balance.clone();
        let accruing = k > terms.grace_period_months;

        let interest = match periodic_rate {
            Some((step, rate)) if accruing && (k - terms.grace_period_months) % step == 0 => {
                opening.apply_percentage(rate)?
            }
            _ => zero.clone(),
        };
        let due = opening.add(&interest)?;

        let payment = match terms.installment_for(month) {
            Some(planned) => planned.min(&due)?,
            None if accruing || k == total_months => {
                let remaining = total_months - k + 1;
                due.divide(Decimal::from(remaining))?
            }
            None => zero.clone(),
        };

        balance = due.subtract(&payment)?;
        total_interest = total_interest.add(&interest)?;
        total_paid = total_paid.add(&payment)?;

        months.push(DebtMonth {
            month,
            opening_balance: opening,
            interest,
            payment,
            closing_balance: balance.clone(),
        });
    }

    Ok(DebtSchedule {
        event_id: event.id.clone(),
        months,
        total_interest,
        total_paid,
    })
}
