use serde::{Deserialize, Serialize};

use super::debt::{build_debt_schedule, DebtSchedule};
use crate::error::RunwayError;
use crate::money::Money;
use crate::period::YearMonth;
use crate::types::Rate;
use crate::RunwayResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingType {
    Equity,
    Debt,
    Grant,
}

/// How often accrued interest is added to a debt balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compounding {
    /// No interest is capitalized
    #[default]
    None,
    Monthly,
    Quarterly,
    Annually,
}

impl Compounding {
    /// Months between capitalizations and the periodic rate divisor.
    pub fn step_months(&self) -> Option<u32> {
        match self {
            Compounding::None => None,
            Compounding::Monthly => Some(1),
            Compounding::Quarterly => Some(3),
            Compounding::Annually => Some(12),
        }
    }
}

/// A scheduled repayment that overrides the computed amortization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub month: YearMonth,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtTerms {
    /// Annual nominal rate
    pub interest_rate: Rate,
    pub maturity: YearMonth,
    #[serde(default)]
    pub compounding: Compounding,
    #[serde(default)]
    pub grace_period_months: u32,
    /// Paid back in the month the loan is received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_payment: Option<Money>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installment_plan: Vec<Installment>,
}

impl DebtTerms {
    pub fn new(interest_rate: Rate, maturity: YearMonth) -> Self {
        DebtTerms {
            interest_rate,
            maturity,
            compounding: Compounding::None,
            grace_period_months: 0,
            initial_payment: None,
            installment_plan: Vec::new(),
        }
    }

    pub fn with_compounding(mut self, compounding: Compounding) -> Self {
        self.compounding = compounding;
        self
    }

    pub fn with_grace_period(mut self, months: u32) -> Self {
        self.grace_period_months = months;
        self
    }

    pub fn with_initial_payment(mut self, payment: Money) -> Self {
        self.initial_payment = Some(payment);
        self
    }

    pub fn with_installments(mut self, plan: Vec<Installment>) -> Self {
        self.installment_plan = plan;
        self
    }

    pub fn installment_for(&self, month: YearMonth) -> Option<&Money> {
        self.installment_plan
            .iter()
            .find(|i| i.month == month)
            .map(|i| &i.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FundingKind {
    Equity {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        investor: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ownership_pct: Option<Rate>,
    },
    Debt(DebtTerms),
    Grant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        grantor: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conditions: Option<String>,
    },
}

/// Cash received on `month`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingEvent {
    pub id: String,
    pub name: String,
    pub amount: Money,
    pub month: YearMonth,
    #[serde(flatten)]
    pub kind: FundingKind,
}

impl FundingEvent {
    pub fn equity(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        month: YearMonth,
    ) -> RunwayResult<Self> {
        Self::build(
            id,
            name,
            amount,
            month,
            FundingKind::Equity {
                investor: None,
                ownership_pct: None,
            },
        )
    }

    pub fn grant(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        month: YearMonth,
    ) -> RunwayResult<Self> {
        Self::build(
            id,
            name,
            amount,
            month,
            FundingKind::Grant {
                grantor: None,
                conditions: None,
            },
        )
    }

    pub fn debt(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        month: YearMonth,
        terms: DebtTerms,
    ) -> RunwayResult<Self> {
        Self::build(id, name, amount, month, FundingKind::Debt(terms))
    }

    fn build(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        month: YearMonth,
        kind: FundingKind,
    ) -> RunwayResult<Self> {
        let event = FundingEvent {
            id: id.into(),
            name: name.into(),
            amount,
            month,
            kind,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> RunwayResult<()> {
        if self.id.trim().is_empty() {
            return Err(RunwayError::invalid("id", "Funding event id must not be empty"));
        }
        if self.amount.is_negative() {
            return Err(RunwayError::invalid(
                "amount",
                format!("Funding '{}' amount must be >= 0", self.id),
            ));
        }
        match &self.kind {
            FundingKind::Equity { ownership_pct, .. } => {
                if let Some(pct) = ownership_pct {
                    if pct.is_sign_negative() || *pct > Rate::ONE {
                        return Err(RunwayError::invalid(
                            "ownership_pct",
                            "Ownership must be a fraction between 0 and 1",
                        ));
                    }
                }
            }
            FundingKind::Grant { .. } => {}
            FundingKind::Debt(terms) => self.validate_debt(terms)?,
        }
        Ok(())
    }

    fn validate_debt(&self, terms: &DebtTerms) -> RunwayResult<()> {
        crate::period::validate_range(self.month, terms.maturity)?;
        if terms.maturity == self.month {
            return Err(RunwayError::invalid(
                "maturity",
                format!("Debt '{}' must mature after the month it is received", self.id),
            ));
        }
        if terms.interest_rate.is_sign_negative() {
            return Err(RunwayError::invalid("interest_rate", "Interest rate must be >= 0"));
        }
        let currency = self.amount.currency();
        if let Some(initial) = &terms.initial_payment {
            initial.ensure_currency(currency)?;
            if initial.is_negative() || initial.greater_than(&self.amount)? {
                return Err(RunwayError::invalid(
                    "initial_payment",
                    format!("Initial payment of '{}' must lie between 0 and principal", self.id),
                ));
            }
        }
        for installment in &terms.installment_plan {
            installment.amount.ensure_currency(currency)?;
            if installment.amount.is_negative() {
                return Err(RunwayError::invalid("installment_plan", "Installments must be >= 0"));
            }
            if installment.month <= self.month || installment.month > terms.maturity {
                return Err(RunwayError::invalid(
                    "installment_plan",
                    format!(
                        "Installment on {} falls outside {}..{}",
                        installment.month, self.month.next(), terms.maturity
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn funding_type(&self) -> FundingType {
        match self.kind {
            FundingKind::Equity { .. } => FundingType::Equity,
            FundingKind::Debt(_) => FundingType::Debt,
            FundingKind::Grant { .. } => FundingType::Grant,
        }
    }

    pub fn is_repayable(&self) -> bool {
        matches!(self.kind, FundingKind::Debt(_))
    }

    pub fn debt_terms(&self) -> Option<&DebtTerms> {
        match &self.kind {
            FundingKind::Debt(terms) => Some(terms),
            _ => None,
        }
    }

    pub fn cash_in_for_month(&self, month: YearMonth) -> Money {
        if self.month == month {
            self.amount.clone()
        } else {
            Money::zero(self.amount.currency().clone())
        }
    }

    /// Amortization schedule, `None` for non-debt funding.
    pub fn debt_schedule(&self) -> RunwayResult<Option<DebtSchedule>> {
        match &self.kind {
            FundingKind::Debt(terms) => build_debt_schedule(self, terms).map(Some),
            _ => Ok(None),
        }
    }

    pub fn outstanding_at(&self, month: YearMonth) -> RunwayResult<Money> {
        Ok(match self.debt_schedule()? {
            Some(schedule) => schedule.outstanding_at(month),
            None => Money::zero(self.amount.currency().clone()),
        })
    }

    pub fn payment_for_month(&self, month: YearMonth) -> RunwayResult<Money> {
        Ok(match self.debt_schedule()? {
            Some(schedule) => schedule.payment_for_month(month),
            None => Money::zero(self.amount.currency().clone()),
        })
    }

    pub fn interest_for_month(&self, month: YearMonth) -> RunwayResult<Money> {
        Ok(match self.debt_schedule()? {
            Some(schedule) => schedule.interest_for_month(month),
            None => Money::zero(self.amount.currency().clone()),
        })
    }
}
