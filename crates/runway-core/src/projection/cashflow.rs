use serde::{Deserialize, Serialize};

use crate::error::RunwayError;
use crate::money::Money;
use crate::period::YearMonth;
use crate::RunwayResult;

/// Informational taxes for one month. Never subtracted from cash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub revenue: Money,
    pub deductible_expense: Money,
    pub vat: Money,
    pub percentage_tax: Money,
    pub taxable_income: Money,
    /// Negative under `LossTreatment::Credit` when taxable income is negative
    pub income_tax: Money,
    pub total: Money,
}

/// One month of a projection.
///
/// `net == cash_in - cash_out` and `ending_cash == previous ending + net`
/// hold by construction; fields are only reachable through getters and
/// [`Cashflow::update_cash`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CashflowRepr")]
pub struct Cashflow {
    month: YearMonth,
    cash_in: Money,
    cash_out: Money,
    net: Money,
    ending_cash: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    taxes: Option<TaxBreakdown>,
}

#[derive(Deserialize)]
struct CashflowRepr {
    month: YearMonth,
    cash_in: Money,
    cash_out: Money,
    net: Money,
    ending_cash: Money,
    #[serde(default)]
    taxes: Option<TaxBreakdown>,
}

impl TryFrom<CashflowRepr> for Cashflow {
    type Error = RunwayError;

    fn try_from(repr: CashflowRepr) -> Result<Self, Self::Error> {
        let net = repr.cash_in.subtract(&repr.cash_out)?;
        if net != repr.net {
            return Err(RunwayError::invalid(
                "net",
                format!("{}: net {} != cash_in - cash_out {}", repr.month, repr.net, net),
            ));
        }
        repr.ending_cash.ensure_currency(net.currency())?;
        Ok(Cashflow {
            month: repr.month,
            cash_in: repr.cash_in,
            cash_out: repr.cash_out,
            net,
            ending_cash: repr.ending_cash,
            taxes: repr.taxes,
        })
    }
}

impl Cashflow {
    pub fn new(
        month: YearMonth,
        cash_in: Money,
        cash_out: Money,
        previous_ending: &Money,
    ) -> RunwayResult<Self> {
        let net = cash_in.subtract(&cash_out)?;
        let ending_cash = previous_ending.add(&net)?;
        Ok(Cashflow {
            month,
            cash_in,
            cash_out,
            net,
            ending_cash,
            taxes: None,
        })
    }

    pub fn with_taxes(mut self, taxes: TaxBreakdown) -> Self {
        self.taxes = Some(taxes);
        self
    }

    /// Replace both sides and re-derive `net` and `ending_cash`. Leaves `self`
    /// untouched on error.
    pub fn update_cash(
        &mut self,
        cash_in: Money,
        cash_out: Money,
        previous_ending: &Money,
    ) -> RunwayResult<()> {
        let net = cash_in.subtract(&cash_out)?;
        let ending_cash = previous_ending.add(&net)?;
        self.cash_in = cash_in;
        self.cash_out = cash_out;
        self.net = net;
        self.ending_cash = ending_cash;
        Ok(())
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn cash_in(&self) -> &Money {
        &self.cash_in
    }

    pub fn cash_out(&self) -> &Money {
        &self.cash_out
    }

    pub fn net(&self) -> &Money {
        &self.net
    }

    pub fn ending_cash(&self) -> &Money {
        &self.ending_cash
    }

    pub fn taxes(&self) -> Option<&TaxBreakdown> {
        self.taxes.as_ref()
    }

    /// Ending cash of the month before this one.
    pub fn opening_cash(&self) -> RunwayResult<Money> {
        self.ending_cash.subtract(&self.net)
    }
}

/// Check `ending[0] == starting + net[0]` and `ending[i] == ending[i-1] + net[i]`.
pub fn verify_chain(cashflows: &[Cashflow], starting_cash: &Money) -> RunwayResult<()> {
    let mut previous = starting_cash.clone();
    for cf in cashflows {
        let expected = previous.add(&cf.net)?;
        if expected != cf.ending_cash {
            return Err(RunwayError::invalid(
                "ending_cash",
                format!(
                    "{}: ending cash {} breaks the chain (expected {})",
                    cf.month, cf.ending_cash, expected
                ),
            ));
        }
        previous = cf.ending_cash.clone();
    }
    Ok(())
}
