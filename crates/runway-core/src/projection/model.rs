use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RunwayError;
use crate::expenses::ExpenseBreakdown;
use crate::funding::FundingManager;
use crate::money::{CurrencyCode, Money};
use crate::period::{Period, YearMonth};
use crate::revenue::{self, RevenueStream};
use crate::types::Rate;
use crate::RunwayResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatMode {
    /// Output VAT on revenue, no percentage tax
    Vat,
    /// Percentage tax on revenue, no VAT
    #[default]
    NonVat,
}

/// What happens to income tax when taxable income is negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossTreatment {
    /// Negative income tax is reported as a credit
    #[default]
    Credit,
    /// Income tax never drops below zero
    Floor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxConfig {
    pub vat_mode: VatMode,
    pub vat_rate: Rate,
    pub percentage_tax_rate: Rate,
    pub income_tax_rate: Rate,
    pub loss_treatment: LossTreatment,
}

impl Default for TaxConfig {
    fn default() -> Self {
        TaxConfig {
            vat_mode: VatMode::NonVat,
            vat_rate: dec!(0.12),
            percentage_tax_rate: dec!(0.03),
            income_tax_rate: dec!(0.25),
            loss_treatment: LossTreatment::Credit,
        }
    }
}

impl TaxConfig {
    pub fn validate(&self) -> RunwayResult<()> {
        let rates = [
            ("vat_rate", self.vat_rate),
            ("percentage_tax_rate", self.percentage_tax_rate),
            ("income_tax_rate", self.income_tax_rate),
        ];
        for (field, rate) in rates {
            if rate.is_sign_negative() || rate > Rate::ONE {
                return Err(RunwayError::invalid(
                    field,
                    format!("Rate must be a fraction between 0 and 1 (got {rate})"),
                ));
            }
        }
        Ok(())
    }
}

/// Switches for the projection walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionOptions {
    /// Attach a [`super::TaxBreakdown`] to every month
    pub include_taxes: bool,
    /// Add scheduled debt payments to cash out
    pub include_debt_service: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        ProjectionOptions {
            include_taxes: true,
            include_debt_service: false,
        }
    }
}

/// Everything a projection reads: opening cash, revenue, expenses, funding
/// and tax settings, all in one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunwayModel {
    pub name: String,
    pub currency: CurrencyCode,
    pub starting_cash: Money,
    #[serde(default)]
    pub revenue: Vec<RevenueStream>,
    pub expenses: ExpenseBreakdown,
    pub funding: FundingManager,
    #[serde(default)]
    pub tax: TaxConfig,
}

impl RunwayModel {
    /// Empty model whose expense and funding collections cover `period`.
    pub fn new(name: impl Into<String>, starting_cash: Money, period: Period) -> Self {
        let currency = starting_cash.currency().clone();
        RunwayModel {
            name: name.into(),
            expenses: ExpenseBreakdown::new(currency.clone(), period),
            funding: FundingManager::new(currency.clone(), period),
            currency,
            starting_cash,
            revenue: Vec::new(),
            tax: TaxConfig::default(),
        }
    }

    pub fn with_tax(mut self, tax: TaxConfig) -> Self {
        self.tax = tax;
        self
    }

    pub fn validate(&self) -> RunwayResult<()> {
        self.starting_cash.ensure_currency(&self.currency)?;
        for (found, what) in [
            (self.expenses.currency(), "expenses"),
            (self.funding.currency(), "funding"),
        ] {
            if found != &self.currency {
                return Err(RunwayError::CurrencyMismatch {
                    expected: self.currency.to_string(),
                    found: format!("{found} ({what})"),
                });
            }
        }
        for (i, stream) in self.revenue.iter().enumerate() {
            stream.validate()?;
            stream.amount.ensure_currency(&self.currency)?;
            if self.revenue[..i].iter().any(|s| s.id == stream.id) {
                return Err(RunwayError::DuplicateEntity {
                    entity: "RevenueStream".into(),
                    id: stream.id.clone(),
                });
            }
        }
        self.tax.validate()
    }

    pub fn add_revenue(&mut self, stream: RevenueStream) -> RunwayResult<()> {
        stream.validate()?;
        stream.amount.ensure_currency(&self.currency)?;
        if self.revenue_stream(&stream.id).is_some() {
            return Err(RunwayError::DuplicateEntity {
                entity: "RevenueStream".into(),
                id: stream.id,
            });
        }
        self.revenue.push(stream);
        Ok(())
    }

    pub fn revenue_stream(&self, id: &str) -> Option<&RevenueStream> {
        self.revenue.iter().find(|s| s.id == id)
    }

    pub fn revenue_for_month(&self, month: YearMonth) -> RunwayResult<Money> {
        revenue::revenue_for_month(&self.revenue, month, &self.currency)
    }

    /// First month of the expense period; projections start here by default.
    pub fn default_start(&self) -> YearMonth {
        self.expenses.period().start_month()
    }
}
