use super::cashflow::TaxBreakdown;
use super::model::{LossTreatment, TaxConfig, VatMode};
use crate::money::Money;
use crate::RunwayResult;

/// Monthly tax rule.
///
/// VAT mode charges `revenue * vat_rate` and no percentage tax; non-VAT mode
/// the reverse. Income tax is `(revenue - expense - vat - percentage_tax) *
/// income_tax_rate`, negative on a loss unless the config floors it. No loss
/// carry-forward between months.
pub fn calculate_taxes(
    revenue: &Money,
    deductible_expense: &Money,
    config: &TaxConfig,
) -> RunwayResult<TaxBreakdown> {
    let zero = Money::zero(revenue.currency().clone());
    let (vat, percentage_tax) = match config.vat_mode {
        VatMode::Vat => (revenue.apply_percentage(config.vat_rate)?, zero.clone()),
        VatMode::NonVat => (zero.clone(), revenue.apply_percentage(config.percentage_tax_rate)?),
    };

    let taxable_income = revenue
        .subtract(deductible_expense)?
        .subtract(&vat)?
        .subtract(&percentage_tax)?;
    let mut income_tax = taxable_income.apply_percentage(config.income_tax_rate)?;
    if config.loss_treatment == LossTreatment::Floor {
        income_tax = income_tax.max(&zero)?;
    }

    let total = vat.add(&percentage_tax)?.add(&income_tax)?;
    Ok(TaxBreakdown {
        revenue: revenue.clone(),
        deductible_expense: deductible_expense.clone(),
        vat,
        percentage_tax,
        taxable_income,
        income_tax,
        total,
    })
}
