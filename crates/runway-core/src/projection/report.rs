use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cashflow::Cashflow;
use super::engine::{generate_monthly_cashflow_with, project_funding, summarize_projection, ProjectionSummary};
use super::model::{ProjectionOptions, RunwayModel};
use super::statements::{generate_balance_snapshot, period_totals, BalanceSnapshot, PeriodTotals};
use crate::funding::FundingEvent;
use crate::period::YearMonth;
use crate::types::{with_metadata, ComputationOutput};
use crate::RunwayResult;

/// Input for a full projection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionRequest {
    pub model: RunwayModel,
    pub months: u32,
    #[serde(default)]
    pub start_month: Option<YearMonth>,
    #[serde(default)]
    pub options: ProjectionOptions,
    /// What-if funding layered on top of the model's own events
    #[serde(default)]
    pub additional_funding: Vec<FundingEvent>,
    /// Month for the balance snapshot, if any
    #[serde(default)]
    pub snapshot_month: Option<YearMonth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionReport {
    pub cashflows: Vec<Cashflow>,
    pub summary: ProjectionSummary,
    pub totals: PeriodTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<BalanceSnapshot>,
}

/// Project the model, layer any additional funding, and summarize.
pub fn run_projection(request: &ProjectionRequest) -> RunwayResult<ComputationOutput<ProjectionReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let model = &request.model;

    let mut cashflows =
        generate_monthly_cashflow_with(model, request.months, request.start_month, &request.options)?;
    if !request.additional_funding.is_empty() {
        cashflows = project_funding(&cashflows, &request.additional_funding)?;
    }

    let summary = summarize_projection(&cashflows)?;
    let totals = period_totals(model, &cashflows)?;
    let snapshot = request
        .snapshot_month
        .map(|m| generate_balance_snapshot(model, m, &cashflows))
        .transpose()?;

    if let Some(month) = summary.insolvency_month {
        warn!(model = %model.name, %month, runway = summary.runway_months, "projection runs out of cash");
        warnings.push(format!(
            "Cash runs out in {month} after {} month(s) of runway",
            summary.runway_months
        ));
    }

    let credited: Vec<YearMonth> = cashflows
        .iter()
        .filter(|cf| cf.taxes().is_some_and(|t| t.income_tax.is_negative()))
        .map(Cashflow::month)
        .collect();
    if let Some(first) = credited.first() {
        warn!(model = %model.name, months = credited.len(), "negative income tax reported as credit");
        warnings.push(format!(
            "Income tax is negative in {} month(s) starting {first}; losses are credited, not carried forward",
            credited.len()
        ));
    }

    let output = ProjectionReport {
        cashflows,
        summary,
        totals,
        snapshot,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly cashflow projection (minor-unit money, straight-line depreciation)",
        &serde_json::json!({
            "model": model.name,
            "currency": model.currency,
            "months": request.months,
            "start_month": request.start_month.unwrap_or_else(|| model.default_start()),
            "include_taxes": request.options.include_taxes,
            "include_debt_service": request.options.include_debt_service,
            "tax": model.tax,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expenses::Expense;
    use crate::money::Money;
    use crate::period::{Frequency, Period};

    fn php(major: i64) -> Money {
        Money::of(major * 100, "PHP").unwrap()
    }

    fn request() -> ProjectionRequest {
        let period = Period::parse("2024-01", "2024-06").unwrap();
        let mut model = RunwayModel::new("Burn", php(5_000), period);
        model
            .expenses
            .add(Expense::recurring("ops", "Ops", php(1_000), Frequency::Monthly, &period).unwrap())
            .unwrap();
        ProjectionRequest {
            model,
            months: 6,
            start_month: None,
            options: ProjectionOptions::default(),
            additional_funding: Vec::new(),
            snapshot_month: Some("2024-03".parse().unwrap()),
        }
    }

    #[test]
    fn test_warnings_flag_insolvency_and_credits() {
        let out = run_projection(&request()).unwrap();
        assert_eq!(out.result.summary.runway_months, 4);
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings[0].contains("2024-05"));
        assert_eq!(out.result.snapshot.unwrap().cash, php(2_000));
    }

    #[test]
    fn test_additional_funding_extends_runway() {
        let mut req = request();
        req.additional_funding = vec![FundingEvent::equity(
            "angel",
            "Angel cheque",
            php(10_000),
            "2024-02".parse().unwrap(),
        )
        .unwrap()];
        let out = run_projection(&req).unwrap();
        assert_eq!(out.result.summary.runway_months, 6);
        assert_eq!(out.result.summary.ending_cash, php(9_000));
    }
}
