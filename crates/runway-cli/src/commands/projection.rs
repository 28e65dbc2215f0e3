use clap::Args;
use serde_json::{json, Value};

use runway_core::period::YearMonth;
use runway_core::projection::{
    generate_balance_snapshot, get_taxes_for_month, period_totals, run_projection,
    summarize_projection, ProjectionRequest,
};

use super::ModelArgs;
use crate::input;

/// Arguments for the month-by-month projection
#[derive(Args)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Leave tax breakdowns off the projected months
    #[arg(long)]
    pub no_taxes: bool,
}

/// Arguments for a balance snapshot
#[derive(Args)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Month to snapshot (YYYY-MM)
    #[arg(long)]
    pub month: YearMonth,
}

/// Arguments for a full projection report
#[derive(Args)]
pub struct ReportArgs {
    /// Path to a JSON projection request (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = args.model.load_model()?;
    let cashflows = args.model.project(&model, !args.no_taxes)?;

    let rows: Vec<Value> = cashflows
        .iter()
        .map(|cf| {
            json!({
                "month": cf.month(),
                "cash_in": cf.cash_in(),
                "cash_out": cf.cash_out(),
                "net": cf.net(),
                "ending_cash": cf.ending_cash(),
                "taxes": cf.taxes().map(|t| &t.total),
            })
        })
        .collect();
    Ok(json!({ "model": model.name, "cashflows": rows }))
}

pub fn run_runway(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = args.load_model()?;
    let cashflows = args.project(&model, false)?;
    let summary = summarize_projection(&cashflows)?;
    Ok(serde_json::to_value(summary)?)
}

pub fn run_taxes(args: ModelArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = args.load_model()?;
    let cashflows = args.project(&model, true)?;

    let mut rows = Vec::with_capacity(cashflows.len());
    for cf in &cashflows {
        let t = get_taxes_for_month(&model, &cashflows, cf.month())?;
        rows.push(json!({
            "month": cf.month(),
            "revenue": t.revenue,
            "vat": t.vat,
            "percentage_tax": t.percentage_tax,
            "income_tax": t.income_tax,
            "total": t.total,
        }));
    }
    let totals = period_totals(&model, &cashflows)?;
    Ok(json!({
        "total_taxes": totals.total_taxes,
        "net_income": totals.net_income,
        "months": rows,
    }))
}

pub fn run_snapshot(args: SnapshotArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = args.model.load_model()?;
    let cashflows = args.model.project(&model, false)?;
    let snapshot = generate_balance_snapshot(&model, args.month, &cashflows)?;
    Ok(serde_json::to_value(snapshot)?)
}

pub fn run_report(args: ReportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ProjectionRequest = input::read_input(args.input.as_deref())?;
    let output = run_projection(&request)?;
    Ok(serde_json::to_value(output)?)
}
