use clap::Args;
use serde_json::{json, Value};

use runway_core::period::YearMonth;
use runway_core::projection::{
    calculate_runway, summarize_projection, Cashflow, ProjectionOptions, RunwayModel,
};
use runway_core::scenarios::{
    analyze_scenarios, simulate_scenario_with, ScenarioInput, ScenarioOverride,
};

use super::ModelArgs;
use crate::input;

/// Arguments for a single what-if scenario
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ScenarioArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Override as `path=value`, e.g. `expenses.rent.amount=1500` (repeatable)
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub set: Vec<String>,

    /// JSON file holding a list of `{ "field", "value" }` overrides
    #[arg(long)]
    pub overrides: Option<String>,
}

/// Arguments for probability-weighted scenario comparison
#[derive(Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// JSON file with `{ "scenarios": [{ "name", "probability", "overrides" }] }`
    #[arg(long)]
    pub scenarios: String,
}

pub fn run_scenario(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = args.model.load_model()?;

    let mut overrides: Vec<ScenarioOverride> = match &args.overrides {
        Some(path) => input::file::read_json(path)?,
        None => Vec::new(),
    };
    for raw in &args.set {
        overrides.push(parse_set(raw)?);
    }

    let (base, scenario) =
        project_both(&model, &overrides, args.model.months, args.model.start)?;
    let base_summary = summarize_projection(&base)?;
    let summary = summarize_projection(&scenario)?;

    Ok(json!({
        "overrides": overrides.len(),
        "base_runway_months": calculate_runway(&base),
        "runway_months": summary.runway_months,
        "base_ending_cash": base_summary.ending_cash,
        "ending_cash": summary.ending_cash,
        "lowest_cash": summary.lowest_cash,
        "lowest_cash_month": summary.lowest_cash_month,
    }))
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let model = args.model.load_model()?;
    let scenarios: ScenarioInput = input::file::read_json(&args.scenarios)?;
    let scenarios = with_start(scenarios, args.model.start);
    let output = analyze_scenarios(&model, &scenarios, args.model.months)?;
    Ok(serde_json::to_value(output)?)
}

/// Base case and overridden copy, both starting from `start`.
fn project_both(
    model: &RunwayModel,
    overrides: &[ScenarioOverride],
    months: u32,
    start: Option<YearMonth>,
) -> Result<(Vec<Cashflow>, Vec<Cashflow>), Box<dyn std::error::Error>> {
    let options = ProjectionOptions::default();
    let base = simulate_scenario_with(model, &[], months, start, &options)?;
    let scenario = simulate_scenario_with(model, overrides, months, start, &options)?;
    Ok((base, scenario))
}

/// `--start` on the command line wins over the file's `start_month`.
fn with_start(mut input: ScenarioInput, start: Option<YearMonth>) -> ScenarioInput {
    if start.is_some() {
        input.start_month = start;
    }
    input
}

/// `path=value`; the value is read as JSON when it parses, else as a string.
fn parse_set(raw: &str) -> Result<ScenarioOverride, Box<dyn std::error::Error>> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Override '{raw}' must look like path=value"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok(ScenarioOverride::new(field.trim(), value))
}
