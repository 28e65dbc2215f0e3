use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use runway_core::funding::FundingEvent;
use runway_core::period::YearMonth;
use runway_core::projection::{Cashflow, ProjectionOptions, RunwayModel};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: serde::de::DeserializeOwned>(input_json: &str) -> NapiResult<T> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

fn render<T: serde::Serialize>(output: &T) -> NapiResult<String> {
    serde_json::to_string(output).map_err(to_napi_error)
}

fn default_months() -> u32 {
    12
}

#[derive(Deserialize)]
struct ModelInput {
    model: RunwayModel,
    #[serde(default = "default_months")]
    months: u32,
    #[serde(default)]
    start_month: Option<YearMonth>,
    #[serde(default)]
    options: ProjectionOptions,
}

impl ModelInput {
    fn project(&self) -> NapiResult<Vec<Cashflow>> {
        runway_core::projection::generate_monthly_cashflow_with(
            &self.model,
            self.months,
            self.start_month,
            &self.options,
        )
        .map_err(to_napi_error)
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_monthly_cashflow(input_json: String) -> NapiResult<String> {
    let input: ModelInput = parse(&input_json)?;
    render(&input.project()?)
}

#[derive(Deserialize)]
struct FundingInput {
    cashflows: Vec<Cashflow>,
    events: Vec<FundingEvent>,
}

#[napi]
pub fn project_funding(input_json: String) -> NapiResult<String> {
    let input: FundingInput = parse(&input_json)?;
    let output = runway_core::projection::project_funding(&input.cashflows, &input.events)
        .map_err(to_napi_error)?;
    render(&output)
}

/// Takes a cashflow array and returns the runway as a bare number.
#[napi]
pub fn calculate_runway(cashflows_json: String) -> NapiResult<u32> {
    let cashflows: Vec<Cashflow> = parse(&cashflows_json)?;
    Ok(runway_core::projection::calculate_runway(&cashflows) as u32)
}

#[napi]
pub fn summarize_projection(cashflows_json: String) -> NapiResult<String> {
    let cashflows: Vec<Cashflow> = parse(&cashflows_json)?;
    let output =
        runway_core::projection::summarize_projection(&cashflows).map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn run_projection(input_json: String) -> NapiResult<String> {
    let request: runway_core::projection::ProjectionRequest = parse(&input_json)?;
    let output = runway_core::projection::run_projection(&request).map_err(to_napi_error)?;
    render(&output)
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SnapshotInput {
    #[serde(flatten)]
    projection: ModelInput,
    month: YearMonth,
}

#[napi]
pub fn balance_snapshot(input_json: String) -> NapiResult<String> {
    let input: SnapshotInput = parse(&input_json)?;
    let cashflows = input.projection.project()?;
    let output = runway_core::projection::generate_balance_snapshot(
        &input.projection.model,
        input.month,
        &cashflows,
    )
    .map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn taxes_for_month(input_json: String) -> NapiResult<String> {
    let input: SnapshotInput = parse(&input_json)?;
    let cashflows = input.projection.project()?;
    let output = runway_core::projection::get_taxes_for_month(
        &input.projection.model,
        &cashflows,
        input.month,
    )
    .map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn period_totals(input_json: String) -> NapiResult<String> {
    let input: ModelInput = parse(&input_json)?;
    let cashflows = input.project()?;
    let output = runway_core::projection::period_totals(&input.model, &cashflows)
        .map_err(to_napi_error)?;
    render(&output)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SimulateInput {
    model: RunwayModel,
    #[serde(default = "default_months")]
    months: u32,
    overrides: Vec<runway_core::scenarios::ScenarioOverride>,
}

#[napi]
pub fn simulate_scenario(input_json: String) -> NapiResult<String> {
    let input: SimulateInput = parse(&input_json)?;
    let output =
        runway_core::scenarios::simulate_scenario(&input.model, &input.overrides, input.months)
            .map_err(to_napi_error)?;
    render(&output)
}

#[derive(Deserialize)]
struct AnalyzeInput {
    model: RunwayModel,
    #[serde(default = "default_months")]
    months: u32,
    #[serde(flatten)]
    scenarios: runway_core::scenarios::ScenarioInput,
}

#[napi]
pub fn analyze_scenarios(input_json: String) -> NapiResult<String> {
    let input: AnalyzeInput = parse(&input_json)?;
    let output =
        runway_core::scenarios::analyze_scenarios(&input.model, &input.scenarios, input.months)
            .map_err(to_napi_error)?;
    render(&output)
}
