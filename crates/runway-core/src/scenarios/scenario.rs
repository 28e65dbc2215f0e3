use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::lens::{compile_overrides, ScenarioOverride};
use crate::error::RunwayError;
use crate::money::Money;
use crate::period::YearMonth;
use crate::projection::{
    calculate_runway, generate_monthly_cashflow, generate_monthly_cashflow_with, summarize_projection,
    Cashflow, ProjectionOptions, RunwayModel,
};
use crate::types::*;
use crate::RunwayResult;

/// Clone `model` and apply `overrides` to the copy. All overrides are parsed
/// before the first one is applied.
pub fn apply_overrides(model: &RunwayModel, overrides: &[ScenarioOverride]) -> RunwayResult<RunwayModel> {
    let lenses = compile_overrides(overrides)?;
    let mut scenario = model.clone();
    for lens in &lenses {
        lens.apply(&mut scenario)?;
    }
    Ok(scenario)
}

/// Re-run the projection on an overridden copy of `model`; `model` itself is
/// never modified.
pub fn simulate_scenario(
    model: &RunwayModel,
    overrides: &[ScenarioOverride],
    months: u32,
) -> RunwayResult<Vec<Cashflow>> {
    let scenario = apply_overrides(model, overrides)?;
    debug!(model = %model.name, overrides = overrides.len(), months, "simulating scenario");
    generate_monthly_cashflow(&scenario, months, None, true)
}

/// [`simulate_scenario`] with an explicit start month and projection options.
pub fn simulate_scenario_with(
    model: &RunwayModel,
    overrides: &[ScenarioOverride],
    months: u32,
    start_month: Option<YearMonth>,
    options: &ProjectionOptions,
) -> RunwayResult<Vec<Cashflow>> {
    let scenario = apply_overrides(model, overrides)?;
    debug!(model = %model.name, overrides = overrides.len(), months, ?start_month, "simulating scenario");
    generate_monthly_cashflow_with(&scenario, months, start_month, options)
}

/// A named set of overrides with its probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub probability: Rate,
    #[serde(default)]
    pub overrides: Vec<ScenarioOverride>,
}

/// Input for scenario analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub scenarios: Vec<Scenario>,
    /// First projected month for the base case and every scenario
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_month: Option<YearMonth>,
}

/// Result for a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub probability: Rate,
    pub runway_months: usize,
    pub ending_cash: Money,
    pub lowest_cash: Money,
    pub deviation_from_base: Money,
    pub deviation_pct: Rate,
}

/// Output of scenario analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub base_runway_months: usize,
    pub base_ending_cash: Money,
    pub results: Vec<ScenarioResult>,
    pub probability_weighted_ending_cash: Money,
    pub probability_weighted_runway: Decimal,
}

/// Project every scenario and compare its ending cash with the unmodified
/// model.
///
/// Probabilities must each lie in [0, 1] and sum to 1 within 0.001.
pub fn analyze_scenarios(
    model: &RunwayModel,
    input: &ScenarioInput,
    months: u32,
) -> RunwayResult<ComputationOutput<ScenarioOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.scenarios.is_empty() {
        return Err(RunwayError::InvalidInput {
            field: "scenarios".into(),
            reason: "At least one scenario required".into(),
        });
    }

    for s in &input.scenarios {
        if s.probability < Decimal::ZERO || s.probability > Decimal::ONE {
            return Err(RunwayError::InvalidInput {
                field: format!("scenario:{} probability", s.name),
                reason: "Probability must be between 0 and 1".into(),
            });
        }
    }

    let total_prob: Decimal = input.scenarios.iter().map(|s| s.probability).sum();
    let prob_tolerance = dec!(0.001);
    if (total_prob - Decimal::ONE).abs() > prob_tolerance {
        return Err(RunwayError::InvalidInput {
            field: "probabilities".into(),
            reason: format!("Probabilities must sum to 1.0 (got {total_prob})"),
        });
    }
    if total_prob != Decimal::ONE {
        warnings.push(format!(
            "Probabilities sum to {total_prob}; treated as approximately 1.0"
        ));
    }

    let options = ProjectionOptions::default();
    let base = generate_monthly_cashflow_with(model, months, input.start_month, &options)?;
    let base_summary = summarize_projection(&base)?;
    let base_value = base_summary.ending_cash.to_major();

    let mut results = Vec::with_capacity(input.scenarios.len());
    let mut weighted_cash = Decimal::ZERO;
    let mut weighted_runway = Decimal::ZERO;

    for scenario in &input.scenarios {
        let cashflows =
            simulate_scenario_with(model, &scenario.overrides, months, input.start_month, &options)?;
        let summary = summarize_projection(&cashflows)?;
        let runway_months = calculate_runway(&cashflows);

        let deviation = summary.ending_cash.subtract(&base_summary.ending_cash)?;
        let deviation_pct = if base_value.is_zero() {
            if !deviation.is_zero() {
                warnings.push(format!(
                    "Base case ends at zero cash; cannot compute deviation_pct for scenario '{}'",
                    scenario.name
                ));
            }
            Decimal::ZERO
        } else {
            deviation.to_major() / base_value
        };

        weighted_cash += scenario.probability * summary.ending_cash.to_major();
        weighted_runway += scenario.probability * Decimal::from(runway_months as u64);

        results.push(ScenarioResult {
            name: scenario.name.clone(),
            probability: scenario.probability,
            runway_months,
            ending_cash: summary.ending_cash,
            lowest_cash: summary.lowest_cash,
            deviation_from_base: deviation,
            deviation_pct,
        });
    }

    let output = ScenarioOutput {
        base_runway_months: base_summary.runway_months,
        base_ending_cash: base_summary.ending_cash,
        results,
        probability_weighted_ending_cash: Money::from_major(weighted_cash, model.currency.clone())?,
        probability_weighted_runway: weighted_runway,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Probability-weighted runway scenarios",
        &serde_json::json!({
            "model": model.name,
            "months": months,
            "num_scenarios": input.scenarios.len(),
            "start_month": input.start_month,
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
    use crate::period::{Frequency, Period};
    use serde_json::json;

    fn php(major: i64) -> Money {
        Money::of(major * 100, "PHP").unwrap()
    }

    fn model() -> RunwayModel {
        let period = Period::parse("2024-01", "2024-12").unwrap();
        let mut model = RunwayModel::new("Studio", php(10_000), period);
        model
            .expenses
            .add(Expense::recurring("rent", "Rent", php(1_000), Frequency::Monthly, &period).unwrap())
            .unwrap();
        model
    }

    fn bear_base_bull() -> ScenarioInput {
        ScenarioInput {
            scenarios: vec![
                Scenario {
                    name: "Bear".into(),
                    probability: dec!(0.25),
                    overrides: vec![ScenarioOverride::new("expenses.rent.amount", json!(1500))],
                },
                Scenario {
                    name: "Base".into(),
                    probability: dec!(0.50),
                    overrides: vec![],
                },
                Scenario {
                    name: "Bull".into(),
                    probability: dec!(0.25),
                    overrides: vec![ScenarioOverride::new("starting_cash", json!(14000))],
                },
            ],
            start_month: None,
        }
    }

    #[test]
    fn test_simulate_leaves_model_untouched() {
        let m = model();
        let before = m.clone();
        let cfs = simulate_scenario(
            &m,
            &[ScenarioOverride::new("expenses.rent.amount", json!(2000))],
            6,
        )
        .unwrap();
        assert_eq!(cfs[0].cash_out(), &php(2_000));
        assert_eq!(m, before);
    }

    #[test]
    fn test_unknown_entity_fails() {
        let err = simulate_scenario(
            &model(),
            &[ScenarioOverride::new("expenses.payroll.amount", json!(1))],
            6,
        )
        .unwrap_err();
        assert!(matches!(err, RunwayError::EntityNotFound { .. }));
    }

    #[test]
    fn test_weighted_scenarios() {
        let out = analyze_scenarios(&model(), &bear_base_bull(), 6).unwrap();
        let r = &out.result;
        assert_eq!(r.base_ending_cash, php(4_000));
        assert_eq!(r.results[0].ending_cash, php(1_000));
        assert_eq!(r.results[0].deviation_from_base, php(-3_000));
        assert_eq!(r.results[2].ending_cash, php(8_000));
        assert_eq!(r.results[2].deviation_pct, dec!(1));
        // 0.25 * 1000 + 0.5 * 4000 + 0.25 * 8000
        assert_eq!(r.probability_weighted_ending_cash, php(4_250));
        assert_eq!(r.probability_weighted_runway, dec!(6));
    }

    #[test]
    fn test_probabilities_must_sum_to_one() {
        let mut input = bear_base_bull();
        input.scenarios[0].probability = dec!(0.5);
        assert!(analyze_scenarios(&model(), &input, 6).is_err());
    }

    #[test]
    fn test_negative_probability_error() {
        let mut input = bear_base_bull();
        input.scenarios[0].probability = dec!(-0.25);
        input.scenarios[1].probability = dec!(1.0);
        assert!(analyze_scenarios(&model(), &input, 6).is_err());
    }

    #[test]
    fn test_empty_scenarios() {
        let input = ScenarioInput {
            scenarios: vec![],
            start_month: None,
        };
        assert!(analyze_scenarios(&model(), &input, 6).is_err());
    }

    #[test]
    fn test_start_month_applies_to_base_and_scenarios() {
        // Rent only starts in April
        let period = Period::parse("2024-01", "2024-12").unwrap();
        let mut m = RunwayModel::new("Late", php(10_000), period);
        m.expenses
            .add(
                Expense::recurring("rent", "Rent", php(1_000), Frequency::Monthly, &period)
                    .unwrap()
                    .with_bounds(Some("2024-04".parse().unwrap()), None, &period)
                    .unwrap(),
            )
            .unwrap();

        let start = Some("2024-04".parse().unwrap());
        let cfs = simulate_scenario_with(&m, &[], 3, start, &ProjectionOptions::default()).unwrap();
        assert_eq!(cfs, generate_monthly_cashflow(&m, 3, start, true).unwrap());
        assert_eq!(cfs[2].ending_cash(), &php(7_000));

        let mut input = bear_base_bull();
        input.start_month = start;
        input.scenarios[0].overrides.clear();
        input.scenarios[2].overrides.clear();
        let out = analyze_scenarios(&m, &input, 3).unwrap();
        assert_eq!(out.result.base_ending_cash, php(7_000));
        assert!(out
            .result
            .results
            .iter()
            .all(|r| r.deviation_from_base.is_zero()));
    }
}
