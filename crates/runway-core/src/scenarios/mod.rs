pub mod lens;
pub mod scenario;

pub use lens::{
    compile_overrides, ExpenseField, FieldPath, FundingField, Lens, Patch, RevenueField,
    ScenarioOverride, TaxField,
};
pub use scenario::{
    analyze_scenarios, apply_overrides, simulate_scenario, simulate_scenario_with, Scenario,
    ScenarioInput, ScenarioOutput, ScenarioResult,
};
