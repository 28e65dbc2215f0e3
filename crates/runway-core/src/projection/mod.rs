//! The projection pipeline: a [`RunwayModel`] goes in, an ordered
//! [`Cashflow`] sequence comes out, and the statement folds read both.

pub mod cashflow;
pub mod engine;
pub mod model;
pub mod report;
pub mod statements;
pub mod tax;

pub use cashflow::{verify_chain, Cashflow, TaxBreakdown};
pub use engine::{
    calculate_runway, generate_monthly_cashflow, generate_monthly_cashflow_with, project_funding,
    summarize_projection, ProjectionSummary,
};
pub use model::{LossTreatment, ProjectionOptions, RunwayModel, TaxConfig, VatMode};
pub use report::{run_projection, ProjectionReport, ProjectionRequest};
pub use statements::{
    generate_balance_snapshot, get_ebitda_across_period, get_net_income_across_period,
    get_taxes_for_month, get_total_taxes_across_period, period_totals, BalanceSnapshot,
    PeriodTotals,
};
pub use tax::calculate_taxes;
