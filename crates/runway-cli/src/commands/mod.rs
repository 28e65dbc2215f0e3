pub mod projection;
pub mod scenarios;

use clap::Args;
use runway_core::period::YearMonth;
use runway_core::projection::{generate_monthly_cashflow, Cashflow, RunwayModel};

use crate::input;

/// Arguments shared by every command that projects a model
#[derive(Args)]
pub struct ModelArgs {
    /// Path to a JSON runway model (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Number of months to project
    #[arg(long, default_value_t = 12)]
    pub months: u32,

    /// First projected month (YYYY-MM); defaults to the expense period start
    #[arg(long)]
    pub start: Option<YearMonth>,
}

impl ModelArgs {
    pub fn load_model(&self) -> Result<RunwayModel, Box<dyn std::error::Error>> {
        let model: RunwayModel = input::read_input(self.input.as_deref())?;
        model.validate()?;
        tracing::debug!(model = %model.name, months = self.months, "model loaded");
        Ok(model)
    }

    pub fn project(
        &self,
        model: &RunwayModel,
        include_taxes: bool,
    ) -> Result<Vec<Cashflow>, Box<dyn std::error::Error>> {
        Ok(generate_monthly_cashflow(model, self.months, self.start, include_taxes)?)
    }
}
