//! Typed setters behind dotted override paths.
//!
//! Callers send `{"field": "expenses.rent.amount", "value": 1500}`. The path
//! is parsed into a [`FieldPath`] and the value into a [`Patch`] of the shape
//! that field accepts, both before any model is touched. Applying a lens only
//! checks that the addressed entity exists.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RunwayError;
use crate::funding::FundingKind;
use crate::money::Money;
use crate::period::YearMonth;
use crate::projection::{LossTreatment, RunwayModel, VatMode};
use crate::revenue::RevenueSchedule;
use crate::types::Rate;
use crate::RunwayResult;

/// One override as exchanged with callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOverride {
    pub field: String,
    pub value: serde_json::Value,
}

impl ScenarioOverride {
    pub fn new(field: impl Into<String>, value: serde_json::Value) -> Self {
        ScenarioOverride {
            field: field.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxField {
    VatMode,
    VatRate,
    PercentageTaxRate,
    IncomeTaxRate,
    LossTreatment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseField {
    Amount,
    Name,
    TaxDeductible,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueField {
    Amount,
    GrowthRate,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingField {
    Amount,
    InterestRate,
    Month,
    Name,
}

/// An addressable leaf of a [`RunwayModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    StartingCash,
    Tax(TaxField),
    Expense { id: String, field: ExpenseField },
    Revenue { id: String, field: RevenueField },
    Funding { id: String, field: FundingField },
}

/// Shape of value a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Amount,
    Rate,
    Text,
    OptionalText,
    Flag,
    Month,
    VatMode,
    LossTreatment,
}

impl FieldPath {
    /// Parse `collection.<id>.field` or a top-level/tax path. Field segments
    /// may be camelCase; entity ids are taken verbatim and may contain dots.
    pub fn parse(raw: &str) -> RunwayResult<Self> {
        let bad = |reason: &str| RunwayError::InvalidFieldPath {
            path: raw.to_string(),
            reason: reason.to_string(),
        };
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(bad("empty path segment"));
        }
        let root = snake_case(segments[0]);
        match root.as_str() {
            "starting_cash" if segments.len() == 1 => Ok(FieldPath::StartingCash),
            "tax" if segments.len() == 2 => {
                let field = match snake_case(segments[1]).as_str() {
                    "vat_mode" => TaxField::VatMode,
                    "vat_rate" => TaxField::VatRate,
                    "percentage_tax_rate" => TaxField::PercentageTaxRate,
                    "income_tax_rate" => TaxField::IncomeTaxRate,
                    "loss_treatment" => TaxField::LossTreatment,
                    _ => return Err(bad("unknown tax field")),
                };
                Ok(FieldPath::Tax(field))
            }
            "expenses" | "revenue" | "funding" if segments.len() >= 3 => {
                let id = segments[1..segments.len() - 1].join(".");
                let leaf = snake_case(segments[segments.len() - 1]);
                match (root.as_str(), leaf.as_str()) {
                    ("expenses", "amount") => Ok(expense(id, ExpenseField::Amount)),
                    ("expenses", "name") => Ok(expense(id, ExpenseField::Name)),
                    ("expenses", "tax_deductible") => Ok(expense(id, ExpenseField::TaxDeductible)),
                    ("expenses", "category") => Ok(expense(id, ExpenseField::Category)),
                    ("revenue", "amount") => Ok(revenue(id, RevenueField::Amount)),
                    ("revenue", "growth_rate") => Ok(revenue(id, RevenueField::GrowthRate)),
                    ("revenue", "name") => Ok(revenue(id, RevenueField::Name)),
                    ("funding", "amount") => Ok(funding(id, FundingField::Amount)),
                    ("funding", "interest_rate") => Ok(funding(id, FundingField::InterestRate)),
                    ("funding", "month") => Ok(funding(id, FundingField::Month)),
                    ("funding", "name") => Ok(funding(id, FundingField::Name)),
                    _ => Err(bad("field cannot be overridden")),
                }
            }
            "starting_cash" | "tax" | "expenses" | "revenue" | "funding" => {
                Err(bad("wrong number of segments"))
            }
            _ => Err(bad("unknown root")),
        }
    }

    fn value_kind(&self) -> ValueKind {
        match self {
            FieldPath::StartingCash => ValueKind::Amount,
            FieldPath::Tax(TaxField::VatMode) => ValueKind::VatMode,
            FieldPath::Tax(TaxField::LossTreatment) => ValueKind::LossTreatment,
            FieldPath::Tax(_) => ValueKind::Rate,
            FieldPath::Expense { field, .. } => match field {
                ExpenseField::Amount => ValueKind::Amount,
                ExpenseField::Name => ValueKind::Text,
                ExpenseField::TaxDeductible => ValueKind::Flag,
                ExpenseField::Category => ValueKind::OptionalText,
            },
            FieldPath::Revenue { field, .. } => match field {
                RevenueField::Amount => ValueKind::Amount,
                RevenueField::GrowthRate => ValueKind::Rate,
                RevenueField::Name => ValueKind::Text,
            },
            FieldPath::Funding { field, .. } => match field {
                FundingField::Amount => ValueKind::Amount,
                FundingField::InterestRate => ValueKind::Rate,
                FundingField::Month => ValueKind::Month,
                FundingField::Name => ValueKind::Text,
            },
        }
    }
}

impl FromStr for FieldPath {
    type Err = RunwayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn expense(id: String, field: ExpenseField) -> FieldPath {
    FieldPath::Expense { id, field }
}

fn revenue(id: String, field: RevenueField) -> FieldPath {
    FieldPath::Revenue { id, field }
}

fn funding(id: String, field: FundingField) -> FieldPath {
    FieldPath::Funding { id, field }
}

/// `vatRate` -> `vat_rate`; snake_case input passes through.
fn snake_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    for c in segment.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// A replacement value already checked against its field's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// `{"amount", "currency"}` object
    Money(Money),
    /// Bare number or numeric string, in major units of the model currency
    MajorUnits(Decimal),
    Rate(Rate),
    Text(String),
    OptionalText(Option<String>),
    Flag(bool),
    Month(YearMonth),
    VatMode(VatMode),
    LossTreatment(LossTreatment),
}

impl Patch {
    fn parse(path: &FieldPath, raw: &serde_json::Value, field: &str) -> RunwayResult<Self> {
        use serde_json::Value;

        let mismatch = |expected: &str| RunwayError::InvalidFieldPath {
            path: field.to_string(),
            reason: format!("expected {expected}, got {raw}"),
        };
        let patch = match path.value_kind() {
            ValueKind::Amount => match raw {
                Value::Object(_) => Patch::Money(
                    serde_json::from_value(raw.clone()).map_err(|_| mismatch("a money object"))?,
                ),
                _ => Patch::MajorUnits(decimal(raw).ok_or_else(|| mismatch("an amount"))?),
            },
            ValueKind::Rate => Patch::Rate(decimal(raw).ok_or_else(|| mismatch("a decimal rate"))?),
            ValueKind::Text => match raw {
                Value::String(s) if !s.trim().is_empty() => Patch::Text(s.clone()),
                _ => return Err(mismatch("a non-empty string")),
            },
            ValueKind::OptionalText => match raw {
                Value::Null => Patch::OptionalText(None),
                Value::String(s) => Patch::OptionalText(Some(s.clone())),
                _ => return Err(mismatch("a string or null")),
            },
            ValueKind::Flag => Patch::Flag(raw.as_bool().ok_or_else(|| mismatch("a boolean"))?),
            ValueKind::Month => match raw {
                Value::String(s) => Patch::Month(YearMonth::parse(s)?),
                _ => return Err(mismatch("a YYYY-MM string")),
            },
            ValueKind::VatMode => Patch::VatMode(
                serde_json::from_value(raw.clone()).map_err(|_| mismatch("\"vat\" or \"non_vat\""))?,
            ),
            ValueKind::LossTreatment => Patch::LossTreatment(
                serde_json::from_value(raw.clone())
                    .map_err(|_| mismatch("\"credit\" or \"floor\""))?,
            ),
        };
        Ok(patch)
    }

    fn into_money(self, model: &RunwayModel) -> RunwayResult<Money> {
        match self {
            Patch::Money(m) => {
                m.ensure_currency(&model.currency)?;
                Ok(m)
            }
            Patch::MajorUnits(major) => Money::from_major(major, model.currency.clone()),
            other => Err(unexpected(other)),
        }
    }
}

fn decimal(raw: &serde_json::Value) -> Option<Decimal> {
    let text = match raw {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn unexpected(patch: Patch) -> RunwayError {
    RunwayError::invalid("value", format!("{patch:?} does not fit this field"))
}

/// A parsed override: where to write and what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lens {
    pub path: FieldPath,
    pub patch: Patch,
}

impl TryFrom<&ScenarioOverride> for Lens {
    type Error = RunwayError;

    fn try_from(raw: &ScenarioOverride) -> Result<Self, Self::Error> {
        let path = FieldPath::parse(&raw.field)?;
        let patch = Patch::parse(&path, &raw.value, &raw.field)?;
        Ok(Lens { path, patch })
    }
}

impl Lens {
    /// Write the patch into `model`. Entity edits go through the owning
    /// collection's `update`, so its invariants and memo rules apply.
    pub fn apply(&self, model: &mut RunwayModel) -> RunwayResult<()> {
        let patch = self.patch.clone();
        match &self.path {
            FieldPath::StartingCash => {
                model.starting_cash = patch.into_money(model)?;
            }
            FieldPath::Tax(field) => {
                let tax = &mut model.tax;
                match (field, patch) {
                    (TaxField::VatMode, Patch::VatMode(mode)) => tax.vat_mode = mode,
                    (TaxField::LossTreatment, Patch::LossTreatment(t)) => tax.loss_treatment = t,
                    (TaxField::VatRate, Patch::Rate(r)) => tax.vat_rate = r,
                    (TaxField::PercentageTaxRate, Patch::Rate(r)) => tax.percentage_tax_rate = r,
                    (TaxField::IncomeTaxRate, Patch::Rate(r)) => tax.income_tax_rate = r,
                    (_, other) => return Err(unexpected(other)),
                }
                model.tax.validate()?;
            }
            FieldPath::Expense { id, field } => {
                let mut item = model
                    .expenses
                    .get(id)
                    .cloned()
                    .ok_or_else(|| RunwayError::not_found("Expense", id))?;
                match (field, patch) {
                    (ExpenseField::Amount, p) => item.amount = p.into_money(model)?,
                    (ExpenseField::Name, Patch::Text(s)) => item.name = s,
                    (ExpenseField::TaxDeductible, Patch::Flag(b)) => item.tax_deductible = b,
                    (ExpenseField::Category, Patch::OptionalText(c)) => item.category = c,
                    (_, other) => return Err(unexpected(other)),
                }
                model.expenses.update(item)?;
            }
            FieldPath::Revenue { id, field } => {
                let idx = model
                    .revenue
                    .iter()
                    .position(|s| &s.id == id)
                    .ok_or_else(|| RunwayError::not_found("RevenueStream", id))?;
                let mut stream = model.revenue[idx].clone();
                match (field, patch) {
                    (RevenueField::Amount, p) => stream.amount = p.into_money(model)?,
                    (RevenueField::Name, Patch::Text(s)) => stream.name = s,
                    (RevenueField::GrowthRate, Patch::Rate(r)) => match &mut stream.schedule {
                        RevenueSchedule::Recurring { growth_rate, .. } => *growth_rate = r,
                        RevenueSchedule::OneTime { .. } => {
                            return Err(RunwayError::invalid(
                                "growth_rate",
                                format!("Revenue '{id}' is one-time and has no growth rate"),
                            ))
                        }
                    },
                    (_, other) => return Err(unexpected(other)),
                }
                stream.validate()?;
                model.revenue[idx] = stream;
            }
            FieldPath::Funding { id, field } => {
                let mut event = model
                    .funding
                    .get(id)
                    .cloned()
                    .ok_or_else(|| RunwayError::not_found("FundingEvent", id))?;
                match (field, patch) {
                    (FundingField::Amount, p) => event.amount = p.into_money(model)?,
                    (FundingField::Name, Patch::Text(s)) => event.name = s,
                    (FundingField::Month, Patch::Month(m)) => event.month = m,
                    (FundingField::InterestRate, Patch::Rate(r)) => match &mut event.kind {
                        FundingKind::Debt(terms) => terms.interest_rate = r,
                        _ => {
                            return Err(RunwayError::invalid(
                                "interest_rate",
                                format!("Funding '{id}' is not debt"),
                            ))
                        }
                    },
                    (_, other) => return Err(unexpected(other)),
                }
                model.funding.update(event)?;
            }
        }
        Ok(())
    }
}

/// Parse every override up front; the first bad one fails the batch.
pub fn compile_overrides(overrides: &[ScenarioOverride]) -> RunwayResult<Vec<Lens>> {
    overrides.iter().map(Lens::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_parse_paths() {
        assert_eq!(FieldPath::parse("starting_cash").unwrap(), FieldPath::StartingCash);
        assert_eq!(FieldPath::parse("startingCash").unwrap(), FieldPath::StartingCash);
        assert_eq!(
            FieldPath::parse("tax.incomeTaxRate").unwrap(),
            FieldPath::Tax(TaxField::IncomeTaxRate)
        );
        assert_eq!(
            FieldPath::parse("expenses.office.rent.amount").unwrap(),
            FieldPath::Expense {
                id: "office.rent".into(),
                field: ExpenseField::Amount
            }
        );
        assert_eq!(
            FieldPath::parse("funding.loan-1.interestRate").unwrap(),
            FieldPath::Funding {
                id: "loan-1".into(),
                field: FundingField::InterestRate
            }
        );
    }

    #[test]
    fn test_invalid_paths() {
        for raw in ["", "tax", "tax.bogus", "expenses.rent", "expenses..amount", "model.name", "revenue.x.month"] {
            assert!(
                matches!(FieldPath::parse(raw), Err(RunwayError::InvalidFieldPath { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_patch_shapes() {
        let lens = Lens::try_from(&ScenarioOverride::new("tax.vat_rate", json!(0.1))).unwrap();
        assert_eq!(lens.patch, Patch::Rate(dec!(0.1)));

        let lens = Lens::try_from(&ScenarioOverride::new("starting_cash", json!("2500.50"))).unwrap();
        assert_eq!(lens.patch, Patch::MajorUnits(dec!(2500.50)));

        let lens = Lens::try_from(&ScenarioOverride::new(
            "expenses.rent.amount",
            json!({"amount": 150000, "currency": "PHP"}),
        ))
        .unwrap();
        assert_eq!(lens.patch, Patch::Money(Money::of(150_000, "PHP").unwrap()));

        assert!(Lens::try_from(&ScenarioOverride::new("tax.vat_mode", json!("sometimes"))).is_err());
        assert!(Lens::try_from(&ScenarioOverride::new("expenses.rent.tax_deductible", json!("yes"))).is_err());
        assert!(Lens::try_from(&ScenarioOverride::new("funding.seed.month", json!("2024-13"))).is_err());
    }
}
