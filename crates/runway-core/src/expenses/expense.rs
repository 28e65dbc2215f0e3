use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RunwayError;
use crate::money::Money;
use crate::period::{Frequency, Period, YearMonth};
use crate::RunwayResult;

/// Discriminant of [`ExpenseKind`], used for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    OneTime,
    Recurring,
    Capital,
}

/// Schedule rule of an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpenseKind {
    /// Full amount in exactly one month.
    OneTime { month: YearMonth },
    /// Amount on every tick of `schedule`, generated from the owning period
    /// narrowed by `starts`/`ends`.
    Recurring {
        frequency: Frequency,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        starts: Option<YearMonth>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ends: Option<YearMonth>,
        #[serde(default)]
        schedule: Vec<YearMonth>,
    },
    /// Cash out at purchase, straight-line depreciation from the purchase
    /// month down to `residual_value`.
    Capital {
        purchase_month: YearMonth,
        depreciation_months: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        residual_value: Option<Money>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub name: String,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub tax_deductible: bool,
    #[serde(flatten)]
    pub kind: ExpenseKind,
}

fn default_true() -> bool {
    true
}

impl Expense {
    pub fn one_time(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        month: YearMonth,
    ) -> RunwayResult<Self> {
        let expense = Expense {
            id: id.into(),
            name: name.into(),
            amount,
            category: None,
            tax_deductible: true,
            kind: ExpenseKind::OneTime { month },
        };
        expense.validate()?;
        Ok(expense)
    }

    /// A recurring expense with its schedule generated against `period`.
    pub fn recurring(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        frequency: Frequency,
        period: &Period,
    ) -> RunwayResult<Self> {
        let mut expense = Expense {
            id: id.into(),
            name: name.into(),
            amount,
            category: None,
            tax_deductible: true,
            kind: ExpenseKind::Recurring {
                frequency,
                starts: None,
                ends: None,
                schedule: Vec::new(),
            },
        };
        expense.validate()?;
        expense.regenerate_schedule(period);
        Ok(expense)
    }

    pub fn capital(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        purchase_month: YearMonth,
        depreciation_months: u32,
        residual_value: Option<Money>,
    ) -> RunwayResult<Self> {
        let expense = Expense {
            id: id.into(),
            name: name.into(),
            amount,
            category: None,
            tax_deductible: true,
            kind: ExpenseKind::Capital {
                purchase_month,
                depreciation_months,
                residual_value,
            },
        };
        expense.validate()?;
        Ok(expense)
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tax_deductible(mut self, deductible: bool) -> Self {
        self.tax_deductible = deductible;
        self
    }

    /// Bound a recurring expense to `[starts, ends]` within the period.
    /// No effect on other kinds.
    pub fn with_bounds(
        mut self,
        bounds_start: Option<YearMonth>,
        bounds_end: Option<YearMonth>,
        period: &Period,
    ) -> RunwayResult<Self> {
        if let ExpenseKind::Recurring { starts, ends, .. } = &mut self.kind {
            if let (Some(s), Some(e)) = (bounds_start, bounds_end) {
                crate::period::validate_range(s, e)?;
            }
            *starts = bounds_start;
            *ends = bounds_end;
        }
        self.regenerate_schedule(period);
        Ok(self)
    }

    pub fn validate(&self) -> RunwayResult<()> {
        if self.id.trim().is_empty() {
            return Err(RunwayError::invalid("id", "Expense id must not be empty"));
        }
        if self.amount.is_negative() {
            return Err(RunwayError::invalid(
                "amount",
                format!("Expense '{}' amount must be >= 0", self.id),
            ));
        }
        match &self.kind {
            ExpenseKind::OneTime { .. } => {}
            ExpenseKind::Recurring { starts, ends, .. } => {
                if let (Some(s), Some(e)) = (starts, ends) {
                    crate::period::validate_range(*s, *e)?;
                }
            }
            ExpenseKind::Capital {
                depreciation_months,
                residual_value,
                ..
            } => {
                if *depreciation_months == 0 {
                    return Err(RunwayError::invalid(
                        "depreciation_months",
                        format!("Capital expense '{}' needs depreciation_months > 0", self.id),
                    ));
                }
                if let Some(residual) = residual_value {
                    residual.ensure_currency(self.amount.currency())?;
                    if residual.is_negative() || residual.greater_than(&self.amount)? {
                        return Err(RunwayError::invalid(
                            "residual_value",
                            format!("Residual of '{}' must lie between 0 and cost", self.id),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn expense_type(&self) -> ExpenseType {
        match self.kind {
            ExpenseKind::OneTime { .. } => ExpenseType::OneTime,
            ExpenseKind::Recurring { .. } => ExpenseType::Recurring,
            ExpenseKind::Capital { .. } => ExpenseType::Capital,
        }
    }

    /// The single month a one-time or capital expense lands in.
    pub fn effective_month(&self) -> Option<YearMonth> {
        match &self.kind {
            ExpenseKind::OneTime { month } => Some(*month),
            ExpenseKind::Capital { purchase_month, .. } => Some(*purchase_month),
            ExpenseKind::Recurring { .. } => None,
        }
    }

    pub fn schedule(&self) -> Option<&[YearMonth]> {
        match &self.kind {
            ExpenseKind::Recurring { schedule, .. } => Some(schedule),
            _ => None,
        }
    }

    /// Rebuild the tick schedule of a recurring expense against `period`.
    /// Identity and amount are untouched.
    pub fn regenerate_schedule(&mut self, period: &Period) {
        if let ExpenseKind::Recurring {
            frequency,
            starts,
            ends,
            schedule,
        } = &mut self.kind
        {
            *schedule = period
                .clamp_to(*starts, *ends)
                .map(|effective| frequency.ticks(&effective))
                .unwrap_or_default();
        }
    }

    pub fn cash_out_for_month(&self, month: YearMonth) -> Money {
        let fires = match &self.kind {
            ExpenseKind::OneTime { month: m } => *m == month,
            ExpenseKind::Recurring { schedule, .. } => schedule.contains(&month),
            ExpenseKind::Capital { purchase_month, .. } => *purchase_month == month,
        };
        if fires {
            self.amount.clone()
        } else {
            Money::zero(self.amount.currency().clone())
        }
    }

    /// Expense recognized in `month`: equals cash out except for capital
    /// items, which recognize depreciation instead.
    pub fn expense_for_month(&self, month: YearMonth) -> RunwayResult<Money> {
        match self.kind {
            ExpenseKind::Capital { .. } => self.depreciation_for_month(month),
            _ => Ok(self.cash_out_for_month(month)),
        }
    }

    /// Straight-line charge for `month`. The final month absorbs rounding so
    /// the total equals cost minus residual.
    pub fn depreciation_for_month(&self, month: YearMonth) -> RunwayResult<Money> {
        let zero = Money::zero(self.amount.currency().clone());
        let ExpenseKind::Capital {
            purchase_month,
            depreciation_months,
            ..
        } = &self.kind
        else {
            return Ok(zero);
        };
        let elapsed = purchase_month.months_until(month);
        if elapsed < 0 || elapsed >= *depreciation_months as i32 {
            return Ok(zero);
        }
        let before = self.accumulated_depreciation(elapsed as u32)?;
        let through = self.accumulated_depreciation(elapsed as u32 + 1)?;
        through.subtract(&before)
    }

    /// Cost minus depreciation through `month` inclusive, floored at the
    /// residual. Zero before purchase and for non-capital items.
    pub fn net_book_value_up_to(&self, month: YearMonth) -> RunwayResult<Money> {
        let ExpenseKind::Capital { purchase_month, .. } = &self.kind else {
            return Ok(Money::zero(self.amount.currency().clone()));
        };
        let elapsed = purchase_month.months_until(month);
        if elapsed < 0 {
            return Ok(Money::zero(self.amount.currency().clone()));
        }
        let accumulated = self.accumulated_depreciation(elapsed as u32 + 1)?;
        let nbv = self.amount.subtract(&accumulated)?;
        nbv.max(&self.residual())
    }

    /// Depreciation recognized from purchase through `month` inclusive.
    pub fn accumulated_depreciation_up_to(&self, month: YearMonth) -> RunwayResult<Money> {
        let ExpenseKind::Capital { purchase_month, .. } = &self.kind else {
            return Ok(Money::zero(self.amount.currency().clone()));
        };
        let elapsed = purchase_month.months_until(month);
        if elapsed < 0 {
            return Ok(Money::zero(self.amount.currency().clone()));
        }
        self.accumulated_depreciation(elapsed as u32 + 1)
    }

    /// Cash out over every month of `period`.
    pub fn total_over(&self, period: &Period) -> RunwayResult<Money> {
        let total = match &self.kind {
            ExpenseKind::Recurring { schedule, .. } => {
                let ticks = schedule.iter().filter(|m| period.contains(**m)).count();
                self.amount.multiply(Decimal::from(ticks as u64))?
            }
            _ => match self.effective_month() {
                Some(m) if period.contains(m) => self.amount.clone(),
                _ => Money::zero(self.amount.currency().clone()),
            },
        };
        Ok(total)
    }

    fn residual(&self) -> Money {
        match &self.kind {
            ExpenseKind::Capital {
                residual_value: Some(residual),
                ..
            } => residual.clone(),
            _ => Money::zero(self.amount.currency().clone()),
        }
    }

    /// Depreciation over the first `months_elapsed` months of the asset's life:
    /// `depreciable * k / n` rounded once, so consecutive values never decrease
    /// and the last one lands exactly on `depreciable`.
    fn accumulated_depreciation(&self, months_elapsed: u32) -> RunwayResult<Money> {
        let ExpenseKind::Capital {
            depreciation_months,
            ..
        } = &self.kind
        else {
            return Ok(Money::zero(self.amount.currency().clone()));
        };
        let depreciable = self.amount.subtract(&self.residual())?;
        if months_elapsed >= *depreciation_months {
            return Ok(depreciable);
        }
        depreciable
            .multiply(Decimal::from(months_elapsed))?
            .divide(Decimal::from(*depreciation_months))
    }
}
