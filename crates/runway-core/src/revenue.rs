//! Revenue streams feeding the cash-in side of a projection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RunwayError;
use crate::money::{CurrencyCode, Money};
use crate::period::{Frequency, Period, YearMonth};
use crate::types::Rate;
use crate::RunwayResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RevenueSchedule {
    OneTime {
        month: YearMonth,
    },
    /// Ticks every `frequency` step from `starts`; the i-th tick (0-based)
    /// receives `amount * (1 + growth_rate)^i`.
    Recurring {
        frequency: Frequency,
        starts: YearMonth,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ends: Option<YearMonth>,
        #[serde(default)]
        growth_rate: Rate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueStream {
    pub id: String,
    pub name: String,
    pub amount: Money,
    #[serde(flatten)]
    pub schedule: RevenueSchedule,
}

impl RevenueStream {
    pub fn one_time(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        month: YearMonth,
    ) -> RunwayResult<Self> {
        let stream = RevenueStream {
            id: id.into(),
            name: name.into(),
            amount,
            schedule: RevenueSchedule::OneTime { month },
        };
        stream.validate()?;
        Ok(stream)
    }

    pub fn recurring(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: Money,
        frequency: Frequency,
        starts: YearMonth,
    ) -> RunwayResult<Self> {
        let stream = RevenueStream {
            id: id.into(),
            name: name.into(),
            amount,
            schedule: RevenueSchedule::Recurring {
                frequency,
                starts,
                ends: None,
                growth_rate: Decimal::ZERO,
            },
        };
        stream.validate()?;
        Ok(stream)
    }

    pub fn ending(mut self, month: YearMonth) -> RunwayResult<Self> {
        if let RevenueSchedule::Recurring { ends, .. } = &mut self.schedule {
            *ends = Some(month);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn with_growth(mut self, rate: Rate) -> RunwayResult<Self> {
        if let RevenueSchedule::Recurring { growth_rate, .. } = &mut self.schedule {
            *growth_rate = rate;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> RunwayResult<()> {
        if self.id.trim().is_empty() {
            return Err(RunwayError::invalid("id", "Revenue id must not be empty"));
        }
        if self.amount.is_negative() {
            return Err(RunwayError::invalid(
                "amount",
                format!("Revenue '{}' amount must be >= 0", self.id),
            ));
        }
        if let RevenueSchedule::Recurring {
            starts,
            ends,
            growth_rate,
            ..
        } = &self.schedule
        {
            if let Some(end) = ends {
                crate::period::validate_range(*starts, *end)?;
            }
            if *growth_rate <= -Decimal::ONE {
                return Err(RunwayError::invalid(
                    "growth_rate",
                    format!("Growth of '{}' must be greater than -100%", self.id),
                ));
            }
        }
        Ok(())
    }

    /// 0-based tick number of `month`, if the stream pays then.
    pub fn tick_index(&self, month: YearMonth) -> Option<u32> {
        match &self.schedule {
            RevenueSchedule::OneTime { month: m } => (*m == month).then_some(0),
            RevenueSchedule::Recurring {
                frequency,
                starts,
                ends,
                ..
            } => {
                if month < *starts || ends.is_some_and(|e| month > e) {
                    return None;
                }
                let elapsed = starts.months_until(month);
                let step = frequency.step_months();
                (elapsed % step == 0).then(|| (elapsed / step) as u32)
            }
        }
    }

    pub fn revenue_for_month(&self, month: YearMonth) -> RunwayResult<Money> {
        let Some(tick) = self.tick_index(month) else {
            return Ok(Money::zero(self.amount.currency().clone()));
        };
        match &self.schedule {
            RevenueSchedule::Recurring { growth_rate, .. } if !growth_rate.is_zero() => {
                self.amount.multiply(compound(*growth_rate, tick)?)
            }
            _ => Ok(self.amount.clone()),
        }
    }

    pub fn total_over(&self, period: &Period) -> RunwayResult<Money> {
        period
            .months()
            .into_iter()
            .try_fold(Money::zero(self.amount.currency().clone()), |acc, m| {
                acc.add(&self.revenue_for_month(m)?)
            })
    }
}

/// Revenue of every stream in `month`.
pub fn revenue_for_month(
    streams: &[RevenueStream],
    month: YearMonth,
    currency: &CurrencyCode,
) -> RunwayResult<Money> {
    streams
        .iter()
        .try_fold(Money::zero(currency.clone()), |acc, s| {
            acc.add(&s.revenue_for_month(month)?)
        })
}

/// (1 + r)^n by repeated multiplication.
fn compound(rate: Rate, n: u32) -> RunwayResult<Decimal> {
    let factor = Decimal::ONE + rate;
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = result
            .checked_mul(factor)
            .ok_or_else(|| RunwayError::invalid("growth_rate", "compounded growth out of range"))?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn php(major: i64) -> Money {
        Money::of(major * 100, "PHP").unwrap()
    }

    #[test]
    fn test_one_time() {
        let s = RevenueStream::one_time("r", "Contract", php(5_000), ym("2024-03")).unwrap();
        assert_eq!(s.revenue_for_month(ym("2024-03")).unwrap(), php(5_000));
        assert!(s.revenue_for_month(ym("2024-04")).unwrap().is_zero());
    }

    #[test]
    fn test_quarterly_ticks_and_end() {
        let s = RevenueStream::recurring("r", "Retainer", php(900), Frequency::Quarterly, ym("2024-01"))
            .unwrap()
            .ending(ym("2024-09"))
            .unwrap();
        assert_eq!(s.tick_index(ym("2024-04")), Some(1));
        assert_eq!(s.tick_index(ym("2024-05")), None);
        assert_eq!(s.tick_index(ym("2024-10")), None);
        assert_eq!(
            s.total_over(&Period::parse("2024-01", "2024-12").unwrap()).unwrap(),
            php(2_700)
        );
    }

    #[test]
    fn test_growth_compounds_per_tick() {
        let s = RevenueStream::recurring("r", "Subscriptions", php(1_000), Frequency::Monthly, ym("2024-01"))
            .unwrap()
            .with_growth(dec!(0.10))
            .unwrap();
        assert_eq!(s.revenue_for_month(ym("2024-01")).unwrap(), php(1_000));
        assert_eq!(s.revenue_for_month(ym("2024-02")).unwrap(), php(1_100));
        assert_eq!(s.revenue_for_month(ym("2024-03")).unwrap(), php(1_210));
        // 1000 * 1.1^3 = 1331
        assert_eq!(s.revenue_for_month(ym("2024-04")).unwrap(), php(1_331));
    }

    #[test]
    fn test_rejects_total_decline() {
        let s = RevenueStream::recurring("r", "x", php(1), Frequency::Monthly, ym("2024-01")).unwrap();
        assert!(s.with_growth(dec!(-1)).is_err());
    }

    #[test]
    fn test_json_shape() {
        let s = RevenueStream::recurring("r", "Retainer", php(10), Frequency::Monthly, ym("2024-01")).unwrap();
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["type"], "recurring");
        assert_eq!(v["starts"], "2024-01");
        let back: RevenueStream = serde_json::from_value(v).unwrap();
        assert_eq!(back, s);
    }
}
