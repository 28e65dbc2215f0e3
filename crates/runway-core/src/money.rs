//! Currency-aware monetary values held as integer minor units.
//!
//! Every operation that can land between two minor units (`multiply`,
//! `divide`, `apply_percentage`, `from_major`) rounds immediately with
//! [`ROUNDING`], half away from zero. Results are never carried at a finer
//! precision than the currency allows.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::RunwayError;
use crate::types::Rate;
use crate::RunwayResult;

/// Rounding applied at the minor-unit boundary after every operation.
pub const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// ISO 4217 currency code, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    fn normalized(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    pub fn parse(code: &str) -> RunwayResult<Self> {
        let candidate = Self::normalized(code);
        if candidate.0.len() != 3 || !candidate.0.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RunwayError::invalid(
                "currency",
                format!("'{code}' is not a three-letter currency code"),
            ));
        }
        Ok(candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places in one major unit.
    pub fn precision(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 0,
            "KWD" | "BHD" | "OMR" | "JOD" | "TND" => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = RunwayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = RunwayError;

    fn try_from(code: &str) -> Result<Self, Self::Error> {
        Self::parse(code)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RunwayError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::parse(&code)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// An immutable amount of one currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MoneyRepr", into = "MoneyRepr")]
pub struct Money {
    minor_units: i64,
    currency: CurrencyCode,
}

/// Wire form: `{"amount": 100000, "currency": "PHP", "precision": 2}`.
#[derive(Serialize, Deserialize)]
struct MoneyRepr {
    amount: i64,
    currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    precision: Option<u32>,
}

impl TryFrom<MoneyRepr> for Money {
    type Error = RunwayError;

    fn try_from(repr: MoneyRepr) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::parse(&repr.currency)?;
        if let Some(precision) = repr.precision {
            if precision != currency.precision() {
                return Err(RunwayError::invalid(
                    "precision",
                    format!(
                        "{} uses {} decimal places, got {}",
                        currency,
                        currency.precision(),
                        precision
                    ),
                ));
            }
        }
        Ok(Money {
            minor_units: repr.amount,
            currency,
        })
    }
}

impl From<Money> for MoneyRepr {
    fn from(money: Money) -> Self {
        let precision = money.currency.precision();
        MoneyRepr {
            amount: money.minor_units,
            currency: money.currency.0,
            precision: Some(precision),
        }
    }
}

impl Money {
    pub fn new(minor_units: i64, currency: CurrencyCode) -> Self {
        Money {
            minor_units,
            currency,
        }
    }

    /// Like [`Money::new`] for a currency code given as text.
    pub fn of(minor_units: i64, code: &str) -> RunwayResult<Self> {
        Ok(Self::new(minor_units, CurrencyCode::parse(code)?))
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(0, currency)
    }

    /// Build from a major-unit decimal (e.g. `1000.50` PHP), rounding to the
    /// currency's minor unit.
    pub fn from_major(major: Decimal, currency: CurrencyCode) -> RunwayResult<Self> {
        let scale = Decimal::from(10i64.pow(currency.precision()));
        let scaled = major
            .checked_mul(scale)
            .ok_or_else(|| RunwayError::invalid("amount", "value out of range"))?;
        Ok(Money {
            minor_units: to_minor(scaled)?,
            currency,
        })
    }

    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.minor_units, self.currency.precision())
    }

    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    pub fn is_negative(&self) -> bool {
        self.minor_units < 0
    }

    pub fn negate(&self) -> RunwayResult<Money> {
        let units = self
            .minor_units
            .checked_neg()
            .ok_or_else(|| RunwayError::invalid("amount", "negation overflow"))?;
        Ok(self.with_units(units))
    }

    pub fn abs(&self) -> RunwayResult<Money> {
        let units = self
            .minor_units
            .checked_abs()
            .ok_or_else(|| RunwayError::invalid("amount", "negation overflow"))?;
        Ok(self.with_units(units))
    }

    pub fn add(&self, other: &Money) -> RunwayResult<Money> {
        self.ensure_same_currency(other)?;
        let units = self
            .minor_units
            .checked_add(other.minor_units)
            .ok_or_else(|| RunwayError::invalid("amount", "addition overflow"))?;
        Ok(self.with_units(units))
    }

    pub fn subtract(&self, other: &Money) -> RunwayResult<Money> {
        self.ensure_same_currency(other)?;
        let units = self
            .minor_units
            .checked_sub(other.minor_units)
            .ok_or_else(|| RunwayError::invalid("amount", "subtraction overflow"))?;
        Ok(self.with_units(units))
    }

    pub fn multiply(&self, factor: Decimal) -> RunwayResult<Money> {
        let product = Decimal::from(self.minor_units)
            .checked_mul(factor)
            .ok_or_else(|| RunwayError::invalid("amount", "multiplication overflow"))?;
        Ok(self.with_units(to_minor(product)?))
    }

    pub fn divide(&self, divisor: Decimal) -> RunwayResult<Money> {
        if divisor.is_zero() {
            return Err(RunwayError::DivisionByZero {
                context: format!("dividing {self}"),
            });
        }
        let quotient = Decimal::from(self.minor_units)
            .checked_div(divisor)
            .ok_or_else(|| RunwayError::invalid("amount", "division overflow"))?;
        Ok(self.with_units(to_minor(quotient)?))
    }

    /// `rate` is a fraction: 0.12 applies twelve percent.
    pub fn apply_percentage(&self, rate: Rate) -> RunwayResult<Money> {
        self.multiply(rate)
    }

    pub fn compare(&self, other: &Money) -> RunwayResult<Ordering> {
        self.ensure_same_currency(other)?;
        Ok(self.minor_units.cmp(&other.minor_units))
    }

    pub fn equals_to(&self, other: &Money) -> RunwayResult<bool> {
        Ok(self.compare(other)? == Ordering::Equal)
    }

    pub fn less_than(&self, other: &Money) -> RunwayResult<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    pub fn less_than_or_equal(&self, other: &Money) -> RunwayResult<bool> {
        Ok(self.compare(other)? != Ordering::Greater)
    }

    pub fn greater_than(&self, other: &Money) -> RunwayResult<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    pub fn greater_than_or_equal(&self, other: &Money) -> RunwayResult<bool> {
        Ok(self.compare(other)? != Ordering::Less)
    }

    pub fn min(&self, other: &Money) -> RunwayResult<Money> {
        Ok(if self.less_than_or_equal(other)? {
            self.clone()
        } else {
            other.clone()
        })
    }

    pub fn max(&self, other: &Money) -> RunwayResult<Money> {
        Ok(if self.greater_than_or_equal(other)? {
            self.clone()
        } else {
            other.clone()
        })
    }

    /// Fold a sequence of amounts that must all be in `currency`.
    pub fn sum<'a, I>(items: I, currency: &CurrencyCode) -> RunwayResult<Money>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        items
            .into_iter()
            .try_fold(Money::zero(currency.clone()), |acc, m| acc.add(m))
    }

    pub fn ensure_currency(&self, currency: &CurrencyCode) -> RunwayResult<()> {
        if &self.currency != currency {
            return Err(RunwayError::CurrencyMismatch {
                expected: currency.to_string(),
                found: self.currency.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_same_currency(&self, other: &Money) -> RunwayResult<()> {
        other.ensure_currency(&self.currency)
    }

    fn with_units(&self, minor_units: i64) -> Money {
        Money {
            minor_units,
            currency: self.currency.clone(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency, self.to_major())
    }
}

fn to_minor(value: Decimal) -> RunwayResult<i64> {
    value
        .round_dp_with_strategy(0, ROUNDING)
        .to_i64()
        .ok_or_else(|| RunwayError::invalid("amount", "value exceeds the minor-unit range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn php(major: i64) -> Money {
        Money::of(major * 100, "PHP").unwrap()
    }

    #[test]
    fn test_add_and_subtract() {
        let a = php(1_000);
        let b = php(250);
        assert_eq!(a.add(&b).unwrap(), php(1_250));
        assert_eq!(a.subtract(&b).unwrap(), php(750));
        assert!(b.subtract(&a).unwrap().is_negative());
    }

    #[test]
    fn test_currency_mismatch() {
        let a = php(10);
        let b = Money::of(1_000, "USD").unwrap();
        assert!(matches!(
            a.add(&b),
            Err(RunwayError::CurrencyMismatch { .. })
        ));
        assert!(a.less_than(&b).is_err());
    }

    #[test]
    fn test_percentage_rounds_half_away_from_zero() {
        // 0.05 * 10 minor units = 0.5 -> 1
        let m = Money::of(10, "PHP").unwrap();
        assert_eq!(m.apply_percentage(dec!(0.05)).unwrap().minor_units(), 1);
        assert_eq!(m.negate().unwrap().apply_percentage(dec!(0.05)).unwrap().minor_units(), -1);
    }

    #[test]
    fn test_divide() {
        let m = php(100);
        assert_eq!(m.divide(dec!(3)).unwrap().minor_units(), 3_333);
        assert!(matches!(
            m.divide(Decimal::ZERO),
            Err(RunwayError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_major_conversion() {
        let m = Money::from_major(dec!(1234.565), "PHP".parse().unwrap()).unwrap();
        assert_eq!(m.minor_units(), 123_457);
        assert_eq!(m.to_major(), dec!(1234.57));

        let yen = Money::from_major(dec!(1500.4), "JPY".parse().unwrap()).unwrap();
        assert_eq!(yen.minor_units(), 1_500);
        assert_eq!(yen.to_major(), dec!(1500));
    }

    #[test]
    fn test_comparisons() {
        let a = php(5);
        let b = php(7);
        assert!(a.less_than(&b).unwrap());
        assert!(a.less_than_or_equal(&a).unwrap());
        assert!(b.greater_than(&a).unwrap());
        assert!(b.greater_than_or_equal(&b).unwrap());
        assert!(a.equals_to(&php(5)).unwrap());
        assert_eq!(a.max(&b).unwrap(), b);
    }

    #[test]
    fn test_json_round_trip() {
        let m = Money::of(-123_456, "php").unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"amount":-123456,"currency":"PHP","precision":2}"#);
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_json_rejects_bad_currency_and_precision() {
        assert!(serde_json::from_str::<Money>(r#"{"amount":1,"currency":"P1"}"#).is_err());
        assert!(
            serde_json::from_str::<Money>(r#"{"amount":1,"currency":"JPY","precision":2}"#)
                .is_err()
        );
    }

    #[test]
    fn test_sum() {
        let items = vec![php(1), php(2), php(3)];
        let total = Money::sum(&items, &CurrencyCode::parse("PHP").unwrap()).unwrap();
        assert_eq!(total, php(6));
    }

    #[test]
    fn test_constructors_validate_currency_code() {
        assert!(Money::of(1, "P1").is_err());
        assert!("PH".parse::<CurrencyCode>().is_err());
        assert!(CurrencyCode::try_from("usd ").is_ok());
        // Anything built in code survives its own JSON
        let m = Money::of(5, "usd").unwrap();
        let back: Money = serde_json::from_str(&serde_json::to_string(&m).unwrap()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_negate_and_abs_overflow() {
        let min = Money::of(i64::MIN, "PHP").unwrap();
        assert!(matches!(min.negate(), Err(RunwayError::InvalidInput { .. })));
        assert!(min.abs().is_err());
        assert_eq!(php(-3).abs().unwrap(), php(3));
        assert_eq!(php(3).negate().unwrap(), php(-3));
    }
}
