//! Year-month keys and inclusive month ranges.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::RunwayError;
use crate::RunwayResult;

/// Canonical `YYYY-MM` month key. Field order makes the derived ordering
/// chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> RunwayResult<Self> {
        if !(1000..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(RunwayError::InvalidMonthFormat(format!("{year:04}-{month:02}")));
        }
        Ok(YearMonth { year, month })
    }

    pub fn parse(raw: &str) -> RunwayResult<Self> {
        let bad = || RunwayError::InvalidMonthFormat(raw.to_string());
        let bytes = raw.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(bad());
        }
        let (year_part, month_part) = (&raw[..4], &raw[5..]);
        if !year_part.chars().chain(month_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let year: i32 = year_part.parse().map_err(|_| bad())?;
        let month: u32 = month_part.parse().map_err(|_| bad())?;
        Self::new(year, month).map_err(|_| bad())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // year and month are range-checked on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Shift by `months`, negative moves backwards.
    pub fn offset(&self, months: i32) -> YearMonth {
        let index = self.index() + months;
        YearMonth {
            year: index.div_euclid(12),
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }

    pub fn next(&self) -> YearMonth {
        self.offset(1)
    }

    pub fn previous(&self) -> YearMonth {
        self.offset(-1)
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(&self, other: YearMonth) -> i32 {
        other.index() - self.index()
    }

    fn index(&self) -> i32 {
        self.year * 12 + self.month as i32 - 1
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = RunwayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = RunwayError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<YearMonth> for String {
    fn from(month: YearMonth) -> Self {
        month.to_string()
    }
}

/// Fails with `InvalidPeriod` when `start > end`.
pub fn validate_range(start: YearMonth, end: YearMonth) -> RunwayResult<()> {
    if start > end {
        return Err(RunwayError::InvalidPeriod {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

/// Every month from `start` to `end`, inclusive. Empty when `start > end`.
pub fn months_between(start: YearMonth, end: YearMonth) -> Vec<YearMonth> {
    let count = start.months_until(end) + 1;
    (0..count.max(0)).map(|i| start.offset(i)).collect()
}

/// Inclusive month range with `start_month <= end_month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PeriodRepr")]
pub struct Period {
    start_month: YearMonth,
    end_month: YearMonth,
}

#[derive(Deserialize)]
struct PeriodRepr {
    start_month: YearMonth,
    end_month: YearMonth,
}

impl TryFrom<PeriodRepr> for Period {
    type Error = RunwayError;

    fn try_from(repr: PeriodRepr) -> Result<Self, Self::Error> {
        Period::new(repr.start_month, repr.end_month)
    }
}

impl Period {
    pub fn new(start_month: YearMonth, end_month: YearMonth) -> RunwayResult<Self> {
        validate_range(start_month, end_month)?;
        Ok(Period {
            start_month,
            end_month,
        })
    }

    pub fn parse(start: &str, end: &str) -> RunwayResult<Self> {
        Self::new(YearMonth::parse(start)?, YearMonth::parse(end)?)
    }

    /// `months` consecutive months beginning at `start`.
    pub fn starting_at(start: YearMonth, months: u32) -> RunwayResult<Self> {
        if months == 0 {
            return Err(RunwayError::invalid("months", "Period needs at least one month"));
        }
        Self::new(start, start.offset(months as i32 - 1))
    }

    pub fn start_month(&self) -> YearMonth {
        self.start_month
    }

    pub fn end_month(&self) -> YearMonth {
        self.end_month
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        month >= self.start_month && month <= self.end_month
    }

    pub fn len(&self) -> usize {
        (self.start_month.months_until(self.end_month) + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn months(&self) -> Vec<YearMonth> {
        months_between(self.start_month, self.end_month)
    }

    /// Overlap of the two ranges, if any.
    pub fn intersect(&self, other: &Period) -> Option<Period> {
        let start = self.start_month.max(other.start_month);
        let end = self.end_month.min(other.end_month);
        Period::new(start, end).ok()
    }

    /// Narrow to optional lower/upper bounds.
    pub fn clamp_to(&self, starts: Option<YearMonth>, ends: Option<YearMonth>) -> Option<Period> {
        let start = starts.map_or(self.start_month, |s| s.max(self.start_month));
        let end = ends.map_or(self.end_month, |e| e.min(self.end_month));
        Period::new(start, end).ok()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_month, self.end_month)
    }
}

/// Recurrence unit for schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn step_months(&self) -> i32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::Yearly => 12,
        }
    }

    /// Tick months from `period` start, stepping until past the end.
    pub fn ticks(&self, period: &Period) -> Vec<YearMonth> {
        let mut ticks = Vec::new();
        let mut current = period.start_month();
        while current <= period.end_month() {
            ticks.push(current);
            current = current.offset(self.step_months());
        }
        ticks
    }

    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::Yearly => "Yearly",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let m = ym("2024-03");
        assert_eq!(m.year(), 2024);
        assert_eq!(m.month(), 3);
        assert_eq!(m.to_string(), "2024-03");
    }

    #[test]
    fn test_parse_rejects_bad_formats() {
        for raw in ["2024-3", "2024-13", "2024-00", "24-03", "2024/03", "abcd-ef", "2024-03-01", ""] {
            assert!(
                matches!(YearMonth::parse(raw), Err(RunwayError::InvalidMonthFormat(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_offset_crosses_years() {
        assert_eq!(ym("2024-11").offset(3), ym("2025-02"));
        assert_eq!(ym("2024-01").offset(-1), ym("2023-12"));
        assert_eq!(ym("2024-01").offset(-25), ym("2021-12"));
        assert_eq!(ym("2024-05").months_until(ym("2023-05")), -12);
    }

    #[test]
    fn test_ordering_is_chronological() {
        let mut months = vec![ym("2025-01"), ym("2024-12"), ym("2024-02")];
        months.sort();
        let as_strings: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        let mut lexical = as_strings.clone();
        lexical.sort();
        assert_eq!(as_strings, lexical);
    }

    #[test]
    fn test_period_validation() {
        assert!(matches!(
            Period::parse("2024-06", "2024-01"),
            Err(RunwayError::InvalidPeriod { .. })
        ));
        let p = Period::parse("2024-01", "2024-12").unwrap();
        assert_eq!(p.len(), 12);
        assert!(p.contains(ym("2024-07")));
        assert!(!p.contains(ym("2025-01")));
    }

    #[test]
    fn test_period_deserialization_enforces_order() {
        let bad = r#"{"start_month":"2024-05","end_month":"2024-01"}"#;
        assert!(serde_json::from_str::<Period>(bad).is_err());
    }

    #[test]
    fn test_frequency_ticks() {
        let p = Period::parse("2024-01", "2024-12").unwrap();
        assert_eq!(Frequency::Monthly.ticks(&p).len(), 12);
        assert_eq!(
            Frequency::Quarterly.ticks(&p),
            vec![ym("2024-01"), ym("2024-04"), ym("2024-07"), ym("2024-10")]
        );
        assert_eq!(Frequency::Yearly.ticks(&p), vec![ym("2024-01")]);
    }

    #[test]
    fn test_clamp_to() {
        let p = Period::parse("2024-01", "2024-12").unwrap();
        let clipped = p.clamp_to(Some(ym("2024-03")), Some(ym("2025-06"))).unwrap();
        assert_eq!(clipped, Period::parse("2024-03", "2024-12").unwrap());
        assert!(p.clamp_to(Some(ym("2025-01")), None).is_none());
    }
}
