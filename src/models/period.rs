//! Calendar month and half-year policy period models.
//!
//! This module contains [`CalculationMonth`], the sortable `YYYYMM` month identifier
//! shared by salary history and calculation results, and [`PolicyPeriod`], the
//! half-year window a policy rule applies to.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The month in which a social-security year starts.
pub const SOCIAL_SECURITY_YEAR_START_MONTH: u32 = 7;

/// A calendar month, serialized as `YYYYMM`.
///
/// Ordering is chronological, so months can be used directly as sort keys and
/// compared against salary-history period labels.
///
/// # Example
///
/// ```
/// use contribution_engine::models::CalculationMonth;
///
/// let month: CalculationMonth = "202403".parse().unwrap();
/// assert_eq!(month.year(), 2024);
/// assert_eq!(month.month(), 3);
/// assert_eq!(month.to_string(), "202403");
/// assert_eq!(month.social_security_year(), 2023);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalculationMonth {
    year: i32,
    month: u32,
}

impl CalculationMonth {
    /// Creates a month, validating that it fits the `YYYYMM` format.
    pub fn new(year: i32, month: u32) -> EngineResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidMonth {
                value: format!("{year:04}{month:02}"),
                message: "month must be between 1 and 12".to_string(),
            });
        }
        if !(1000..=9999).contains(&year) {
            return Err(EngineError::InvalidMonth {
                value: format!("{year}{month:02}"),
                message: "year must have four digits".to_string(),
            });
        }
        Ok(Self { year, month })
    }

    /// Returns the month containing the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The calendar year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The calendar month, 1 through 12.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The social-security year this month belongs to.
    ///
    /// July through December belong to the year of the month itself;
    /// January through June belong to the previous year's cycle.
    pub fn social_security_year(&self) -> i32 {
        if self.month >= SOCIAL_SECURITY_YEAR_START_MONTH {
            self.year
        } else {
            self.year - 1
        }
    }

    /// The half of the calendar year this month falls in.
    pub fn half(&self) -> Half {
        Half::of_month(self.month)
    }

    /// The half-year policy period containing this month.
    pub fn policy_period(&self) -> PolicyPeriod {
        PolicyPeriod::new(self.year, self.half())
    }

    /// The following calendar month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for CalculationMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for CalculationMonth {
    type Err = EngineError;

    /// Parses `YYYYMM` or `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits: String = trimmed.chars().filter(|c| *c != '-').collect();
        let well_formed = digits.len() == 6
            && digits.chars().all(|c| c.is_ascii_digit())
            && (trimmed.len() == 6 || trimmed.as_bytes().get(4) == Some(&b'-'));

        if !well_formed {
            return Err(EngineError::InvalidMonth {
                value: s.to_string(),
                message: "expected YYYYMM or YYYY-MM".to_string(),
            });
        }

        let year = digits[..4].parse::<i32>().map_err(|e| EngineError::InvalidMonth {
            value: s.to_string(),
            message: e.to_string(),
        })?;
        let month = digits[4..].parse::<u32>().map_err(|e| EngineError::InvalidMonth {
            value: s.to_string(),
            message: e.to_string(),
        })?;

        Self::new(year, month)
    }
}

impl TryFrom<String> for CalculationMonth {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CalculationMonth> for String {
    fn from(month: CalculationMonth) -> Self {
        month.to_string()
    }
}

/// Half of a calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Half {
    /// January through June.
    H1,
    /// July through December.
    H2,
}

impl Half {
    /// Returns the half containing the given calendar month.
    pub fn of_month(month: u32) -> Self {
        if month >= SOCIAL_SECURITY_YEAR_START_MONTH {
            Half::H2
        } else {
            Half::H1
        }
    }

    fn first_month(self) -> u32 {
        match self {
            Half::H1 => 1,
            Half::H2 => SOCIAL_SECURITY_YEAR_START_MONTH,
        }
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Half::H1 => write!(f, "H1"),
            Half::H2 => write!(f, "H2"),
        }
    }
}

/// A half-year policy window such as `2023H1`.
///
/// # Example
///
/// ```
/// use contribution_engine::models::{Half, PolicyPeriod};
///
/// let period: PolicyPeriod = "2023H2".parse().unwrap();
/// assert_eq!(period, PolicyPeriod::new(2023, Half::H2));
/// assert_eq!(period.months().len(), 6);
/// assert_eq!(period.months()[0].to_string(), "202307");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PolicyPeriod {
    /// The calendar year.
    pub year: i32,
    /// The half of the year.
    pub half: Half,
}

impl PolicyPeriod {
    /// Creates a policy period.
    pub fn new(year: i32, half: Half) -> Self {
        Self { year, half }
    }

    /// The six calendar months of this period, in order.
    pub fn months(&self) -> Vec<CalculationMonth> {
        let first = self.half.first_month();
        (first..first + 6)
            .map(|month| CalculationMonth {
                year: self.year,
                month,
            })
            .collect()
    }

    /// Returns true if the month falls inside this period.
    pub fn contains(&self, month: CalculationMonth) -> bool {
        month.policy_period() == *self
    }

    /// The social-security year shared by every month of this period.
    pub fn social_security_year(&self) -> i32 {
        match self.half {
            Half::H1 => self.year - 1,
            Half::H2 => self.year,
        }
    }

    /// The period immediately after this one.
    pub fn next(&self) -> Self {
        match self.half {
            Half::H1 => Self::new(self.year, Half::H2),
            Half::H2 => Self::new(self.year + 1, Half::H1),
        }
    }

    /// Every period from `first` through `last`, inclusive.
    ///
    /// Returns an empty list when `last` precedes `first`.
    pub fn range(first: PolicyPeriod, last: PolicyPeriod) -> Vec<PolicyPeriod> {
        let mut periods = Vec::new();
        let mut current = first;
        while current <= last {
            periods.push(current);
            current = current.next();
        }
        periods
    }
}

impl fmt::Display for PolicyPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.year, self.half)
    }
}

impl FromStr for PolicyPeriod {
    type Err = EngineError;

    /// Parses `2023H1`, `2023-H1` or `2023h1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_ascii_uppercase();

        let invalid = |message: &str| EngineError::InvalidPeriod {
            value: s.to_string(),
            message: message.to_string(),
        };

        if normalized.len() != 6 {
            return Err(invalid("expected YYYYH1 or YYYYH2"));
        }
        let (year_part, half_part) = normalized.split_at(4);
        let year = year_part
            .parse::<i32>()
            .map_err(|_| invalid("year must be four digits"))?;
        let half = match half_part {
            "H1" => Half::H1,
            "H2" => Half::H2,
            _ => return Err(invalid("half must be H1 or H2")),
        };

        Ok(Self::new(year, half))
    }
}

impl TryFrom<String> for PolicyPeriod {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PolicyPeriod> for String {
    fn from(period: PolicyPeriod) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(s: &str) -> CalculationMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_compact_and_dashed_months() {
        assert_eq!(month("202401"), CalculationMonth::new(2024, 1).unwrap());
        assert_eq!(month("2024-01"), CalculationMonth::new(2024, 1).unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_months() {
        for bad in ["202413", "202400", "2024", "2024/01", "20240101", "abcdef"] {
            let result = bad.parse::<CalculationMonth>();
            assert!(
                matches!(result, Err(EngineError::InvalidMonth { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_month_ordering_is_chronological() {
        assert!(month("202312") < month("202401"));
        assert!(month("202401") < month("202402"));
    }

    #[test]
    fn test_social_security_year_rolls_over_in_july() {
        assert_eq!(month("202406").social_security_year(), 2023);
        assert_eq!(month("202407").social_security_year(), 2024);
        assert_eq!(month("202401").social_security_year(), 2023);
        assert_eq!(month("202412").social_security_year(), 2024);
    }

    #[test]
    fn test_next_month_wraps_year() {
        assert_eq!(month("202312").next(), month("202401"));
        assert_eq!(month("202305").next(), month("202306"));
    }

    #[test]
    fn test_month_serializes_as_yyyymm_string() {
        let json = serde_json::to_string(&month("202303")).unwrap();
        assert_eq!(json, "\"202303\"");
        let parsed: CalculationMonth = serde_json::from_str("\"202303\"").unwrap();
        assert_eq!(parsed, month("202303"));
    }

    #[test]
    fn test_policy_period_months() {
        let h1 = PolicyPeriod::new(2024, Half::H1);
        let labels: Vec<String> = h1.months().iter().map(|m| m.to_string()).collect();
        assert_eq!(
            labels,
            vec!["202401", "202402", "202403", "202404", "202405", "202406"]
        );

        let h2 = PolicyPeriod::new(2023, Half::H2);
        assert_eq!(h2.months().first().unwrap().to_string(), "202307");
        assert_eq!(h2.months().last().unwrap().to_string(), "202312");
    }

    #[test]
    fn test_policy_period_contains() {
        let period = PolicyPeriod::new(2023, Half::H2);
        assert!(period.contains(month("202307")));
        assert!(!period.contains(month("202306")));
        assert!(!period.contains(month("202407")));
    }

    #[test]
    fn test_policy_period_parse_and_display() {
        let period: PolicyPeriod = "2023-h2".parse().unwrap();
        assert_eq!(period.to_string(), "2023H2");
        assert!("2023H3".parse::<PolicyPeriod>().is_err());
        assert!("23H1".parse::<PolicyPeriod>().is_err());
    }

    #[test]
    fn test_policy_period_range() {
        let periods = PolicyPeriod::range(
            PolicyPeriod::new(2023, Half::H1),
            PolicyPeriod::new(2024, Half::H2),
        );
        let labels: Vec<String> = periods.iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["2023H1", "2023H2", "2024H1", "2024H2"]);

        assert!(
            PolicyPeriod::range(
                PolicyPeriod::new(2024, Half::H1),
                PolicyPeriod::new(2023, Half::H2)
            )
            .is_empty()
        );
    }

    #[test]
    fn test_policy_period_social_security_year() {
        assert_eq!(PolicyPeriod::new(2024, Half::H1).social_security_year(), 2023);
        assert_eq!(PolicyPeriod::new(2024, Half::H2).social_security_year(), 2024);
    }
}
