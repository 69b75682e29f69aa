//! Salary history model and wage assumptions.
//!
//! This module defines the [`SalaryRecord`] rows handed to the engine by ingestion
//! and the [`WageAssumption`] that selects which wage field feeds a calculation.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CalculationMonth;

/// Which wage figure is treated as the employee's wage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WageAssumption {
    /// Gross wage (all pay components).
    Wide,
    /// Basic wage only.
    Narrow,
}

impl WageAssumption {
    /// Both assumptions, wide first.
    pub const ALL: [WageAssumption; 2] = [WageAssumption::Wide, WageAssumption::Narrow];

    /// Selects the wage field this assumption uses from a record.
    ///
    /// # Example
    ///
    /// ```
    /// use contribution_engine::models::{SalaryRecord, WageAssumption};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    ///
    /// let record = SalaryRecord {
    ///     employee_id: "E1".to_string(),
    ///     hire_date: NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
    ///     period_label: "202401".parse().unwrap(),
    ///     basic_wage: Decimal::new(5000, 0),
    ///     gross_wage: Decimal::new(8000, 0),
    /// };
    /// assert_eq!(WageAssumption::Wide.wage_of(&record), Decimal::new(8000, 0));
    /// assert_eq!(WageAssumption::Narrow.wage_of(&record), Decimal::new(5000, 0));
    /// ```
    pub fn wage_of(&self, record: &SalaryRecord) -> Decimal {
        match self {
            WageAssumption::Wide => record.gross_wage,
            WageAssumption::Narrow => record.basic_wage,
        }
    }

    /// Human-readable name of the wage field.
    pub fn field_name(&self) -> &'static str {
        match self {
            WageAssumption::Wide => "gross wage",
            WageAssumption::Narrow => "basic wage",
        }
    }
}

impl fmt::Display for WageAssumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WageAssumption::Wide => write!(f, "wide"),
            WageAssumption::Narrow => write!(f, "narrow"),
        }
    }
}

/// One month of an employee's salary history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRecord {
    /// Stable identifier for the person.
    pub employee_id: String,
    /// The date the employee was hired.
    pub hire_date: NaiveDate,
    /// The month this record covers.
    pub period_label: CalculationMonth,
    /// Basic wage for the month.
    pub basic_wage: Decimal,
    /// Gross wage for the month.
    pub gross_wage: Decimal,
}

/// Returns the hire date to use for an employee's history.
///
/// Records normally agree; when they don't, the most recent month's hire date
/// wins so that a re-hire supersedes the earlier employment.
pub fn effective_hire_date(records: &[SalaryRecord]) -> Option<NaiveDate> {
    records
        .iter()
        .max_by_key(|r| r.period_label)
        .map(|r| r.hire_date)
}
