//! Calculation result models for the Contribution Engine.
//!
//! This module contains the [`CalculationResult`] row produced for every
//! employee-month, the [`MissingReferenceRecord`] written when no reference wage
//! can be resolved, and the [`ResultScope`] that qualifies bulk deletes.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CalculationMonth, InsuranceType, PolicyPeriod, WageAssumption};

/// Employee category relative to the social-security year being calculated.
///
/// # Example
///
/// ```
/// use contribution_engine::models::EmployeeCategory;
///
/// assert_eq!(serde_json::to_string(&EmployeeCategory::A).unwrap(), "\"A\"");
/// assert!(EmployeeCategory::A.uses_year_average());
/// assert!(!EmployeeCategory::C.uses_year_average());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EmployeeCategory {
    /// Incumbent: hired before the social-security year began.
    A,
    /// Hired during the current social-security year.
    B,
    /// Hired in the first half of the calendar year after the social-security
    /// year started, before the July rollover.
    C,
}

impl EmployeeCategory {
    /// Returns true if the category's preferred reference is a year average.
    pub fn uses_year_average(&self) -> bool {
        matches!(self, EmployeeCategory::A)
    }
}

impl fmt::Display for EmployeeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmployeeCategory::A => write!(f, "A"),
            EmployeeCategory::B => write!(f, "B"),
            EmployeeCategory::C => write!(f, "C"),
        }
    }
}

/// Where a reference wage came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceSource {
    /// Mean wage over the records of a calendar year.
    YearAverage {
        /// The averaged calendar year.
        year: i32,
        /// Number of monthly records that were averaged.
        months: u32,
    },
    /// Wage of the social-security start month.
    FirstMonth {
        /// The start month.
        month: CalculationMonth,
    },
}

impl ReferenceSource {
    /// Audit label for this source, naming the wage field used.
    ///
    /// # Example
    ///
    /// ```
    /// use contribution_engine::models::{ReferenceSource, WageAssumption};
    ///
    /// let source = ReferenceSource::YearAverage { year: 2022, months: 12 };
    /// assert_eq!(source.label(WageAssumption::Wide), "2022 annual average (gross wage)");
    /// ```
    pub fn label(&self, assumption: WageAssumption) -> String {
        match self {
            ReferenceSource::YearAverage { year, .. } => {
                format!("{year} annual average ({})", assumption.field_name())
            }
            ReferenceSource::FirstMonth { month } => {
                format!("first-month wage {month} ({})", assumption.field_name())
            }
        }
    }
}

/// A single step in the audit trace recording a calculation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// Adjusted base and payment for one insurance type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceLine {
    /// Floor applied, if any.
    pub floor: Option<Decimal>,
    /// Cap applied, if any.
    pub cap: Option<Decimal>,
    /// Enterprise rate.
    pub rate: Decimal,
    /// Reference wage after clamping, rounded to 2 dp.
    pub adjusted_base: Decimal,
    /// `adjusted_base * rate`, rounded to 2 dp.
    pub payment: Decimal,
}

/// Uniquely identifies a result row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResultKey {
    /// The policy period.
    pub period: PolicyPeriod,
    /// The wage assumption.
    pub wage_assumption: WageAssumption,
    /// The employee.
    pub employee_id: String,
    /// The month calculated.
    pub calculation_month: CalculationMonth,
}

/// Theoretical contributions for one employee-month under one assumption.
///
/// Rows carry no timestamps or generated identifiers, so recomputing with the
/// same inputs reproduces them exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// The employee.
    pub employee_id: String,
    /// The month calculated.
    pub calculation_month: CalculationMonth,
    /// The half-year policy period whose rule was applied.
    pub period: PolicyPeriod,
    /// Wide (gross) or narrow (basic) wage.
    pub wage_assumption: WageAssumption,
    /// Category from the classifier.
    pub employee_category: EmployeeCategory,
    /// The employee's hire date.
    pub hire_date: NaiveDate,
    /// First month of social-security coverage.
    pub social_security_start: CalculationMonth,
    /// Resolved reference wage, rounded to 2 dp.
    pub reference_wage_base: Decimal,
    /// Human-readable source tag, e.g. "2022 annual average (gross wage)".
    pub reference_wage_source: String,
    /// Structured form of the source tag.
    pub reference_source: ReferenceSource,
    /// Pension insurance.
    pub pension: InsuranceLine,
    /// Medical insurance.
    pub medical: InsuranceLine,
    /// Unemployment insurance.
    pub unemployment: InsuranceLine,
    /// Work-injury insurance.
    pub injury: InsuranceLine,
    /// Housing provident fund.
    pub housing_fund: InsuranceLine,
    /// Sum of the five payments.
    pub theoretical_total: Decimal,
    /// Rule steps applied to produce this row.
    pub audit_trace: Vec<AuditStep>,
}

impl CalculationResult {
    /// Returns the line for an insurance type.
    pub fn line(&self, insurance: InsuranceType) -> &InsuranceLine {
        match insurance {
            InsuranceType::Pension => &self.pension,
            InsuranceType::Medical => &self.medical,
            InsuranceType::Unemployment => &self.unemployment,
            InsuranceType::Injury => &self.injury,
            InsuranceType::HousingFund => &self.housing_fund,
        }
    }

    /// The unique key of this row.
    pub fn key(&self) -> ResultKey {
        ResultKey {
            period: self.period,
            wage_assumption: self.wage_assumption,
            employee_id: self.employee_id.clone(),
            calculation_month: self.calculation_month,
        }
    }

    /// Sum of the five payments.
    pub fn payments_sum(&self) -> Decimal {
        InsuranceType::ALL
            .iter()
            .map(|t| self.line(*t).payment)
            .sum()
    }
}

/// An employee whose reference wage could not be resolved, kept for manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingReferenceRecord {
    /// The employee.
    pub employee_id: String,
    /// The period being recomputed.
    pub period: PolicyPeriod,
    /// The assumption being recomputed.
    pub wage_assumption: WageAssumption,
    /// Category from the classifier.
    pub category: EmployeeCategory,
    /// The source the resolver tried first.
    pub preferred_source: String,
    /// Why none of the candidate sources could be used.
    pub reason: String,
}

/// The set of result rows a recompute owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultScope {
    /// The policy period.
    pub period: PolicyPeriod,
    /// The wage assumption.
    pub wage_assumption: WageAssumption,
    /// Employees whose rows are replaced.
    pub employee_ids: Vec<String>,
}

impl ResultScope {
    /// Returns true if the row belongs to this scope.
    pub fn contains(&self, result: &CalculationResult) -> bool {
        result.period == self.period
            && result.wage_assumption == self.wage_assumption
            && self.employee_ids.iter().any(|id| *id == result.employee_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Half;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(payment: &str) -> InsuranceLine {
        InsuranceLine {
            floor: Some(dec("3958")),
            cap: Some(dec("24546")),
            rate: dec("0.16"),
            adjusted_base: dec("5000.00"),
            payment: dec(payment),
        }
    }

    fn sample_result() -> CalculationResult {
        CalculationResult {
            employee_id: "E1".to_string(),
            calculation_month: "202303".parse().unwrap(),
            period: PolicyPeriod::new(2023, Half::H1),
            wage_assumption: WageAssumption::Wide,
            employee_category: EmployeeCategory::A,
            hire_date: NaiveDate::from_ymd_opt(2019, 4, 1).unwrap(),
            social_security_start: "201904".parse().unwrap(),
            reference_wage_base: dec("5000.00"),
            reference_wage_source: "2021 annual average (gross wage)".to_string(),
            reference_source: ReferenceSource::YearAverage {
                year: 2021,
                months: 12,
            },
            pension: line("800.00"),
            medical: line("300.00"),
            unemployment: line("35.00"),
            injury: line("10.00"),
            housing_fund: line("250.00"),
            theoretical_total: dec("1395.00"),
            audit_trace: vec![],
        }
    }

    #[test]
    fn test_theoretical_total_equals_sum_of_payments() {
        let result = sample_result();
        assert_eq!(result.payments_sum(), result.theoretical_total);
    }

    #[test]
    fn test_line_lookup_by_type() {
        let result = sample_result();
        assert_eq!(result.line(InsuranceType::HousingFund).payment, dec("250.00"));
        assert_eq!(result.line(InsuranceType::Injury).payment, dec("10.00"));
    }

    #[test]
    fn test_reference_source_labels_distinguish_kinds() {
        let average = ReferenceSource::YearAverage {
            year: 2022,
            months: 7,
        };
        let first = ReferenceSource::FirstMonth {
            month: "202303".parse().unwrap(),
        };
        assert_eq!(
            average.label(WageAssumption::Narrow),
            "2022 annual average (basic wage)"
        );
        assert_eq!(
            first.label(WageAssumption::Wide),
            "first-month wage 202303 (gross wage)"
        );
    }

    #[test]
    fn test_reference_source_serialization() {
        let source = ReferenceSource::FirstMonth {
            month: "202303".parse().unwrap(),
        };
        let json = serde_json::to_string(&source).unwrap();
        assert_eq!(json, r#"{"kind":"first_month","month":"202303"}"#);
    }

    #[test]
    fn test_scope_contains_matching_rows_only() {
        let result = sample_result();
        let scope = ResultScope {
            period: PolicyPeriod::new(2023, Half::H1),
            wage_assumption: WageAssumption::Wide,
            employee_ids: vec!["E1".to_string()],
        };
        assert!(scope.contains(&result));

        let narrow = ResultScope {
            wage_assumption: WageAssumption::Narrow,
            ..scope.clone()
        };
        assert!(!narrow.contains(&result));

        let other_employee = ResultScope {
            employee_ids: vec!["E2".to_string()],
            ..scope
        };
        assert!(!other_employee.contains(&result));
    }

    #[test]
    fn test_result_serialization_round_trip() {
        let result = sample_result();
        let json = serde_json::to_string(&result).unwrap();
        let parsed: CalculationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
