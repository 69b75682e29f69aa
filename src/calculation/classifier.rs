//! Employee classification against the social-security year.
//!
//! This module places an employee into category A, B or C for a calculation
//! month and derives the month social-security coverage starts.

use chrono::{Datelike, NaiveDate};

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditStep, CalculationMonth, EmployeeCategory};

/// Hires on or before this day of the month are covered from the hire month.
pub const SOCIAL_SECURITY_START_CUTOFF_DAY: u32 = 15;

/// The result of classifying an employee, including the audit step.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// The employee's category.
    pub category: EmployeeCategory,
    /// The social-security year of the calculation month.
    pub social_security_year: i32,
    /// The audit step recording this classification.
    pub audit_step: AuditStep,
}

/// Classifies an employee for a calculation month.
///
/// The social-security year of the month runs July–June and is labelled by its
/// starting calendar year. Against that year:
///
/// - hired in an earlier year → [`EmployeeCategory::A`]
/// - hired in the same year → [`EmployeeCategory::B`]
/// - hired in the following calendar year (January–June, before rollover) → [`EmployeeCategory::C`]
///
/// Any other hire year is inconsistent with the month and fails with
/// `InvalidHireYear`.
///
/// # Examples
///
/// ```
/// use contribution_engine::calculation::classify_employee;
/// use contribution_engine::models::EmployeeCategory;
/// use chrono::NaiveDate;
///
/// let hired = NaiveDate::from_ymd_opt(2023, 6, 10).unwrap();
///
/// // January 2024 is in social-security year 2023.
/// let january = classify_employee(hired, "202401".parse().unwrap(), 1).unwrap();
/// assert_eq!(january.category, EmployeeCategory::B);
///
/// // From July 2024 the new cycle treats the employee as an incumbent.
/// let july = classify_employee(hired, "202407".parse().unwrap(), 1).unwrap();
/// assert_eq!(july.category, EmployeeCategory::A);
/// ```
pub fn classify_employee(
    hire_date: NaiveDate,
    calculation_month: CalculationMonth,
    step_number: u32,
) -> EngineResult<ClassificationResult> {
    let social_security_year = calculation_month.social_security_year();
    let hire_year = hire_date.year();

    let category = if hire_year < social_security_year {
        EmployeeCategory::A
    } else if hire_year == social_security_year {
        EmployeeCategory::B
    } else if hire_year == social_security_year + 1 {
        EmployeeCategory::C
    } else {
        return Err(EngineError::InvalidHireYear {
            hire_date,
            calculation_month,
            social_security_year,
        });
    };

    let reasoning = match category {
        EmployeeCategory::A => format!(
            "Hired in {hire_year}, before social-security year {social_security_year}: incumbent"
        ),
        EmployeeCategory::B => format!(
            "Hired in {hire_year}, during social-security year {social_security_year}"
        ),
        EmployeeCategory::C => format!(
            "Hired in {hire_year}, after social-security year {social_security_year} began but before the July rollover"
        ),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "employee_classification".to_string(),
        rule_name: "Employee Classification".to_string(),
        input: serde_json::json!({
            "hire_date": hire_date.to_string(),
            "calculation_month": calculation_month.to_string()
        }),
        output: serde_json::json!({
            "category": category.to_string(),
            "social_security_year": social_security_year
        }),
        reasoning,
    };

    Ok(ClassificationResult {
        category,
        social_security_year,
        audit_step,
    })
}

/// Returns the first month of social-security coverage for a hire date.
///
/// Hiring on or before the 15th starts coverage that month; hiring after the
/// 15th starts it the following month.
///
/// # Examples
///
/// ```
/// use contribution_engine::calculation::social_security_start_month;
/// use chrono::NaiveDate;
///
/// let early = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
/// assert_eq!(social_security_start_month(early).to_string(), "202303");
///
/// let late = NaiveDate::from_ymd_opt(2023, 12, 16).unwrap();
/// assert_eq!(social_security_start_month(late).to_string(), "202401");
/// ```
pub fn social_security_start_month(hire_date: NaiveDate) -> CalculationMonth {
    let hire_month = CalculationMonth::from_date(hire_date);
    if hire_date.day() <= SOCIAL_SECURITY_START_CUTOFF_DAY {
        hire_month
    } else {
        hire_month.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month(s: &str) -> CalculationMonth {
        s.parse().unwrap()
    }

    fn category(hire: NaiveDate, target: &str) -> EmployeeCategory {
        classify_employee(hire, month(target), 1).unwrap().category
    }

    #[test]
    fn test_incumbent_is_category_a() {
        assert_eq!(category(date(2020, 1, 1), "202303"), EmployeeCategory::A);
        assert_eq!(category(date(2022, 12, 31), "202307"), EmployeeCategory::A);
    }

    #[test]
    fn test_hire_in_social_security_year_is_category_b() {
        // 202303 belongs to social-security year 2022.
        assert_eq!(category(date(2022, 8, 1), "202303"), EmployeeCategory::B);
        assert_eq!(category(date(2023, 7, 1), "202312"), EmployeeCategory::B);
    }

    #[test]
    fn test_first_half_hire_before_rollover_is_category_c() {
        assert_eq!(category(date(2023, 2, 10), "202303"), EmployeeCategory::C);
        assert_eq!(category(date(2024, 6, 30), "202406"), EmployeeCategory::C);
    }

    #[test]
    fn test_june_hire_at_july_rollover() {
        // Hired June 2023. January 2024 is still social-security year 2023.
        let hired = date(2023, 6, 20);
        assert_eq!(category(hired, "202306"), EmployeeCategory::C);
        assert_eq!(category(hired, "202307"), EmployeeCategory::B);
        assert_eq!(category(hired, "202401"), EmployeeCategory::B);
        assert_eq!(category(hired, "202406"), EmployeeCategory::B);
        assert_eq!(category(hired, "202407"), EmployeeCategory::A);
    }

    #[test]
    fn test_hire_two_years_ahead_is_invalid() {
        let result = classify_employee(date(2025, 1, 5), month("202403"), 1);
        match result {
            Err(EngineError::InvalidHireYear {
                social_security_year,
                ..
            }) => assert_eq!(social_security_year, 2023),
            other => panic!("Expected InvalidHireYear, got {other:?}"),
        }
    }

    #[test]
    fn test_hire_next_year_in_second_half_is_invalid() {
        // 202308 is social-security year 2023; a 2025 hire is two cycles ahead.
        assert!(classify_employee(date(2025, 3, 1), month("202308"), 1).is_err());
        // A 2024 hire is next-cycle, so category C even though it is in the future.
        assert_eq!(category(date(2024, 3, 1), "202308"), EmployeeCategory::C);
    }

    #[test]
    fn test_audit_step_records_decision() {
        let result = classify_employee(date(2021, 4, 1), month("202305"), 3).unwrap();
        assert_eq!(result.audit_step.step_number, 3);
        assert_eq!(result.audit_step.rule_id, "employee_classification");
        assert_eq!(result.audit_step.output["category"], "A");
        assert_eq!(result.audit_step.output["social_security_year"], 2022);
    }

    #[test]
    fn test_start_month_cutoff_on_the_15th() {
        assert_eq!(social_security_start_month(date(2023, 3, 1)), month("202303"));
        assert_eq!(social_security_start_month(date(2023, 3, 15)), month("202303"));
        assert_eq!(social_security_start_month(date(2023, 3, 16)), month("202304"));
        assert_eq!(social_security_start_month(date(2023, 12, 31)), month("202401"));
    }
}
