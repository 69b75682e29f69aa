//! Request types for the Contribution Engine API.
//!
//! This module defines the JSON request structures for the `/recompute` and
//! `/calculate` endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{CalculationMonth, PolicyPeriod, SalaryRecord, WageAssumption};

fn all_assumptions() -> Vec<WageAssumption> {
    WageAssumption::ALL.to_vec()
}

fn wide() -> WageAssumption {
    WageAssumption::Wide
}

/// Request body for the `/recompute` endpoint.
///
/// # Example
///
/// ```
/// use contribution_engine::api::RecomputeRequest;
///
/// let request: RecomputeRequest = serde_json::from_str(r#"{"period": "2023H1"}"#).unwrap();
/// assert_eq!(request.wage_assumptions.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeRequest {
    /// The half-year to recompute, e.g. `"2023H1"`.
    pub period: PolicyPeriod,
    /// Assumptions to recompute; both when omitted.
    #[serde(default = "all_assumptions")]
    pub wage_assumptions: Vec<WageAssumption>,
}

/// Request body for the `/calculate` endpoint.
///
/// Previews one employee-month from inline salary history without touching
/// the result store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateRequest {
    /// The employee.
    pub employee_id: String,
    /// The month to calculate, e.g. `"202303"`.
    pub calculation_month: CalculationMonth,
    /// Wide or narrow; wide when omitted.
    #[serde(default = "wide")]
    pub wage_assumption: WageAssumption,
    /// The employee's salary history.
    pub salary_history: Vec<SalaryRecordRequest>,
}

/// One month of salary history in a calculate request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryRecordRequest {
    /// The month this record covers.
    pub period_label: CalculationMonth,
    /// The date the employee was hired.
    pub hire_date: NaiveDate,
    /// Basic wage for the month.
    pub basic_wage: Decimal,
    /// Gross wage for the month.
    pub gross_wage: Decimal,
}

impl CalculateRequest {
    /// Converts the inline history into salary records for the employee.
    pub fn salary_records(&self) -> Vec<SalaryRecord> {
        self.salary_history
            .iter()
            .map(|r| SalaryRecord {
                employee_id: self.employee_id.clone(),
                hire_date: r.hire_date,
                period_label: r.period_label,
                basic_wage: r.basic_wage,
                gross_wage: r.gross_wage,
            })
            .collect()
    }
}
