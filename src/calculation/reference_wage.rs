//! Reference wage resolution.
//!
//! This module selects the wage figure used as an employee's contribution base:
//! an annual average for incumbents and the first-month wage for new hires,
//! with the averaged year taken from the [`ReferenceYearTable`].

use rust_decimal::Decimal;

use crate::config::ReferenceYearTable;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, CalculationMonth, EmployeeCategory, ReferenceSource, SalaryRecord, WageAssumption,
};

use super::base_adjuster::round_money;

/// A resolved reference wage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWage {
    /// The wage, rounded to 2 dp.
    pub amount: Decimal,
    /// Where the wage came from.
    pub source: ReferenceSource,
    /// Audit label, e.g. "2022 annual average (gross wage)".
    pub label: String,
}

/// The result of resolving a reference wage, including the audit step.
#[derive(Debug, Clone)]
pub struct ReferenceWageResult {
    /// The resolved wage.
    pub wage: ReferenceWage,
    /// The audit step recording the resolution.
    pub audit_step: AuditStep,
}

/// Everything the resolver needs to know about one employee-month.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceWageQuery<'a> {
    /// The employee.
    pub employee_id: &'a str,
    /// Category from the classifier.
    pub category: EmployeeCategory,
    /// The month being calculated.
    pub calculation_month: CalculationMonth,
    /// First month of social-security coverage.
    pub social_security_start: CalculationMonth,
    /// Wide or narrow wage.
    pub wage_assumption: WageAssumption,
    /// The employee's salary history.
    pub history: &'a [SalaryRecord],
}

/// Resolves reference wages from salary history.
///
/// # Example
///
/// ```
/// use contribution_engine::calculation::{ReferenceWageQuery, ReferenceWageResolver};
/// use contribution_engine::config::ReferenceYearTable;
/// use contribution_engine::models::{EmployeeCategory, ReferenceSource, SalaryRecord, WageAssumption};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let history: Vec<SalaryRecord> = ["202201", "202202"]
///     .iter()
///     .zip([Decimal::new(6000, 0), Decimal::new(7000, 0)])
///     .map(|(month, gross)| SalaryRecord {
///         employee_id: "E1".to_string(),
///         hire_date: NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
///         period_label: month.parse().unwrap(),
///         basic_wage: Decimal::new(5000, 0),
///         gross_wage: gross,
///     })
///     .collect();
///
/// let resolver = ReferenceWageResolver::new(ReferenceYearTable::default(), true);
/// let result = resolver
///     .resolve(
///         ReferenceWageQuery {
///             employee_id: "E1",
///             category: EmployeeCategory::A,
///             calculation_month: "202403".parse().unwrap(),
///             social_security_start: "202001".parse().unwrap(),
///             wage_assumption: WageAssumption::Wide,
///             history: &history,
///         },
///         2,
///     )
///     .unwrap();
///
/// // 202403 is in social-security year 2023; the default rule averages 2022.
/// assert_eq!(result.wage.amount, Decimal::new(650000, 2));
/// assert_eq!(result.wage.source, ReferenceSource::YearAverage { year: 2022, months: 2 });
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceWageResolver {
    reference_years: ReferenceYearTable,
    first_month_fallback: bool,
}

impl ReferenceWageResolver {
    /// Creates a resolver.
    ///
    /// `first_month_fallback` lets category A employees use their first-month
    /// wage when no candidate year has salary records.
    pub fn new(reference_years: ReferenceYearTable, first_month_fallback: bool) -> Self {
        Self {
            reference_years,
            first_month_fallback,
        }
    }

    /// The ordered sources tried for a query.
    fn candidates(&self, query: &ReferenceWageQuery<'_>) -> Vec<Candidate> {
        let first_month = Candidate::FirstMonth(query.social_security_start);
        if !query.category.uses_year_average() {
            return vec![first_month];
        }

        let mut candidates: Vec<Candidate> = self
            .reference_years
            .candidate_years(query.calculation_month.policy_period())
            .into_iter()
            .map(Candidate::YearAverage)
            .collect();
        if self.first_month_fallback {
            candidates.push(first_month);
        }
        candidates
    }

    /// Resolves the reference wage for one employee-month.
    ///
    /// Candidates are tried in order; the first with data wins. When none
    /// has data the error lists every attempt.
    pub fn resolve(
        &self,
        query: ReferenceWageQuery<'_>,
        step_number: u32,
    ) -> EngineResult<ReferenceWageResult> {
        let candidates = self.candidates(&query);
        let year_rule = query.category.uses_year_average().then(|| {
            if self
                .reference_years
                .has_entry(query.calculation_month.policy_period())
            {
                "reference_year_table"
            } else {
                "default_offset"
            }
        });
        let assumption = query.wage_assumption;
        let mut misses = Vec::with_capacity(candidates.len());

        for candidate in &candidates {
            let found = match *candidate {
                Candidate::YearAverage(year) => year_average(query.history, year, assumption).map(
                    |(amount, months)| (amount, ReferenceSource::YearAverage { year, months }),
                ),
                Candidate::FirstMonth(month) => first_month_wage(query.history, month, assumption)
                    .map(|amount| (amount, ReferenceSource::FirstMonth { month })),
            };

            match found {
                Some((amount, source)) => {
                    let wage = ReferenceWage {
                        amount: round_money(amount),
                        source,
                        label: source.label(assumption),
                    };
                    let audit_step =
                        build_audit_step(&query, &candidates, year_rule, &misses, &wage, step_number);
                    return Ok(ReferenceWageResult { wage, audit_step });
                }
                None => misses.push(candidate.miss_reason(assumption)),
            }
        }

        let preferred_source = candidates
            .first()
            .map(|c| c.label(assumption))
            .unwrap_or_default();

        Err(EngineError::MissingReferenceWage {
            employee_id: query.employee_id.to_string(),
            category: query.category,
            preferred_source,
            reason: misses.join("; "),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    YearAverage(i32),
    FirstMonth(CalculationMonth),
}

impl Candidate {
    fn source_placeholder(&self) -> ReferenceSource {
        match *self {
            Candidate::YearAverage(year) => ReferenceSource::YearAverage { year, months: 0 },
            Candidate::FirstMonth(month) => ReferenceSource::FirstMonth { month },
        }
    }

    fn label(&self, assumption: WageAssumption) -> String {
        self.source_placeholder().label(assumption)
    }

    fn miss_reason(&self, assumption: WageAssumption) -> String {
        match self {
            Candidate::YearAverage(year) => {
                format!("no {} records in {year}", assumption.field_name())
            }
            Candidate::FirstMonth(month) => {
                format!("no salary record for first month {month}")
            }
        }
    }
}

fn build_audit_step(
    query: &ReferenceWageQuery<'_>,
    candidates: &[Candidate],
    year_rule: Option<&str>,
    misses: &[String],
    wage: &ReferenceWage,
    step_number: u32,
) -> AuditStep {
    let tried: Vec<String> = candidates
        .iter()
        .map(|c| c.label(query.wage_assumption))
        .collect();

    let reasoning = if misses.is_empty() {
        format!("Category {} uses {}: {}", query.category, wage.label, wage.amount)
    } else {
        format!(
            "Category {} fell back to {} ({}): {}",
            query.category,
            wage.label,
            misses.join("; "),
            wage.amount
        )
    };

    AuditStep {
        step_number,
        rule_id: "reference_wage".to_string(),
        rule_name: "Reference Wage Resolution".to_string(),
        input: serde_json::json!({
            "employee_id": query.employee_id,
            "category": query.category.to_string(),
            "calculation_month": query.calculation_month.to_string(),
            "wage_assumption": query.wage_assumption.to_string(),
            "year_rule": year_rule,
            "candidates": tried
        }),
        output: serde_json::json!({
            "reference_wage": wage.amount.to_string(),
            "source": wage.label
        }),
        reasoning,
    }
}

/// Mean of the selected wage over all records in a calendar year.
///
/// Returns the unrounded mean and the number of records, or `None` when the
/// year has no records.
pub fn year_average(
    history: &[SalaryRecord],
    year: i32,
    assumption: WageAssumption,
) -> Option<(Decimal, u32)> {
    let wages: Vec<Decimal> = history
        .iter()
        .filter(|r| r.period_label.year() == year)
        .map(|r| assumption.wage_of(r))
        .collect();

    if wages.is_empty() {
        return None;
    }

    let count = wages.len() as u32;
    let total: Decimal = wages.into_iter().sum();
    Some((total / Decimal::from(count), count))
}

/// The selected wage of the record at exactly `month`, if any.
pub fn first_month_wage(
    history: &[SalaryRecord],
    month: CalculationMonth,
    assumption: WageAssumption,
) -> Option<Decimal> {
    history
        .iter()
        .find(|r| r.period_label == month)
        .map(|r| assumption.wage_of(r))
}
