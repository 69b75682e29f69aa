//! Per-month contribution calculation.
//!
//! [`ContributionCalculator`] runs the three rule steps for one employee-month
//! and assembles the result row with its audit trace.

use crate::config::{BatchSettings, ReferenceYearTable};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationMonth, CalculationResult, PolicyRule, SalaryRecord, WageAssumption,
    effective_hire_date,
};

use super::base_adjuster::adjust_insurance_bases;
use super::classifier::{classify_employee, social_security_start_month};
use super::reference_wage::{ReferenceWageQuery, ReferenceWageResolver};

/// What happened to one employee-month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthOutcome {
    /// A result row was produced.
    Computed(Box<CalculationResult>),
    /// The month precedes the employee's social-security coverage.
    NotCovered {
        /// The first covered month.
        social_security_start: CalculationMonth,
    },
}

/// Classifies, resolves and adjusts one employee-month.
#[derive(Debug, Clone)]
pub struct ContributionCalculator {
    resolver: ReferenceWageResolver,
}

impl ContributionCalculator {
    /// Creates a calculator around a resolver.
    pub fn new(resolver: ReferenceWageResolver) -> Self {
        Self { resolver }
    }

    /// Creates a calculator from the reference-year table and batch settings.
    pub fn from_settings(reference_years: ReferenceYearTable, settings: &BatchSettings) -> Self {
        Self::new(ReferenceWageResolver::new(
            reference_years,
            settings.category_a_first_month_fallback,
        ))
    }

    /// Calculates one employee-month against a policy rule.
    ///
    /// `history` is the employee's full salary history; the hire date is taken
    /// from its latest record. The month is classified first, so a hire year
    /// beyond the next social-security year is an error even though coverage
    /// has not started. Other months before coverage return
    /// [`MonthOutcome::NotCovered`].
    ///
    /// # Errors
    ///
    /// * `MissingSalaryRecord` if `history` is empty.
    /// * `InvalidPolicyRule` if `rule` is for a different half-year.
    /// * `InvalidHireYear` and `MissingReferenceWage` from the rule steps.
    pub fn calculate(
        &self,
        employee_id: &str,
        history: &[SalaryRecord],
        calculation_month: CalculationMonth,
        wage_assumption: WageAssumption,
        rule: &PolicyRule,
    ) -> EngineResult<MonthOutcome> {
        let hire_date =
            effective_hire_date(history).ok_or_else(|| EngineError::MissingSalaryRecord {
                employee_id: employee_id.to_string(),
            })?;

        let period = calculation_month.policy_period();
        if rule.period != period {
            return Err(EngineError::InvalidPolicyRule {
                period,
                message: format!(
                    "rule for {} cannot be applied to {calculation_month}",
                    rule.period
                ),
            });
        }

        let mut step_number: u32 = 1;

        let classification = classify_employee(hire_date, calculation_month, step_number)?;
        step_number += 1;

        let social_security_start = social_security_start_month(hire_date);
        if calculation_month < social_security_start {
            return Ok(MonthOutcome::NotCovered {
                social_security_start,
            });
        }

        let reference = self.resolver.resolve(
            ReferenceWageQuery {
                employee_id,
                category: classification.category,
                calculation_month,
                social_security_start,
                wage_assumption,
                history,
            },
            step_number,
        )?;
        step_number += 1;

        let adjustment = adjust_insurance_bases(reference.wage.amount, rule, step_number);

        Ok(MonthOutcome::Computed(Box::new(CalculationResult {
            employee_id: employee_id.to_string(),
            calculation_month,
            period,
            wage_assumption,
            employee_category: classification.category,
            hire_date,
            social_security_start,
            reference_wage_base: reference.wage.amount,
            reference_wage_source: reference.wage.label,
            reference_source: reference.wage.source,
            pension: adjustment.pension,
            medical: adjustment.medical,
            unemployment: adjustment.unemployment,
            injury: adjustment.injury,
            housing_fund: adjustment.housing_fund,
            theoretical_total: adjustment.theoretical_total,
            audit_trace: vec![
                classification.audit_step,
                reference.audit_step,
                adjustment.audit_step,
            ],
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmployeeCategory, Half, PolicyPeriod, ReferenceSource};
    use crate::test_support::{dec, record, sample_rule};

    fn month(s: &str) -> CalculationMonth {
        s.parse().unwrap()
    }

    fn calculator() -> ContributionCalculator {
        ContributionCalculator::from_settings(ReferenceYearTable::default(), &BatchSettings::default())
    }

    fn computed(outcome: MonthOutcome) -> CalculationResult {
        match outcome {
            MonthOutcome::Computed(row) => *row,
            other => panic!("Expected a computed row, got {other:?}"),
        }
    }

    #[test]
    fn test_incumbent_row_has_three_audit_steps() {
        let history = vec![
            record("E1", "2019-04-01", "202201", "4000", "6000"),
            record("E1", "2019-04-01", "202212", "4000", "7000"),
            record("E1", "2019-04-01", "202403", "4500", "7500"),
        ];
        let rule = sample_rule(PolicyPeriod::new(2024, Half::H1));
        let row = computed(
            calculator()
                .calculate("E1", &history, month("202403"), WageAssumption::Wide, &rule)
                .unwrap(),
        );

        assert_eq!(row.employee_category, EmployeeCategory::A);
        assert_eq!(row.reference_wage_base, dec("6500.00"));
        assert_eq!(
            row.reference_source,
            ReferenceSource::YearAverage {
                year: 2022,
                months: 2
            }
        );
        assert_eq!(row.period, PolicyPeriod::new(2024, Half::H1));
        assert_eq!(row.theoretical_total, row.payments_sum());

        let rule_ids: Vec<&str> = row.audit_trace.iter().map(|s| s.rule_id.as_str()).collect();
        assert_eq!(
            rule_ids,
            vec!["employee_classification", "reference_wage", "base_adjustment"]
        );
        let steps: Vec<u32> = row.audit_trace.iter().map(|s| s.step_number).collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[test]
    fn test_month_before_coverage_is_not_covered() {
        let history = vec![record("E2", "2023-03-20", "202304", "5000", "6000")];
        let rule = sample_rule(PolicyPeriod::new(2023, Half::H1));
        let outcome = calculator()
            .calculate("E2", &history, month("202303"), WageAssumption::Wide, &rule)
            .unwrap();
        assert_eq!(
            outcome,
            MonthOutcome::NotCovered {
                social_security_start: month("202304")
            }
        );
    }

    #[test]
    fn test_future_hire_year_is_rejected_before_coverage_check() {
        let history = vec![record("E8", "2026-01-05", "202301", "5000", "6000")];
        let rule = sample_rule(PolicyPeriod::new(2023, Half::H1));
        let result =
            calculator().calculate("E8", &history, month("202301"), WageAssumption::Wide, &rule);
        assert!(matches!(
            result,
            Err(EngineError::InvalidHireYear {
                social_security_year: 2022,
                ..
            })
        ));
    }

    #[test]
    fn test_new_hire_uses_start_month_wage() {
        let history = vec![
            record("E3", "2023-03-20", "202304", "5000", "6000"),
            record("E3", "2023-03-20", "202305", "5000", "9000"),
        ];
        let rule = sample_rule(PolicyPeriod::new(2023, Half::H1));
        let row = computed(
            calculator()
                .calculate("E3", &history, month("202305"), WageAssumption::Narrow, &rule)
                .unwrap(),
        );
        assert_eq!(row.employee_category, EmployeeCategory::C);
        assert_eq!(row.reference_wage_base, dec("5000.00"));
        assert_eq!(row.reference_wage_source, "first-month wage 202304 (basic wage)");
    }

    #[test]
    fn test_missing_start_month_record_is_missing_reference() {
        let history = vec![record("E4", "2023-03-10", "202304", "5000", "6000")];
        let rule = sample_rule(PolicyPeriod::new(2023, Half::H1));
        let result =
            calculator().calculate("E4", &history, month("202304"), WageAssumption::Wide, &rule);
        assert!(matches!(
            result,
            Err(EngineError::MissingReferenceWage {
                category: EmployeeCategory::C,
                ..
            })
        ));
    }

    #[test]
    fn test_rule_for_other_period_is_rejected() {
        let history = vec![record("E5", "2020-01-01", "202301", "5000", "6000")];
        let rule = sample_rule(PolicyPeriod::new(2023, Half::H2));
        let result =
            calculator().calculate("E5", &history, month("202301"), WageAssumption::Wide, &rule);
        assert!(matches!(result, Err(EngineError::InvalidPolicyRule { .. })));
    }

    #[test]
    fn test_empty_history_is_missing_salary_record() {
        let rule = sample_rule(PolicyPeriod::new(2023, Half::H1));
        let result = calculator().calculate("E6", &[], month("202301"), WageAssumption::Wide, &rule);
        assert!(matches!(
            result,
            Err(EngineError::MissingSalaryRecord { employee_id }) if employee_id == "E6"
        ));
    }

    #[test]
    fn test_latest_record_hire_date_wins() {
        // A rehire updates the hire date on later records.
        let history = vec![
            record("E7", "2018-05-01", "202201", "4000", "5000"),
            record("E7", "2023-02-01", "202302", "4500", "5500"),
        ];
        let rule = sample_rule(PolicyPeriod::new(2023, Half::H1));
        let row = computed(
            calculator()
                .calculate("E7", &history, month("202303"), WageAssumption::Wide, &rule)
                .unwrap(),
        );
        assert_eq!(row.hire_date, chrono::NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
        assert_eq!(row.employee_category, EmployeeCategory::C);
        assert_eq!(row.reference_wage_base, dec("5500.00"));
    }
}
