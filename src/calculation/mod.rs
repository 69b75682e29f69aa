//! Calculation logic for the Contribution Engine.
//!
//! This module contains the rule steps applied to every employee-month:
//! employee classification against the social-security year, reference wage
//! resolution, and insurance base adjustment with payment calculation.
//! [`ContributionCalculator`] runs them in order and assembles the result row.

mod base_adjuster;
mod classifier;
mod contribution;
mod reference_wage;

pub use base_adjuster::{
    AdjustmentResult, MONEY_DECIMAL_PLACES, adjust_insurance_bases, clamp_base, round_money,
};
pub use classifier::{
    ClassificationResult, SOCIAL_SECURITY_START_CUTOFF_DAY, classify_employee,
    social_security_start_month,
};
pub use contribution::{ContributionCalculator, MonthOutcome};
pub use reference_wage::{
    ReferenceWage, ReferenceWageQuery, ReferenceWageResolver, ReferenceWageResult,
    first_month_wage, year_average,
};
