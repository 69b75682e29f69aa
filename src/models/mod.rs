//! Core data models for the Contribution Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod calculation_result;
mod period;
mod policy_rule;
mod salary;

pub use calculation_result::{
    AuditStep, CalculationResult, EmployeeCategory, InsuranceLine, MissingReferenceRecord,
    ReferenceSource, ResultKey, ResultScope,
};
pub use period::{CalculationMonth, Half, PolicyPeriod, SOCIAL_SECURITY_YEAR_START_MONTH};
pub use policy_rule::{InsuranceBounds, InsuranceType, PolicyRule};
pub use salary::{SalaryRecord, WageAssumption, effective_hire_date};
