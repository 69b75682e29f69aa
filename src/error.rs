//! Error types for the Contribution Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while classifying employees,
//! resolving reference wages, and recomputing contribution batches.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{CalculationMonth, EmployeeCategory, PolicyPeriod};

/// Errors raised by the external store adapters.
///
/// Adapters translate their backend failures into one of these variants so the
/// engine can decide whether a condition is a typed "not found" or a transport
/// problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("Record not found: {what}")]
    NotFound {
        /// A description of the missing record.
        what: String,
    },

    /// The store did not answer in time.
    #[error("Store operation '{operation}' timed out")]
    Timeout {
        /// The operation that timed out.
        operation: String,
    },

    /// The store rejected the operation.
    #[error("Store operation '{operation}' failed: {message}")]
    Backend {
        /// The operation that failed.
        operation: String,
        /// The backend's error description.
        message: String,
    },

    /// A write would break a uniqueness or value constraint.
    #[error("Constraint violated: {message}")]
    Constraint {
        /// A description of the violated constraint.
        message: String,
    },
}

/// The main error type for the Contribution Engine.
///
/// # Example
///
/// ```
/// use contribution_engine::error::EngineError;
///
/// let error = EngineError::MissingSalaryRecord {
///     employee_id: "E1001".to_string(),
/// };
/// assert_eq!(error.to_string(), "No salary history for employee 'E1001'");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A policy rule is internally inconsistent (e.g. floor above cap).
    #[error("Invalid policy rule for {period}: {message}")]
    InvalidPolicyRule {
        /// The policy period of the offending rule.
        period: PolicyPeriod,
        /// A description of the inconsistency.
        message: String,
    },

    /// A month identifier could not be parsed or is out of range.
    #[error("Invalid calculation month '{value}': {message}")]
    InvalidMonth {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        message: String,
    },

    /// A policy period identifier could not be parsed.
    #[error("Invalid policy period '{value}': {message}")]
    InvalidPeriod {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        message: String,
    },

    /// The hire date cannot be classified against the calculation month.
    #[error(
        "Invalid hire year: hired {hire_date} cannot be classified for {calculation_month} \
         (social-security year {social_security_year})"
    )]
    InvalidHireYear {
        /// The employee's hire date.
        hire_date: NaiveDate,
        /// The month being calculated.
        calculation_month: CalculationMonth,
        /// The social-security year of the calculation month.
        social_security_year: i32,
    },

    /// No salary history exists for the employee.
    #[error("No salary history for employee '{employee_id}'")]
    MissingSalaryRecord {
        /// The employee without history.
        employee_id: String,
    },

    /// No policy rule exists for the half-year.
    #[error("No policy rule configured for {period}")]
    MissingPolicyRule {
        /// The period that has no rule.
        period: PolicyPeriod,
    },

    /// None of the reference-wage candidate sources had data.
    #[error("No reference wage for employee '{employee_id}' ({preferred_source}): {reason}")]
    MissingReferenceWage {
        /// The employee whose reference wage is missing.
        employee_id: String,
        /// The employee's category for the month being resolved.
        category: EmployeeCategory,
        /// The source the resolver tried first.
        preferred_source: String,
        /// Every candidate that was tried and why it failed.
        reason: String,
    },

    /// The result store rejected a bulk delete or insert.
    #[error("Commit failed during {operation}: {message}")]
    CommitFailure {
        /// `delete_scope`, `insert_batch` or `append_missing_reference`.
        operation: String,
        /// The store's error description.
        message: String,
    },

    /// An external store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
