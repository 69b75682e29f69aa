//! Interfaces to the external stores the engine reads from and writes to.
//!
//! The engine operates exclusively through these traits. Calls are blocking;
//! timeouts and retries belong to the implementations. [`memory`] holds
//! in-process implementations used by tests, benchmarks and the HTTP preview.

pub mod memory;
mod provider;

pub use memory::{
    InMemoryMissingReferenceSink, InMemoryPolicyStore, InMemoryResultStore, InMemorySalaryStore,
};
pub use provider::{PolicyRuleProvider, SalaryHistoryProvider};

use crate::error::StoreError;
use crate::models::{
    CalculationResult, MissingReferenceRecord, PolicyPeriod, PolicyRule, ResultScope,
    SalaryRecord, WageAssumption,
};

/// Read-only access to policy rules.
pub trait PolicyRuleStore: Send + Sync {
    /// Returns the rule for a half-year, or `StoreError::NotFound`.
    fn get(&self, period: PolicyPeriod) -> Result<PolicyRule, StoreError>;
}

/// Read-only access to salary history.
pub trait SalaryHistoryStore: Send + Sync {
    /// Returns every salary record of an employee, or `StoreError::NotFound`.
    fn get_by_employee(&self, employee_id: &str) -> Result<Vec<SalaryRecord>, StoreError>;

    /// Returns the employees with at least one salary record inside the period.
    fn list_employees_active_in_period(
        &self,
        period: PolicyPeriod,
    ) -> Result<Vec<String>, StoreError>;
}

/// Write access to calculation results.
pub trait ResultStore: Send + Sync {
    /// Deletes every row in the scope and returns how many were removed.
    fn delete_scope(&self, scope: &ResultScope) -> Result<usize, StoreError>;

    /// Inserts a batch of rows and returns how many were written.
    fn insert_batch(&self, rows: &[CalculationResult]) -> Result<usize, StoreError>;

    /// Counts the rows stored for a period and assumption.
    fn count_scope(
        &self,
        period: PolicyPeriod,
        wage_assumption: WageAssumption,
    ) -> Result<usize, StoreError>;
}

/// Destination for employees whose reference wage could not be resolved.
pub trait MissingReferenceSink: Send + Sync {
    /// Appends records for manual review.
    fn append(&self, records: &[MissingReferenceRecord]) -> Result<(), StoreError>;
}
