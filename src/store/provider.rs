//! Typed adapters over the policy and salary stores.
//!
//! The providers turn a store's generic `NotFound` into the engine's typed
//! conditions so callers must handle a missing rule or history explicitly.

use std::sync::Arc;

use crate::error::{EngineError, EngineResult, StoreError};
use crate::models::{PolicyPeriod, PolicyRule, SalaryRecord};

use super::{PolicyRuleStore, SalaryHistoryStore};

/// Looks up policy rules by half-year.
#[derive(Clone)]
pub struct PolicyRuleProvider {
    store: Arc<dyn PolicyRuleStore>,
}

impl PolicyRuleProvider {
    /// Wraps a policy store.
    pub fn new(store: Arc<dyn PolicyRuleStore>) -> Self {
        Self { store }
    }

    /// Returns the rule for the period.
    ///
    /// Fails with `MissingPolicyRule` when the store has none, and with
    /// `InvalidPolicyRule` when the stored rule breaks its invariants.
    pub fn get(&self, period: PolicyPeriod) -> EngineResult<PolicyRule> {
        let rule = self.store.get(period).map_err(|e| match e {
            StoreError::NotFound { .. } => EngineError::MissingPolicyRule { period },
            other => EngineError::Store(other),
        })?;
        if rule.period != period {
            return Err(EngineError::InvalidPolicyRule {
                period,
                message: format!("store returned the rule for {}", rule.period),
            });
        }
        rule.validate()?;
        Ok(rule)
    }
}

/// Looks up salary history.
#[derive(Clone)]
pub struct SalaryHistoryProvider {
    store: Arc<dyn SalaryHistoryStore>,
}

impl SalaryHistoryProvider {
    /// Wraps a salary history store.
    pub fn new(store: Arc<dyn SalaryHistoryStore>) -> Self {
        Self { store }
    }

    /// Returns the employee's history sorted by month.
    ///
    /// Fails with `MissingSalaryRecord` when the store has no rows for the
    /// employee.
    pub fn history(&self, employee_id: &str) -> EngineResult<Vec<SalaryRecord>> {
        let mut records = self.store.get_by_employee(employee_id).map_err(|e| match e {
            StoreError::NotFound { .. } => EngineError::MissingSalaryRecord {
                employee_id: employee_id.to_string(),
            },
            other => EngineError::Store(other),
        })?;

        if records.is_empty() {
            return Err(EngineError::MissingSalaryRecord {
                employee_id: employee_id.to_string(),
            });
        }

        records.sort_by_key(|r| r.period_label);
        Ok(records)
    }

    /// Returns the deduplicated, sorted ids of employees active in the period.
    pub fn active_employees(&self, period: PolicyPeriod) -> EngineResult<Vec<String>> {
        let mut ids = self.store.list_employees_active_in_period(period)?;
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
