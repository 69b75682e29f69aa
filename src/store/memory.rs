//! In-memory store implementations.
//!
//! These back the engine in tests, benchmarks and the HTTP preview endpoint.
//! They enforce the same constraints a relational backend would: one salary
//! record per employee-month and no overwriting of existing result rows.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError, RwLock};

use rust_decimal::Decimal;

use crate::error::StoreError;
use crate::models::{
    CalculationMonth, CalculationResult, MissingReferenceRecord, PolicyPeriod, PolicyRule,
    ResultKey, ResultScope, SalaryRecord, WageAssumption,
};

use super::{MissingReferenceSink, PolicyRuleStore, ResultStore, SalaryHistoryStore};

fn poisoned<T>(operation: &str) -> impl FnOnce(PoisonError<T>) -> StoreError + '_ {
    move |_| StoreError::Backend {
        operation: operation.to_string(),
        message: "lock poisoned".to_string(),
    }
}

/// Policy rules held in memory.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    rules: RwLock<BTreeMap<PolicyPeriod, PolicyRule>>,
}

impl InMemoryPolicyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given rules.
    pub fn with_rules(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        let store = Self::new();
        for rule in rules {
            store.put(rule);
        }
        store
    }

    /// Adds or replaces the rule for its period.
    pub fn put(&self, rule: PolicyRule) {
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rule.period, rule);
    }
}

impl PolicyRuleStore for InMemoryPolicyStore {
    fn get(&self, period: PolicyPeriod) -> Result<PolicyRule, StoreError> {
        self.rules
            .read()
            .map_err(poisoned("get_policy_rule"))?
            .get(&period)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: format!("policy rule {period}"),
            })
    }
}

/// Salary history held in memory, indexed by employee then month.
#[derive(Debug, Default)]
pub struct InMemorySalaryStore {
    records: RwLock<BTreeMap<String, BTreeMap<CalculationMonth, SalaryRecord>>>,
}

impl InMemorySalaryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one record.
    ///
    /// Rejects a second record for the same employee-month and negative wages.
    pub fn insert(&self, record: SalaryRecord) -> Result<(), StoreError> {
        if record.basic_wage < Decimal::ZERO || record.gross_wage < Decimal::ZERO {
            return Err(StoreError::Constraint {
                message: format!(
                    "negative wage for employee '{}' in {}",
                    record.employee_id, record.period_label
                ),
            });
        }

        let mut records = self.records.write().map_err(poisoned("insert_salary"))?;
        let months = records.entry(record.employee_id.clone()).or_default();
        if months.contains_key(&record.period_label) {
            return Err(StoreError::Constraint {
                message: format!(
                    "duplicate salary record for employee '{}' in {}",
                    record.employee_id, record.period_label
                ),
            });
        }
        months.insert(record.period_label, record);
        Ok(())
    }

    /// Adds several records, stopping at the first rejected one.
    pub fn insert_all(
        &self,
        records: impl IntoIterator<Item = SalaryRecord>,
    ) -> Result<(), StoreError> {
        for record in records {
            self.insert(record)?;
        }
        Ok(())
    }

    /// Total number of stored records.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .map(|r| r.values().map(BTreeMap::len).sum::<usize>())
            .unwrap_or(0)
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SalaryHistoryStore for InMemorySalaryStore {
    fn get_by_employee(&self, employee_id: &str) -> Result<Vec<SalaryRecord>, StoreError> {
        self.records
            .read()
            .map_err(poisoned("get_by_employee"))?
            .get(employee_id)
            .map(|months| months.values().cloned().collect())
            .ok_or_else(|| StoreError::NotFound {
                what: format!("salary history for employee '{employee_id}'"),
            })
    }

    fn list_employees_active_in_period(
        &self,
        period: PolicyPeriod,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .records
            .read()
            .map_err(poisoned("list_employees_active_in_period"))?
            .iter()
            .filter(|(_, months)| months.keys().any(|m| period.contains(*m)))
            .map(|(id, _)| id.clone())
            .collect())
    }
}

/// Result rows held in memory, keyed like a composite primary key.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    rows: RwLock<BTreeMap<ResultKey, CalculationResult>>,
}

impl InMemoryResultStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rows for a period and assumption in key order.
    pub fn rows(
        &self,
        period: PolicyPeriod,
        wage_assumption: WageAssumption,
    ) -> Vec<CalculationResult> {
        self.rows
            .read()
            .map(|rows| {
                rows.values()
                    .filter(|r| r.period == period && r.wage_assumption == wage_assumption)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns every stored row in key order.
    pub fn all_rows(&self) -> Vec<CalculationResult> {
        self.rows
            .read()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl ResultStore for InMemoryResultStore {
    fn delete_scope(&self, scope: &ResultScope) -> Result<usize, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned("delete_scope"))?;
        let before = rows.len();
        rows.retain(|_, row| !scope.contains(row));
        Ok(before - rows.len())
    }

    fn insert_batch(&self, batch: &[CalculationResult]) -> Result<usize, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned("insert_batch"))?;

        // All-or-nothing: validate the whole batch before writing any row.
        let mut keys = Vec::with_capacity(batch.len());
        for row in batch {
            let key = row.key();
            if rows.contains_key(&key) || keys.contains(&key) {
                return Err(StoreError::Constraint {
                    message: format!(
                        "result row already exists for employee '{}' in {} ({}, {})",
                        key.employee_id, key.calculation_month, key.period, key.wage_assumption
                    ),
                });
            }
            keys.push(key);
        }

        for (key, row) in keys.into_iter().zip(batch) {
            rows.insert(key, row.clone());
        }
        Ok(batch.len())
    }

    fn count_scope(
        &self,
        period: PolicyPeriod,
        wage_assumption: WageAssumption,
    ) -> Result<usize, StoreError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned("count_scope"))?
            .values()
            .filter(|r| r.period == period && r.wage_assumption == wage_assumption)
            .count())
    }
}

/// Missing-reference records held in memory.
#[derive(Debug, Default)]
pub struct InMemoryMissingReferenceSink {
    records: Mutex<Vec<MissingReferenceRecord>>,
}

impl InMemoryMissingReferenceSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every appended record in arrival order.
    pub fn records(&self) -> Vec<MissingReferenceRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl MissingReferenceSink for InMemoryMissingReferenceSink {
    fn append(&self, records: &[MissingReferenceRecord]) -> Result<(), StoreError> {
        self.records
            .lock()
            .map_err(poisoned("append_missing_reference"))?
            .extend_from_slice(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Half;
    use crate::test_support::{record, sample_result};

    #[test]
    fn test_salary_store_rejects_duplicate_month() {
        let store = InMemorySalaryStore::new();
        store
            .insert(record("E1", "2021-05-01", "202301", "5000", "6000"))
            .unwrap();
        let result = store.insert(record("E1", "2021-05-01", "202301", "5100", "6100"));
        assert!(matches!(result, Err(StoreError::Constraint { .. })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_salary_store_rejects_negative_wage() {
        let store = InMemorySalaryStore::new();
        let result = store.insert(record("E1", "2021-05-01", "202301", "-1", "6000"));
        assert!(matches!(result, Err(StoreError::Constraint { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_salary_store_unknown_employee_is_not_found() {
        let store = InMemorySalaryStore::new();
        assert!(matches!(
            store.get_by_employee("E404"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_result_store_insert_delete_count() {
        let store = InMemoryResultStore::new();
        let period = PolicyPeriod::new(2023, Half::H1);
        let rows = vec![
            sample_result("E1", "202301", WageAssumption::Wide),
            sample_result("E1", "202302", WageAssumption::Wide),
            sample_result("E2", "202301", WageAssumption::Wide),
            sample_result("E1", "202301", WageAssumption::Narrow),
        ];
        assert_eq!(store.insert_batch(&rows).unwrap(), 4);
        assert_eq!(store.count_scope(period, WageAssumption::Wide).unwrap(), 3);

        let scope = ResultScope {
            period,
            wage_assumption: WageAssumption::Wide,
            employee_ids: vec!["E1".to_string()],
        };
        assert_eq!(store.delete_scope(&scope).unwrap(), 2);
        assert_eq!(store.count_scope(period, WageAssumption::Wide).unwrap(), 1);
        assert_eq!(store.count_scope(period, WageAssumption::Narrow).unwrap(), 1);
    }

    #[test]
    fn test_result_store_rejects_existing_row_atomically() {
        let store = InMemoryResultStore::new();
        store
            .insert_batch(&[sample_result("E1", "202301", WageAssumption::Wide)])
            .unwrap();

        let batch = vec![
            sample_result("E2", "202301", WageAssumption::Wide),
            sample_result("E1", "202301", WageAssumption::Wide),
        ];
        assert!(matches!(
            store.insert_batch(&batch),
            Err(StoreError::Constraint { .. })
        ));
        assert_eq!(store.all_rows().len(), 1);
    }

    #[test]
    fn test_result_store_rejects_duplicates_within_batch() {
        let store = InMemoryResultStore::new();
        let row = sample_result("E1", "202301", WageAssumption::Wide);
        assert!(store.insert_batch(&[row.clone(), row]).is_err());
        assert!(store.all_rows().is_empty());
    }

    #[test]
    fn test_missing_reference_sink_appends_in_order() {
        let sink = InMemoryMissingReferenceSink::new();
        let make = |id: &str| MissingReferenceRecord {
            employee_id: id.to_string(),
            period: PolicyPeriod::new(2023, Half::H1),
            wage_assumption: WageAssumption::Wide,
            category: crate::models::EmployeeCategory::B,
            preferred_source: "first-month wage 202303 (gross wage)".to_string(),
            reason: "no salary record for 202303".to_string(),
        };
        sink.append(&[make("E1")]).unwrap();
        sink.append(&[make("E2"), make("E3")]).unwrap();
        let ids: Vec<String> = sink.records().into_iter().map(|r| r.employee_id).collect();
        assert_eq!(ids, vec!["E1", "E2", "E3"]);
    }
}
