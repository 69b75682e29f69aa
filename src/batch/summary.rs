//! Run summary types returned by a batch recompute.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{CalculationMonth, MissingReferenceRecord, PolicyPeriod, WageAssumption};

/// Phases of a recompute run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Fetching the policy rule.
    Init,
    /// Listing active employees.
    Enumerate,
    /// Calculating employee-months.
    Resolve,
    /// Sorting and chunking rows.
    Stage,
    /// Replacing the scope in the result store.
    Commit,
    /// Finished.
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Init => "init",
            RunState::Enumerate => "enumerate",
            RunState::Resolve => "resolve",
            RunState::Stage => "stage",
            RunState::Commit => "commit",
            RunState::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Classifies a per-employee failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The hire date is inconsistent with the month.
    InvalidHireYear,
    /// The salary store has no history for the employee.
    MissingSalaryRecord,
    /// The policy rule could not be applied.
    InvalidPolicyRule,
    /// The employee's rows could not be written.
    CommitFailure,
    /// A store call failed while reading.
    Store,
    /// Any other engine error.
    Other,
}

impl From<&EngineError> for FailureKind {
    fn from(error: &EngineError) -> Self {
        match error {
            EngineError::InvalidHireYear { .. } => FailureKind::InvalidHireYear,
            EngineError::MissingSalaryRecord { .. } => FailureKind::MissingSalaryRecord,
            EngineError::InvalidPolicyRule { .. } => FailureKind::InvalidPolicyRule,
            EngineError::CommitFailure { .. } => FailureKind::CommitFailure,
            EngineError::Store(_) => FailureKind::Store,
            _ => FailureKind::Other,
        }
    }
}

/// One employee (or employee-month) that produced no committed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// The employee.
    pub employee_id: String,
    /// The month, when the failure is specific to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation_month: Option<CalculationMonth>,
    /// What went wrong.
    pub kind: FailureKind,
    /// The error message.
    pub message: String,
}

impl RunFailure {
    /// Builds a failure record from an engine error.
    pub fn from_error(
        employee_id: &str,
        calculation_month: Option<CalculationMonth>,
        error: &EngineError,
    ) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            calculation_month,
            kind: FailureKind::from(error),
            message: error.to_string(),
        }
    }
}

/// Counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    /// Employees enumerated for the period.
    pub employees: usize,
    /// Employee-months on or after coverage start that were calculated.
    pub attempted: usize,
    /// Result rows committed.
    pub succeeded: usize,
    /// Employee-months that produced no committed row and were not routed
    /// to manual review. When an employee's history cannot be read, every
    /// month of the period counts; when the manual-review append fails, the
    /// routed months count.
    pub failed: usize,
    /// Employees recorded for manual review.
    pub missing_reference: usize,
    /// Employee-months before coverage start.
    pub skipped: usize,
    /// Previously stored rows removed from the scope.
    pub deleted: usize,
}

/// The outcome of recomputing one `(period, wage_assumption)` scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifier for log correlation.
    pub run_id: Uuid,
    /// The policy period.
    pub period: PolicyPeriod,
    /// The wage assumption.
    pub wage_assumption: WageAssumption,
    /// The last state reached.
    pub state: RunState,
    /// Counters.
    pub counts: RunCounts,
    /// Employees or employee-months without a committed row.
    pub failures: Vec<RunFailure>,
    /// Employees whose reference wage could not be resolved.
    pub missing_references: Vec<MissingReferenceRecord>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Returns true if every attempted employee-month was committed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.missing_references.is_empty()
    }
}

/// The outcome of one scope in a multi-scope recompute.
#[derive(Debug)]
pub struct ScopeOutcome {
    /// The policy period.
    pub period: PolicyPeriod,
    /// The wage assumption.
    pub wage_assumption: WageAssumption,
    /// The run summary, or the error that aborted the run.
    pub result: Result<RunSummary, EngineError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_failure_kind_from_error() {
        let error = EngineError::MissingSalaryRecord {
            employee_id: "E1".to_string(),
        };
        assert_eq!(FailureKind::from(&error), FailureKind::MissingSalaryRecord);

        let error = EngineError::Store(StoreError::Timeout {
            operation: "get_by_employee".to_string(),
        });
        assert_eq!(FailureKind::from(&error), FailureKind::Store);
    }

    #[test]
    fn test_run_failure_carries_message() {
        let error = EngineError::CommitFailure {
            operation: "insert_batch".to_string(),
            message: "connection reset".to_string(),
        };
        let failure = RunFailure::from_error("E9", None, &error);
        assert_eq!(failure.kind, FailureKind::CommitFailure);
        assert_eq!(
            failure.message,
            "Commit failed during insert_batch: connection reset"
        );
    }

    #[test]
    fn test_run_state_order_follows_phases() {
        assert!(RunState::Init < RunState::Enumerate);
        assert!(RunState::Stage < RunState::Commit);
        assert!(RunState::Commit < RunState::Done);
        assert_eq!(serde_json::to_string(&RunState::Done).unwrap(), "\"done\"");
    }
}
