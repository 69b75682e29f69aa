//! Batch recompute of one `(period, wage_assumption)` scope.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calculation::{ContributionCalculator, MonthOutcome};
use crate::config::{BatchSettings, ConfigLoader, ReferenceYearTable};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationResult, EmployeeCategory, MissingReferenceRecord, PolicyPeriod, PolicyRule,
    ResultScope, WageAssumption,
};
use crate::store::{
    MissingReferenceSink, PolicyRuleProvider, PolicyRuleStore, ResultStore,
    SalaryHistoryProvider, SalaryHistoryStore,
};

use super::summary::{RunCounts, RunFailure, RunState, RunSummary, ScopeOutcome};

/// The stores a recompute reads from and writes to.
#[derive(Clone)]
pub struct EngineStores {
    /// Policy rules by half-year.
    pub policies: Arc<dyn PolicyRuleStore>,
    /// Salary history.
    pub salaries: Arc<dyn SalaryHistoryStore>,
    /// Calculation results.
    pub results: Arc<dyn ResultStore>,
    /// Employees queued for manual review.
    pub missing_references: Arc<dyn MissingReferenceSink>,
}

/// Recomputes theoretical contributions for a scope and replaces its rows.
///
/// A run moves through [`RunState`]s: the policy rule is fetched, active
/// employees are listed, every covered employee-month is calculated, rows
/// are sorted, and finally each chunk of employees has its stored rows
/// deleted and replaced. A failed chunk leaves earlier and later chunks
/// committed. Only a missing policy rule or a store failure before any
/// calculation aborts the run; everything else is reported in the
/// [`RunSummary`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use contribution_engine::batch::{BatchRecomputeOrchestrator, EngineStores};
/// use contribution_engine::config::{BatchSettings, ConfigLoader};
/// use contribution_engine::models::{Half, PolicyPeriod, WageAssumption};
/// use contribution_engine::store::{
///     InMemoryMissingReferenceSink, InMemoryResultStore, InMemorySalaryStore,
/// };
///
/// let config = ConfigLoader::load("./config/default").unwrap();
/// let stores = EngineStores {
///     policies: Arc::new(config.clone()),
///     salaries: Arc::new(InMemorySalaryStore::new()),
///     results: Arc::new(InMemoryResultStore::new()),
///     missing_references: Arc::new(InMemoryMissingReferenceSink::new()),
/// };
/// let orchestrator = BatchRecomputeOrchestrator::new(
///     stores,
///     config.reference_years().clone(),
///     BatchSettings::default(),
/// )
/// .unwrap();
///
/// let summary = orchestrator
///     .recompute(PolicyPeriod::new(2023, Half::H1), WageAssumption::Wide)
///     .unwrap();
/// assert_eq!(summary.counts.employees, 0);
/// ```
#[derive(Clone)]
pub struct BatchRecomputeOrchestrator {
    policies: PolicyRuleProvider,
    salaries: SalaryHistoryProvider,
    results: Arc<dyn ResultStore>,
    missing_references: Arc<dyn MissingReferenceSink>,
    calculator: ContributionCalculator,
    chunk_size: usize,
}

/// Mutable state carried through one run.
struct RunContext {
    run_id: Uuid,
    period: PolicyPeriod,
    wage_assumption: WageAssumption,
    state: RunState,
    counts: RunCounts,
    failures: Vec<RunFailure>,
    missing_references: Vec<MissingReferenceRecord>,
    /// Employee-months routed to manual review.
    missing_months: usize,
}

impl RunContext {
    fn advance(&mut self, state: RunState) {
        debug!(
            run_id = %self.run_id,
            from = %self.state,
            to = %state,
            "Run state transition"
        );
        self.state = state;
    }

    fn fail(&mut self, failure: RunFailure) {
        warn!(
            run_id = %self.run_id,
            employee_id = %failure.employee_id,
            kind = ?failure.kind,
            error = %failure.message,
            "Employee failed"
        );
        self.failures.push(failure);
    }
}

impl BatchRecomputeOrchestrator {
    /// Creates an orchestrator over the given stores.
    ///
    /// Fails with `ConfigParseError` when the batch settings are out of range.
    pub fn new(
        stores: EngineStores,
        reference_years: ReferenceYearTable,
        settings: BatchSettings,
    ) -> EngineResult<Self> {
        settings.validate("batch settings")?;
        Ok(Self {
            policies: PolicyRuleProvider::new(stores.policies),
            salaries: SalaryHistoryProvider::new(stores.salaries),
            results: stores.results,
            missing_references: stores.missing_references,
            calculator: ContributionCalculator::from_settings(reference_years, &settings),
            chunk_size: settings.chunk_size,
        })
    }

    /// Creates an orchestrator whose policy rules and settings come from a
    /// loaded configuration directory.
    pub fn from_config(
        config: ConfigLoader,
        salaries: Arc<dyn SalaryHistoryStore>,
        results: Arc<dyn ResultStore>,
        missing_references: Arc<dyn MissingReferenceSink>,
    ) -> EngineResult<Self> {
        let reference_years = config.reference_years().clone();
        let settings = config.batch_settings().clone();
        let stores = EngineStores {
            policies: Arc::new(config),
            salaries,
            results,
            missing_references,
        };
        Self::new(stores, reference_years, settings)
    }

    /// Returns the per-month calculator.
    pub fn calculator(&self) -> &ContributionCalculator {
        &self.calculator
    }

    /// Returns the policy rule provider.
    pub fn policies(&self) -> &PolicyRuleProvider {
        &self.policies
    }

    /// Returns the configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Counts the rows stored for a scope.
    pub fn count_scope(
        &self,
        period: PolicyPeriod,
        wage_assumption: WageAssumption,
    ) -> EngineResult<usize> {
        Ok(self.results.count_scope(period, wage_assumption)?)
    }

    /// Recomputes one scope and replaces its rows in the result store.
    ///
    /// Re-running with unchanged inputs produces the same rows.
    ///
    /// # Errors
    ///
    /// `MissingPolicyRule` or `InvalidPolicyRule` when the period's rule is
    /// unusable, and store errors raised while listing employees.
    pub fn recompute(
        &self,
        period: PolicyPeriod,
        wage_assumption: WageAssumption,
    ) -> EngineResult<RunSummary> {
        let started_at = Utc::now();
        let mut run = RunContext {
            run_id: Uuid::new_v4(),
            period,
            wage_assumption,
            state: RunState::Init,
            counts: RunCounts::default(),
            failures: Vec::new(),
            missing_references: Vec::new(),
            missing_months: 0,
        };

        info!(
            run_id = %run.run_id,
            period = %period,
            wage_assumption = %wage_assumption,
            "Starting recompute"
        );

        let rule = self.policies.get(period).inspect_err(|err| {
            warn!(run_id = %run.run_id, period = %period, error = %err, "Recompute aborted");
        })?;

        run.advance(RunState::Enumerate);
        let employees = self.salaries.active_employees(period).inspect_err(|err| {
            warn!(run_id = %run.run_id, period = %period, error = %err, "Recompute aborted");
        })?;
        run.counts.employees = employees.len();

        run.advance(RunState::Resolve);
        let mut rows = Vec::new();
        for employee_id in &employees {
            self.resolve_employee(&mut run, employee_id, &rule, &mut rows);
        }

        run.advance(RunState::Stage);
        rows.sort_by(|a, b| {
            (&a.employee_id, a.calculation_month).cmp(&(&b.employee_id, b.calculation_month))
        });

        run.advance(RunState::Commit);
        self.commit(&mut run, &employees, &rows);

        run.advance(RunState::Done);
        let summary = RunSummary {
            run_id: run.run_id,
            period,
            wage_assumption,
            state: run.state,
            counts: run.counts,
            failures: run.failures,
            missing_references: run.missing_references,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            run_id = %summary.run_id,
            period = %period,
            wage_assumption = %wage_assumption,
            employees = summary.counts.employees,
            attempted = summary.counts.attempted,
            succeeded = summary.counts.succeeded,
            failed = summary.counts.failed,
            missing_reference = summary.counts.missing_reference,
            skipped = summary.counts.skipped,
            "Recompute completed"
        );

        Ok(summary)
    }

    /// Recomputes every `(period, assumption)` pair in turn.
    ///
    /// A scope that aborts does not stop the others.
    pub fn recompute_periods(
        &self,
        periods: &[PolicyPeriod],
        wage_assumptions: &[WageAssumption],
    ) -> Vec<ScopeOutcome> {
        let mut outcomes = Vec::with_capacity(periods.len() * wage_assumptions.len());
        for &period in periods {
            for &wage_assumption in wage_assumptions {
                outcomes.push(ScopeOutcome {
                    period,
                    wage_assumption,
                    result: self.recompute(period, wage_assumption),
                });
            }
        }
        outcomes
    }

    fn resolve_employee(
        &self,
        run: &mut RunContext,
        employee_id: &str,
        rule: &PolicyRule,
        rows: &mut Vec<CalculationResult>,
    ) {
        let history = match self.salaries.history(employee_id) {
            Ok(history) => history,
            Err(err) => {
                run.counts.failed += run.period.months().len();
                run.fail(RunFailure::from_error(employee_id, None, &err));
                return;
            }
        };

        for month in run.period.months() {
            let outcome = self.calculator.calculate(
                employee_id,
                &history,
                month,
                run.wage_assumption,
                rule,
            );

            match outcome {
                Ok(MonthOutcome::Computed(row)) => {
                    run.counts.attempted += 1;
                    rows.push(*row);
                }
                Ok(MonthOutcome::NotCovered { .. }) => {
                    run.counts.skipped += 1;
                }
                Err(EngineError::MissingReferenceWage {
                    category,
                    preferred_source,
                    reason,
                    ..
                }) => {
                    run.counts.attempted += 1;
                    run.missing_months += 1;
                    record_missing_reference(run, employee_id, category, preferred_source, reason);
                }
                Err(err) => {
                    run.counts.attempted += 1;
                    run.counts.failed += 1;
                    run.fail(RunFailure::from_error(employee_id, Some(month), &err));
                }
            }
        }
    }

    fn commit(&self, run: &mut RunContext, employees: &[String], rows: &[CalculationResult]) {
        for ids in employees.chunks(self.chunk_size) {
            let (Some(first), Some(last)) = (ids.first(), ids.last()) else {
                continue;
            };
            // Rows and ids share the employee order, so the chunk's rows are contiguous.
            let from = rows.partition_point(|row| row.employee_id < *first);
            let to = rows.partition_point(|row| row.employee_id <= *last);
            let chunk_rows = &rows[from..to];

            match self.delete_chunk(run, ids) {
                Ok(deleted) => {
                    run.counts.deleted += deleted;
                    for chunk in chunk_rows.chunks(self.chunk_size) {
                        self.insert_chunk(run, chunk);
                    }
                }
                Err(err) => {
                    warn!(
                        run_id = %run.run_id,
                        employees = ids.len(),
                        error = %err,
                        "Chunk delete failed; its rows were not inserted"
                    );
                    run.counts.failed += chunk_rows.len();
                    for employee_id in ids {
                        run.fail(RunFailure::from_error(employee_id, None, &err));
                    }
                }
            }
        }

        if run.missing_references.is_empty() {
            return;
        }
        if let Err(err) = self.missing_references.append(&run.missing_references) {
            let err = EngineError::CommitFailure {
                operation: "append_missing_reference".to_string(),
                message: err.to_string(),
            };
            run.counts.failed += run.missing_months;
            let ids: Vec<String> = run
                .missing_references
                .iter()
                .map(|r| r.employee_id.clone())
                .collect();
            for employee_id in ids {
                run.fail(RunFailure::from_error(&employee_id, None, &err));
            }
        }
    }

    fn delete_chunk(&self, run: &RunContext, employee_ids: &[String]) -> EngineResult<usize> {
        let scope = ResultScope {
            period: run.period,
            wage_assumption: run.wage_assumption,
            employee_ids: employee_ids.to_vec(),
        };
        let deleted = self
            .results
            .delete_scope(&scope)
            .map_err(|err| EngineError::CommitFailure {
                operation: "delete_scope".to_string(),
                message: err.to_string(),
            })?;
        debug!(run_id = %run.run_id, deleted, "Chunk cleared");
        Ok(deleted)
    }

    fn insert_chunk(&self, run: &mut RunContext, chunk: &[CalculationResult]) {
        match self.results.insert_batch(chunk) {
            Ok(written) => {
                run.counts.succeeded += written;
                debug!(run_id = %run.run_id, written, "Chunk committed");
            }
            Err(err) => {
                let err = EngineError::CommitFailure {
                    operation: "insert_batch".to_string(),
                    message: err.to_string(),
                };
                run.counts.failed += chunk.len();
                let employees: BTreeSet<&str> =
                    chunk.iter().map(|row| row.employee_id.as_str()).collect();
                for employee_id in employees {
                    run.fail(RunFailure::from_error(employee_id, None, &err));
                }
            }
        }
    }
}

fn record_missing_reference(
    run: &mut RunContext,
    employee_id: &str,
    category: EmployeeCategory,
    preferred_source: String,
    reason: String,
) {
    if run
        .missing_references
        .iter()
        .any(|r| r.employee_id == employee_id)
    {
        return;
    }

    warn!(
        run_id = %run.run_id,
        employee_id = %employee_id,
        category = %category,
        reason = %reason,
        "Reference wage missing"
    );
    run.missing_references.push(MissingReferenceRecord {
        employee_id: employee_id.to_string(),
        period: run.period,
        wage_assumption: run.wage_assumption,
        category,
        preferred_source,
        reason,
    });
    run.counts.missing_reference += 1;
}
