//! Batch recompute of theoretical contributions.
//!
//! [`BatchRecomputeOrchestrator`] recomputes every active employee-month of a
//! `(period, wage_assumption)` scope and replaces the scope's rows in the
//! result store, reporting the outcome as a [`RunSummary`].

mod orchestrator;
mod summary;

pub use orchestrator::{BatchRecomputeOrchestrator, EngineStores};
pub use summary::{FailureKind, RunCounts, RunFailure, RunState, RunSummary, ScopeOutcome};
