//! HTTP API module for the Contribution Engine.
//!
//! This module provides the REST endpoints for recomputing a period's
//! contributions and previewing a single employee-month.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{CalculateRequest, RecomputeRequest, SalaryRecordRequest};
pub use response::{ApiError, ApiErrorResponse, ScopeReport};
pub use state::AppState;
