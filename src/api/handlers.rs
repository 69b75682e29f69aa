//! HTTP request handlers for the Contribution Engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::MonthOutcome;
use crate::error::EngineError;
use crate::models::CalculationResult;
use crate::store::{InMemorySalaryStore, SalaryHistoryProvider};

use super::request::{CalculateRequest, RecomputeRequest};
use super::response::{ApiError, ApiErrorResponse, ScopeReport};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/recompute", post(recompute_handler))
        .route("/calculate", post(calculate_handler))
        .with_state(state)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(error: ApiErrorResponse) -> Response {
    json_response(error.status, error.error)
}

/// Maps a JSON extraction failure to a 400 response body.
fn rejection_error(rejection: JsonRejection, correlation_id: Uuid) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    }
}

/// Handler for POST /recompute endpoint.
///
/// Recomputes the requested period under each wage assumption and returns
/// one report per assumption. When every scope aborts, the first error is
/// returned with its status instead. Recomputes are serialized.
async fn recompute_handler(
    State(state): State<AppState>,
    payload: Result<Json<RecomputeRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing recompute request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                rejection_error(rejection, correlation_id),
            );
        }
    };

    if request.wage_assumptions.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            ApiError::validation_error("wage_assumptions must not be empty"),
        );
    }

    let _guard = state.recompute_lock().lock().await;

    let start_time = Instant::now();
    let orchestrator = Arc::clone(state.orchestrator());
    let period = request.period;
    let assumptions = request.wage_assumptions;
    let joined = tokio::task::spawn_blocking(move || {
        orchestrator.recompute_periods(&[period], &assumptions)
    })
    .await;

    match joined {
        Ok(outcomes) => {
            let aborted = outcomes.iter().filter(|o| o.result.is_err()).count();
            let outcomes = if aborted == outcomes.len() {
                match outcomes.into_iter().find_map(|o| o.result.err()) {
                    Some(err) => {
                        warn!(
                            correlation_id = %correlation_id,
                            period = %period,
                            error = %err,
                            "Recompute failed"
                        );
                        return error_response(err.into());
                    }
                    None => Vec::new(),
                }
            } else {
                outcomes
            };

            info!(
                correlation_id = %correlation_id,
                period = %period,
                runs = outcomes.len(),
                aborted,
                duration_ms = start_time.elapsed().as_millis(),
                "Recompute request completed"
            );
            let reports: Vec<ScopeReport> = outcomes.into_iter().map(ScopeReport::from).collect();
            json_response(StatusCode::OK, reports)
        }
        Err(join_error) => {
            warn!(
                correlation_id = %correlation_id,
                error = %join_error,
                "Recompute task did not complete"
            );
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", "Recompute task did not complete"),
            )
        }
    }
}

/// Handler for POST /calculate endpoint.
///
/// Previews one employee-month from the salary history in the request body.
/// Nothing is written to the result store.
async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing calculation request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                rejection_error(rejection, correlation_id),
            );
        }
    };

    let start_time = Instant::now();
    match preview(&state, &request) {
        Ok(MonthOutcome::Computed(row)) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = %row.employee_id,
                calculation_month = %row.calculation_month,
                theoretical_total = %row.theoretical_total,
                duration_us = start_time.elapsed().as_micros(),
                "Calculation completed successfully"
            );
            json_response::<CalculationResult>(StatusCode::OK, *row)
        }
        Ok(MonthOutcome::NotCovered {
            social_security_start,
        }) => json_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::not_covered(request.calculation_month, social_security_start),
        ),
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                employee_id = %request.employee_id,
                error = %err,
                "Calculation failed"
            );
            error_response(err.into())
        }
    }
}

/// Validates the inline history and calculates the requested month.
fn preview(state: &AppState, request: &CalculateRequest) -> Result<MonthOutcome, EngineError> {
    let salaries = InMemorySalaryStore::new();
    salaries.insert_all(request.salary_records())?;
    let history = SalaryHistoryProvider::new(Arc::new(salaries)).history(&request.employee_id)?;

    let orchestrator = state.orchestrator();
    let rule = orchestrator
        .policies()
        .get(request.calculation_month.policy_period())?;

    orchestrator.calculator().calculate(
        &request.employee_id,
        &history,
        request.calculation_month,
        request.wage_assumption,
        &rule,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchRecomputeOrchestrator;
    use crate::config::ConfigLoader;
    use crate::store::{InMemoryMissingReferenceSink, InMemoryResultStore};
    use crate::test_support::{dec, record};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/default").expect("Failed to load config");
        let salaries = InMemorySalaryStore::new();
        salaries
            .insert_all([
                record("E1", "2020-05-06", "202107", "5000", "6000"),
                record("E1", "2020-05-06", "202303", "5200", "6400"),
            ])
            .unwrap();
        let orchestrator = BatchRecomputeOrchestrator::from_config(
            config,
            Arc::new(salaries),
            Arc::new(InMemoryResultStore::new()),
            Arc::new(InMemoryMissingReferenceSink::new()),
        )
        .unwrap();
        AppState::new(orchestrator)
    }

    async fn post(uri: &str, body: String) -> (StatusCode, Vec<u8>) {
        let response = create_router(create_test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_recompute_returns_one_summary_per_assumption() {
        let (status, body) = post("/recompute", r#"{"period": "2023H1"}"#.to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let reports: Vec<ScopeReport> = serde_json::from_slice(&body).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.error.is_none()));
        assert!(
            reports
                .iter()
                .filter_map(|r| r.summary.as_ref())
                .all(|s| s.counts.succeeded == 6)
        );
    }

    #[tokio::test]
    async fn test_recompute_unknown_period_returns_404() {
        let (status, body) = post("/recompute", r#"{"period": "2030H1"}"#.to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "POLICY_RULE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let (status, body) = post("/recompute", "{invalid json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_calculate_previews_new_hire() {
        let body = serde_json::json!({
            "employee_id": "N1",
            "calculation_month": "202303",
            "salary_history": [
                {"period_label": "202303", "hire_date": "2023-03-01", "basic_wage": "5000", "gross_wage": "6000"}
            ]
        });
        let (status, body) = post("/calculate", body.to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let row: CalculationResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(row.reference_wage_base, dec("6000"));
        assert_eq!(row.pension.payment, dec("960.00"));
        assert_eq!(row.audit_trace.len(), 3);
    }

    #[tokio::test]
    async fn test_calculate_before_coverage_returns_422() {
        let body = serde_json::json!({
            "employee_id": "N2",
            "calculation_month": "202303",
            "salary_history": [
                {"period_label": "202304", "hire_date": "2023-03-16", "basic_wage": "5000", "gross_wage": "6000"}
            ]
        });
        let (status, body) = post("/calculate", body.to_string()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "NOT_COVERED");
    }

    #[tokio::test]
    async fn test_calculate_rejects_duplicate_months() {
        let body = serde_json::json!({
            "employee_id": "N3",
            "calculation_month": "202303",
            "salary_history": [
                {"period_label": "202303", "hire_date": "2023-03-01", "basic_wage": "5000", "gross_wage": "6000"},
                {"period_label": "202303", "hire_date": "2023-03-01", "basic_wage": "5100", "gross_wage": "6100"}
            ]
        });
        let (status, body) = post("/calculate", body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "VALIDATION_ERROR");
    }
}
