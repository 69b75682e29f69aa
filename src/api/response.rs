//! Response types for the Contribution Engine API.
//!
//! This module defines the error response structures and error handling
//! for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::batch::{RunSummary, ScopeOutcome};
use crate::error::{EngineError, StoreError};
use crate::models::{CalculationMonth, PolicyPeriod, WageAssumption};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }

    /// Creates the response for a month before social-security coverage.
    pub fn not_covered(month: CalculationMonth, start: CalculationMonth) -> Self {
        Self::with_details(
            "NOT_COVERED",
            format!("Month {month} precedes social-security coverage"),
            format!("Coverage starts in {start}"),
        )
    }
}

/// One scope of a recompute response: its summary, or the error that
/// aborted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeReport {
    /// The policy period.
    pub period: PolicyPeriod,
    /// The wage assumption.
    pub wage_assumption: WageAssumption,
    /// Present when the scope ran to completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    /// Present when the scope aborted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl From<ScopeOutcome> for ScopeReport {
    fn from(outcome: ScopeOutcome) -> Self {
        let (summary, error) = match outcome.result {
            Ok(summary) => (Some(summary), None),
            Err(err) => (None, Some(ApiErrorResponse::from(err).error)),
        };
        Self {
            period: outcome.period,
            wage_assumption: outcome.wage_assumption,
            summary,
            error,
        }
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Pairs an error body with a status code.
    pub fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ApiErrorResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
                )
            }
            EngineError::InvalidPolicyRule { .. } => ApiErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INVALID_POLICY_RULE", message),
            ),
            EngineError::InvalidMonth { .. } | EngineError::InvalidPeriod { .. } => {
                ApiErrorResponse::new(StatusCode::BAD_REQUEST, ApiError::validation_error(message))
            }
            EngineError::InvalidHireYear { .. } => ApiErrorResponse::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::with_details(
                    "INVALID_HIRE_YEAR",
                    message,
                    "The hire date is more than one year after the social-security year",
                ),
            ),
            EngineError::MissingSalaryRecord { .. } => ApiErrorResponse::new(
                StatusCode::BAD_REQUEST,
                ApiError::new("MISSING_SALARY_RECORD", message),
            ),
            EngineError::MissingPolicyRule { period } => ApiErrorResponse::new(
                StatusCode::NOT_FOUND,
                ApiError::with_details(
                    "POLICY_RULE_NOT_FOUND",
                    message,
                    format!("No floor/cap/rate table is configured for {period}"),
                ),
            ),
            EngineError::MissingReferenceWage { reason, .. } => ApiErrorResponse::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::with_details("MISSING_REFERENCE_WAGE", message, reason),
            ),
            EngineError::CommitFailure { .. } => ApiErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("COMMIT_FAILURE", message),
            ),
            EngineError::Store(store) => {
                let (status, code) = match store {
                    StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    StoreError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "STORE_TIMEOUT"),
                    StoreError::Backend { .. } => (StatusCode::BAD_GATEWAY, "STORE_ERROR"),
                    StoreError::Constraint { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                };
                ApiErrorResponse::new(status, ApiError::new(code, message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Half;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_missing_policy_rule_is_404() {
        let api_error: ApiErrorResponse = EngineError::MissingPolicyRule {
            period: PolicyPeriod::new(2025, Half::H1),
        }
        .into();
        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.error.code, "POLICY_RULE_NOT_FOUND");
        assert!(api_error.error.details.unwrap().contains("2025H1"));
    }

    #[test]
    fn test_store_constraint_is_validation_error() {
        let api_error: ApiErrorResponse = EngineError::Store(StoreError::Constraint {
            message: "duplicate salary record".to_string(),
        })
        .into();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.error.code, "VALIDATION_ERROR");
    }

    #[test]
    fn test_aborted_scope_reports_error_body() {
        let report = ScopeReport::from(ScopeOutcome {
            period: PolicyPeriod::new(2024, Half::H2),
            wage_assumption: WageAssumption::Narrow,
            result: Err(EngineError::Store(StoreError::Timeout {
                operation: "list_employees_active_in_period".to_string(),
            })),
        });
        assert!(report.summary.is_none());
        assert_eq!(
            report.error.as_ref().map(|e| e.code.as_str()),
            Some("STORE_TIMEOUT")
        );

        let json = serde_json::to_value(ScopeReport {
            error: None,
            ..report
        })
        .unwrap();
        assert_eq!(json["period"], "2024H2");
        assert!(json.get("summary").is_none());
    }

    #[test]
    fn test_not_covered_names_start_month() {
        let error = ApiError::not_covered("202303".parse().unwrap(), "202304".parse().unwrap());
        assert_eq!(error.code, "NOT_COVERED");
        assert_eq!(error.details.as_deref(), Some("Coverage starts in 202304"));
    }
}
