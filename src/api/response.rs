//! Response types for the payroll engine API.
//!
//! This module defines the error response structures, the mapping from
//! [`EngineError`] to HTTP status codes, and the presentation views of
//! payslips, whose amounts are rounded only here.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculation::round_for_presentation;
use crate::error::EngineError;
use crate::models::{Breakdown, ComponentId, ComponentKind, PayslipStatus};
use crate::payroll::PayslipWithLines;

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
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
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
        let (status, error) = match error {
            EngineError::ConfigNotFound { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
            ),
            EngineError::ConfigParseError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("CONFIG_ERROR", "Configuration parse error", message),
            ),
            EngineError::Validation { field, .. } => (
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "VALIDATION_ERROR",
                    message,
                    format!("The field '{}' is invalid", field),
                ),
            ),
            EngineError::NotFound { resource, .. } => (
                StatusCode::NOT_FOUND,
                ApiError::new(format!("{}_NOT_FOUND", resource.to_uppercase()), message),
            ),
            EngineError::DuplicateCycle { existing, .. } => (
                StatusCode::CONFLICT,
                ApiError::with_details(
                    "DUPLICATE_CYCLE",
                    message,
                    format!("Existing cycle: {}", existing),
                ),
            ),
            EngineError::InvalidTransition { .. } => (
                StatusCode::CONFLICT,
                ApiError::new("INVALID_TRANSITION", message),
            ),
            EngineError::GroupAlreadyProcessed { .. } => (
                StatusCode::CONFLICT,
                ApiError::new("GROUP_ALREADY_PROCESSED", message),
            ),
            EngineError::FlagAlreadyResolved { .. } => (
                StatusCode::CONFLICT,
                ApiError::new("FLAG_ALREADY_RESOLVED", message),
            ),
            EngineError::AuditNotClear { .. } => (
                StatusCode::CONFLICT,
                ApiError::with_details(
                    "AUDIT_NOT_CLEAR",
                    message,
                    "Resolve open audit flags before moving the cycle to review",
                ),
            ),
            EngineError::FormulaError { .. }
            | EngineError::CircularDependency { .. }
            | EngineError::CalculationError { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::with_details("CALCULATION_ERROR", "Calculation failed", message),
            ),
            EngineError::FatalTransaction { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details(
                    "TRANSACTION_ERROR",
                    "The request was rolled back",
                    message,
                ),
            ),
        };
        ApiErrorResponse { status, error }
    }
}

/// A payslip line as presented to API consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayslipLineView {
    /// Line identifier.
    pub id: Uuid,
    /// The component, absent for settlement lines.
    pub component_id: Option<ComponentId>,
    /// Display name.
    pub name: String,
    /// Earning or deduction.
    #[serde(rename = "type")]
    pub line_type: ComponentKind,
    /// Rounded amount.
    pub amount: Decimal,
    /// Full-precision breakdown.
    pub breakdown: Breakdown,
}

/// A payslip as presented to API consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayslipView {
    /// Payslip identifier.
    pub id: Uuid,
    /// The cycle.
    pub cycle_id: Uuid,
    /// The employee.
    pub employee_id: String,
    /// Rounded gross.
    pub gross: Decimal,
    /// Rounded deductions.
    pub deductions: Decimal,
    /// Rounded net.
    pub net: Decimal,
    /// Lifecycle state.
    pub status: PayslipStatus,
    /// The lines.
    pub lines: Vec<PayslipLineView>,
}

impl PayslipView {
    /// Builds the view, rounding amounts to `decimal_places`.
    ///
    /// Totals are rounded from the stored full-precision values, not summed
    /// from rounded lines.
    pub fn present(payslip: PayslipWithLines, decimal_places: u32) -> Self {
        let round = |amount: Decimal| round_for_presentation(amount, decimal_places);
        let PayslipWithLines { payslip, lines } = payslip;
        Self {
            id: payslip.id,
            cycle_id: payslip.cycle_id,
            employee_id: payslip.employee_id,
            gross: round(payslip.gross),
            deductions: round(payslip.deductions),
            net: round(payslip.net),
            status: payslip.status,
            lines: lines
                .into_iter()
                .map(|l| PayslipLineView {
                    id: l.id,
                    component_id: l.component_id,
                    name: l.name,
                    line_type: l.line_type,
                    amount: round(l.amount),
                    breakdown: l.breakdown,
                })
                .collect(),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok".
    pub status: String,
    /// The organisation from configuration.
    pub organisation: String,
    /// Crate version.
    pub version: String,
}
