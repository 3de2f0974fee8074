//! HTTP request handlers for the payroll engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::GroupId;
use crate::payroll::PayrollService;

use super::request::{CreateCycleRequest, FlagQuery, ResolveFlagRequest, TransitionRequest};
use super::response::{ApiError, ApiErrorResponse, HealthResponse, PayslipView};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/cycles", post(create_cycle_handler).get(list_cycles_handler))
        .route("/cycles/:id", get(get_cycle_handler))
        .route("/cycles/:id/transition", post(transition_handler))
        .route("/cycles/:id/groups/:group_id/run", post(run_group_handler))
        .route("/cycles/:id/audit/run", post(run_audit_handler))
        .route("/cycles/:id/audit/verify", post(verify_audit_handler))
        .route("/cycles/:id/audit/flags", get(list_flags_handler))
        .route("/cycles/:id/payslips", get(list_payslips_handler))
        .route("/flags/:id/resolve", post(resolve_flag_handler))
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

/// Runs a whole-roster service call on the blocking pool so generation and
/// lock waits stay off the async workers.
async fn run_blocking<R, F>(state: &AppState, f: F) -> EngineResult<R>
where
    R: Send + 'static,
    F: FnOnce(&PayrollService) -> EngineResult<R> + Send + 'static,
{
    let service = state.shared_service();
    tokio::task::spawn_blocking(move || f(service.as_ref()))
        .await
        .map_err(|e| EngineError::FatalTransaction {
            message: format!("payroll task did not complete: {}", e),
        })?
}

fn engine_error(correlation_id: Uuid, operation: &'static str, err: EngineError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        operation,
        error = %err,
        "Request failed"
    );
    ApiErrorResponse::from(err).into_response()
}

/// Maps a body rejection to a 400, telling missing fields apart from
/// malformed JSON.
fn body_rejection(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // Get the body text which contains the detailed error from serde
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
    };
    ApiErrorResponse::bad_request(error).into_response()
}

fn path_rejection(correlation_id: Uuid, rejection: PathRejection) -> Response {
    let message = rejection.body_text();
    warn!(correlation_id = %correlation_id, error = %message, "Invalid path parameter");
    ApiErrorResponse::bad_request(ApiError::new("INVALID_PATH", message)).into_response()
}

fn query_rejection(correlation_id: Uuid, rejection: QueryRejection) -> Response {
    let message = rejection.body_text();
    warn!(correlation_id = %correlation_id, error = %message, "Invalid query string");
    ApiErrorResponse::bad_request(ApiError::new("INVALID_QUERY", message)).into_response()
}

/// Handler for GET /health.
async fn health_handler(State(state): State<AppState>) -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok".to_string(),
            organisation: state.service().settings().metadata.organisation.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )
}

/// Handler for POST /cycles.
async fn create_cycle_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateCycleRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing create cycle request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return body_rejection(correlation_id, rejection),
    };

    match state.service().create_cycle(request.into()) {
        Ok(cycle) => {
            info!(
                correlation_id = %correlation_id,
                cycle_id = %cycle.id,
                start_date = %cycle.start_date,
                end_date = %cycle.end_date,
                "Cycle created"
            );
            json_response(StatusCode::CREATED, cycle)
        }
        Err(err) => engine_error(correlation_id, "create_cycle", err),
    }
}

/// Handler for GET /cycles.
async fn list_cycles_handler(State(state): State<AppState>) -> Response {
    let correlation_id = Uuid::new_v4();
    match state.service().list_cycles() {
        Ok(cycles) => json_response(StatusCode::OK, cycles),
        Err(err) => engine_error(correlation_id, "list_cycles", err),
    }
}

/// Handler for GET /cycles/:id.
async fn get_cycle_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let cycle_id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection),
    };
    match state.service().get_cycle(cycle_id) {
        Ok(cycle) => json_response(StatusCode::OK, cycle),
        Err(err) => engine_error(correlation_id, "get_cycle", err),
    }
}

/// Handler for POST /cycles/:id/transition.
///
/// Entering review generates payslips and finalizing settles source records,
/// so this is the slowest endpoint; its duration is logged.
async fn transition_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let cycle_id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection),
    };
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return body_rejection(correlation_id, rejection),
    };
    info!(
        correlation_id = %correlation_id,
        cycle_id = %cycle_id,
        to = %request.status,
        "Processing transition request"
    );

    let start_time = Instant::now();
    let to = request.status;
    match run_blocking(&state, move |service| service.transition(cycle_id, to)).await {
        Ok(outcome) => {
            info!(
                correlation_id = %correlation_id,
                cycle_id = %cycle_id,
                status = %outcome.cycle.status,
                duration_us = start_time.elapsed().as_micros(),
                "Transition completed successfully"
            );
            json_response(StatusCode::OK, outcome)
        }
        Err(err) => engine_error(correlation_id, "transition", err),
    }
}

/// Handler for POST /cycles/:id/groups/:group_id/run.
async fn run_group_handler(
    State(state): State<AppState>,
    path: Result<Path<(Uuid, GroupId)>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let (cycle_id, group_id) = match path {
        Ok(Path(ids)) => ids,
        Err(rejection) => return path_rejection(correlation_id, rejection),
    };
    info!(
        correlation_id = %correlation_id,
        cycle_id = %cycle_id,
        group_id,
        "Processing group run"
    );

    let start_time = Instant::now();
    match run_blocking(&state, move |service| service.run_group(cycle_id, group_id)).await {
        Ok(summary) => {
            info!(
                correlation_id = %correlation_id,
                processed = summary.processed,
                errors = summary.errors,
                duration_us = start_time.elapsed().as_micros(),
                "Group run completed successfully"
            );
            json_response(StatusCode::OK, summary)
        }
        Err(err) => engine_error(correlation_id, "run_group", err),
    }
}

/// Handler for POST /cycles/:id/audit/run.
async fn run_audit_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let cycle_id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection),
    };
    match run_blocking(&state, move |service| service.run_audit(cycle_id)).await {
        Ok(report) => json_response(StatusCode::OK, report),
        Err(err) => engine_error(correlation_id, "run_audit", err),
    }
}

/// Handler for POST /cycles/:id/audit/verify.
async fn verify_audit_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let cycle_id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection),
    };
    match run_blocking(&state, move |service| service.verify_audit(cycle_id)).await {
        Ok(report) => json_response(StatusCode::OK, report),
        Err(err) => engine_error(correlation_id, "verify_audit", err),
    }
}

/// Handler for GET /cycles/:id/audit/flags.
async fn list_flags_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<FlagQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let cycle_id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection),
    };
    let query = match query {
        Ok(Query(q)) => q,
        Err(rejection) => return query_rejection(correlation_id, rejection),
    };
    match state.service().list_flags(cycle_id, query.status) {
        Ok(flags) => json_response(StatusCode::OK, flags),
        Err(err) => engine_error(correlation_id, "list_flags", err),
    }
}

/// Handler for POST /flags/:id/resolve.
async fn resolve_flag_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ResolveFlagRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let flag_id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection),
    };
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return body_rejection(correlation_id, rejection),
    };
    match state.service().resolve_flag(flag_id, request.note) {
        Ok(flag) => json_response(StatusCode::OK, flag),
        Err(err) => engine_error(correlation_id, "resolve_flag", err),
    }
}

/// Handler for GET /cycles/:id/payslips.
///
/// Amounts are rounded for presentation; breakdowns keep full precision.
async fn list_payslips_handler(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let cycle_id = match path {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection),
    };
    let decimal_places = state.service().settings().presentation.decimal_places;
    match state.service().list_payslips(cycle_id) {
        Ok(payslips) => {
            let views: Vec<PayslipView> = payslips
                .into_iter()
                .map(|p| PayslipView::present(p, decimal_places))
                .collect();
            json_response(StatusCode::OK, views)
        }
        Err(err) => engine_error(correlation_id, "list_payslips", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::models::CycleStatus;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/payroll").expect("Failed to load config");
        AppState::new(config)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    const JANUARY: &str = r#"{
        "name": "January 2025",
        "start_date": "2025-01-01",
        "end_date": "2025-01-31",
        "group_ids": [1, 2]
    }"#;

    #[tokio::test]
    async fn test_health_reports_organisation() {
        let router = create_router(create_test_state());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["organisation"], "Acme Manufacturing");
    }

    #[tokio::test]
    async fn test_service_work_runs_off_the_request_thread() {
        let state = create_test_state();
        let request_thread = std::thread::current().id();

        let worker_thread = run_blocking(&state, |service| {
            service.list_cycles()?;
            Ok(std::thread::current().id())
        })
        .await
        .unwrap();
        assert_ne!(worker_thread, request_thread);

        let missing = run_blocking(&state, |service| {
            service.transition(Uuid::nil(), CycleStatus::Auditing)
        })
        .await;
        assert!(matches!(missing, Err(EngineError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_cycle_returns_201_with_draft_status() {
        let router = create_router(create_test_state());
        let (status, body) = send(&router, post_json("/cycles", JANUARY)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "draft");
        assert_eq!(body["group_ids"], serde_json::json!([1, 2]));
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());
        let (status, body) = send(&router, post_json("/cycles", "{invalid json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let router = create_router(create_test_state());
        let body = r#"{"name": "January", "start_date": "2025-01-01", "group_ids": [1]}"#;
        let (status, body) = send(&router, post_json("/cycles", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["message"].as_str().unwrap().contains("missing field"));
    }

    #[tokio::test]
    async fn test_invalid_cycle_id_returns_400() {
        let router = create_router(create_test_state());
        let request = Request::builder()
            .uri("/cycles/not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_PATH");
    }

    #[tokio::test]
    async fn test_unknown_cycle_returns_404() {
        let router = create_router(create_test_state());
        let request = Request::builder()
            .uri(format!("/cycles/{}/payslips", Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "CYCLE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_illegal_transition_returns_409() {
        let router = create_router(create_test_state());
        let (_, cycle) = send(&router, post_json("/cycles", JANUARY)).await;
        let uri = format!("/cycles/{}/transition", cycle["id"].as_str().unwrap());

        let (status, body) = send(&router, post_json(&uri, r#"{"status": "finalized"}"#)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_TRANSITION");
    }

    #[tokio::test]
    async fn test_invalid_flag_status_filter_returns_400() {
        let router = create_router(create_test_state());
        let (_, cycle) = send(&router, post_json("/cycles", JANUARY)).await;
        let request = Request::builder()
            .uri(format!(
                "/cycles/{}/audit/flags?status=closed",
                cycle["id"].as_str().unwrap()
            ))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_QUERY");
    }
}
