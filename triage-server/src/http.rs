//! Triage HTTP action API
//!
//! Axum-based HTTP server through which the dialogue manager invokes the triage
//! core. Each endpoint has a thin axum handler that delegates to a pure inner
//! function, so the inner functions are testable without axum dispatch.
//!
//! Endpoints:
//! - GET  /health               liveness + sink and vocabulary info
//! - GET  /version              server version info
//! - POST /actions              raw action protocol (`{"action": ...}`)
//! - POST /validate/:question   validate one answer
//! - POST /score                compute the medical score
//! - POST /emergency            run emergency detection
//! - POST /calls                score, escalate, assemble and save the call

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use triage_core::protocol::{TriageRequest, TriageResponse};
use triage_core::{Question, SlotSet};
use uuid::Uuid;

use crate::router::{self, TriageState};

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<TriageState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/actions", post(actions_handler))
        .route("/validate/:question", post(validate_handler))
        .route("/score", post(score_handler))
        .route("/emergency", post(emergency_handler))
        .route("/calls", post(calls_handler))
        .with_state(state)
}

/// Start the HTTP server on `addr`.
/// Gracefully shuts down when the broadcast shutdown signal fires, then waits
/// (bounded by `persistence.drain_timeout_ms`) for background hand-offs.
pub async fn start_http_server(
    addr: &str,
    state: TriageState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let dispatcher = state.dispatcher.clone();
    let drain_limit = Duration::from_millis(state.engine.config().persistence.drain_timeout_ms);
    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Triage HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    if dispatcher.drain(drain_limit).await {
        tracing::info!("All call records handed off");
    }

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct SlotsRequest {
    #[serde(default)]
    pub slots: SlotSet,
}

#[derive(Debug, Deserialize, Default)]
pub struct CallRequest {
    pub call_id: Option<Uuid>,
    #[serde(default)]
    pub slots: SlotSet,
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

pub fn health_inner(state: &TriageState) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "sink": state.sink_name(),
            "hand_offs_in_flight": state.dispatcher.in_flight(),
            "vocabulary": state.engine.vocabulary().version,
        }),
    )
}

pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "triage/1",
    })
}

/// Raw protocol: the response envelope is returned as-is.
pub async fn actions_inner(
    state: &TriageState,
    request: TriageRequest,
) -> (StatusCode, serde_json::Value) {
    let response = router::handle_request(request, state).await;
    let status = if response.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    match serde_json::to_value(&response) {
        Ok(body) => (status, body),
        Err(e) => error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn validate_inner(
    state: &TriageState,
    question: &str,
    req: SlotsRequest,
) -> (StatusCode, serde_json::Value) {
    if let Err(e) = question.parse::<Question>() {
        return error_body(StatusCode::BAD_REQUEST, e.to_string());
    }
    let request = TriageRequest::Validate {
        question: question.to_string(),
        slots: req.slots,
    };
    unwrap_response(router::handle_request(request, state).await)
}

pub async fn score_inner(state: &TriageState, req: SlotsRequest) -> (StatusCode, serde_json::Value) {
    let request = TriageRequest::Score { slots: req.slots };
    unwrap_response(router::handle_request(request, state).await)
}

pub async fn emergency_inner(
    state: &TriageState,
    req: SlotsRequest,
) -> (StatusCode, serde_json::Value) {
    let request = TriageRequest::DetectEmergency { slots: req.slots };
    unwrap_response(router::handle_request(request, state).await)
}

pub async fn calls_inner(state: &TriageState, req: CallRequest) -> (StatusCode, serde_json::Value) {
    let request = TriageRequest::SaveCall {
        call_id: req.call_id,
        slots: req.slots,
    };
    unwrap_response(router::handle_request(request, state).await)
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<TriageState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state);
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn actions_handler(
    State(state): State<Arc<TriageState>>,
    Json(req): Json<TriageRequest>,
) -> impl IntoResponse {
    let (status, body) = actions_inner(&state, req).await;
    (status, Json(body))
}

pub async fn validate_handler(
    State(state): State<Arc<TriageState>>,
    Path(question): Path<String>,
    Json(req): Json<SlotsRequest>,
) -> impl IntoResponse {
    let (status, body) = validate_inner(&state, &question, req).await;
    (status, Json(body))
}

pub async fn score_handler(
    State(state): State<Arc<TriageState>>,
    Json(req): Json<SlotsRequest>,
) -> impl IntoResponse {
    let (status, body) = score_inner(&state, req).await;
    (status, Json(body))
}

pub async fn emergency_handler(
    State(state): State<Arc<TriageState>>,
    Json(req): Json<SlotsRequest>,
) -> impl IntoResponse {
    let (status, body) = emergency_inner(&state, req).await;
    (status, Json(body))
}

pub async fn calls_handler(
    State(state): State<Arc<TriageState>>,
    Json(req): Json<CallRequest>,
) -> impl IntoResponse {
    let (status, body) = calls_inner(&state, req).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Convert a `TriageResponse` into an HTTP body value, or an error string.
pub fn response_to_http(response: TriageResponse) -> std::result::Result<serde_json::Value, String> {
    if response.is_ok() {
        Ok(response.data.unwrap_or(serde_json::json!({})))
    } else {
        Err(response.error.unwrap_or_else(|| "unknown error".to_string()))
    }
}

fn unwrap_response(response: TriageResponse) -> (StatusCode, serde_json::Value) {
    match response_to_http(response) {
        Ok(data) => (StatusCode::OK, data),
        Err(e) => error_body(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

fn error_body(status: StatusCode, error: String) -> (StatusCode, serde_json::Value) {
    (
        status,
        serde_json::json!({
            "error": error,
            "status": "error",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{SimulatedRecordSink, TriageConfig};

    fn state() -> TriageState {
        TriageState::with_sink(TriageConfig::default(), Arc::new(SimulatedRecordSink))
    }

    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string());
        assert_eq!(v["protocol"], "triage/1");
    }

    #[test]
    fn test_health_inner_reports_sink_and_vocabulary() {
        let (status, body) = health_inner(&state());
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sink"], "simulated");
        assert_eq!(body["vocabulary"], "2024.1");
    }

    #[test]
    fn test_response_to_http_error_no_message() {
        let mut resp = TriageResponse::err("x");
        resp.error = None;
        assert_eq!(response_to_http(resp).unwrap_err(), "unknown error");
    }

    #[tokio::test]
    async fn test_validate_inner_unknown_question_is_400() {
        let (status, body) = validate_inner(&state(), "weather", SlotsRequest::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_validate_inner_missing_answer_reprompts() {
        let (status, body) = validate_inner(&state(), "mood", SlotsRequest::default()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verified"], false);
        assert_eq!(body["issue"], "missing_answer");
    }

    #[tokio::test]
    async fn test_actions_inner_error_envelope_is_400() {
        let (status, body) = actions_inner(
            &state(),
            TriageRequest::Validate {
                question: "weather".to_string(),
                slots: SlotSet::new(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }
}
