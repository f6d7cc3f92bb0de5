//! Axum router and all HTTP handlers for rw-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use rw_consensus::parse_reading;
use rw_engine::{attestation_for, evaluate_with_policy};
use rw_schemas::Incident;
use rw_signature::{canonical_message, verify};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api_types::{
        ClearIncidentResponse, ErrorResponse, HealthResponse, OpenIncidentRequest,
        PreviewRequest, PreviewResponse, VerifyRequest, VerifyResponse,
    },
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/preview", post(preview))
        .route("/v1/verify", post(verify_handler))
        .route("/v1/incident", post(incident_open))
        .route("/v1/incident/clear", post(incident_clear))
        .with_state(state)
}

fn error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(msg))).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

/// Last published evaluation, verbatim. 503 until the first tick completes.
pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> Response {
    match st.latest.read().await.clone() {
        Some(derived) => (StatusCode::OK, Json(derived)).into_response(),
        None => error(
            StatusCode::SERVICE_UNAVAILABLE,
            "no evaluation has completed yet",
        ),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/preview
// ---------------------------------------------------------------------------

/// Evaluate draft inputs/policy. Pure: daemon state is neither read for
/// inputs nor written.
pub(crate) async fn preview(
    State(st): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> Response {
    let policy = match &req.policy {
        None => st.policy.clone(),
        Some(spec) => match spec.validate() {
            Ok(p) => p,
            Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
        },
    };
    let now = req
        .now_unix_s
        .unwrap_or_else(|| chrono::Utc::now().timestamp());

    let derived = evaluate_with_policy(&req.inputs, &policy, now);
    let (attestation, attestation_blocked) = match attestation_for(&derived, &req.inputs.snapshot) {
        Ok(a) => (Some(a), None),
        Err(e) => (None, Some(e.to_string())),
    };

    (
        StatusCode::OK,
        Json(PreviewResponse {
            derived,
            attestation,
            attestation_blocked,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/verify
// ---------------------------------------------------------------------------

/// Standalone signature check of one payload. 422 if the payload is not a
/// well-formed reading.
pub(crate) async fn verify_handler(Json(req): Json<VerifyRequest>) -> Response {
    let default_source = req.source_id.as_deref().unwrap_or_default();
    let reading = match parse_reading(&req.payload, default_source) {
        Ok(r) => r,
        Err(e) => return error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    };
    let fields = reading.signed_fields();
    let v = verify(&fields, req.expected_signer.as_deref());

    (
        StatusCode::OK,
        Json(VerifyResponse {
            valid: v.valid,
            recovered_signer: v.recovered_signer,
            error: v.error,
            message: canonical_message(&fields),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/incident  /v1/incident/clear
// ---------------------------------------------------------------------------

/// Declare the active incident. Takes effect on the next tick.
pub(crate) async fn incident_open(
    State(st): State<Arc<AppState>>,
    Json(req): Json<OpenIncidentRequest>,
) -> Response {
    if req.title.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "incident title must not be empty");
    }
    let incident = Incident {
        id: req
            .id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        title: req.title,
        severity: req.severity,
        opened_at_unix_s: Some(chrono::Utc::now().timestamp()),
    };

    *st.incident.write().await = Some(incident.clone());

    warn!(id = %incident.id, severity = ?incident.severity, "incident/open");
    let _ = st.bus.send(BusMsg::LogLine {
        level: "WARN".to_string(),
        msg: format!("incident opened: {}", incident.title),
    });
    (StatusCode::OK, Json(incident)).into_response()
}

pub(crate) async fn incident_clear(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = st.incident.write().await.take().is_some();

    info!(cleared, "incident/clear");
    if cleared {
        let _ = st.bus.send(BusMsg::LogLine {
            level: "INFO".to_string(),
            msg: "incident cleared".to_string(),
        });
    }
    (StatusCode::OK, Json(ClearIncidentResponse { cleared }))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Status(_) => "status",
                    BusMsg::Transition { .. } => "transition",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
