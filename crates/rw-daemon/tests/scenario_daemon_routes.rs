//! Daemon HTTP surface and tick publication.
//!
//! GREEN when:
//! - /v1/status is 503 before the first tick and serves the published status verbatim after.
//! - A tick broadcasts the status and any enforcement transitions on the bus.
//! - /v1/preview evaluates draft inputs without touching daemon state, and
//!   rejects an invalid draft policy with 400.
//! - /v1/verify reports the recovered signer and the canonical message.
//! - A declared incident flows into the next tick and can be cleared.
//!
//! All tests are in-process; no network required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rw_consensus::ConsensusPolicy;
use rw_consensus::ConsensusMode;
use rw_daemon::{routes, state};
use rw_engine::{EnforcementTransition, SourceSlot};
use rw_schemas::{EnforcementSnapshot, Incident, IncidentSeverity};
use rw_status::SystemStatus;
use rw_testkit::*;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_state(mode: ConsensusMode) -> Arc<state::AppState> {
    Arc::new(state::AppState::new(
        ConsensusPolicy::with_mode(mode),
        Some("cfg-hash".to_string()),
    ))
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn healthy_pair() -> rw_engine::EvaluationInputs {
    inputs(
        slot(
            "custodian-a",
            None,
            PayloadBuilder::new("custodian-a", "1200000", NOW).fetched(),
        ),
        slot(
            "auditor-b",
            None,
            PayloadBuilder::new("auditor-b", "1200000", NOW).fetched(),
        ),
        wired_snapshot(12_000, 10_000),
    )
}

// ---------------------------------------------------------------------------
// /v1/health and /v1/status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_service_and_config_hash() {
    let st = make_state(ConsensusMode::RequireMatch);
    let (status, body) = call(routes::build_router(st), get("/v1/health")).await;

    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "rw-daemon");
    assert_eq!(json["configHash"], "cfg-hash");
}

#[tokio::test]
async fn status_is_503_before_first_tick() {
    let st = make_state(ConsensusMode::RequireMatch);
    let (status, body) = call(routes::build_router(st), get("/v1/status")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(parse_json(body)["error"].is_string());
}

#[tokio::test]
async fn status_serves_the_published_tick_verbatim() {
    let st = make_state(ConsensusMode::RequireMatch);
    let published = state::run_tick(&st, healthy_pair(), NOW).await;
    assert_eq!(published.status, SystemStatus::Healthy);

    let (status, body) = call(routes::build_router(Arc::clone(&st)), get("/v1/status")).await;
    assert_eq!(status, StatusCode::OK);

    let served: rw_status::DerivedStatus = serde_json::from_slice(&body).unwrap();
    assert_eq!(served, published);
    let json = parse_json(body);
    assert_eq!(json["status"], "HEALTHY");
    assert_eq!(json["reasons"], serde_json::json!([]));
    assert_eq!(json["evaluatedAtUnixS"], NOW);
}

// ---------------------------------------------------------------------------
// Tick -> bus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tick_broadcasts_status_and_transitions() {
    let st = make_state(ConsensusMode::RequireMatch);
    let mut rx = st.bus.subscribe();

    state::run_tick(&st, healthy_pair(), NOW).await;

    let mut paused = healthy_pair();
    paused.snapshot.minting_paused = Some(true);
    let second = state::run_tick(&st, paused, NOW + 60).await;
    assert_eq!(second.status, SystemStatus::Unhealthy);

    let mut seen_transitions = Vec::new();
    let mut statuses = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        match msg {
            state::BusMsg::Transition { transition, at_unix_s } => {
                assert_eq!(at_unix_s, NOW + 60);
                seen_transitions.push(transition);
            }
            state::BusMsg::Status(d) => statuses.push(d.status),
            _ => {}
        }
    }
    assert_eq!(seen_transitions, vec![EnforcementTransition::MintingPaused]);
    assert_eq!(statuses, vec![SystemStatus::Healthy, SystemStatus::Unhealthy]);
}

#[tokio::test]
async fn losing_the_onchain_read_is_a_transition() {
    let st = make_state(ConsensusMode::RequireMatch);
    let mut rx = st.bus.subscribe();

    state::run_tick(&st, healthy_pair(), NOW).await;
    let mut lost = healthy_pair();
    lost.snapshot = EnforcementSnapshot::unavailable("rpc down");
    let d = state::run_tick(&st, lost, NOW + 60).await;

    assert_eq!(d.status, SystemStatus::Stale);
    assert_eq!(d.reason_strs(), vec!["onchain_unavailable"]);

    let transitions: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|m| match m {
            state::BusMsg::Transition { transition, .. } => Some(transition),
            _ => None,
        })
        .collect();
    assert_eq!(transitions, vec![EnforcementTransition::OnchainLost]);
}

// ---------------------------------------------------------------------------
// /v1/preview
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preview_evaluates_and_attests_without_publishing() {
    let st = make_state(ConsensusMode::RequireMatch);

    let mut inp = healthy_pair();
    inp.snapshot.liability_supply = Some(Decimal::from(1_000_000));
    let req = post_json(
        "/v1/preview",
        serde_json::json!({ "inputs": inp, "nowUnixS": NOW }),
    );
    let (status, body) = call(routes::build_router(Arc::clone(&st)), req).await;

    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["derived"]["status"], "HEALTHY");
    assert_eq!(json["attestation"]["reserveUsd"], "1200000");
    assert_eq!(json["attestation"]["coverageBps"], 12_000);
    assert_eq!(json["attestation"]["breakerTriggered"], false);
    assert!(json["attestationBlocked"].is_null());

    assert!(st.latest.read().await.is_none(), "preview must not publish");
}

#[tokio::test]
async fn preview_with_draft_policy_overrides_daemon_policy() {
    let st = make_state(ConsensusMode::RequireMatch);

    let inp = inputs(
        slot(
            "custodian-a",
            None,
            PayloadBuilder::new("custodian-a", "1000000", NOW).fetched(),
        ),
        slot(
            "auditor-b",
            None,
            PayloadBuilder::new("auditor-b", "1100000", NOW).fetched(),
        ),
        wired_snapshot(12_000, 10_000),
    );
    let req = post_json(
        "/v1/preview",
        serde_json::json!({
            "inputs": inp,
            "policy": { "mode": "conservative_min" },
            "nowUnixS": NOW,
        }),
    );
    let (status, body) = call(routes::build_router(st), req).await;

    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["derived"]["status"], "DEGRADED");
    assert_eq!(
        json["derived"]["reasons"],
        serde_json::json!(["reserve_source_mismatch"])
    );
    // Lower of the two readings.
    assert_eq!(json["derived"]["diagnostics"]["selected"]["role"], "primary");
}

#[tokio::test]
async fn preview_rejects_invalid_policy() {
    let st = make_state(ConsensusMode::RequireMatch);
    let req = post_json(
        "/v1/preview",
        serde_json::json!({
            "inputs": healthy_pair(),
            "policy": { "mode": "majority_vote" },
        }),
    );
    let (status, body) = call(routes::build_router(st), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err = parse_json(body)["error"].as_str().unwrap_or_default().to_string();
    assert!(err.contains("majority_vote"), "{err}");
}

#[tokio::test]
async fn preview_of_stale_data_reports_why_no_attestation() {
    let st = make_state(ConsensusMode::PrimaryOnly);
    let inp = inputs(
        slot(
            "custodian-a",
            None,
            PayloadBuilder::new("custodian-a", "1200000", NOW - 10_000).fetched(),
        ),
        SourceSlot::not_configured(),
        wired_snapshot(12_000, 10_000),
    );
    let req = post_json(
        "/v1/preview",
        serde_json::json!({ "inputs": inp, "nowUnixS": NOW }),
    );
    let (status, body) = call(routes::build_router(st), req).await;

    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["derived"]["status"], "STALE");
    assert!(json["attestation"].is_null());
    assert!(json["attestationBlocked"].is_string());
}

// ---------------------------------------------------------------------------
// /v1/verify
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verify_recovers_signer_and_returns_message() {
    let signer = TestSigner::from_seed(7);
    let payload = PayloadBuilder::new("custodian-a", "1200000", NOW).signed_by(&signer);
    let req = post_json(
        "/v1/verify",
        serde_json::json!({
            "payload": payload.json(),
            "expectedSigner": signer.address_hex(),
        }),
    );
    let (status, body) = call(
        routes::build_router(make_state(ConsensusMode::PrimaryOnly)),
        req,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["valid"], true);
    assert_eq!(json["recoveredSigner"], signer.address_hex());
    assert_eq!(
        json["message"],
        format!("ReserveWatch:v1|source=custodian-a|reserveUsd=1200000|timestamp={NOW}")
    );
}

#[tokio::test]
async fn verify_without_expected_signer_is_not_evaluated() {
    let payload = PayloadBuilder::new("custodian-a", "1200000", NOW);
    let req = post_json("/v1/verify", serde_json::json!({ "payload": payload.json() }));
    let (status, body) = call(
        routes::build_router(make_state(ConsensusMode::PrimaryOnly)),
        req,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(parse_json(body)["valid"].is_null());
}

#[tokio::test]
async fn verify_malformed_payload_is_422() {
    let req = post_json(
        "/v1/verify",
        serde_json::json!({ "payload": { "timestamp": NOW } }),
    );
    let (status, _) = call(
        routes::build_router(make_state(ConsensusMode::PrimaryOnly)),
        req,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ---------------------------------------------------------------------------
// /v1/incident
// ---------------------------------------------------------------------------

#[tokio::test]
async fn critical_incident_drives_next_tick_unhealthy_until_cleared() {
    let st = make_state(ConsensusMode::RequireMatch);

    let req = post_json(
        "/v1/incident",
        serde_json::json!({ "title": "custodian offline", "severity": "critical" }),
    );
    let (status, body) = call(routes::build_router(Arc::clone(&st)), req).await;
    assert_eq!(status, StatusCode::OK);
    let opened: Incident = serde_json::from_slice(&body).unwrap();
    assert!(!opened.id.is_empty());
    assert_eq!(opened.severity, IncidentSeverity::Critical);

    let d = state::run_tick(&st, healthy_pair(), NOW).await;
    assert_eq!(d.status, SystemStatus::Unhealthy);
    assert_eq!(d.incident.as_ref().map(|i| i.id.clone()), Some(opened.id));

    let (status, body) = call(
        routes::build_router(Arc::clone(&st)),
        post_json("/v1/incident/clear", serde_json::json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["cleared"], true);

    let d = state::run_tick(&st, healthy_pair(), NOW + 60).await;
    assert_eq!(d.status, SystemStatus::Healthy);
    assert!(d.incident.is_none());
}

#[tokio::test]
async fn incident_with_blank_title_is_rejected() {
    let st = make_state(ConsensusMode::RequireMatch);
    let req = post_json(
        "/v1/incident",
        serde_json::json!({ "title": "  ", "severity": "minor" }),
    );
    let (status, _) = call(routes::build_router(Arc::clone(&st)), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(st.incident.read().await.is_none());
}
