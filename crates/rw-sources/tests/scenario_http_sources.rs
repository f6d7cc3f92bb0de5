//! HTTP collection against a mock server.
//!
//! GREEN when:
//! - A 2xx JSON body becomes `FetchOutcome::Fetched`.
//! - Non-2xx, undecodable bodies and slow sources become `FetchOutcome::Failed`.
//! - The enforcement read retries at `finalized` then falls back to `latest`.
//! - Exhausted enforcement reads become an unavailable snapshot.
//! - `collect` assembles all three into evaluation inputs.

use std::sync::Arc;
use std::time::Duration;

use httpmock::{Method::GET, MockServer};
use rust_decimal::Decimal;
use rw_schemas::FetchOutcome;
use rw_sources::*;
use serde_json::json;

fn source(server: &MockServer, path: &str, timeout_ms: u64) -> HttpReserveSource {
    HttpReserveSource::new(
        "custodian-a",
        server.url(path),
        None,
        Duration::from_millis(timeout_ms),
    )
}

#[tokio::test]
async fn ok_body_is_fetched() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/reserves");
            then.status(200).json_body(json!({
                "timestamp": 1_700_000_000,
                "reserveUsd": "1200000.00",
                "source": "custodian-a"
            }));
        })
        .await;

    let out = fetch_outcome(&source(&server, "/reserves", 2_000)).await;
    m.assert_async().await;
    match out {
        FetchOutcome::Fetched { payload } => {
            assert_eq!(payload.reserve_usd, Some(json!("1200000.00")));
            assert_eq!(payload.timestamp, Some(json!(1_700_000_000)));
        }
        other => panic!("expected fetched, got {other:?}"),
    }
}

#[tokio::test]
async fn non_2xx_is_failed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/reserves");
            then.status(503).body("maintenance");
        })
        .await;

    let out = fetch_outcome(&source(&server, "/reserves", 2_000)).await;
    assert_eq!(out, FetchOutcome::failed("http status 503"));
}

#[tokio::test]
async fn undecodable_body_is_failed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/reserves");
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let out = fetch_outcome(&source(&server, "/reserves", 2_000)).await;
    match out {
        FetchOutcome::Failed { error } => assert!(error.contains("decode"), "{error}"),
        other => panic!("expected failed, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_source_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .delay(Duration::from_millis(1_500))
                .json_body(json!({"timestamp": 1, "reserveUsd": "1"}));
        })
        .await;

    let out = fetch_outcome(&source(&server, "/slow", 100)).await;
    assert_eq!(out, FetchOutcome::failed("timed out after 100ms"));
}

#[tokio::test]
async fn enforcement_falls_back_to_latest() {
    let server = MockServer::start_async().await;
    let finalized = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/enforcement")
                .query_param("blockTag", "finalized");
            then.status(502);
        })
        .await;
    let latest = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/enforcement")
                .query_param("blockTag", "latest");
            then.status(200).json_body(json!({
                "coverageBps": 12000,
                "minCoverageBps": 10000,
                "mintingPaused": false,
                "mintingEnabled": true,
                "hookWired": true,
                "forwarderSet": true,
                "liabilitySupply": "1000000"
            }));
        })
        .await;

    let reader = HttpEnforcementReader::new(server.url("/enforcement"), Duration::from_secs(2));
    let snap = read_with_fallback(&reader, 1, Duration::from_secs(2)).await;

    assert_eq!(finalized.hits_async().await, 2);
    assert_eq!(latest.hits_async().await, 1);
    assert!(snap.is_available());
    assert_eq!(snap.block_tag.as_deref(), Some("latest"));
    assert_eq!(snap.coverage_bps, Some(12_000));
    assert_eq!(snap.liability_supply, Some(Decimal::from(1_000_000)));
}

#[tokio::test]
async fn enforcement_numeric_liability_supply_decodes() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/enforcement");
            then.status(200).json_body(json!({
                "coverageBps": 12000,
                "minCoverageBps": 10000,
                "liabilitySupply": 1000000
            }));
        })
        .await;

    let reader = HttpEnforcementReader::new(server.url("/enforcement"), Duration::from_secs(2));
    let snap = read_with_fallback(&reader, 0, Duration::from_secs(2)).await;

    assert!(snap.is_available(), "{:?}", snap.error);
    assert_eq!(snap.block_tag.as_deref(), Some("finalized"));
    assert_eq!(snap.liability_supply, Some(Decimal::from(1_000_000)));
}

#[tokio::test]
async fn enforcement_exhaustion_is_unavailable() {
    let server = MockServer::start_async().await;
    let any = server
        .mock_async(|when, then| {
            when.method(GET).path("/enforcement");
            then.status(500);
        })
        .await;

    let reader = HttpEnforcementReader::new(server.url("/enforcement"), Duration::from_secs(2));
    let snap = read_with_fallback(&reader, 2, Duration::from_secs(2)).await;

    assert_eq!(any.hits_async().await, 4);
    assert!(!snap.is_available());
    assert_eq!(snap.error.as_deref(), Some("http status 500"));
}

#[tokio::test]
async fn reader_reported_error_is_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/enforcement");
            then.status(200)
                .json_body(json!({"error": "execution reverted"}));
        })
        .await;

    let reader = HttpEnforcementReader::new(server.url("/enforcement"), Duration::from_secs(2));
    let snap = read_with_fallback(&reader, 0, Duration::from_secs(2)).await;
    assert!(!snap.is_available());
    assert!(snap.error.unwrap_or_default().contains("execution reverted"));
}

#[tokio::test]
async fn collect_assembles_inputs_with_one_source_down() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/a");
            then.status(200)
                .json_body(json!({"timestamp": 1_700_000_000, "reserveUsd": 5}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/b");
            then.status(404);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/enforcement");
            then.status(200).json_body(json!({"coverageBps": 12000}));
        })
        .await;

    let sources = Sources {
        primary: Arc::new(HttpReserveSource::new(
            "a",
            server.url("/a"),
            Some("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".into()),
            Duration::from_secs(2),
        )),
        secondary: Some(Arc::new(HttpReserveSource::new(
            "b",
            server.url("/b"),
            Some(" ".into()),
            Duration::from_secs(2),
        ))),
        onchain: Arc::new(HttpEnforcementReader::new(
            server.url("/enforcement"),
            Duration::from_secs(2),
        )),
        onchain_retries: 0,
        onchain_timeout: Duration::from_secs(2),
    };

    let inputs = sources.collect().await;
    assert_eq!(inputs.primary.connector_id, "a");
    assert!(matches!(inputs.primary.outcome, FetchOutcome::Fetched { .. }));
    assert_eq!(
        inputs.primary.expected_signer.as_deref(),
        Some("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf")
    );
    assert_eq!(inputs.secondary.connector_id, "b");
    assert_eq!(inputs.secondary.expected_signer, None);
    assert_eq!(inputs.secondary.outcome, FetchOutcome::failed("http status 404"));
    assert_eq!(inputs.snapshot.block_tag.as_deref(), Some("finalized"));
    assert!(inputs.incident.is_none());
}
