//! Shared runtime state for rw-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The only values that
//! outlive a tick are the last published status (served verbatim), the
//! previous enforcement snapshot (for transition detection) and the active
//! incident. Every tick still evaluates from scratch.

use std::sync::Arc;
use std::time::Duration;

use rw_consensus::ConsensusPolicy;
use rw_engine::{detect_transitions, evaluate_with_policy, EnforcementTransition, EvaluationInputs};
use rw_schemas::{EnforcementSnapshot, Incident};
use rw_sources::Sources;
use rw_status::DerivedStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Status(Box<DerivedStatus>),
    Transition {
        transition: EnforcementTransition,
        at_unix_s: i64,
    },
    LogLine { level: String, msg: String },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    /// Validated at startup; previews may override per request.
    pub policy: ConsensusPolicy,
    /// Hash of the loaded config, if the daemon was started from one.
    pub config_hash: Option<String>,
    /// Last evaluation published by the monitor loop. `None` until the first tick.
    pub latest: Arc<RwLock<Option<DerivedStatus>>>,
    /// Enforcement snapshot consumed by the previous tick.
    pub previous_snapshot: Arc<RwLock<Option<EnforcementSnapshot>>>,
    /// Operator-declared incident fed into each evaluation.
    pub incident: Arc<RwLock<Option<Incident>>>,
}

impl AppState {
    pub fn new(policy: ConsensusPolicy, config_hash: Option<String>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "rw-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            policy,
            config_hash,
            latest: Arc::new(RwLock::new(None)),
            previous_snapshot: Arc::new(RwLock::new(None)),
            incident: Arc::new(RwLock::new(None)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// Evaluate one set of collected inputs and publish the result.
///
/// The active incident replaces whatever `inputs.incident` carried.
pub async fn run_tick(
    state: &AppState,
    mut inputs: EvaluationInputs,
    now_unix_s: i64,
) -> DerivedStatus {
    inputs.incident = state.incident.read().await.clone();
    let derived = evaluate_with_policy(&inputs, &state.policy, now_unix_s);

    let transitions = {
        let mut prev = state.previous_snapshot.write().await;
        let t = detect_transitions(prev.as_ref(), &inputs.snapshot);
        *prev = Some(inputs.snapshot);
        t
    };
    for t in transitions {
        if t.is_adverse() {
            warn!(transition = t.as_str(), "enforcement transition");
        } else {
            info!(transition = t.as_str(), "enforcement transition");
        }
        let _ = state.bus.send(BusMsg::Transition {
            transition: t,
            at_unix_s: now_unix_s,
        });
    }

    let previous_status = {
        let mut latest = state.latest.write().await;
        latest.replace(derived.clone()).map(|d| d.status)
    };
    if previous_status != Some(derived.status) {
        warn!(
            status = %derived.status,
            previous = ?previous_status,
            reasons = ?derived.reason_strs(),
            "status changed"
        );
    } else {
        debug!(status = %derived.status, "tick");
    }

    let _ = state.bus.send(BusMsg::Status(Box::new(derived.clone())));
    derived
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Spawn the polling loop: collect, evaluate, publish, every `interval`.
///
/// "now" is taken once per tick, after collection.
pub fn spawn_monitor(state: Arc<AppState>, sources: Sources, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let inputs = sources.collect().await;
            let now = chrono::Utc::now().timestamp();
            run_tick(&state, inputs, now).await;
        }
    });
}
