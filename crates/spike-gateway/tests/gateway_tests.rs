// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router and client behavior against in-process Spike instances.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::Value;
use spike_config::KekRotationPolicy;
use spike_core::{Capability, CapabilityChecker, ErrorKind, ShardSource, SpikeError};
use spike_gateway::{build_router, AuthConfig, GatewayState, HttpPeer};
use spike_kek::KeyRing;
use spike_lock::{LockGate, MemoryLockStore};
use spike_recovery::{RecoveryCoordinator, RestoreCoordinator, RootKeyKeeper, ShardCustodian};
use spike_test_utils::StaticCapabilities;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const OPERATOR: &str = "spiffe://spike/operator";
const ADMIN: &str = "spiffe://spike/admin";

fn state(bootstrap: bool) -> GatewayState {
    let caps = StaticCapabilities::new()
        .grant(OPERATOR, Capability::Recover)
        .grant(OPERATOR, Capability::Restore)
        .grant(ADMIN, Capability::Lock)
        .grant(ADMIN, Capability::Unlock);
    let checker: Arc<dyn CapabilityChecker> = Arc::new(caps);

    let keyring = Arc::new(KeyRing::new(KekRotationPolicy::default()));
    let custodian = Arc::new(ShardCustodian::new());
    let keeper = Arc::new(RootKeyKeeper::new(keyring, custodian.clone(), 5, 3));
    if bootstrap {
        keeper.bootstrap().unwrap();
    }

    let gate = Arc::new(LockGate::open(Arc::new(MemoryLockStore::new()), checker.clone()).unwrap());
    let recovery = Arc::new(RecoveryCoordinator::new(
        custodian,
        checker.clone(),
        5,
        Duration::from_secs(5),
    ));
    let restore = Arc::new(RestoreCoordinator::new(checker, gate.clone(), keeper.clone(), 5, 3).unwrap());

    GatewayState {
        keeper,
        gate,
        recovery,
        restore,
        auth: AuthConfig::new([("op-token", OPERATOR), ("admin-token", ADMIN)]),
        shutdown: CancellationToken::new(),
        start_time: std::time::Instant::now(),
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json");
    let body = body.map(|v| Body::from(v.to_string())).unwrap_or_else(Body::empty);
    builder.body(body).unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn recovered_shards(app: &Router) -> Vec<String> {
    let (status, body) = call(app, post("/v1/operator/recover", "op-token", None)).await;
    assert_eq!(status, StatusCode::OK);
    body["shards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_is_public() {
    let app = build_router(state(true));
    let (status, body) = call(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn api_requires_known_token() {
    let app = build_router(state(true));
    let (status, _) = call(&app, get("/v1/status", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, get("/v1/status", Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_reports_readiness_and_lock() {
    let app = build_router(state(false));
    let (status, body) = call(&app, get("/v1/status", Some("admin-token"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], false);
    assert_eq!(body["locked"], false);
    assert_eq!(body["restore"]["shards_remaining"], 3);
    assert_eq!(body["active_kek"], Value::Null);
}

#[tokio::test]
async fn recover_requires_capability() {
    let app = build_router(state(true));
    assert_eq!(recovered_shards(&app).await.len(), 5);

    let (status, body) = call(&app, post("/v1/operator/recover", "admin-token", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "authorization");
}

#[tokio::test]
async fn restore_over_http_reaches_ready() {
    let live = build_router(state(true));
    let shards = recovered_shards(&live).await;

    let restarted = build_router(state(false));
    let (status, body) = call(
        &restarted,
        post("/v1/operator/restore", "op-token", Some(serde_json::json!({"shard": "nonsense"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "input");

    let mut restored = Vec::new();
    for shard in &shards[..3] {
        let (status, body) = call(
            &restarted,
            post("/v1/operator/restore", "op-token", Some(serde_json::json!({"shard": shard}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        restored.push(body["restored"].as_bool().unwrap());
    }
    assert_eq!(restored, vec![false, false, true]);

    let (status, body) = call(
        &restarted,
        post("/v1/operator/restore", "op-token", Some(serde_json::json!({"shard": shards[3]}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (_, body) = call(&restarted, get("/v1/status", Some("op-token"))).await;
    assert_eq!(body["ready"], true);
    assert_eq!(body["active_kek"], 1);
}

#[tokio::test]
async fn lock_blocks_restore_until_unlocked() {
    let live = build_router(state(true));
    let shards = recovered_shards(&live).await;
    let app = build_router(state(false));

    let (status, body) = call(&app, post("/v1/operator/lock", "op-token", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "authorization");

    let (status, body) = call(&app, post("/v1/operator/lock", "admin-token", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locked"], true);

    let restore = || {
        post(
            "/v1/operator/restore",
            "op-token",
            Some(serde_json::json!({"shard": shards[0]})),
        )
    };
    let (status, body) = call(&app, restore()).await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["kind"], "locked");

    let (status, _) = call(&app, get("/v1/status", Some("op-token"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, post("/v1/operator/unlock", "admin-token", None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, restore()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shards_collected"], 1);
}

async fn serve(state: GatewayState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn peer(url: &str, token: &str) -> HttpPeer {
    HttpPeer::new(url, SecretString::from(token.to_string()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn http_peer_round_trip() {
    let live_url = serve(state(true)).await;
    let restarted_url = serve(state(false)).await;

    let shards = peer(&live_url, "op-token").fetch_shards(5).await.unwrap();
    assert_eq!(shards.len(), 5);

    let operator = peer(&restarted_url, "op-token");
    let mut outcomes = Vec::new();
    for shard in [&shards[0], &shards[2], &shards[4]] {
        let encoded = spike_shamir::encode(shard);
        outcomes.push(operator.restore(&encoded).await.unwrap().restored);
    }
    assert_eq!(outcomes, vec![false, false, true]);
    assert!(operator.status().await.unwrap().ready);

    let admin = peer(&restarted_url, "admin-token");
    assert!(admin.lock().await.unwrap());
    let err = operator.restore(&spike_shamir::encode(&shards[1])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Locked);
    assert!(!admin.unlock().await.unwrap());
}

#[tokio::test]
async fn http_peer_maps_rejections_and_outages() {
    let url = serve(state(true)).await;

    let err = peer(&url, "bogus").status().await.unwrap_err();
    assert!(matches!(
        err,
        SpikeError::Remote {
            kind: ErrorKind::Authorization,
            ..
        }
    ));

    let unused = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("http://{}", unused.local_addr().unwrap());
    drop(unused);
    let err = peer(&dead_url, "op-token").fetch_shards(5).await.unwrap_err();
    assert!(matches!(err, SpikeError::Connectivity { .. }));
}
