/// The remote authority client, against a mock server and against the real
/// intent API served on a loopback port.
mod helpers;

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use willkeeper_backend::config::{AuthorityConfig, RetryConfig};
use willkeeper_backend::will::{Address, Intent, WillState};
use willkeeper_backend::{
    create_app, AppState, Authority, EventSink, HttpAuthority, LocalAuthority, ManualClock,
    WillError, WillMirror,
};

use helpers::{ALICE, BOB, DAY, OWNER, START};

fn owner() -> Address {
    OWNER.parse().unwrap()
}

fn client(base_url: String, timeout_ms: u64) -> HttpAuthority {
    HttpAuthority::new(&AuthorityConfig {
        base_url,
        timeout_ms,
    })
    .unwrap()
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 2,
    }
}

fn registered_body() -> serde_json::Value {
    json!({
        "status": "success",
        "data": {
            "id": 1,
            "owner": OWNER,
            "state": "registered",
            "inactivity_period": 3600,
            "last_check_in": START,
            "balance": 0,
            "active": false,
            "executed": false,
            "beneficiaries": []
        }
    })
}

// ── mock server ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_posts_intent_and_parses_snapshot() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/api/wills/{OWNER}/intents"))
                .json_body(json!({ "intent": "register", "inactivity_period": 3600 }));
            then.status(200).json_body(registered_body());
        })
        .await;

    let will = client(server.base_url(), 1_000)
        .submit(&owner(), Intent::Register { inactivity_period: 3600 })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(will.id, 1);
    assert_eq!(will.state, WillState::Registered);
    assert!(will.payouts.is_empty());
}

#[tokio::test]
async fn test_fetch_maps_404_to_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/api/wills/{OWNER}"));
            then.status(404)
                .json_body(json!({ "status": "error", "error": "not_found", "message": "no will" }));
        })
        .await;

    let fetched = client(server.base_url(), 1_000).fetch(&owner()).await.unwrap();

    assert!(fetched.is_none());
}

#[tokio::test]
async fn test_typed_rejection_maps_back_to_core_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/wills/{OWNER}/intents"));
            then.status(409).json_body(json!({
                "status": "error",
                "error": "not_expired",
                "details": { "remaining": 120 },
                "message": "inactivity period has not elapsed (120s remaining)"
            }));
        })
        .await;

    let err = client(server.base_url(), 1_000)
        .submit(&owner(), Intent::Distribute)
        .await
        .unwrap_err();

    assert_eq!(err, WillError::NotExpired { remaining: 120 });
}

#[tokio::test]
async fn test_server_errors_are_ambiguous() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(502).body("bad gateway");
        })
        .await;

    let err = client(server.base_url(), 1_000)
        .submit(&owner(), Intent::CheckIn)
        .await
        .unwrap_err();

    assert!(matches!(err, WillError::AuthorityUnavailable(_)));
}

#[tokio::test]
async fn test_throttling_is_a_definite_rejection() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(429)
                .json_body(json!({ "status": "error", "message": "slow down" }));
        })
        .await;

    let err = client(server.base_url(), 1_000)
        .submit(&owner(), Intent::CheckIn)
        .await
        .unwrap_err();

    assert_eq!(err, WillError::AuthorityRejected("slow down".into()));
}

#[tokio::test]
async fn test_timeout_is_ambiguous() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(registered_body());
        })
        .await;

    let err = client(server.base_url(), 50)
        .submit(&owner(), Intent::Register { inactivity_period: 3600 })
        .await
        .unwrap_err();

    assert!(matches!(err, WillError::AuthorityUnavailable(_)));
}

#[tokio::test]
async fn test_untyped_client_error_is_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(404).json_body(json!({
                "status": "error",
                "error": "not_found",
                "message": "no such route"
            }));
        })
        .await;
    let clock = Arc::new(ManualClock::new(START));
    let remote = Arc::new(client(server.base_url(), 1_000));
    let mirror = WillMirror::new(owner(), remote, clock, EventSink::default());

    let err = mirror
        .submit_with_retry(Intent::Register { inactivity_period: 3600 }, &fast_retry())
        .await
        .unwrap_err();

    assert_eq!(err, WillError::InvalidRequest("no such route".into()));
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_refused_connection_is_a_definite_rejection() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let remote = Arc::new(client(format!("http://{addr}"), 1_000));

    let err = remote
        .submit(&owner(), Intent::CheckIn)
        .await
        .unwrap_err();
    assert!(matches!(err, WillError::AuthorityRejected(ref m) if m.starts_with("not delivered")));

    let events = EventSink::default();
    let mut outcomes = events.subscribe();
    let clock = Arc::new(ManualClock::new(START));
    let mirror = WillMirror::new(owner(), remote, clock, events.clone());

    let err = mirror
        .submit_with_retry(Intent::Register { inactivity_period: 3600 }, &fast_retry())
        .await
        .unwrap_err();

    assert!(matches!(err, WillError::AuthorityRejected(_)));
    let outcome = outcomes.recv().await.unwrap();
    assert_eq!(outcome.error.as_deref(), Some("authority_rejected"));
    assert!(outcomes.try_recv().is_err());
}

// ── loopback intent API ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_mirror_over_http_against_intent_api() {
    let clock = Arc::new(ManualClock::new(START));
    let local = Arc::new(LocalAuthority::new(clock.clone()));
    let app = create_app(AppState::new(local, EventSink::default()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let remote = Arc::new(client(format!("http://{addr}"), 5_000));
    let mirror = WillMirror::new(owner(), remote, clock.clone(), EventSink::default());

    assert!(mirror.refresh().await.unwrap().is_none());

    for intent in [
        Intent::Register {
            inactivity_period: 30 * DAY,
        },
        Intent::AddBeneficiary {
            address: ALICE.to_string(),
            percentage: 60,
            name: Some("Alice".to_string()),
        },
        Intent::AddBeneficiary {
            address: BOB.to_string(),
            percentage: 40,
            name: None,
        },
        Intent::Deposit { amount: 1_000 },
        Intent::Activate,
    ] {
        mirror.submit(intent).await.unwrap();
    }

    let err = mirror.submit(Intent::Distribute).await.unwrap_err();
    assert_eq!(err, WillError::NotExpired { remaining: 30 * DAY });

    clock.advance(30 * DAY);
    let will = mirror.submit(Intent::Distribute).await.unwrap();
    assert_eq!(will.state, WillState::Executed);
    assert_eq!(will.payouts[0].amount, 600);
    assert_eq!(will.payouts[1].amount, 400);
    assert_eq!(mirror.view().await.balance.confirmed(), &0);
}
