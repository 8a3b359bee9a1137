/// Integration tests for the intent API.
///
/// Each test drives a will through the HTTP surface against an in-process
/// authority whose clock the test controls.
mod helpers;

use axum::http::StatusCode;
use serde_json::json;
use willkeeper_backend::{Clock, OutcomeKind};

use helpers::{TestContext, ALICE, BOB, DAY, OWNER};

// ── helpers ──────────────────────────────────────────────────────────────────

async fn funded_active_will(ctx: &TestContext) {
    let steps = [
        json!({ "intent": "register", "inactivity_period": 30 * DAY }),
        json!({ "intent": "add_beneficiary", "address": ALICE, "percentage": 60, "name": "Alice" }),
        json!({ "intent": "add_beneficiary", "address": BOB, "percentage": 40 }),
        json!({ "intent": "deposit", "amount": 100 }),
        json!({ "intent": "activate" }),
    ];
    for step in steps {
        let (status, json) = ctx.intent(OWNER, step.clone()).await;
        assert_eq!(status, StatusCode::OK, "{step} -> {json}");
    }
}

// ── lifecycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_returns_confirmed_will() {
    let ctx = TestContext::new();

    let (status, json) = ctx
        .intent(OWNER, json!({ "intent": "register", "inactivity_period": 3600 }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["id"], 1);
    assert_eq!(json["data"]["state"], "registered");
    assert_eq!(json["data"]["owner"], OWNER);
    assert_eq!(json["data"]["last_check_in"], helpers::START);

    let (status, json) = ctx.get(&format!("/api/wills/{OWNER}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["inactivity_period"], 3600);
}

#[tokio::test]
async fn test_owner_address_is_case_insensitive() {
    let ctx = TestContext::new();
    let upper = OWNER.to_uppercase().replacen("0X", "0x", 1);

    let (status, _) = ctx
        .intent(&upper, json!({ "intent": "register", "inactivity_period": 3600 }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = ctx.get(&format!("/api/wills/{OWNER}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["owner"], OWNER);
}

#[tokio::test]
async fn test_distribute_before_expiry_then_after() {
    let ctx = TestContext::new();
    funded_active_will(&ctx).await;

    let (status, json) = ctx.intent(OWNER, json!({ "intent": "distribute" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "not_expired");
    assert_eq!(json["details"]["remaining"], 30 * DAY);

    ctx.clock.advance(31 * DAY);

    let (status, json) = ctx.intent(OWNER, json!({ "intent": "distribute" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Funds distributed");
    assert_eq!(json["data"]["state"], "executed");
    assert_eq!(json["data"]["balance"], 0);
    assert_eq!(
        json["data"]["payouts"],
        json!([
            { "address": ALICE, "amount": 60 },
            { "address": BOB, "amount": 40 },
        ])
    );
}

#[tokio::test]
async fn test_distribute_twice_pays_once() {
    let ctx = TestContext::new();
    funded_active_will(&ctx).await;
    ctx.clock.advance(31 * DAY);

    let (_, first) = ctx.intent(OWNER, json!({ "intent": "distribute" })).await;
    let mut events = ctx.events.subscribe();
    let (status, second) = ctx.intent(OWNER, json!({ "intent": "distribute" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "Funds distributed");
    assert_eq!(second["message"], "Will already executed; nothing to distribute");
    assert_eq!(second["data"]["payouts"], first["data"]["payouts"]);
    assert_eq!(second["data"]["balance"], 0);

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, OutcomeKind::Success);
    assert_eq!(event.message, "Will already executed; nothing to distribute");
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_check_in_resets_the_countdown() {
    let ctx = TestContext::new();
    funded_active_will(&ctx).await;
    ctx.clock.advance(29 * DAY);

    let (status, json) = ctx.intent(OWNER, json!({ "intent": "check_in" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Check-in successful");

    ctx.clock.advance(2 * DAY);
    let (status, json) = ctx.get(&format!("/api/wills/{OWNER}/activity")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["expired"], false);
    assert_eq!(json["data"]["remaining"], 28 * DAY);

    let (status, _) = ctx.intent(OWNER, json!({ "intent": "distribute" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// ── rejections ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_allocation_overflow_leaves_beneficiaries_unchanged() {
    let ctx = TestContext::new();
    ctx.intent(OWNER, json!({ "intent": "register", "inactivity_period": 3600 }))
        .await;
    ctx.intent(
        OWNER,
        json!({ "intent": "add_beneficiary", "address": ALICE, "percentage": 70 }),
    )
    .await;

    let (status, json) = ctx
        .intent(
            OWNER,
            json!({ "intent": "add_beneficiary", "address": BOB, "percentage": 40 }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"], "allocation_overflow");
    assert_eq!(json["details"]["total"], 110);

    let (_, json) = ctx.get(&format!("/api/wills/{OWNER}")).await;
    let beneficiaries = json["data"]["beneficiaries"].as_array().unwrap();
    assert_eq!(beneficiaries.len(), 1);
    assert_eq!(beneficiaries[0]["address"], ALICE);
    assert_eq!(beneficiaries[0]["percentage"], 70);
}

#[tokio::test]
async fn test_set_beneficiaries_is_all_or_nothing() {
    let ctx = TestContext::new();
    ctx.intent(OWNER, json!({ "intent": "register", "inactivity_period": 3600 }))
        .await;
    ctx.intent(
        OWNER,
        json!({ "intent": "add_beneficiary", "address": ALICE, "percentage": 100, "name": "Alice" }),
    )
    .await;

    let (status, json) = ctx
        .intent(
            OWNER,
            json!({
                "intent": "set_beneficiaries",
                "beneficiaries": [
                    { "address": BOB, "percentage": 50 },
                    { "address": "not-an-address", "percentage": 50 }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "invalid_address");

    let (_, json) = ctx.get(&format!("/api/wills/{OWNER}")).await;
    let beneficiaries = json["data"]["beneficiaries"].as_array().unwrap();
    assert_eq!(beneficiaries.len(), 1);
    assert_eq!(beneficiaries[0]["address"], ALICE);

    let (status, json) = ctx
        .intent(
            OWNER,
            json!({
                "intent": "set_beneficiaries",
                "beneficiaries": [
                    { "address": BOB, "percentage": 50, "name": "Bob" },
                    { "address": ALICE, "percentage": 50 }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Beneficiaries updated");
    assert_eq!(json["data"]["beneficiaries"][0]["name"], "Bob");
    assert_eq!(json["data"]["beneficiaries"][1]["percentage"], 50);
}

#[tokio::test]
async fn test_edits_are_locked_while_active() {
    let ctx = TestContext::new();
    funded_active_will(&ctx).await;

    let (status, json) = ctx
        .intent(OWNER, json!({ "intent": "remove_beneficiary", "address": BOB }))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "will_locked");

    let (status, json) = ctx
        .intent(
            OWNER,
            json!({
                "intent": "set_beneficiaries",
                "beneficiaries": [{ "address": BOB, "percentage": 100 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "will_locked");
}

#[tokio::test]
async fn test_intent_for_unregistered_owner_is_illegal() {
    let ctx = TestContext::new();

    let (status, json) = ctx.intent(OWNER, json!({ "intent": "check_in" })).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "illegal_transition");
    assert_eq!(json["details"]["state"], "unregistered");
    assert_eq!(json["details"]["operation"], "check_in");
}

#[tokio::test]
async fn test_unknown_owner_is_not_found() {
    let ctx = TestContext::new();

    let (status, json) = ctx.get(&format!("/api/wills/{OWNER}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let (status, _) = ctx.get(&format!("/api/wills/{OWNER}/activity")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests_are_bad_requests() {
    let ctx = TestContext::new();

    let (status, json) = ctx.get("/api/wills/not-an-address").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");

    let (status, _) = ctx.intent(OWNER, json!({ "intent": "explode" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .intent(OWNER, json!({ "intent": "deposit", "amount": "lots" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── history & events ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_will_after_execution_keeps_history() {
    let ctx = TestContext::new();
    funded_active_will(&ctx).await;
    ctx.clock.advance(31 * DAY);
    ctx.intent(OWNER, json!({ "intent": "distribute" })).await;

    let (_, json) = ctx.get(&format!("/api/wills/{OWNER}/history")).await;
    assert_eq!(json["data"]["active_will_id"], 0);

    let (status, json) = ctx
        .intent(OWNER, json!({ "intent": "register", "inactivity_period": DAY }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], 2);

    let (_, json) = ctx.get(&format!("/api/wills/{OWNER}/history")).await;
    assert_eq!(json["data"]["active_will_id"], 2);
    assert_eq!(json["data"]["wills"].as_array().unwrap().len(), 2);

    let (status, json) = ctx.get(&format!("/api/wills/{OWNER}/history/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["state"], "executed");

    let (status, _) = ctx.get(&format!("/api/wills/{OWNER}/history/9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_each_intent_emits_one_outcome_event() {
    let ctx = TestContext::new();
    let mut events = ctx.events.subscribe();

    ctx.intent(OWNER, json!({ "intent": "register", "inactivity_period": 3600 }))
        .await;
    ctx.intent(OWNER, json!({ "intent": "withdraw" })).await;

    let first = events.recv().await.unwrap();
    assert_eq!(first.kind, OutcomeKind::Success);
    assert_eq!(first.message, "Registration successful");
    assert_eq!(first.will_id, Some(1));
    assert_eq!(first.at, ctx.clock.now());

    let second = events.recv().await.unwrap();
    assert_eq!(second.kind, OutcomeKind::Failure);
    assert_eq!(second.error.as_deref(), Some("no_funds"));
    assert!(events.try_recv().is_err());
}
