#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use willkeeper_backend::{create_app, AppState, EventSink, LocalAuthority, ManualClock};

pub const OWNER: &str = "0x00000000000000000000000000000000000000aa";
pub const ALICE: &str = "0x000000000000000000000000000000000000a11c";
pub const BOB: &str = "0x0000000000000000000000000000000000000b0b";

pub const START: u64 = 1_700_000_000;
pub const DAY: u64 = 86_400;

pub struct TestContext {
    pub app: Router,
    pub authority: Arc<LocalAuthority>,
    pub clock: Arc<ManualClock>,
    pub events: EventSink,
}

impl TestContext {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let authority = Arc::new(LocalAuthority::new(clock.clone()));
        let events = EventSink::default();
        let app = create_app(AppState::new(authority.clone(), events.clone()));
        Self {
            app,
            authority,
            clock,
            events,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn intent(&self, owner: &str, body: Value) -> (StatusCode, Value) {
        self.post_json(&format!("/api/wills/{owner}/intents"), body)
            .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response is not json")
        };
        (status, json)
    }
}
