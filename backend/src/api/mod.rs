//! HTTP intent API in front of an in-process execution authority.

mod error;
mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use error::ApiError;

use crate::authority::LocalAuthority;
use crate::events::EventSink;

#[derive(Clone)]
pub struct AppState {
    pub authority: Arc<LocalAuthority>,
    pub events: EventSink,
}

impl AppState {
    pub fn new(authority: Arc<LocalAuthority>, events: EventSink) -> Self {
        Self { authority, events }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/wills/:owner", get(handlers::get_will))
        .route("/api/wills/:owner/intents", post(handlers::submit_intent))
        .route("/api/wills/:owner/activity", get(handlers::get_activity))
        .route("/api/wills/:owner/history", get(handlers::get_history))
        .route("/api/wills/:owner/history/:will_id", get(handlers::get_will_by_id))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}
