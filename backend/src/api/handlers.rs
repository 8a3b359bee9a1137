use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::authority::Authority;
use crate::events::OutcomeEvent;
use crate::will::{Address, Intent};

fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "status": "success", "data": data }))
}

fn owner_from(raw: &str) -> Result<Address, ApiError> {
    Address::parse(raw).map_err(|_| ApiError::BadRequest(format!("invalid owner address: {raw}")))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "now": state.authority.clock().now(),
    }))
}

pub async fn get_will(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let owner = owner_from(&owner)?;
    let will = state
        .authority
        .fetch(&owner)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no will registered for {owner}")))?;
    Ok(success(will))
}

pub async fn get_activity(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let owner = owner_from(&owner)?;
    let report = state
        .authority
        .activity(&owner)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("no will registered for {owner}")))?;
    Ok(success(report))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let owner = owner_from(&owner)?;
    let active_will_id = state.authority.active_will_id(&owner).await;
    let wills = state.authority.history(&owner).await;
    Ok(success(json!({
        "active_will_id": active_will_id,
        "wills": wills,
    })))
}

pub async fn get_will_by_id(
    State(state): State<AppState>,
    Path((owner, will_id)): Path<(String, u64)>,
) -> Result<Json<Value>, ApiError> {
    let owner = owner_from(&owner)?;
    let will = state
        .authority
        .will_by_id(&owner, will_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("will {will_id} not found for {owner}")))?;
    Ok(success(will))
}

pub async fn submit_intent(
    State(state): State<AppState>,
    Path(owner): Path<String>,
    payload: Result<Json<Intent>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let owner = owner_from(&owner)?;
    let Json(intent) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let operation = intent.operation();
    let now = state.authority.clock().now();

    match state.authority.commit(&owner, intent).await {
        Ok(committed) => {
            let will = committed.snapshot;
            let event = if committed.already_executed {
                OutcomeEvent::already_executed(will.id, now)
            } else {
                OutcomeEvent::success(operation, will.id, now)
            };
            let body = json!({
                "status": "success",
                "message": event.message,
                "data": will,
            });
            state.events.emit(event);
            Ok(Json(body))
        }
        Err(err) => {
            let will_id = Some(state.authority.active_will_id(&owner).await).filter(|id| *id != 0);
            state
                .events
                .emit(OutcomeEvent::failure(operation, &err, will_id, now));
            Err(err.into())
        }
    }
}
