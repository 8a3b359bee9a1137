use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::WillError;
use crate::will::{Operation, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Failure,
}

/// What the presentation layer is told about one attempted transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    pub id: Uuid,
    pub kind: OutcomeKind,
    pub operation: Operation,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub will_id: Option<u64>,
    pub at: Timestamp,
}

impl OutcomeEvent {
    pub fn success(operation: Operation, will_id: u64, at: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: OutcomeKind::Success,
            operation,
            message: operation.success_message().to_string(),
            error: None,
            will_id: Some(will_id),
            at,
        }
    }

    /// A distribute that found the will already paid out. Succeeds, but moves
    /// nothing.
    pub fn already_executed(will_id: u64, at: Timestamp) -> Self {
        Self {
            message: "Will already executed; nothing to distribute".to_string(),
            ..Self::success(Operation::Distribute, will_id, at)
        }
    }

    pub fn failure(
        operation: Operation,
        error: &WillError,
        will_id: Option<u64>,
        at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: OutcomeKind::Failure,
            operation,
            message: error.to_string(),
            error: Some(error.code().to_string()),
            will_id,
            at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

/// Fan-out of outcome events. Sending never blocks; slow subscribers lose
/// the oldest events.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: broadcast::Sender<OutcomeEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutcomeEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: OutcomeEvent) {
        match event.kind {
            OutcomeKind::Success => info!(
                operation = %event.operation,
                will_id = ?event.will_id,
                "{}", event.message
            ),
            OutcomeKind::Failure => warn!(
                operation = %event.operation,
                will_id = ?event.will_id,
                error = ?event.error,
                "{}", event.message
            ),
        }
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(64)
    }
}
