//! Client-side mirror of one owner's will.
//!
//! The mirror validates intents locally so bad input never reaches the
//! execution authority, shows a provisional view while a transition is in
//! flight, and always defers to the authority's answer once it arrives.

mod cache;
mod view;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub use cache::{CacheError, CachedWill};
pub use view::{MirrorView, PendingTransition, Tracked};

use crate::authority::Authority;
use crate::clock::Clock;
use crate::config::RetryConfig;
use crate::error::WillError;
use crate::events::{EventSink, OutcomeEvent};
use crate::will::{ActivityReport, Address, Intent, Operation, Timestamp, Will, WillSnapshot, WillState};

/// One submission as seen by the retry loop.
struct Attempt {
    result: Result<WillSnapshot, WillError>,
    /// The authority is known to still hold the will it held before.
    unchanged: bool,
    was_executed: bool,
}

impl Attempt {
    /// Refused before anything was sent.
    fn local(result: Result<WillSnapshot, WillError>) -> Self {
        Self {
            result,
            unchanged: true,
            was_executed: false,
        }
    }
}

pub struct WillMirror {
    owner: Address,
    authority: Arc<dyn Authority>,
    clock: Arc<dyn Clock>,
    events: EventSink,
    view: RwLock<MirrorView>,
}

impl WillMirror {
    pub fn new(
        owner: Address,
        authority: Arc<dyn Authority>,
        clock: Arc<dyn Clock>,
        events: EventSink,
    ) -> Self {
        Self {
            owner,
            authority,
            clock,
            events,
            view: RwLock::new(MirrorView::default()),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub async fn view(&self) -> MirrorView {
        self.view.read().await.clone()
    }

    /// Countdown derived from the last confirmed check-in.
    pub async fn activity(&self) -> Option<ActivityReport> {
        let view = self.view.read().await;
        view.confirmed_snapshot()
            .map(|s| s.activity(self.clock.now()))
    }

    /// Replaces the confirmed view with the authority's current state.
    pub async fn refresh(&self) -> Result<Option<WillSnapshot>, WillError> {
        if let Some(pending) = &self.view.read().await.pending {
            return Err(WillError::TransitionInFlight(pending.operation));
        }
        let snapshot = self.authority.fetch(&self.owner).await?;
        let mut view = self.view.write().await;
        view.confirm(snapshot.clone(), self.clock.now());
        debug!(owner = %self.owner, state = %view.state.confirmed(), "mirror synced");
        Ok(snapshot)
    }

    /// Submits one intent and emits exactly one outcome event for it.
    pub async fn submit(&self, intent: Intent) -> Result<WillSnapshot, WillError> {
        let operation = intent.operation();
        let attempt = self.attempt(&intent).await;
        self.report(operation, attempt).await
    }

    /// Like [`WillMirror::submit`], but retries authority failures with
    /// exponential backoff. A failure is only retried while the authority is
    /// known not to have committed the intent. Still emits a single outcome
    /// event.
    pub async fn submit_with_retry(
        &self,
        intent: Intent,
        retry: &RetryConfig,
    ) -> Result<WillSnapshot, WillError> {
        let operation = intent.operation();
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;
        let outcome = loop {
            let outcome = self.attempt(&intent).await;
            if let Err(err) = &outcome.result {
                if err.is_retryable() && outcome.unchanged && attempt < max_attempts {
                    let delay = retry.backoff_ms(attempt);
                    warn!(
                        owner = %self.owner,
                        operation = %operation,
                        attempt,
                        delay_ms = delay,
                        error = %err,
                        "intent not committed; retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                    continue;
                }
            }
            break outcome;
        };
        self.report(operation, outcome).await
    }

    pub async fn save_cache(&self, path: &Path) -> Result<bool, CacheError> {
        let snapshot = match self.view.read().await.confirmed_snapshot() {
            Some(s) => s.clone(),
            None => return Ok(false),
        };
        let cached = CachedWill {
            owner: self.owner.clone(),
            saved_at: self.clock.now(),
            snapshot,
        };
        cached.save(path).await?;
        Ok(true)
    }

    /// Seeds the confirmed view from disk so something can be shown before
    /// the authority answers. The view stays marked stale until the next
    /// successful refresh.
    pub async fn hydrate_from_cache(&self, path: &Path) -> Result<bool, CacheError> {
        let Some(cached) = CachedWill::load(path).await? else {
            return Ok(false);
        };
        if cached.owner != self.owner {
            warn!(
                owner = %self.owner,
                cached_owner = %cached.owner,
                "ignoring cached will of another owner"
            );
            return Ok(false);
        }
        let mut view = self.view.write().await;
        if view.is_pending() || view.synced_at.is_some() {
            return Ok(false);
        }
        view.hydrate(cached.snapshot, cached.saved_at);
        info!(owner = %self.owner, saved_at = cached.saved_at, "mirror hydrated from cache");
        Ok(true)
    }

    async fn attempt(&self, intent: &Intent) -> Attempt {
        let operation = intent.operation();
        let now = self.clock.now();
        let before = {
            let mut view = self.view.write().await;
            if let Some(pending) = &view.pending {
                return Attempt::local(Err(WillError::TransitionInFlight(pending.operation)));
            }
            let before = view.confirmed_snapshot().cloned();
            match self.predict(before.as_ref(), intent, now) {
                Ok(Some(predicted)) => view.propose(operation, &predicted, now),
                Ok(None) => view.mark_pending(operation, now),
                Err(err) => return Attempt::local(Err(err)),
            }
            before
        };
        let was_executed = before.as_ref().is_some_and(|s| s.executed);

        match self.authority.submit(&self.owner, intent.clone()).await {
            Ok(snapshot) => {
                self.view
                    .write()
                    .await
                    .confirm(Some(snapshot.clone()), self.clock.now());
                Attempt {
                    result: Ok(snapshot),
                    unchanged: false,
                    was_executed,
                }
            }
            Err(err) => {
                self.view.write().await.rollback();
                let unchanged = match err {
                    WillError::AuthorityUnavailable(_) => match self.refresh().await {
                        Ok(current) => current == before,
                        Err(sync) => {
                            warn!(owner = %self.owner, error = %sync, "re-sync after ambiguous failure failed");
                            false
                        }
                    },
                    _ => true,
                };
                Attempt {
                    result: Err(err),
                    unchanged,
                    was_executed,
                }
            }
        }
    }

    /// Replays `intent` against the confirmed state. `Ok(None)` means the
    /// intent is forwarded without a prediction.
    fn predict(
        &self,
        confirmed: Option<&WillSnapshot>,
        intent: &Intent,
        now: Timestamp,
    ) -> Result<Option<WillSnapshot>, WillError> {
        let operation = intent.operation();
        match (intent, confirmed) {
            (Intent::Register { inactivity_period }, None) => {
                Will::register(0, self.owner.clone(), *inactivity_period, now)
                    .map(|w| Some(w.snapshot()))
            }
            (Intent::Register { inactivity_period }, Some(current)) if current.executed => {
                Will::register(current.id + 1, self.owner.clone(), *inactivity_period, now)
                    .map(|w| Some(w.snapshot()))
            }
            (_, None) => Err(WillError::IllegalTransition {
                operation,
                state: WillState::Unregistered,
            }),
            (_, Some(current)) => {
                let mut will = Will::from_snapshot(current);
                match will.apply(intent, now) {
                    Ok(()) => Ok(Some(will.snapshot())),
                    // The authority's clock decides expiry; ours may lag.
                    Err(WillError::NotExpired { remaining }) if operation == Operation::Distribute => {
                        debug!(owner = %self.owner, remaining, "local clock says not expired; asking the authority");
                        Ok(None)
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    async fn report(&self, operation: Operation, attempt: Attempt) -> Result<WillSnapshot, WillError> {
        let now = self.clock.now();
        let Attempt {
            result,
            was_executed,
            ..
        } = attempt;
        let event = match &result {
            Ok(snapshot) if was_executed && operation == Operation::Distribute => {
                OutcomeEvent::already_executed(snapshot.id, now)
            }
            Ok(snapshot) => OutcomeEvent::success(operation, snapshot.id, now),
            Err(err) => {
                let will_id = *self.view.read().await.will_id.confirmed();
                OutcomeEvent::failure(operation, err, will_id, now)
            }
        };
        self.events.emit(event);
        result
    }
}
