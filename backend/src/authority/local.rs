use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::Authority;
use crate::clock::Clock;
use crate::error::WillError;
use crate::will::{ActivityReport, Address, Intent, Operation, Will, WillSnapshot, WillState};

/// Every will an owner has registered, keyed by their owner-scoped id.
#[derive(Debug, Default)]
struct OwnerWills {
    wills: BTreeMap<u64, Will>,
}

impl OwnerWills {
    fn current(&self) -> Option<&Will> {
        self.wills.values().next_back()
    }

    fn current_mut(&mut self) -> Option<&mut Will> {
        self.wills.values_mut().next_back()
    }

    fn next_id(&self) -> u64 {
        self.wills.keys().next_back().map_or(1, |id| id + 1)
    }
}

/// Result of a committed intent.
#[derive(Debug, Clone)]
pub struct Committed {
    pub snapshot: WillSnapshot,
    /// The intent was a distribute on a will that had already been paid out.
    pub already_executed: bool,
}

/// In-process execution authority.
///
/// Mutations for all owners are serialised behind one lock and every intent is
/// re-validated against this authority's own clock, whatever the caller
/// predicted.
#[derive(Debug)]
pub struct LocalAuthority {
    clock: Arc<dyn Clock>,
    registry: Mutex<HashMap<Address, OwnerWills>>,
}

impl LocalAuthority {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Id of the owner's live (not yet executed) will, or 0 when there is none.
    pub async fn active_will_id(&self, owner: &Address) -> u64 {
        let registry = self.registry.lock().await;
        registry
            .get(owner)
            .and_then(OwnerWills::current)
            .filter(|will| !will.is_executed())
            .map_or(0, Will::id)
    }

    pub async fn will_by_id(&self, owner: &Address, id: u64) -> Option<WillSnapshot> {
        let registry = self.registry.lock().await;
        registry
            .get(owner)
            .and_then(|wills| wills.wills.get(&id))
            .map(Will::snapshot)
    }

    /// All of the owner's wills, oldest first.
    pub async fn history(&self, owner: &Address) -> Vec<WillSnapshot> {
        let registry = self.registry.lock().await;
        registry
            .get(owner)
            .map(|wills| wills.wills.values().map(Will::snapshot).collect())
            .unwrap_or_default()
    }

    /// Countdown for the owner's current will, computed on this authority's clock.
    pub async fn activity(&self, owner: &Address) -> Option<ActivityReport> {
        let now = self.clock.now();
        let registry = self.registry.lock().await;
        registry
            .get(owner)
            .and_then(OwnerWills::current)
            .map(|will| will.activity(now))
    }

    fn register(
        wills: &mut OwnerWills,
        owner: &Address,
        inactivity_period: u64,
        now: u64,
    ) -> Result<WillSnapshot, WillError> {
        if let Some(current) = wills.current() {
            if !current.is_executed() {
                return Err(WillError::IllegalTransition {
                    operation: Operation::Register,
                    state: current.state(),
                });
            }
        }
        let id = wills.next_id();
        let will = Will::register(id, owner.clone(), inactivity_period, now)?;
        let snapshot = will.snapshot();
        wills.wills.insert(id, will);
        Ok(snapshot)
    }

    /// Validates and applies one intent under the registry lock.
    pub async fn commit(&self, owner: &Address, intent: Intent) -> Result<Committed, WillError> {
        let operation = intent.operation();
        let now = self.clock.now();
        let mut registry = self.registry.lock().await;
        let wills = registry.entry(owner.clone()).or_default();
        let mut already_executed = false;

        let result = match &intent {
            Intent::Register { inactivity_period } => {
                Self::register(wills, owner, *inactivity_period, now)
            }
            _ => match wills.current_mut() {
                Some(will) => {
                    already_executed = operation == Operation::Distribute && will.is_executed();
                    will.apply(&intent, now).map(|_| will.snapshot())
                }
                None => Err(WillError::IllegalTransition {
                    operation,
                    state: WillState::Unregistered,
                }),
            },
        };

        match &result {
            Ok(snapshot) if already_executed => info!(
                %owner,
                will_id = snapshot.id,
                "distribute on executed will; nothing moved"
            ),
            Ok(snapshot) => info!(
                %owner,
                will_id = snapshot.id,
                %operation,
                state = %snapshot.state,
                balance = snapshot.balance,
                "transition committed"
            ),
            Err(err) => warn!(%owner, %operation, error = err.code(), "transition rejected: {err}"),
        }
        if wills.wills.is_empty() {
            registry.remove(owner);
        }
        result.map(|snapshot| Committed {
            snapshot,
            already_executed,
        })
    }
}

#[async_trait]
impl Authority for LocalAuthority {
    async fn submit(&self, owner: &Address, intent: Intent) -> Result<WillSnapshot, WillError> {
        self.commit(owner, intent).await.map(|c| c.snapshot)
    }

    async fn fetch(&self, owner: &Address) -> Result<Option<WillSnapshot>, WillError> {
        let registry = self.registry.lock().await;
        Ok(registry
            .get(owner)
            .and_then(OwnerWills::current)
            .map(Will::snapshot))
    }
}
