use serde::Serialize;

use crate::will::{Beneficiary, Operation, Timestamp, WillSnapshot, WillState};

/// A value as last confirmed by the authority, plus an optional provisional
/// value for a transition that has been submitted but not yet confirmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Tracked<T> {
    confirmed: T,
    pending: Option<T>,
}

impl<T: Clone + PartialEq> Tracked<T> {
    pub fn new(confirmed: T) -> Self {
        Self {
            confirmed,
            pending: None,
        }
    }

    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// What to display: the provisional value if there is one.
    pub fn current(&self) -> &T {
        self.pending.as_ref().unwrap_or(&self.confirmed)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Records a prediction. A prediction equal to the confirmed value is not
    /// a pending change.
    pub fn propose(&mut self, value: T) {
        self.pending = (value != self.confirmed).then_some(value);
    }

    pub fn confirm(&mut self, value: T) {
        self.confirmed = value;
        self.pending = None;
    }

    pub fn rollback(&mut self) {
        self.pending = None;
    }
}

/// A transition that has been submitted and has no terminal answer yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingTransition {
    pub operation: Operation,
    pub submitted_at: Timestamp,
}

/// Local reflection of one owner's will.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MirrorView {
    pub will_id: Tracked<Option<u64>>,
    pub state: Tracked<WillState>,
    pub inactivity_period: Tracked<u64>,
    pub last_check_in: Tracked<Timestamp>,
    pub balance: Tracked<u64>,
    pub beneficiaries: Tracked<Vec<Beneficiary>>,
    pub pending: Option<PendingTransition>,
    /// When the confirmed values were last read from the authority.
    pub synced_at: Option<Timestamp>,
    /// Confirmed values came from the offline cache, not the authority.
    pub stale: bool,
    #[serde(skip)]
    confirmed: Option<WillSnapshot>,
}

impl Default for MirrorView {
    fn default() -> Self {
        Self {
            will_id: Tracked::new(None),
            state: Tracked::new(WillState::Unregistered),
            inactivity_period: Tracked::new(0),
            last_check_in: Tracked::new(0),
            balance: Tracked::new(0),
            beneficiaries: Tracked::new(Vec::new()),
            pending: None,
            synced_at: None,
            stale: false,
            confirmed: None,
        }
    }
}

impl MirrorView {
    pub fn confirmed_snapshot(&self) -> Option<&WillSnapshot> {
        self.confirmed.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn total_percentage(&self) -> u32 {
        self.beneficiaries.confirmed().iter().map(|b| b.percentage).sum()
    }

    /// Replaces every confirmed field with the authority's answer and drops
    /// anything provisional.
    pub(crate) fn confirm(&mut self, snapshot: Option<WillSnapshot>, at: Timestamp) {
        match &snapshot {
            Some(s) => {
                self.will_id.confirm(Some(s.id));
                self.state.confirm(s.state);
                self.inactivity_period.confirm(s.inactivity_period);
                self.last_check_in.confirm(s.last_check_in);
                self.balance.confirm(s.balance);
                self.beneficiaries.confirm(s.beneficiaries.clone());
            }
            None => *self = MirrorView::default(),
        }
        self.confirmed = snapshot;
        self.pending = None;
        self.synced_at = Some(at);
        self.stale = false;
    }

    /// Loads confirmed values that did not come straight from the authority.
    pub(crate) fn hydrate(&mut self, snapshot: WillSnapshot, saved_at: Timestamp) {
        self.confirm(Some(snapshot), saved_at);
        self.stale = true;
    }

    pub(crate) fn propose(&mut self, operation: Operation, predicted: &WillSnapshot, at: Timestamp) {
        self.will_id.propose(Some(predicted.id));
        self.state.propose(predicted.state);
        self.inactivity_period.propose(predicted.inactivity_period);
        self.last_check_in.propose(predicted.last_check_in);
        self.balance.propose(predicted.balance);
        self.beneficiaries.propose(predicted.beneficiaries.clone());
        self.pending = Some(PendingTransition {
            operation,
            submitted_at: at,
        });
    }

    /// Marks a submission without predicting its effect.
    pub(crate) fn mark_pending(&mut self, operation: Operation, at: Timestamp) {
        self.pending = Some(PendingTransition {
            operation,
            submitted_at: at,
        });
    }

    pub(crate) fn rollback(&mut self) {
        self.will_id.rollback();
        self.state.rollback();
        self.inactivity_period.rollback();
        self.last_check_in.rollback();
        self.balance.rollback();
        self.beneficiaries.rollback();
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_lifecycle() {
        let mut balance = Tracked::new(10u64);
        balance.propose(10);
        assert!(!balance.is_pending());

        balance.propose(25);
        assert_eq!(balance.current(), &25);
        assert_eq!(balance.confirmed(), &10);

        balance.rollback();
        assert_eq!(balance.current(), &10);

        balance.propose(25);
        balance.confirm(30);
        assert_eq!(balance.current(), &30);
        assert_eq!(balance.pending(), None);
    }
}
