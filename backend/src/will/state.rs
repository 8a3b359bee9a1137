use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::activity::{self, ActivityReport, ActivityTracker, Timestamp};
use super::distribution::{compute_shares, Share};
use super::{
    Address, AllocationLedger, Beneficiary, BeneficiaryEntry, FundsLedger, Intent, Operation,
};
use crate::error::WillError;

/// Lifecycle of a will. `Unregistered` is only ever reported for an owner that
/// has no will yet; a [`Will`] value starts at `Registered`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WillState {
    Unregistered,
    Registered,
    Active,
    Deactivated,
    Executed,
}

impl WillState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WillState::Unregistered => "unregistered",
            WillState::Registered => "registered",
            WillState::Active => "active",
            WillState::Deactivated => "deactivated",
            WillState::Executed => "executed",
        }
    }
}

impl fmt::Display for WillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical state of a will as exchanged with the execution authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WillSnapshot {
    pub id: u64,
    pub owner: Address,
    pub state: WillState,
    pub inactivity_period: u64,
    pub last_check_in: Timestamp,
    pub balance: u64,
    pub active: bool,
    pub executed: bool,
    pub beneficiaries: Vec<Beneficiary>,
    #[serde(default)]
    pub payouts: Vec<Share>,
}

impl WillSnapshot {
    pub fn total_percentage(&self) -> u32 {
        self.beneficiaries.iter().map(|b| b.percentage).sum()
    }

    pub fn activity(&self, now: Timestamp) -> ActivityReport {
        ActivityReport::at(now, self.inactivity_period, self.last_check_in)
    }
}

/// Result of a successful `distribute`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Distribution {
    /// Funds were paid out by this call.
    Executed(Vec<Share>),
    /// The will had already executed; nothing was paid.
    AlreadyExecuted,
}

/// The authoritative lifecycle of one owner's will.
///
/// Every transition checks all of its guards before mutating anything, so a
/// rejected call leaves the will exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Will {
    id: u64,
    owner: Address,
    inactivity_period: u64,
    activity: ActivityTracker,
    funds: FundsLedger,
    allocation: AllocationLedger,
    state: WillState,
    payouts: Vec<Share>,
}

impl Will {
    pub fn register(
        id: u64,
        owner: Address,
        inactivity_period: u64,
        now: Timestamp,
    ) -> Result<Self, WillError> {
        if inactivity_period == 0 {
            return Err(WillError::InvalidPeriod);
        }
        Ok(Self {
            id,
            owner,
            inactivity_period,
            activity: ActivityTracker::new(now),
            funds: FundsLedger::new(),
            allocation: AllocationLedger::new(),
            state: WillState::Registered,
            payouts: Vec::new(),
        })
    }

    /// Rebuilds a will from state confirmed by the execution authority.
    pub fn from_snapshot(snapshot: &WillSnapshot) -> Self {
        Self {
            id: snapshot.id,
            owner: snapshot.owner.clone(),
            inactivity_period: snapshot.inactivity_period,
            activity: ActivityTracker::new(snapshot.last_check_in),
            funds: FundsLedger::with_balance(snapshot.balance),
            allocation: AllocationLedger::from_confirmed(snapshot.beneficiaries.clone()),
            state: snapshot.state,
            payouts: snapshot.payouts.clone(),
        }
    }

    pub fn snapshot(&self) -> WillSnapshot {
        WillSnapshot {
            id: self.id,
            owner: self.owner.clone(),
            state: self.state,
            inactivity_period: self.inactivity_period,
            last_check_in: self.activity.last_check_in(),
            balance: self.funds.balance(),
            active: self.is_active(),
            executed: self.is_executed(),
            beneficiaries: self.allocation.as_slice().to_vec(),
            payouts: self.payouts.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn state(&self) -> WillState {
        self.state
    }

    pub fn inactivity_period(&self) -> u64 {
        self.inactivity_period
    }

    pub fn last_check_in(&self) -> Timestamp {
        self.activity.last_check_in()
    }

    pub fn balance(&self) -> u64 {
        self.funds.balance()
    }

    pub fn allocation(&self) -> &AllocationLedger {
        &self.allocation
    }

    pub fn beneficiaries(&self) -> &[Beneficiary] {
        self.allocation.as_slice()
    }

    pub fn payouts(&self) -> &[Share] {
        &self.payouts
    }

    pub fn is_active(&self) -> bool {
        self.state == WillState::Active
    }

    pub fn is_executed(&self) -> bool {
        self.state == WillState::Executed
    }

    pub fn time_remaining(&self, now: Timestamp) -> u64 {
        activity::time_remaining(now, self.inactivity_period, self.last_check_in())
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        activity::is_expired(now, self.inactivity_period, self.last_check_in())
    }

    pub fn activity(&self, now: Timestamp) -> ActivityReport {
        ActivityReport::at(now, self.inactivity_period, self.last_check_in())
    }

    fn require(&self, operation: Operation, allowed: &[WillState]) -> Result<(), WillError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(WillError::IllegalTransition {
                operation,
                state: self.state,
            })
        }
    }

    /// Beneficiaries are editable until activation and again after
    /// deactivation. An executed will never changes.
    fn require_editable(&self, operation: Operation) -> Result<(), WillError> {
        match self.state {
            WillState::Registered | WillState::Deactivated => Ok(()),
            WillState::Active => Err(WillError::WillLocked),
            state => Err(WillError::IllegalTransition { operation, state }),
        }
    }

    pub fn add_beneficiary(
        &mut self,
        address: &str,
        percentage: u32,
        name: Option<String>,
    ) -> Result<(), WillError> {
        self.require_editable(Operation::AddBeneficiary)?;
        self.allocation.add(&self.owner, address, percentage, name)?;
        Ok(())
    }

    pub fn update_beneficiary(
        &mut self,
        address: &str,
        percentage: u32,
        name: Option<String>,
    ) -> Result<(), WillError> {
        self.require_editable(Operation::UpdateBeneficiary)?;
        self.allocation.update(address, percentage, name)?;
        Ok(())
    }

    pub fn remove_beneficiary(&mut self, address: &str) -> Result<Option<Beneficiary>, WillError> {
        self.require_editable(Operation::RemoveBeneficiary)?;
        self.allocation.remove(address)
    }

    /// Swaps in a whole new beneficiary list, or leaves the old one if any
    /// entry is rejected.
    pub fn set_beneficiaries(&mut self, entries: &[BeneficiaryEntry]) -> Result<(), WillError> {
        self.require_editable(Operation::SetBeneficiaries)?;
        self.allocation.replace(&self.owner, entries)
    }

    /// Arms the will. Needs a complete allocation and restarts the
    /// inactivity clock.
    pub fn activate(&mut self, now: Timestamp) -> Result<(), WillError> {
        self.require(
            Operation::Activate,
            &[WillState::Registered, WillState::Deactivated],
        )?;
        if !self.allocation.is_complete() {
            return Err(WillError::IncompleteAllocation {
                total: self.allocation.total_percentage(),
            });
        }
        self.state = WillState::Active;
        self.record_activity(now);
        Ok(())
    }

    /// Explicit proof of life. Returns whether the deadline moved.
    pub fn check_in(&mut self, now: Timestamp) -> Result<bool, WillError> {
        self.require(Operation::CheckIn, &[WillState::Active])?;
        Ok(self.record_activity(now))
    }

    pub fn deactivate(&mut self) -> Result<(), WillError> {
        self.require(Operation::Deactivate, &[WillState::Active])?;
        self.state = WillState::Deactivated;
        Ok(())
    }

    pub fn deposit(&mut self, amount: u64) -> Result<u64, WillError> {
        self.require(
            Operation::Deposit,
            &[WillState::Registered, WillState::Active],
        )?;
        self.funds.credit(amount)
    }

    /// Returns the whole balance to the owner.
    pub fn withdraw(&mut self) -> Result<u64, WillError> {
        self.require(
            Operation::Withdraw,
            &[
                WillState::Registered,
                WillState::Active,
                WillState::Deactivated,
            ],
        )?;
        let amount = self.funds.balance();
        if amount == 0 {
            return Err(WillError::NoFunds);
        }
        self.funds.debit(amount)?;
        Ok(amount)
    }

    /// Pays the balance out to the beneficiaries once the inactivity period has
    /// elapsed. Calling it again after execution is a no-op.
    pub fn distribute(&mut self, now: Timestamp) -> Result<Distribution, WillError> {
        if self.is_executed() {
            return Ok(Distribution::AlreadyExecuted);
        }
        self.require(Operation::Distribute, &[WillState::Active])?;

        let remaining = self.time_remaining(now);
        if remaining > 0 {
            return Err(WillError::NotExpired { remaining });
        }
        if self.funds.balance() == 0 {
            return Err(WillError::NoFunds);
        }
        if !self.allocation.is_complete() {
            return Err(WillError::IncompleteAllocation {
                total: self.allocation.total_percentage(),
            });
        }

        let shares = compute_shares(self.funds.balance(), self.allocation.as_slice());
        let mut funds = self.funds;
        for share in &shares {
            funds.debit(share.amount)?;
        }
        self.funds = funds;
        self.state = WillState::Executed;
        self.payouts = shares.clone();
        Ok(Distribution::Executed(shares))
    }

    /// Applies any intent other than `Register`, which creates a will rather
    /// than changing one.
    pub fn apply(&mut self, intent: &Intent, now: Timestamp) -> Result<(), WillError> {
        match intent {
            Intent::Register { .. } => Err(WillError::IllegalTransition {
                operation: Operation::Register,
                state: self.state,
            }),
            Intent::CheckIn => self.check_in(now).map(|_| ()),
            Intent::Deposit { amount } => self.deposit(*amount).map(|_| ()),
            Intent::Withdraw => self.withdraw().map(|_| ()),
            Intent::AddBeneficiary {
                address,
                percentage,
                name,
            } => self.add_beneficiary(address, *percentage, name.clone()),
            Intent::UpdateBeneficiary {
                address,
                percentage,
                name,
            } => self.update_beneficiary(address, *percentage, name.clone()),
            Intent::RemoveBeneficiary { address } => self.remove_beneficiary(address).map(|_| ()),
            Intent::SetBeneficiaries { beneficiaries } => self.set_beneficiaries(beneficiaries),
            Intent::Activate => self.activate(now),
            Intent::Deactivate => self.deactivate(),
            Intent::Distribute => self.distribute(now).map(|_| ()),
        }
    }

    fn record_activity(&mut self, now: Timestamp) -> bool {
        let moved = self.activity.record_activity(now);
        if !moved {
            warn!(
                will_id = self.id,
                owner = %self.owner,
                now,
                last_check_in = self.activity.last_check_in(),
                "clock is behind the last check-in; keeping the previous deadline"
            );
        }
        moved
    }
}
