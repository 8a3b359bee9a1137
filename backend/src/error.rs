use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::will::{Operation, WillState};

/// Every way a will transition can be refused.
///
/// Allocation errors are recoverable by editing the input and retrying.
/// State-machine errors are surfaced verbatim. The two authority errors are
/// retryable, but an unavailable authority may have committed the intent, so
/// the mirror only retries one after a re-sync shows nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details", rename_all = "snake_case")]
pub enum WillError {
    // ── allocation ──────────────────────────────────────────────────────────
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("{0} is already a beneficiary of this will")]
    DuplicateBeneficiary(String),

    #[error("percentage must be between 1 and 100, got {0}")]
    InvalidPercentage(u32),

    #[error("total allocation would be {total}%, which exceeds 100%")]
    AllocationOverflow { total: u32 },

    #[error("a will holds at most {max} beneficiaries")]
    TooManyBeneficiaries { max: usize },

    #[error("{0} is not a beneficiary of this will")]
    BeneficiaryNotFound(String),

    #[error("allocation must total exactly 100% across at least one beneficiary, currently {total}%")]
    IncompleteAllocation { total: u32 },

    // ── input ───────────────────────────────────────────────────────────────
    #[error("inactivity period must be greater than zero")]
    InvalidPeriod,

    #[error("amount must be greater than zero")]
    InvalidAmount,

    // ── state machine ───────────────────────────────────────────────────────
    #[error("beneficiaries cannot be changed while the will is active")]
    WillLocked,

    #[error("inactivity period has not elapsed ({remaining}s remaining)")]
    NotExpired { remaining: u64 },

    #[error("the will holds no funds")]
    NoFunds,

    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("cannot {operation} a will that is {state}")]
    IllegalTransition {
        operation: Operation,
        state: WillState,
    },

    #[error("a {0} request is still awaiting confirmation")]
    TransitionInFlight(Operation),

    // ── execution authority ─────────────────────────────────────────────────
    #[error("execution authority unavailable: {0}")]
    AuthorityUnavailable(String),

    #[error("execution authority rejected the request: {0}")]
    AuthorityRejected(String),

    #[error("execution authority refused a malformed request: {0}")]
    InvalidRequest(String),
}

impl WillError {
    /// Stable identifier used in logs, outcome events and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WillError::InvalidAddress(_) => "invalid_address",
            WillError::DuplicateBeneficiary(_) => "duplicate_beneficiary",
            WillError::InvalidPercentage(_) => "invalid_percentage",
            WillError::AllocationOverflow { .. } => "allocation_overflow",
            WillError::TooManyBeneficiaries { .. } => "too_many_beneficiaries",
            WillError::BeneficiaryNotFound(_) => "beneficiary_not_found",
            WillError::IncompleteAllocation { .. } => "incomplete_allocation",
            WillError::InvalidPeriod => "invalid_period",
            WillError::InvalidAmount => "invalid_amount",
            WillError::WillLocked => "will_locked",
            WillError::NotExpired { .. } => "not_expired",
            WillError::NoFunds => "no_funds",
            WillError::InsufficientFunds { .. } => "insufficient_funds",
            WillError::IllegalTransition { .. } => "illegal_transition",
            WillError::TransitionInFlight(_) => "transition_in_flight",
            WillError::AuthorityUnavailable(_) => "authority_unavailable",
            WillError::AuthorityRejected(_) => "authority_rejected",
            WillError::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Input errors the user fixes by editing what they typed.
    pub fn is_allocation_error(&self) -> bool {
        matches!(
            self,
            WillError::InvalidAddress(_)
                | WillError::DuplicateBeneficiary(_)
                | WillError::InvalidPercentage(_)
                | WillError::AllocationOverflow { .. }
                | WillError::TooManyBeneficiaries { .. }
                | WillError::BeneficiaryNotFound(_)
                | WillError::IncompleteAllocation { .. }
                | WillError::InvalidPeriod
                | WillError::InvalidAmount
        )
    }

    pub fn is_authority_error(&self) -> bool {
        matches!(
            self,
            WillError::AuthorityUnavailable(_) | WillError::AuthorityRejected(_)
        )
    }

    /// Transient authority failures. Sending the same request again can
    /// succeed; anything else fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        self.is_authority_error()
    }
}
