//! Core will logic: allocation, activity, funds, distribution and the
//! lifecycle state machine that ties them together. Pure and synchronous;
//! time is always passed in.

mod address;
pub mod activity;
pub mod allocation;
pub mod distribution;
pub mod funds;
mod intent;
pub mod state;

pub use activity::{ActivityReport, ActivityTracker, TimeLeft, Timestamp};
pub use address::Address;
pub use allocation::{AllocationLedger, Beneficiary, BeneficiaryEntry, MAX_BENEFICIARIES};
pub use distribution::{compute_shares, Share};
pub use funds::FundsLedger;
pub use intent::{Intent, Operation};
pub use state::{Distribution, Will, WillSnapshot, WillState};
