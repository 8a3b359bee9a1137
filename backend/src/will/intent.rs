use std::fmt;

use serde::{Deserialize, Serialize};

use super::allocation::BeneficiaryEntry;

/// Every request the core can put to the execution authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Register {
        inactivity_period: u64,
    },
    CheckIn,
    Deposit {
        amount: u64,
    },
    Withdraw,
    AddBeneficiary {
        address: String,
        percentage: u32,
        #[serde(default)]
        name: Option<String>,
    },
    UpdateBeneficiary {
        address: String,
        percentage: u32,
        #[serde(default)]
        name: Option<String>,
    },
    RemoveBeneficiary {
        address: String,
    },
    SetBeneficiaries {
        beneficiaries: Vec<BeneficiaryEntry>,
    },
    Activate,
    Deactivate,
    Distribute,
}

impl Intent {
    pub fn operation(&self) -> Operation {
        match self {
            Intent::Register { .. } => Operation::Register,
            Intent::CheckIn => Operation::CheckIn,
            Intent::Deposit { .. } => Operation::Deposit,
            Intent::Withdraw => Operation::Withdraw,
            Intent::AddBeneficiary { .. } => Operation::AddBeneficiary,
            Intent::UpdateBeneficiary { .. } => Operation::UpdateBeneficiary,
            Intent::RemoveBeneficiary { .. } => Operation::RemoveBeneficiary,
            Intent::SetBeneficiaries { .. } => Operation::SetBeneficiaries,
            Intent::Activate => Operation::Activate,
            Intent::Deactivate => Operation::Deactivate,
            Intent::Distribute => Operation::Distribute,
        }
    }
}

/// Name of an intent, without its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Register,
    CheckIn,
    Deposit,
    Withdraw,
    AddBeneficiary,
    UpdateBeneficiary,
    RemoveBeneficiary,
    SetBeneficiaries,
    Activate,
    Deactivate,
    Distribute,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::CheckIn => "check_in",
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
            Operation::AddBeneficiary => "add_beneficiary",
            Operation::UpdateBeneficiary => "update_beneficiary",
            Operation::RemoveBeneficiary => "remove_beneficiary",
            Operation::SetBeneficiaries => "set_beneficiaries",
            Operation::Activate => "activate",
            Operation::Deactivate => "deactivate",
            Operation::Distribute => "distribute",
        }
    }

    /// Message shown when the operation is confirmed.
    pub fn success_message(&self) -> &'static str {
        match self {
            Operation::Register => "Registration successful",
            Operation::CheckIn => "Check-in successful",
            Operation::Deposit => "Deposit successful",
            Operation::Withdraw => "Withdrawal successful",
            Operation::AddBeneficiary => "Beneficiary added",
            Operation::UpdateBeneficiary => "Beneficiary updated",
            Operation::RemoveBeneficiary => "Beneficiary removed",
            Operation::SetBeneficiaries => "Beneficiaries updated",
            Operation::Activate => "Will activated",
            Operation::Deactivate => "Will deactivated",
            Operation::Distribute => "Funds distributed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
