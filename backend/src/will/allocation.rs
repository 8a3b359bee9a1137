use serde::{Deserialize, Serialize};

use super::Address;
use crate::error::WillError;

/// Upper bound on beneficiaries per will.
pub const MAX_BENEFICIARIES: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub address: Address,
    /// Whole percent, 1..=100.
    pub percentage: u32,
    /// Display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One requested entry of a whole-list replacement, as typed by the owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryEntry {
    pub address: String,
    pub percentage: u32,
    #[serde(default)]
    pub name: Option<String>,
}

impl Beneficiary {
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.address.short())
    }
}

fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn check_percentage(percentage: u32) -> Result<(), WillError> {
    if percentage == 0 || percentage > 100 {
        return Err(WillError::InvalidPercentage(percentage));
    }
    Ok(())
}

/// Beneficiaries of one will, in insertion order.
///
/// The sum of percentages never exceeds 100. Every mutation checks all of its
/// guards before touching the list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationLedger {
    beneficiaries: Vec<Beneficiary>,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from a list confirmed by the execution authority.
    pub fn from_confirmed(beneficiaries: Vec<Beneficiary>) -> Self {
        Self { beneficiaries }
    }

    pub fn add(
        &mut self,
        owner: &Address,
        address: &str,
        percentage: u32,
        name: Option<String>,
    ) -> Result<&Beneficiary, WillError> {
        let address = Address::parse(address)?;
        if &address == owner {
            return Err(WillError::InvalidAddress(format!(
                "{address} is the owner of this will"
            )));
        }
        if self.position(&address).is_some() {
            return Err(WillError::DuplicateBeneficiary(address.to_string()));
        }
        check_percentage(percentage)?;
        if self.beneficiaries.len() >= MAX_BENEFICIARIES {
            return Err(WillError::TooManyBeneficiaries {
                max: MAX_BENEFICIARIES,
            });
        }
        let total = self.total_percentage() + percentage;
        if total > 100 {
            return Err(WillError::AllocationOverflow { total });
        }

        self.beneficiaries.push(Beneficiary {
            address,
            percentage,
            name: clean_name(name),
        });
        Ok(&self.beneficiaries[self.beneficiaries.len() - 1])
    }

    /// Changes the share of an existing beneficiary. The display name is only
    /// replaced when one is given; a blank name clears it.
    pub fn update(
        &mut self,
        address: &str,
        percentage: u32,
        name: Option<String>,
    ) -> Result<&Beneficiary, WillError> {
        let address = Address::parse(address)?;
        let index = self
            .position(&address)
            .ok_or_else(|| WillError::BeneficiaryNotFound(address.to_string()))?;
        check_percentage(percentage)?;
        let total = self.total_percentage() - self.beneficiaries[index].percentage + percentage;
        if total > 100 {
            return Err(WillError::AllocationOverflow { total });
        }

        let entry = &mut self.beneficiaries[index];
        entry.percentage = percentage;
        if name.is_some() {
            entry.name = clean_name(name);
        }
        Ok(entry)
    }

    /// Replaces the whole list in one step. Every entry goes through the same
    /// guards as [`AllocationLedger::add`], in order; if any fails the ledger is
    /// left as it was.
    pub fn replace(
        &mut self,
        owner: &Address,
        entries: &[BeneficiaryEntry],
    ) -> Result<(), WillError> {
        let mut next = AllocationLedger::new();
        for entry in entries {
            next.add(owner, &entry.address, entry.percentage, entry.name.clone())?;
        }
        *self = next;
        Ok(())
    }

    /// Removes `address`, keeping the order of the remaining entries.
    /// Removing an address that is not present is not an error.
    pub fn remove(&mut self, address: &str) -> Result<Option<Beneficiary>, WillError> {
        let address = Address::parse(address)?;
        Ok(self
            .position(&address)
            .map(|index| self.beneficiaries.remove(index)))
    }

    pub fn total_percentage(&self) -> u32 {
        self.beneficiaries.iter().map(|b| b.percentage).sum()
    }

    pub fn is_complete(&self) -> bool {
        !self.beneficiaries.is_empty() && self.total_percentage() == 100
    }

    pub fn get(&self, address: &Address) -> Option<&Beneficiary> {
        self.position(address).map(|i| &self.beneficiaries[i])
    }

    pub fn as_slice(&self) -> &[Beneficiary] {
        &self.beneficiaries
    }

    pub fn len(&self) -> usize {
        self.beneficiaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beneficiaries.is_empty()
    }

    fn position(&self, address: &Address) -> Option<usize> {
        self.beneficiaries.iter().position(|b| &b.address == address)
    }
}
