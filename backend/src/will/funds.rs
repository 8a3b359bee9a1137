use crate::error::WillError;

/// Balance held by a will, in the ledger's native unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FundsLedger {
    balance: u64,
}

impl FundsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance: u64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn credit(&mut self, amount: u64) -> Result<u64, WillError> {
        if amount == 0 {
            return Err(WillError::InvalidAmount);
        }
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(WillError::InvalidAmount)?;
        Ok(self.balance)
    }

    pub fn debit(&mut self, amount: u64) -> Result<u64, WillError> {
        if amount > self.balance {
            return Err(WillError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }
}
