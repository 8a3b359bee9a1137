#![no_std]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, vec, Address, Env,
    IntoVal, InvokeError, String, Val, Vec,
};

// ─────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────

const MAX_BENEFICIARIES: u32 = 10;
const FULL_ALLOCATION: u32 = 100;

// ─────────────────────────────────────────────────
// Data Types
// ─────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WillState {
    Registered,
    Active,
    Deactivated,
    Executed,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Beneficiary {
    pub address: Address,
    pub percentage: u32, // Whole percent, 1..=100
    pub name: String,    // Empty when the owner gave no name
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payout {
    pub address: Address,
    pub amount: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Will {
    pub id: u64,
    pub owner: Address,
    pub state: WillState,
    pub inactivity_period: u64, // Seconds of silence before distribution opens
    pub last_check_in: u64,
    pub balance: u64, // Escrowed by this contract
    pub beneficiaries: Vec<Beneficiary>,
    pub payouts: Vec<Payout>, // Filled once, on execution
}

// ─────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WillRegisteredEvent {
    pub owner: Address,
    pub will_id: u64,
    pub inactivity_period: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BeneficiaryEvent {
    pub owner: Address,
    pub will_id: u64,
    pub beneficiary: Address,
    pub percentage: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BeneficiariesSetEvent {
    pub owner: Address,
    pub will_id: u64,
    pub count: u32,
    pub total_percentage: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StateChangedEvent {
    pub owner: Address,
    pub will_id: u64,
    pub state: WillState,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FundsEvent {
    pub owner: Address,
    pub will_id: u64,
    pub amount: u64,
    pub balance: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DistributedEvent {
    pub owner: Address,
    pub will_id: u64,
    pub total: u64,
    pub beneficiaries: u32,
    pub caller: Address,
}

// ─────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────

#[contracterror]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WillError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    WillNotFound = 3,
    InvalidAddress = 4,
    DuplicateBeneficiary = 5,
    InvalidPercentage = 6,
    AllocationOverflow = 7,
    TooManyBeneficiaries = 8,
    BeneficiaryNotFound = 9,
    IncompleteAllocation = 10,
    InvalidPeriod = 11,
    InvalidAmount = 12,
    WillLocked = 13,
    NotExpired = 14,
    NoFunds = 15,
    IllegalTransition = 16,
    TransferFailed = 17,
}

// ─────────────────────────────────────────────────
// Storage Keys
// ─────────────────────────────────────────────────

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    Token,
    LatestWillId(Address), // Highest id the owner has registered
    Will(Address, u64),
}

// ─────────────────────────────────────────────────
// Contract
// ─────────────────────────────────────────────────

#[contract]
pub struct WillContract;

#[contractimpl]
impl WillContract {
    // ─── Admin / Init ───────────────────────────────

    /// Set the admin and the token every will escrows. Can only be called once.
    pub fn initialize(env: Env, admin: Address, token: Address) -> Result<(), WillError> {
        admin.require_auth();
        if Self::admin(&env).is_some() {
            return Err(WillError::AlreadyInitialized);
        }
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Token, &token);
        log!(&env, "Will contract initialized");
        Ok(())
    }

    fn admin(env: &Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Admin)
    }

    pub fn get_admin(env: Env) -> Result<Address, WillError> {
        Self::admin(&env).ok_or(WillError::NotInitialized)
    }

    fn get_token(env: &Env) -> Result<Address, WillError> {
        env.storage()
            .instance()
            .get(&DataKey::Token)
            .ok_or(WillError::NotInitialized)
    }

    fn latest_id(env: &Env, owner: &Address) -> u64 {
        env.storage()
            .persistent()
            .get(&DataKey::LatestWillId(owner.clone()))
            .unwrap_or(0u64)
    }

    fn load(env: &Env, owner: &Address, id: u64) -> Option<Will> {
        env.storage()
            .persistent()
            .get(&DataKey::Will(owner.clone(), id))
    }

    fn current(env: &Env, owner: &Address) -> Result<Will, WillError> {
        let id = Self::latest_id(env, owner);
        Self::load(env, owner, id).ok_or(WillError::WillNotFound)
    }

    fn store(env: &Env, will: &Will) {
        env.storage()
            .persistent()
            .set(&DataKey::Will(will.owner.clone(), will.id), will);
    }

    fn transfer(
        env: &Env,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), WillError> {
        let amount_i128 = amount as i128;
        let args: Vec<Val> = vec![
            env,
            from.clone().into_val(env),
            to.clone().into_val(env),
            amount_i128.into_val(env),
        ];
        let res =
            env.try_invoke_contract::<(), InvokeError>(token, &symbol_short!("transfer"), args);
        if res.is_err() {
            return Err(WillError::TransferFailed);
        }
        Ok(())
    }

    // ─── Guards ─────────────────────────────────────

    fn require_state(will: &Will, allowed: &[WillState]) -> Result<(), WillError> {
        if allowed.contains(&will.state) {
            Ok(())
        } else {
            Err(WillError::IllegalTransition)
        }
    }

    /// Beneficiaries can change before activation and after deactivation.
    fn require_editable(will: &Will) -> Result<(), WillError> {
        match will.state {
            WillState::Registered | WillState::Deactivated => Ok(()),
            WillState::Active => Err(WillError::WillLocked),
            WillState::Executed => Err(WillError::IllegalTransition),
        }
    }

    fn total_percentage(beneficiaries: &Vec<Beneficiary>) -> u32 {
        beneficiaries.iter().map(|b| b.percentage).sum()
    }

    fn is_complete(beneficiaries: &Vec<Beneficiary>) -> bool {
        !beneficiaries.is_empty() && Self::total_percentage(beneficiaries) == FULL_ALLOCATION
    }

    fn position(beneficiaries: &Vec<Beneficiary>, address: &Address) -> Option<u32> {
        beneficiaries
            .iter()
            .position(|b| b.address == *address)
            .map(|i| i as u32)
    }

    fn check_percentage(percentage: u32) -> Result<(), WillError> {
        if percentage == 0 || percentage > FULL_ALLOCATION {
            return Err(WillError::InvalidPercentage);
        }
        Ok(())
    }

    fn time_left(env: &Env, will: &Will) -> u64 {
        let now = env.ledger().timestamp();
        will.inactivity_period
            .saturating_sub(now.saturating_sub(will.last_check_in))
    }

    fn publish_state(env: &Env, will: &Will) {
        env.events().publish(
            (symbol_short!("WILL"), symbol_short!("STATE")),
            StateChangedEvent {
                owner: will.owner.clone(),
                will_id: will.id,
                state: will.state,
                timestamp: env.ledger().timestamp(),
            },
        );
    }

    // ─── Lifecycle ──────────────────────────────────

    /// Create a will for `owner`. A new will can only be registered once the
    /// previous one has executed. Returns the owner-scoped will id.
    pub fn register(env: Env, owner: Address, inactivity_period: u64) -> Result<u64, WillError> {
        Self::get_token(&env)?;
        owner.require_auth();

        if inactivity_period == 0 {
            return Err(WillError::InvalidPeriod);
        }
        if let Ok(current) = Self::current(&env, &owner) {
            if current.state != WillState::Executed {
                return Err(WillError::IllegalTransition);
            }
        }

        let id = Self::latest_id(&env, &owner) + 1;
        let will = Will {
            id,
            owner: owner.clone(),
            state: WillState::Registered,
            inactivity_period,
            last_check_in: env.ledger().timestamp(),
            balance: 0,
            beneficiaries: Vec::new(&env),
            payouts: Vec::new(&env),
        };
        Self::store(&env, &will);
        env.storage()
            .persistent()
            .set(&DataKey::LatestWillId(owner.clone()), &id);

        env.events().publish(
            (symbol_short!("WILL"), symbol_short!("REGISTER")),
            WillRegisteredEvent {
                owner,
                will_id: id,
                inactivity_period,
            },
        );
        log!(&env, "Will {} registered", id);
        Ok(id)
    }

    /// Arm the will. The allocation must total exactly 100% and the
    /// inactivity clock restarts now.
    pub fn activate(env: Env, owner: Address) -> Result<(), WillError> {
        owner.require_auth();
        let mut will = Self::current(&env, &owner)?;
        Self::require_state(&will, &[WillState::Registered, WillState::Deactivated])?;
        if !Self::is_complete(&will.beneficiaries) {
            return Err(WillError::IncompleteAllocation);
        }

        will.state = WillState::Active;
        will.last_check_in = will.last_check_in.max(env.ledger().timestamp());
        Self::store(&env, &will);
        Self::publish_state(&env, &will);
        log!(&env, "Will {} activated", will.id);
        Ok(())
    }

    pub fn deactivate(env: Env, owner: Address) -> Result<(), WillError> {
        owner.require_auth();
        let mut will = Self::current(&env, &owner)?;
        Self::require_state(&will, &[WillState::Active])?;

        will.state = WillState::Deactivated;
        Self::store(&env, &will);
        Self::publish_state(&env, &will);
        log!(&env, "Will {} deactivated", will.id);
        Ok(())
    }

    /// Proof of life: restart the inactivity clock from the ledger time.
    pub fn check_in(env: Env, owner: Address) -> Result<u64, WillError> {
        owner.require_auth();
        let mut will = Self::current(&env, &owner)?;
        Self::require_state(&will, &[WillState::Active])?;

        // Ledger time never runs backwards, but keep the deadline monotonic anyway.
        will.last_check_in = will.last_check_in.max(env.ledger().timestamp());
        Self::store(&env, &will);

        env.events().publish(
            (symbol_short!("WILL"), symbol_short!("CHECKIN")),
            StateChangedEvent {
                owner: owner.clone(),
                will_id: will.id,
                state: will.state,
                timestamp: will.last_check_in,
            },
        );
        Ok(will.last_check_in)
    }

    // ─── Beneficiaries ──────────────────────────────

    pub fn add_beneficiary(
        env: Env,
        owner: Address,
        beneficiary: Address,
        percentage: u32,
        name: String,
    ) -> Result<(), WillError> {
        owner.require_auth();
        let mut will = Self::current(&env, &owner)?;
        Self::require_editable(&will)?;

        if beneficiary == owner {
            return Err(WillError::InvalidAddress);
        }
        if Self::position(&will.beneficiaries, &beneficiary).is_some() {
            return Err(WillError::DuplicateBeneficiary);
        }
        Self::check_percentage(percentage)?;
        if will.beneficiaries.len() >= MAX_BENEFICIARIES {
            return Err(WillError::TooManyBeneficiaries);
        }
        if Self::total_percentage(&will.beneficiaries) + percentage > FULL_ALLOCATION {
            return Err(WillError::AllocationOverflow);
        }

        will.beneficiaries.push_back(Beneficiary {
            address: beneficiary.clone(),
            percentage,
            name,
        });
        Self::store(&env, &will);

        env.events().publish(
            (symbol_short!("BENEFIC"), symbol_short!("ADD")),
            BeneficiaryEvent {
                owner,
                will_id: will.id,
                beneficiary,
                percentage,
            },
        );
        log!(&env, "Beneficiary added to will {}", will.id);
        Ok(())
    }

    /// Replace the share and name of an existing beneficiary.
    pub fn update_beneficiary(
        env: Env,
        owner: Address,
        beneficiary: Address,
        percentage: u32,
        name: String,
    ) -> Result<(), WillError> {
        owner.require_auth();
        let mut will = Self::current(&env, &owner)?;
        Self::require_editable(&will)?;

        let index = Self::position(&will.beneficiaries, &beneficiary)
            .ok_or(WillError::BeneficiaryNotFound)?;
        Self::check_percentage(percentage)?;
        let previous = will
            .beneficiaries
            .get(index)
            .ok_or(WillError::BeneficiaryNotFound)?;
        let total = Self::total_percentage(&will.beneficiaries) - previous.percentage + percentage;
        if total > FULL_ALLOCATION {
            return Err(WillError::AllocationOverflow);
        }

        will.beneficiaries.set(
            index,
            Beneficiary {
                address: beneficiary.clone(),
                percentage,
                name,
            },
        );
        Self::store(&env, &will);

        env.events().publish(
            (symbol_short!("BENEFIC"), symbol_short!("UPDATE")),
            BeneficiaryEvent {
                owner,
                will_id: will.id,
                beneficiary,
                percentage,
            },
        );
        Ok(())
    }

    /// Returns whether an entry was removed. Removing an unknown address is
    /// not an error.
    pub fn remove_beneficiary(
        env: Env,
        owner: Address,
        beneficiary: Address,
    ) -> Result<bool, WillError> {
        owner.require_auth();
        let mut will = Self::current(&env, &owner)?;
        Self::require_editable(&will)?;

        let Some(index) = Self::position(&will.beneficiaries, &beneficiary) else {
            return Ok(false);
        };
        let removed = will
            .beneficiaries
            .get(index)
            .ok_or(WillError::BeneficiaryNotFound)?;
        // Keep insertion order: the last entry absorbs the rounding remainder.
        will.beneficiaries.remove(index);
        Self::store(&env, &will);

        env.events().publish(
            (symbol_short!("BENEFIC"), symbol_short!("REMOVE")),
            BeneficiaryEvent {
                owner,
                will_id: will.id,
                beneficiary,
                percentage: removed.percentage,
            },
        );
        log!(&env, "Beneficiary removed from will {}", will.id);
        Ok(true)
    }

    /// Swap in a whole new beneficiary list. Every entry is checked the way
    /// `add_beneficiary` checks it; one bad entry leaves the stored list as it was.
    pub fn set_beneficiaries(
        env: Env,
        owner: Address,
        beneficiaries: Vec<Beneficiary>,
    ) -> Result<(), WillError> {
        owner.require_auth();
        let mut will = Self::current(&env, &owner)?;
        Self::require_editable(&will)?;

        if beneficiaries.len() > MAX_BENEFICIARIES {
            return Err(WillError::TooManyBeneficiaries);
        }
        let mut next: Vec<Beneficiary> = Vec::new(&env);
        for entry in beneficiaries.iter() {
            if entry.address == owner {
                return Err(WillError::InvalidAddress);
            }
            if Self::position(&next, &entry.address).is_some() {
                return Err(WillError::DuplicateBeneficiary);
            }
            Self::check_percentage(entry.percentage)?;
            if Self::total_percentage(&next) + entry.percentage > FULL_ALLOCATION {
                return Err(WillError::AllocationOverflow);
            }
            next.push_back(entry);
        }

        let count = next.len();
        let total_percentage = Self::total_percentage(&next);
        will.beneficiaries = next;
        Self::store(&env, &will);

        env.events().publish(
            (symbol_short!("BENEFIC"), symbol_short!("SET")),
            BeneficiariesSetEvent {
                owner,
                will_id: will.id,
                count,
                total_percentage,
            },
        );
        log!(&env, "Beneficiaries of will {} replaced", will.id);
        Ok(())
    }

    // ─── Funds ──────────────────────────────────────

    /// Escrow `amount` of the token from the owner. Returns the new balance.
    pub fn deposit(env: Env, owner: Address, amount: u64) -> Result<u64, WillError> {
        let token = Self::get_token(&env)?;
        owner.require_auth();
        let mut will = Self::current(&env, &owner)?;
        Self::require_state(&will, &[WillState::Registered, WillState::Active])?;

        if amount == 0 {
            return Err(WillError::InvalidAmount);
        }
        let balance = will
            .balance
            .checked_add(amount)
            .ok_or(WillError::InvalidAmount)?;

        Self::transfer(
            &env,
            &token,
            &owner,
            &env.current_contract_address(),
            amount,
        )?;
        will.balance = balance;
        Self::store(&env, &will);

        env.events().publish(
            (symbol_short!("VAULT"), symbol_short!("DEPOSIT")),
            FundsEvent {
                owner,
                will_id: will.id,
                amount,
                balance,
            },
        );
        log!(&env, "Deposited {} into will {}", amount, will.id);
        Ok(balance)
    }

    /// Return the whole escrowed balance to the owner.
    pub fn withdraw(env: Env, owner: Address) -> Result<u64, WillError> {
        let token = Self::get_token(&env)?;
        owner.require_auth();
        let mut will = Self::current(&env, &owner)?;
        Self::require_state(
            &will,
            &[
                WillState::Registered,
                WillState::Active,
                WillState::Deactivated,
            ],
        )?;

        let amount = will.balance;
        if amount == 0 {
            return Err(WillError::NoFunds);
        }
        Self::transfer(
            &env,
            &token,
            &env.current_contract_address(),
            &owner,
            amount,
        )?;
        will.balance = 0;
        Self::store(&env, &will);

        env.events().publish(
            (symbol_short!("VAULT"), symbol_short!("WITHDRAW")),
            FundsEvent {
                owner,
                will_id: will.id,
                amount,
                balance: 0,
            },
        );
        log!(&env, "Withdrew {} from will {}", amount, will.id);
        Ok(amount)
    }

    // ─── Distribution ───────────────────────────────

    /// Split `balance` by percentage, flooring each share. The last beneficiary
    /// also receives the rounding remainder so the payouts sum to `balance`.
    fn compute_payouts(env: &Env, balance: u64, beneficiaries: &Vec<Beneficiary>) -> Vec<Payout> {
        let mut payouts = Vec::new(env);
        let mut assigned: u64 = 0;
        let last = beneficiaries.len().saturating_sub(1);
        for (i, beneficiary) in beneficiaries.iter().enumerate() {
            let amount = if i as u32 == last {
                balance - assigned
            } else {
                ((balance as u128) * (beneficiary.percentage as u128) / (FULL_ALLOCATION as u128))
                    as u64
            };
            assigned += amount;
            payouts.push_back(Payout {
                address: beneficiary.address,
                amount,
            });
        }
        payouts
    }

    /// Pay out an expired will. Anyone may call this; a will that already
    /// executed returns its recorded payouts without moving funds again.
    pub fn distribute(env: Env, caller: Address, owner: Address) -> Result<Vec<Payout>, WillError> {
        let token = Self::get_token(&env)?;
        caller.require_auth();
        let mut will = Self::current(&env, &owner)?;

        if will.state == WillState::Executed {
            return Ok(will.payouts);
        }
        Self::require_state(&will, &[WillState::Active])?;
        if Self::time_left(&env, &will) > 0 {
            return Err(WillError::NotExpired);
        }
        if will.balance == 0 {
            return Err(WillError::NoFunds);
        }
        if !Self::is_complete(&will.beneficiaries) {
            return Err(WillError::IncompleteAllocation);
        }

        let total = will.balance;
        let payouts = Self::compute_payouts(&env, total, &will.beneficiaries);
        let contract_id = env.current_contract_address();
        for payout in payouts.iter() {
            if payout.amount > 0 {
                Self::transfer(&env, &token, &contract_id, &payout.address, payout.amount)?;
            }
        }

        will.balance = 0;
        will.state = WillState::Executed;
        will.payouts = payouts.clone();
        Self::store(&env, &will);

        env.events().publish(
            (symbol_short!("WILL"), symbol_short!("EXECUTE")),
            DistributedEvent {
                owner,
                will_id: will.id,
                total,
                beneficiaries: payouts.len(),
                caller,
            },
        );
        log!(&env, "Will {} executed, {} distributed", will.id, total);
        Ok(payouts)
    }

    // ─── Queries ────────────────────────────────────

    /// The owner's most recent will, executed or not.
    pub fn get_will(env: Env, owner: Address) -> Option<Will> {
        Self::current(&env, &owner).ok()
    }

    pub fn get_will_by_id(env: Env, owner: Address, will_id: u64) -> Option<Will> {
        Self::load(&env, &owner, will_id)
    }

    /// Id of the owner's live will, or 0 when there is none.
    pub fn get_active_will_id(env: Env, owner: Address) -> u64 {
        match Self::current(&env, &owner) {
            Ok(will) if will.state != WillState::Executed => will.id,
            _ => 0,
        }
    }

    /// Seconds until distribution opens, floored at zero.
    pub fn time_remaining(env: Env, owner: Address) -> Result<u64, WillError> {
        let will = Self::current(&env, &owner)?;
        Ok(Self::time_left(&env, &will))
    }

    pub fn is_expired(env: Env, owner: Address) -> Result<bool, WillError> {
        let will = Self::current(&env, &owner)?;
        Ok(Self::time_left(&env, &will) == 0)
    }
}
