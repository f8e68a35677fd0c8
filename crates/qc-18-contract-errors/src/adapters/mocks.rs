//! # Mock Collaborators
//!
//! In-memory stand-ins for the wasm host, rewards metadata and bank, used by
//! unit tests, integration tests and `create_test_service()`.

use crate::domain::value_objects::{Address, Coin};
use crate::errors::SudoCallError;
use crate::ports::outbound::{BankTransfer, RewardsOwnership, SudoResponse, WasmHost};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

// =============================================================================
// MOCK WASM HOST
// =============================================================================

/// How a mock contract reacts to a sudo call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SudoBehavior {
    /// Succeed after consuming the given gas.
    Succeed { gas_used: u64 },
    /// Return an execution error.
    Fail(String),
    /// Remove the contract from the host, then return an execution error.
    FailAndRemove(String),
}

impl Default for SudoBehavior {
    fn default() -> Self {
        Self::Succeed { gas_used: 1_000 }
    }
}

#[derive(Debug, Clone, Default)]
struct MockContract {
    admin: Option<Address>,
    behavior: SudoBehavior,
}

/// Sudo call recorded by [`MockWasmHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSudoCall {
    pub contract: Address,
    pub payload: Vec<u8>,
    pub gas_limit: u64,
}

/// Mock wasm host with per-contract behavior and call recording.
#[derive(Debug, Default)]
pub struct MockWasmHost {
    contracts: RwLock<HashMap<Address, MockContract>>,
    calls: Mutex<Vec<RecordedSudoCall>>,
}

impl MockWasmHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate a contract that succeeds on sudo.
    pub fn add_contract(&self, address: Address, admin: Option<Address>) {
        self.contracts.write().insert(
            address,
            MockContract {
                admin,
                behavior: SudoBehavior::default(),
            },
        );
    }

    /// Forget a contract, as if it had been removed from the chain.
    pub fn remove_contract(&self, address: &Address) {
        self.contracts.write().remove(address);
    }

    /// Change how an existing contract answers sudo calls.
    pub fn set_behavior(&self, address: &Address, behavior: SudoBehavior) {
        if let Some(contract) = self.contracts.write().get_mut(address) {
            contract.behavior = behavior;
        }
    }

    /// Every sudo call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedSudoCall> {
        self.calls.lock().clone()
    }
}

impl WasmHost for MockWasmHost {
    fn has_contract(&self, address: &Address) -> bool {
        self.contracts.read().contains_key(address)
    }

    fn contract_admin(&self, address: &Address) -> Option<Address> {
        self.contracts.read().get(address).and_then(|c| c.admin)
    }

    fn sudo(
        &self,
        address: &Address,
        payload: &[u8],
        gas_limit: u64,
    ) -> Result<SudoResponse, SudoCallError> {
        self.calls.lock().push(RecordedSudoCall {
            contract: *address,
            payload: payload.to_vec(),
            gas_limit,
        });

        let behavior = match self.contracts.read().get(address) {
            Some(contract) => contract.behavior.clone(),
            None => return Err(SudoCallError::Execution("no such contract".to_string())),
        };

        match behavior {
            // Metering halts execution at the limit
            SudoBehavior::Succeed { gas_used } if gas_used > gas_limit => {
                Err(SudoCallError::OutOfGas {
                    limit: gas_limit,
                    used: gas_used,
                })
            }
            SudoBehavior::Succeed { gas_used } => Ok(SudoResponse {
                data: Vec::new(),
                gas_used,
            }),
            SudoBehavior::Fail(message) => Err(SudoCallError::Execution(message)),
            SudoBehavior::FailAndRemove(message) => {
                self.remove_contract(address);
                Err(SudoCallError::Execution(message))
            }
        }
    }
}

// =============================================================================
// MOCK REWARDS OWNERSHIP
// =============================================================================

/// Mock rewards metadata: contract -> owner.
#[derive(Debug, Default)]
pub struct MockRewardsOwnership {
    owners: RwLock<HashMap<Address, Address>>,
}

impl MockRewardsOwnership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_owner(&self, contract: Address, owner: Address) {
        self.owners.write().insert(contract, owner);
    }
}

impl RewardsOwnership for MockRewardsOwnership {
    fn owner_of(&self, contract: &Address) -> Option<Address> {
        self.owners.read().get(contract).copied()
    }
}

// =============================================================================
// MOCK BANK
// =============================================================================

/// Mock bank holding per-account and per-pool balances.
#[derive(Debug, Default)]
pub struct MockBank {
    balances: Mutex<HashMap<(Address, String), u128>>,
    pools: Mutex<HashMap<(String, String), u128>>,
}

impl MockBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account.
    pub fn fund(&self, account: Address, coin: &Coin) {
        *self
            .balances
            .lock()
            .entry((account, coin.denom.clone()))
            .or_insert(0) += coin.amount;
    }

    pub fn balance(&self, account: &Address, denom: &str) -> u128 {
        self.balances
            .lock()
            .get(&(*account, denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Balance of a module account.
    pub fn pool_balance(&self, pool: &str, denom: &str) -> u128 {
        self.pools
            .lock()
            .get(&(pool.to_string(), denom.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

impl BankTransfer for MockBank {
    fn charge(&self, payer: &Address, pool: &str, fee: &Coin) -> Result<(), String> {
        if fee.amount == 0 {
            return Ok(());
        }

        let mut balances = self.balances.lock();
        let balance = balances.entry((*payer, fee.denom.clone())).or_insert(0);
        if *balance < fee.amount {
            return Err(format!("{payer} has {balance}{}, needs {fee}", fee.denom));
        }
        *balance -= fee.amount;

        *self
            .pools
            .lock()
            .entry((pool.to_string(), fee.denom.clone()))
            .or_insert(0) += fee.amount;
        Ok(())
    }
}
