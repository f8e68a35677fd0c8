//! # Subscription Registry
//!
//! Paid, renewable error callback subscriptions.
//!
//! A subscription is stored under `ContractSubscriptions(contract)` with a
//! single expiry index entry `SubscriptionEndBlock(height, contract)`.
//! Renewal replaces both in one batch.

use crate::domain::entities::{Params, Subscription};
use crate::domain::keys::{decode_address, decode_u64, encode_u64, KeyPrefix};
use crate::domain::value_objects::{Address, BlockHeight, Coin};
use crate::errors::{ContractErrorsError, ContractErrorsResult, StoreError};
use crate::metrics;
use crate::ports::outbound::{BankTransfer, BatchOperation, KeyValueStore, RewardsOwnership, WasmHost};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SubscriptionRegistry<S: KeyValueStore> {
    store: S,
    wasm: Arc<dyn WasmHost>,
    rewards: Arc<dyn RewardsOwnership>,
    bank: Arc<dyn BankTransfer>,
    fee_collector: String,
}

impl<S: KeyValueStore> SubscriptionRegistry<S> {
    pub fn new(
        store: S,
        wasm: Arc<dyn WasmHost>,
        rewards: Arc<dyn RewardsOwnership>,
        bank: Arc<dyn BankTransfer>,
        fee_collector: impl Into<String>,
    ) -> Self {
        Self {
            store,
            wasm,
            rewards,
            bank,
            fee_collector: fee_collector.into(),
        }
    }

    /// Underlying store, for inspection.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sender may manage the contract's subscription if it is the contract
    /// itself, its admin, or its rewards owner.
    fn is_authorized(&self, sender: &Address, contract: &Address) -> bool {
        sender == contract
            || self.wasm.contract_admin(contract).as_ref() == Some(sender)
            || self.rewards.owner_of(contract).as_ref() == Some(sender)
    }

    /// Subscribe or renew. Returns the new expiry height.
    ///
    /// # Errors
    ///
    /// - `ContractNotFound`: the wasm host does not know the contract
    /// - `Unauthorized`: sender is neither the contract, its admin nor its
    ///   rewards owner
    /// - `IncorrectFee`: `fee` differs from `params.subscription_fee`
    /// - `InsufficientFunds`: the bank refused the transfer
    ///
    /// All of the above leave state untouched.
    pub fn set(
        &mut self,
        height: BlockHeight,
        params: &Params,
        sender: &Address,
        contract: &Address,
        fee: &Coin,
    ) -> ContractErrorsResult<BlockHeight> {
        if !self.wasm.has_contract(contract) {
            return Err(ContractErrorsError::ContractNotFound {
                address: contract.to_string(),
            });
        }
        if !self.is_authorized(sender, contract) {
            warn!(sender = %sender, contract = %contract, "[qc-18] unauthorized subscription attempt");
            return Err(ContractErrorsError::Unauthorized {
                sender: sender.to_string(),
                reason: "is not the contract, its admin or its rewards owner".to_string(),
            });
        }
        if *fee != params.subscription_fee {
            return Err(ContractErrorsError::IncorrectFee {
                expected: params.subscription_fee.to_string(),
                provided: fee.to_string(),
            });
        }

        let existing = self.get(contract)?;

        self.bank
            .charge(sender, &self.fee_collector, fee)
            .map_err(|reason| ContractErrorsError::InsufficientFunds { reason })?;

        let expiry_height = height.saturating_add(params.subscription_period);
        let mut ops = Vec::with_capacity(3);
        if let Some(old_expiry) = existing {
            ops.push(BatchOperation::delete(KeyPrefix::subscription_end_block_key(
                old_expiry, contract,
            )));
        }
        ops.push(BatchOperation::put(
            KeyPrefix::subscription_end_block_key(expiry_height, contract),
            contract.as_bytes().to_vec(),
        ));
        ops.push(BatchOperation::put(
            KeyPrefix::contract_subscription_key(contract),
            encode_u64(expiry_height),
        ));
        self.store.atomic_batch_write(ops)?;

        debug!(
            contract = %contract,
            expiry_height,
            renewed = existing.is_some(),
            "[qc-18] subscription set"
        );
        metrics::record_subscription();
        Ok(expiry_height)
    }

    pub fn has(&self, contract: &Address) -> Result<bool, StoreError> {
        self.store
            .exists(&KeyPrefix::contract_subscription_key(contract))
    }

    /// Expiry height of the contract's subscription, if any.
    pub fn get(&self, contract: &Address) -> Result<Option<BlockHeight>, StoreError> {
        self.store
            .get(&KeyPrefix::contract_subscription_key(contract))?
            .map(|bytes| decode_u64(&bytes))
            .transpose()
    }

    pub fn subscription(&self, contract: &Address) -> Result<Option<Subscription>, StoreError> {
        Ok(self.get(contract)?.map(|expiry_height| Subscription {
            contract_address: *contract,
            expiry_height,
        }))
    }

    /// Contracts whose subscription ends at exactly `height`.
    pub fn expiring_at(&self, height: BlockHeight) -> Result<Vec<Address>, StoreError> {
        self.store
            .prefix_scan(&KeyPrefix::subscription_end_block_prefix(height))?
            .into_iter()
            .map(|(_, value)| decode_address(&value))
            .collect()
    }

    /// Remove every subscription ending at exactly `height`. Returns the
    /// number removed.
    pub fn prune_at_height(&mut self, height: BlockHeight) -> ContractErrorsResult<usize> {
        let expiring = self.expiring_at(height)?;
        if expiring.is_empty() {
            return Ok(0);
        }

        let mut ops = Vec::with_capacity(expiring.len() * 2);
        for contract in &expiring {
            ops.push(BatchOperation::delete(KeyPrefix::contract_subscription_key(
                contract,
            )));
            ops.push(BatchOperation::delete(KeyPrefix::subscription_end_block_key(
                height, contract,
            )));
        }
        self.store.atomic_batch_write(ops)?;

        debug!(height, pruned = expiring.len(), "[qc-18] subscriptions pruned");
        metrics::record_pruned("subscriptions", expiring.len());
        Ok(expiring.len())
    }
}
