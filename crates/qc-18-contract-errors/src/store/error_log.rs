//! # Error Log
//!
//! Durable fault records for contracts without an active subscription.
//!
//! Each record is written together with two index entries:
//!
//! - `ContractErrors(contract, id)`: lists a contract's errors in id order
//! - `DeletionBlocks(height, id)`: schedules the record for pruning
//!
//! The record and both entries are always written and removed in one batch.
//! `ErrorsCount` lives in the same store and is only ever incremented.

use crate::domain::entities::{FaultRecord, Params};
use crate::domain::keys::{decode_u64, encode_u64, KeyPrefix};
use crate::domain::value_objects::{Address, BlockHeight, ErrorId};
use crate::errors::{ContractErrorsError, ContractErrorsResult, StoreError};
use crate::events::ContractErrorsEvent;
use crate::metrics;
use crate::ports::outbound::{BatchOperation, EventSink, KeyValueStore, WasmHost};
use std::sync::Arc;
use tracing::debug;

/// Outcome of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredError {
    pub error_id: ErrorId,
    pub deletion_height: BlockHeight,
}

pub struct ErrorLog<S: KeyValueStore> {
    store: S,
    wasm: Arc<dyn WasmHost>,
    events: Arc<dyn EventSink>,
}

impl<S: KeyValueStore> ErrorLog<S> {
    pub fn new(store: S, wasm: Arc<dyn WasmHost>, events: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            wasm,
            events,
        }
    }

    /// Underlying store, for inspection.
    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Number of ids handed out so far. Ids start at 1, so this is also the
    /// last id assigned.
    pub fn errors_count(&self) -> Result<u64, StoreError> {
        match self.store.get(&KeyPrefix::errors_count_key())? {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(0),
        }
    }

    /// Consume the next error id without writing a record.
    pub fn reserve_id(&mut self) -> Result<ErrorId, StoreError> {
        let id = self.errors_count()? + 1;
        self.store
            .put(&KeyPrefix::errors_count_key(), &encode_u64(id))?;
        Ok(id)
    }

    /// Store a record, scheduling it for deletion `error_stored_time` blocks
    /// after `height`.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty module name or malformed contract address
    /// - `ContractNotFound`: the wasm host does not know the contract
    /// - `Storage`: the batch write failed (nothing was written)
    pub fn append(
        &mut self,
        height: BlockHeight,
        params: &Params,
        record: FaultRecord,
    ) -> ContractErrorsResult<StoredError> {
        record.validate()?;
        let contract = record.contract()?;
        if !self.wasm.has_contract(&contract) {
            return Err(ContractErrorsError::ContractNotFound {
                address: record.contract_address,
            });
        }
        self.write(height, params, contract, record)
    }

    /// Store a record without consulting the wasm host.
    ///
    /// For records whose contract was already checked when the fault was
    /// routed (callback fallbacks, faults held while callbacks are disabled)
    /// and for genesis, which runs before contracts are instantiated. The
    /// contract may be gone by the time these are written.
    pub fn append_unchecked(
        &mut self,
        height: BlockHeight,
        params: &Params,
        record: FaultRecord,
    ) -> ContractErrorsResult<StoredError> {
        record.validate()?;
        let contract = record.contract()?;
        self.write(height, params, contract, record)
    }

    fn write(
        &mut self,
        height: BlockHeight,
        params: &Params,
        contract: Address,
        record: FaultRecord,
    ) -> ContractErrorsResult<StoredError> {
        let error_id = self.errors_count()? + 1;
        let deletion_height = height.saturating_add(params.error_stored_time);

        let ops = vec![
            BatchOperation::put(KeyPrefix::errors_count_key(), encode_u64(error_id)),
            BatchOperation::put(
                KeyPrefix::error_key(error_id),
                bincode::serialize(&record).map_err(StoreError::from)?,
            ),
            BatchOperation::put(
                KeyPrefix::contract_errors_key(&contract, error_id),
                encode_u64(error_id),
            ),
            BatchOperation::put(
                KeyPrefix::deletion_block_key(deletion_height, error_id),
                encode_u64(error_id),
            ),
        ];
        self.store.atomic_batch_write(ops)?;

        debug!(
            error_id,
            deletion_height,
            contract = %contract,
            module = %record.module_name,
            "[qc-18] error stored"
        );
        metrics::record_error_stored();
        self.events.emit(ContractErrorsEvent::ErrorStored {
            error_id,
            record,
            deletion_height,
        });

        Ok(StoredError {
            error_id,
            deletion_height,
        })
    }

    /// Record by id.
    pub fn get(&self, error_id: ErrorId) -> Result<Option<FaultRecord>, StoreError> {
        match self.store.get(&KeyPrefix::error_key(error_id))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load(&self, error_id: ErrorId) -> Result<FaultRecord, StoreError> {
        self.get(error_id)?
            .ok_or(StoreError::DanglingIndex { error_id })
    }

    /// All records of a contract, in id order.
    pub fn list_by_contract(&self, contract: &Address) -> Result<Vec<FaultRecord>, StoreError> {
        self.store
            .prefix_scan(&KeyPrefix::contract_errors_prefix(contract))?
            .into_iter()
            .map(|(_, value)| self.load(decode_u64(&value)?))
            .collect()
    }

    /// Ids scheduled for deletion at exactly `height`.
    pub fn scheduled_at(&self, height: BlockHeight) -> Result<Vec<ErrorId>, StoreError> {
        self.store
            .prefix_scan(&KeyPrefix::deletion_blocks_prefix(height))?
            .into_iter()
            .map(|(_, value)| decode_u64(&value))
            .collect()
    }

    /// Delete every record scheduled at exactly `height`, with both of its
    /// index entries. Returns the number of records removed.
    pub fn prune_at_height(&mut self, height: BlockHeight) -> ContractErrorsResult<usize> {
        let ids = self.scheduled_at(height)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let mut ops = Vec::with_capacity(ids.len() * 3);
        for &error_id in &ids {
            let record = self.load(error_id)?;
            let contract = record.contract().map_err(|_| StoreError::Codec {
                message: format!("stored error {error_id} has a malformed contract address"),
            })?;
            ops.push(BatchOperation::delete(KeyPrefix::error_key(error_id)));
            ops.push(BatchOperation::delete(KeyPrefix::contract_errors_key(
                &contract, error_id,
            )));
            ops.push(BatchOperation::delete(KeyPrefix::deletion_block_key(
                height, error_id,
            )));
        }
        self.store.atomic_batch_write(ops)?;

        debug!(height, pruned = ids.len(), "[qc-18] errors pruned");
        metrics::record_pruned("errors", ids.len());
        Ok(ids.len())
    }

    /// Every stored record, in id order.
    pub fn export_all(&self) -> Result<Vec<(ErrorId, FaultRecord)>, StoreError> {
        self.store
            .prefix_scan(KeyPrefix::Errors.as_bytes())?
            .into_iter()
            .map(|(key, value)| {
                let id = decode_u64(&key[KeyPrefix::Errors.as_bytes().len()..])?;
                Ok((id, bincode::deserialize(&value)?))
            })
            .collect()
    }
}
