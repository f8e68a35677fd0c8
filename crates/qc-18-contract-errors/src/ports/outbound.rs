//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the Contract Errors subsystem depends on:
//! - Key-value persistence
//! - Wasm host (contract existence, admin lookup, bounded-gas sudo)
//! - Rewards ownership (contract owner lookup)
//! - Bank transfer (subscription fee collection)
//! - Event sink
//!
//! Adapters implement these traits; nothing in this module touches I/O.

use crate::domain::value_objects::{Address, Coin};
use crate::errors::{StoreError, SudoCallError};
use crate::events::ContractErrorsEvent;

// =============================================================================
// KEY-VALUE STORE
// =============================================================================

/// Result of a prefix scan: `(key, value)` pairs in ascending key order.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Abstract interface for persistent key-value storage.
///
/// Production backs this with a column family of the node database.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError>;

    /// Iterate over keys with a prefix, ascending by key.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

// =============================================================================
// WASM HOST
// =============================================================================

/// Successful sudo call outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SudoResponse {
    /// Data returned by the contract.
    pub data: Vec<u8>,
    /// Gas consumed by the call.
    pub gas_used: u64,
}

/// Interface to the wasm execution host.
pub trait WasmHost: Send + Sync {
    /// Returns true if a contract is instantiated at `address`.
    fn has_contract(&self, address: &Address) -> bool;

    /// Admin of the contract, if it has one.
    fn contract_admin(&self, address: &Address) -> Option<Address>;

    /// Invoke the contract's sudo entry point with a metered gas budget.
    ///
    /// The host MUST stop execution once `gas_limit` is consumed and report
    /// [`SudoCallError::OutOfGas`].
    fn sudo(
        &self,
        address: &Address,
        payload: &[u8],
        gas_limit: u64,
    ) -> Result<SudoResponse, SudoCallError>;
}

// =============================================================================
// REWARDS OWNERSHIP
// =============================================================================

/// Interface to the rewards subsystem's contract metadata.
pub trait RewardsOwnership: Send + Sync {
    /// Owner registered for the contract's rewards, if any.
    fn owner_of(&self, contract: &Address) -> Option<Address>;
}

// =============================================================================
// BANK TRANSFER
// =============================================================================

/// Interface to the bank for fee collection.
pub trait BankTransfer: Send + Sync {
    /// Move `fee` from `payer` into the module account `pool`.
    ///
    /// On error nothing is transferred.
    fn charge(&self, payer: &Address, pool: &str, fee: &Coin) -> Result<(), String>;
}

// =============================================================================
// EVENT SINK
// =============================================================================

/// Destination for subsystem events.
pub trait EventSink: Send + Sync {
    /// Publish one event.
    fn emit(&self, event: ContractErrorsEvent);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_operation_builders() {
        assert_eq!(
            BatchOperation::put(b"k".to_vec(), b"v".to_vec()),
            BatchOperation::Put {
                key: b"k".to_vec(),
                value: b"v".to_vec()
            }
        );
        assert_eq!(
            BatchOperation::delete(b"k".to_vec()),
            BatchOperation::Delete { key: b"k".to_vec() }
        );
    }
}
