//! # Store Key Layout
//!
//! | Prefix | Collection | Key | Value |
//! |--------|------------|-----|-------|
//! | `0x01` | Params | - | `Params` |
//! | `0x02` | ErrorsCount | - | `u64` |
//! | `0x03` | ContractErrors | address, error id | error id |
//! | `0x04` | Errors | error id | `FaultRecord` |
//! | `0x05` | DeletionBlocks | height, error id | error id |
//! | `0x06` | ContractSubscriptions | address | expiry height |
//! | `0x07` | SubscriptionEndBlock | height, address | address |
//!
//! Integers are big-endian so a prefix scan yields ascending order.

use crate::domain::value_objects::{Address, BlockHeight, ErrorId};
use crate::errors::StoreError;

/// Key prefixes, one per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    Params,
    ErrorsCount,
    ContractErrors,
    Errors,
    DeletionBlocks,
    ContractSubscriptions,
    SubscriptionEndBlock,
}

impl KeyPrefix {
    /// Get the byte prefix for this collection.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Params => &[0x01],
            KeyPrefix::ErrorsCount => &[0x02],
            KeyPrefix::ContractErrors => &[0x03],
            KeyPrefix::Errors => &[0x04],
            KeyPrefix::DeletionBlocks => &[0x05],
            KeyPrefix::ContractSubscriptions => &[0x06],
            KeyPrefix::SubscriptionEndBlock => &[0x07],
        }
    }

    /// Build a full key from the given parts.
    pub fn key(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        for part in parts {
            key.extend_from_slice(part);
        }
        key
    }

    pub fn params_key() -> Vec<u8> {
        KeyPrefix::Params.key(&[])
    }

    pub fn errors_count_key() -> Vec<u8> {
        KeyPrefix::ErrorsCount.key(&[])
    }

    pub fn contract_errors_key(contract: &Address, error_id: ErrorId) -> Vec<u8> {
        KeyPrefix::ContractErrors.key(&[&contract.as_bytes()[..], &error_id.to_be_bytes()[..]])
    }

    /// Prefix of every `ContractErrors` entry for one contract.
    pub fn contract_errors_prefix(contract: &Address) -> Vec<u8> {
        KeyPrefix::ContractErrors.key(&[&contract.as_bytes()[..]])
    }

    pub fn error_key(error_id: ErrorId) -> Vec<u8> {
        KeyPrefix::Errors.key(&[&error_id.to_be_bytes()[..]])
    }

    pub fn deletion_block_key(height: BlockHeight, error_id: ErrorId) -> Vec<u8> {
        KeyPrefix::DeletionBlocks.key(&[&height.to_be_bytes()[..], &error_id.to_be_bytes()[..]])
    }

    /// Prefix of every `DeletionBlocks` entry scheduled at `height`.
    pub fn deletion_blocks_prefix(height: BlockHeight) -> Vec<u8> {
        KeyPrefix::DeletionBlocks.key(&[&height.to_be_bytes()[..]])
    }

    pub fn contract_subscription_key(contract: &Address) -> Vec<u8> {
        KeyPrefix::ContractSubscriptions.key(&[&contract.as_bytes()[..]])
    }

    pub fn subscription_end_block_key(height: BlockHeight, contract: &Address) -> Vec<u8> {
        KeyPrefix::SubscriptionEndBlock.key(&[&height.to_be_bytes()[..], &contract.as_bytes()[..]])
    }

    /// Prefix of every `SubscriptionEndBlock` entry expiring at `height`.
    pub fn subscription_end_block_prefix(height: BlockHeight) -> Vec<u8> {
        KeyPrefix::SubscriptionEndBlock.key(&[&height.to_be_bytes()[..]])
    }
}

/// Encode a `u64` value.
pub fn encode_u64(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Decode a `u64` value written by [`encode_u64`].
pub fn decode_u64(bytes: &[u8]) -> Result<u64, StoreError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| StoreError::Codec {
        message: format!("expected 8 bytes, got {}", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(raw))
}

/// Decode an address value.
pub fn decode_address(bytes: &[u8]) -> Result<Address, StoreError> {
    Address::from_slice(bytes).ok_or_else(|| StoreError::Codec {
        message: format!("expected {} address bytes, got {}", Address::LEN, bytes.len()),
    })
}
