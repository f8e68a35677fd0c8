//! # Error Types
//!
//! All error types for the Contract Errors subsystem.
//!
//! Synchronous entry points (`set_error`, `subscribe_to_error`,
//! `update_params`) reject with [`ContractErrorsError`] and leave no partial
//! state behind. Callback delivery failures never surface here: the
//! dispatcher absorbs them into the error log. A storage failure after all
//! checks passed is a [`FatalError`] and must abort block processing.

use crate::domain::value_objects::ErrorId;
use thiserror::Error;

/// Result type for Contract Errors operations.
pub type ContractErrorsResult<T> = Result<T, ContractErrorsError>;

// =============================================================================
// SUBSYSTEM ERRORS
// =============================================================================

/// Errors returned synchronously to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractErrorsError {
    /// Input failed validation (empty module name, malformed address, bad coin).
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The wasm host has no contract at this address.
    #[error("contract not found: {address}")]
    ContractNotFound { address: String },

    /// Sender may not perform this operation.
    #[error("unauthorized: {sender} {reason}")]
    Unauthorized { sender: String, reason: String },

    /// Subscription fee does not equal the configured fee.
    #[error("incorrect subscription fee: expected {expected}, provided {provided}")]
    IncorrectFee { expected: String, provided: String },

    /// Fee transfer was refused by the bank.
    #[error("insufficient funds: {reason}")]
    InsufficientFunds { reason: String },

    /// Module parameters are invalid.
    #[error("invalid params: {reason}")]
    InvalidParams { reason: String },

    /// Operation called outside of (or across) the block lifecycle.
    #[error("block lifecycle violation: {reason}")]
    BlockLifecycle { reason: String },

    /// Underlying store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ContractErrorsError {
    /// Shorthand for a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Returns true if this error was a rejected request (no state touched).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

// =============================================================================
// STORE ERRORS
// =============================================================================

/// Errors from the key-value store and value codecs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend I/O failure.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Value could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec { message: String },

    /// An index entry points at a record that does not exist.
    #[error("dangling index entry for error {error_id}")]
    DanglingIndex { error_id: ErrorId },
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        Self::Codec {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// SUDO CALL ERRORS
// =============================================================================

/// Failure of a bounded-gas sudo call, as reported by the wasm host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SudoCallError {
    /// Contract consumed more gas than the callback ceiling.
    #[error("out of gas: used {used}, limit {limit}")]
    OutOfGas { limit: u64, used: u64 },

    /// Contract returned an error or trapped.
    #[error("execution failed: {0}")]
    Execution(String),
}

// =============================================================================
// FATAL ERRORS
// =============================================================================

/// Unrecoverable failure. The host must stop processing the block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// A write or prune failed after every check had passed.
    #[error("storage invariant violated during {context}: {source}")]
    StorageInvariantViolation {
        context: &'static str,
        source: ContractErrorsError,
    },

    /// `end_block` was called without a matching `begin_block`.
    #[error("end_block called with no open block")]
    NoOpenBlock,
}

// =============================================================================
// TESTS
// =============================================================================
