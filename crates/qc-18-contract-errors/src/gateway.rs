//! # Gateway
//!
//! Single entry point for new faults. A fault for a subscribed contract goes
//! to the block's callback queue; any other fault goes to the error log.
//! Never both.

use crate::domain::entities::{FaultRecord, Params};
use crate::domain::value_objects::{BlockHeight, ErrorId};
use crate::errors::{ContractErrorsError, ContractErrorsResult};
use crate::metrics;
use crate::ports::outbound::{KeyValueStore, WasmHost};
use crate::store::{BlockScope, ErrorLog, StoredError, SubscriptionRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a reported fault ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    /// Written to the error log.
    Stored {
        error_id: ErrorId,
        deletion_height: BlockHeight,
    },
    /// Queued for callback delivery at the end of the block.
    Queued { error_id: ErrorId },
}

impl Routing {
    pub fn error_id(&self) -> ErrorId {
        match self {
            Self::Stored { error_id, .. } | Self::Queued { error_id } => *error_id,
        }
    }
}

impl From<StoredError> for Routing {
    fn from(stored: StoredError) -> Self {
        Self::Stored {
            error_id: stored.error_id,
            deletion_height: stored.deletion_height,
        }
    }
}

/// Borrows the stores it routes between for the length of one call.
pub struct Gateway<'a, S: KeyValueStore> {
    pub error_log: &'a mut ErrorLog<S>,
    pub subscriptions: &'a SubscriptionRegistry<S>,
    pub wasm: &'a dyn WasmHost,
}

impl<'a, S: KeyValueStore> Gateway<'a, S> {
    /// Validate `record` and route it.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty module name or malformed contract address
    /// - `ContractNotFound`: the wasm host does not know the contract
    pub fn set_error(
        &mut self,
        scope: &mut BlockScope,
        params: &Params,
        record: FaultRecord,
    ) -> ContractErrorsResult<Routing> {
        record.validate()?;
        let contract = record.contract()?;
        if !self.wasm.has_contract(&contract) {
            return Err(ContractErrorsError::ContractNotFound {
                address: record.contract_address,
            });
        }

        if self.subscriptions.has(&contract)? {
            let error_id = self.error_log.reserve_id()?;
            scope.queue.enqueue(error_id, record);
            metrics::set_queue_depth(scope.queue.len());
            debug!(
                error_id,
                contract = %contract,
                height = scope.height,
                "[qc-18] fault queued for callback"
            );
            return Ok(Routing::Queued { error_id });
        }

        self.error_log
            .append(scope.height, params, record)
            .map(Routing::from)
    }
}
