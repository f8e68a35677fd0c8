//! # Genesis
//!
//! Module state carried across chain restarts: params and the full error
//! log. Subscriptions and the callback queue are not exported.

use crate::domain::entities::{FaultRecord, Params};
use crate::errors::{ContractErrorsError, ContractErrorsResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    /// Stored errors in id order.
    pub errors: Vec<FaultRecord>,
}

impl GenesisState {
    pub fn new(params: Params, errors: Vec<FaultRecord>) -> Self {
        Self { params, errors }
    }

    /// Params must be valid and every record well formed.
    pub fn validate(&self) -> ContractErrorsResult<()> {
        self.params.validate()?;
        for (index, record) in self.errors.iter().enumerate() {
            record.validate().map_err(|e| {
                ContractErrorsError::validation(format!("genesis error #{index}: {e}"))
            })?;
        }
        Ok(())
    }
}
