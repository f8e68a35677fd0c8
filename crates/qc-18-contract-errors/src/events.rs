//! # Event Schema
//!
//! Events published by the Contract Errors subsystem.
//!
//! | Event | Emitted by |
//! |-------|-----------|
//! | `ErrorStored` | `ErrorLog::append` |
//! | `CallbackFailed` | `Dispatcher` delivery step |
//! | `SubscribedToErrors` | `subscribe_to_error` |
//! | `ParamsUpdated` | `update_params` |

use crate::domain::entities::{FaultRecord, Params};
use crate::domain::value_objects::{Address, BlockHeight, Coin, ErrorId};
use serde::{Deserialize, Serialize};

/// Event published through the `EventSink` port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContractErrorsEvent {
    /// A fault was written to the error log.
    ErrorStored {
        error_id: ErrorId,
        record: FaultRecord,
        deletion_height: BlockHeight,
    },
    /// An error callback failed or ran out of gas.
    CallbackFailed {
        error_id: ErrorId,
        record: FaultRecord,
        reason: String,
    },
    /// A contract subscribed (or renewed) to error callbacks.
    SubscribedToErrors {
        sender: Address,
        contract_address: Address,
        fees_paid: Coin,
        subscription_valid_till: BlockHeight,
    },
    /// Governance replaced the module parameters.
    ParamsUpdated {
        authority: String,
        new_params: Params,
    },
}

impl ContractErrorsEvent {
    /// Short, stable name for logs and metrics labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ErrorStored { .. } => "error_stored",
            Self::CallbackFailed { .. } => "callback_failed",
            Self::SubscribedToErrors { .. } => "subscribed_to_errors",
            Self::ParamsUpdated { .. } => "params_updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = ContractErrorsEvent::ParamsUpdated {
            authority: "gov".to_string(),
            new_params: Params::default(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "params_updated");
        assert_eq!(json["authority"], "gov");
        assert_eq!(event.name(), "params_updated");
    }
}
