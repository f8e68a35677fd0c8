//! # Domain Entities
//!
//! Fault records, subscriptions and module parameters.

use crate::domain::value_objects::{Address, BlockHeight, Coin};
use crate::errors::{ContractErrorsError, ContractErrorsResult};
use serde::{Deserialize, Serialize};

/// Default denomination for the subscription fee.
pub const DEFAULT_DENOM: &str = "aqc";

/// Roughly 21 days of blocks.
pub const DEFAULT_ERROR_STORED_TIME: BlockHeight = 302_400;

/// Roughly 21 days of blocks.
pub const DEFAULT_SUBSCRIPTION_PERIOD: BlockHeight = 302_400;

// =============================================================================
// FAULT RECORD
// =============================================================================

/// Failure of a sudo call made by some module on a contract.
///
/// Records are immutable once stored. A failed error callback produces a new
/// record rather than modifying the original.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRecord {
    /// Module that issued the failing sudo call.
    pub module_name: String,
    /// Module-specific error code.
    pub error_code: i32,
    /// Contract the sudo call targeted, in text form.
    pub contract_address: String,
    /// Payload that was sent with the failing call.
    pub input_payload: String,
    /// Error returned by the contract.
    pub error_message: String,
}

impl FaultRecord {
    /// Checks the module name and contract address.
    pub fn validate(&self) -> ContractErrorsResult<()> {
        if self.module_name.is_empty() {
            return Err(ContractErrorsError::validation("module name cannot be empty"));
        }
        self.contract()?;
        Ok(())
    }

    /// Parses the contract address.
    pub fn contract(&self) -> ContractErrorsResult<Address> {
        self.contract_address
            .parse::<Address>()
            .map_err(|e| ContractErrorsError::validation(e.to_string()))
    }

    /// Flat JSON encoding of this record.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Message delivered to a subscribed contract's sudo entry point.
///
/// Serializes as `{"error": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SudoMsg {
    /// A fault reported against the receiving contract.
    Error(FaultRecord),
}

impl SudoMsg {
    /// JSON bytes handed to the wasm host.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Active error callback subscription of a contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscribed contract.
    pub contract_address: Address,
    /// Last block at which the subscription is active.
    pub expiry_height: BlockHeight,
}

// =============================================================================
// PARAMS
// =============================================================================

/// Module parameters, changed only through governance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Blocks a stored error remains queryable before it is pruned.
    pub error_stored_time: BlockHeight,
    /// Skip callback delivery and store queued faults instead.
    pub disable_error_callbacks: bool,
    /// Exact fee required to subscribe.
    pub subscription_fee: Coin,
    /// Blocks a subscription lasts.
    pub subscription_period: BlockHeight,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            error_stored_time: DEFAULT_ERROR_STORED_TIME,
            disable_error_callbacks: false,
            subscription_fee: Coin::new(DEFAULT_DENOM, 0),
            subscription_period: DEFAULT_SUBSCRIPTION_PERIOD,
        }
    }
}

impl Params {
    /// Validates all fields.
    pub fn validate(&self) -> ContractErrorsResult<()> {
        if self.error_stored_time == 0 {
            return Err(ContractErrorsError::InvalidParams {
                reason: "error_stored_time must be greater than 0".to_string(),
            });
        }
        if self.subscription_period == 0 {
            return Err(ContractErrorsError::InvalidParams {
                reason: "subscription_period must be greater than 0".to_string(),
            });
        }
        self.subscription_fee
            .validate()
            .map_err(|reason| ContractErrorsError::InvalidParams {
                reason: format!("subscription_fee: {reason}"),
            })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> String {
        Address::new([0x42; 20]).to_string()
    }

    fn record(module: &str, contract_address: String) -> FaultRecord {
        FaultRecord {
            module_name: module.to_string(),
            error_code: 1,
            contract_address,
            input_payload: "test".to_string(),
            error_message: "test".to_string(),
        }
    }

    #[test]
    fn test_fault_record_validate() {
        assert!(FaultRecord::default().validate().is_err());
        assert!(record("test", "\u{1f47b}".to_string()).validate().is_err());
        assert!(record("", contract()).validate().is_err());
        assert!(record("test", contract()).validate().is_ok());
    }

    #[test]
    fn test_sudo_msg_json_layout() {
        let rec = FaultRecord {
            module_name: "callback".to_string(),
            error_code: 1,
            contract_address: contract(),
            input_payload: "hello".to_string(),
            error_message: "world".to_string(),
        };
        let flat = String::from_utf8(rec.to_json_bytes().unwrap()).unwrap();
        assert_eq!(
            flat,
            format!(
                r#"{{"module_name":"callback","error_code":1,"contract_address":"{}","input_payload":"hello","error_message":"world"}}"#,
                contract()
            )
        );

        let wrapped = String::from_utf8(SudoMsg::Error(rec).to_json_bytes().unwrap()).unwrap();
        assert_eq!(wrapped, format!(r#"{{"error":{flat}}}"#));
    }

    #[test]
    fn test_params_validate() {
        assert!(Params::default().validate().is_ok());

        let params = Params {
            error_stored_time: 0,
            ..Params::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ContractErrorsError::InvalidParams { .. })
        ));

        let params = Params {
            subscription_period: 0,
            ..Params::default()
        };
        assert!(params.validate().is_err());

        let params = Params {
            subscription_fee: Coin::new("", 100),
            ..Params::default()
        };
        assert!(params.validate().is_err());
    }
}
