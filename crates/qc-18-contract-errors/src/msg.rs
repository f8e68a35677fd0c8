//! # Messages and Queries
//!
//! Request/response payloads of the external Msg and Query surface.
//! Each surface is a tagged enum so a router needs one `match`.

use crate::domain::entities::{FaultRecord, Params};
use crate::domain::value_objects::{Address, BlockHeight, Coin};
use crate::errors::{ContractErrorsError, ContractErrorsResult};
use serde::{Deserialize, Serialize};

fn parse_address(field: &str, value: &str) -> ContractErrorsResult<Address> {
    value
        .parse::<Address>()
        .map_err(|e| ContractErrorsError::validation(format!("invalid {field} address: {e}")))
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Subscribe a contract to error callbacks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSubscribeToError {
    /// Signer: the contract itself, its admin, or its rewards owner.
    pub sender: String,
    /// Contract to subscribe.
    pub contract_address: String,
    /// Fee paid; must equal `Params::subscription_fee`.
    pub fee: Coin,
}

impl MsgSubscribeToError {
    /// Stateless checks. Returns the parsed `(sender, contract)`.
    pub fn validate_basic(&self) -> ContractErrorsResult<(Address, Address)> {
        let sender = parse_address("sender", &self.sender)?;
        let contract = parse_address("contract", &self.contract_address)?;
        self.fee
            .validate()
            .map_err(|reason| ContractErrorsError::validation(format!("invalid fee: {reason}")))?;
        Ok((sender, contract))
    }
}

/// Response to [`MsgSubscribeToError`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSubscribeToErrorResponse {
    /// Last block at which the subscription is active.
    pub subscription_valid_till: BlockHeight,
}

/// Replace module parameters. Governance only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    /// Must equal the configured governance authority.
    pub authority: String,
    /// New parameters.
    pub params: Params,
}

impl MsgUpdateParams {
    /// Stateless checks.
    pub fn validate_basic(&self) -> ContractErrorsResult<()> {
        parse_address("authority", &self.authority)?;
        self.params.validate()
    }
}

/// Every message accepted by the subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractErrorsMsg {
    SubscribeToError(MsgSubscribeToError),
    UpdateParams(MsgUpdateParams),
}

/// Response to a [`ContractErrorsMsg`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractErrorsMsgResponse {
    SubscribeToError(MsgSubscribeToErrorResponse),
    UpdateParams,
}

// =============================================================================
// QUERIES
// =============================================================================

/// Every query served by the subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractErrorsQuery {
    /// Stored errors of one contract.
    Errors { contract_address: String },
    /// Subscription status of one contract.
    IsSubscribed { contract_address: String },
    /// Current parameters.
    Params,
}

/// Response to [`ContractErrorsQuery::Errors`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryErrorsResponse {
    /// Records in error id order.
    pub errors: Vec<FaultRecord>,
}

/// Response to [`ContractErrorsQuery::IsSubscribed`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryIsSubscribedResponse {
    pub subscribed: bool,
    /// Zero when not subscribed.
    pub subscription_valid_till: BlockHeight,
}

/// Response to a [`ContractErrorsQuery`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractErrorsQueryResponse {
    Errors(QueryErrorsResponse),
    IsSubscribed(QueryIsSubscribedResponse),
    Params(Params),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> String {
        Address::new([byte; 20]).to_string()
    }

    #[test]
    fn test_subscribe_validate_basic() {
        let msg = MsgSubscribeToError {
            sender: addr(1),
            contract_address: addr(2),
            fee: Coin::new("aqc", 100),
        };
        let (sender, contract) = msg.validate_basic().unwrap();
        assert_eq!(sender, Address::new([1; 20]));
        assert_eq!(contract, Address::new([2; 20]));

        let bad_sender = MsgSubscribeToError {
            sender: "nope".to_string(),
            ..msg.clone()
        };
        assert!(matches!(
            bad_sender.validate_basic(),
            Err(ContractErrorsError::Validation { .. })
        ));

        let bad_fee = MsgSubscribeToError {
            fee: Coin::new("", 1),
            ..msg
        };
        assert!(bad_fee.validate_basic().is_err());
    }

    #[test]
    fn test_update_params_validate_basic() {
        let msg = MsgUpdateParams {
            authority: addr(9),
            params: Params::default(),
        };
        assert!(msg.validate_basic().is_ok());

        let msg = MsgUpdateParams {
            authority: addr(9),
            params: Params {
                error_stored_time: 0,
                ..Params::default()
            },
        };
        assert!(matches!(
            msg.validate_basic(),
            Err(ContractErrorsError::InvalidParams { .. })
        ));
    }
}
