//! # Driving Ports (API - Inbound)
//!
//! - `SudoErrorReporter`: used by other modules to report a failed sudo call
//! - `ContractErrorsMsgApi`: transaction messages
//! - `ContractErrorsQueryApi`: read-only queries

use crate::domain::entities::{FaultRecord, Params};
use crate::errors::ContractErrorsResult;
use crate::gateway::Routing;
use crate::msg::{
    ContractErrorsMsg, ContractErrorsMsgResponse, ContractErrorsQuery,
    ContractErrorsQueryResponse, MsgSubscribeToError, MsgSubscribeToErrorResponse,
    MsgUpdateParams, QueryErrorsResponse, QueryIsSubscribedResponse,
};

/// Entry point for modules whose sudo call on a contract failed.
pub trait SudoErrorReporter {
    /// Record a fault against a contract.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty module name or malformed contract address
    /// - `ContractNotFound`: the wasm host does not know the contract
    fn set_error(&mut self, record: FaultRecord) -> ContractErrorsResult<Routing>;
}

/// Transaction message handlers.
pub trait ContractErrorsMsgApi {
    /// Subscribe (or renew) a contract's error callback subscription.
    fn subscribe_to_error(
        &mut self,
        msg: MsgSubscribeToError,
    ) -> ContractErrorsResult<MsgSubscribeToErrorResponse>;

    /// Replace module parameters. Governance only.
    fn update_params(&mut self, msg: MsgUpdateParams) -> ContractErrorsResult<()>;

    /// Route a message to its handler.
    fn handle_msg(&mut self, msg: ContractErrorsMsg) -> ContractErrorsResult<ContractErrorsMsgResponse> {
        match msg {
            ContractErrorsMsg::SubscribeToError(m) => self
                .subscribe_to_error(m)
                .map(ContractErrorsMsgResponse::SubscribeToError),
            ContractErrorsMsg::UpdateParams(m) => self
                .update_params(m)
                .map(|()| ContractErrorsMsgResponse::UpdateParams),
        }
    }
}

/// Query handlers.
pub trait ContractErrorsQueryApi {
    /// All stored errors of a contract, oldest first.
    fn errors(&self, contract_address: &str) -> ContractErrorsResult<QueryErrorsResponse>;

    /// Subscription status of a contract.
    fn is_subscribed(&self, contract_address: &str)
        -> ContractErrorsResult<QueryIsSubscribedResponse>;

    /// Current module parameters.
    fn params(&self) -> ContractErrorsResult<Params>;

    /// Route a query to its handler.
    fn handle_query(&self, query: ContractErrorsQuery) -> ContractErrorsResult<ContractErrorsQueryResponse> {
        match query {
            ContractErrorsQuery::Errors { contract_address } => self
                .errors(&contract_address)
                .map(ContractErrorsQueryResponse::Errors),
            ContractErrorsQuery::IsSubscribed { contract_address } => self
                .is_subscribed(&contract_address)
                .map(ContractErrorsQueryResponse::IsSubscribed),
            ContractErrorsQuery::Params => self.params().map(ContractErrorsQueryResponse::Params),
        }
    }
}
