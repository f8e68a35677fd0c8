//! # Contract Errors Service
//!
//! Wires the stores, gateway and dispatcher to the driving ports and the
//! block lifecycle.
//!
//! ## Block lifecycle
//!
//! ```text
//! begin_block(h) ──> set_error / subscribe_to_error ... ──> end_block()
//!      │                                                        │
//!      └── opens BlockScope (fresh CallbackQueue)     Dispatcher consumes it
//! ```
//!
//! `set_error` and `subscribe_to_error` need the current height and are
//! rejected outside an open block. Queries and `update_params` are not.
//!
//! Pruning only visits the height being closed, so once a block has been
//! opened every later block must be exactly one higher.

use crate::adapters::{
    InMemoryKVStore, MockBank, MockRewardsOwnership, MockWasmHost, TracingEventSink,
};
use crate::config::ServiceConfig;
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::domain::entities::{FaultRecord, Params};
use crate::domain::value_objects::{Address, BlockHeight};
use crate::errors::{ContractErrorsError, ContractErrorsResult, FatalError};
use crate::events::ContractErrorsEvent;
use crate::gateway::{Gateway, Routing};
use crate::genesis::GenesisState;
use crate::msg::{
    MsgSubscribeToError, MsgSubscribeToErrorResponse, MsgUpdateParams, QueryErrorsResponse,
    QueryIsSubscribedResponse,
};
use crate::ports::inbound::{ContractErrorsMsgApi, ContractErrorsQueryApi, SudoErrorReporter};
use crate::ports::outbound::{BankTransfer, EventSink, KeyValueStore, RewardsOwnership, WasmHost};
use crate::store::{BlockScope, ErrorLog, ParamsStore, SubscriptionRegistry};

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One store per collection group. In production these are column
/// families of the node database.
pub struct ModuleStores<S: KeyValueStore> {
    pub params: S,
    pub errors: S,
    pub subscriptions: S,
}

impl ModuleStores<InMemoryKVStore> {
    pub fn in_memory() -> Self {
        Self {
            params: InMemoryKVStore::new(),
            errors: InMemoryKVStore::new(),
            subscriptions: InMemoryKVStore::new(),
        }
    }
}

/// Other modules the service calls into.
#[derive(Clone)]
pub struct Collaborators {
    pub wasm: Arc<dyn WasmHost>,
    pub rewards: Arc<dyn RewardsOwnership>,
    pub bank: Arc<dyn BankTransfer>,
    pub events: Arc<dyn EventSink>,
}

/// Statistics for the Contract Errors Service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Faults accepted by `set_error`.
    pub errors_reported: u64,
    /// Of those, faults queued for callback.
    pub faults_queued: u64,
    pub callbacks_delivered: u64,
    pub callbacks_failed: u64,
    /// Subscriptions created or renewed.
    pub subscriptions: u64,
    /// Requests rejected without a state change.
    pub rejected_requests: u64,
    pub blocks_processed: u64,
    pub errors_pruned: u64,
    pub subscriptions_pruned: u64,
}

/// The Contract Errors Service.
pub struct ContractErrorsService<S: KeyValueStore> {
    config: ServiceConfig,
    params: ParamsStore<S>,
    error_log: ErrorLog<S>,
    subscriptions: SubscriptionRegistry<S>,
    wasm: Arc<dyn WasmHost>,
    events: Arc<dyn EventSink>,
    block: Option<BlockScope>,
    /// Height of the most recently opened block.
    last_height: Option<BlockHeight>,
    stats: ServiceStats,
}

fn no_open_block() -> ContractErrorsError {
    ContractErrorsError::BlockLifecycle {
        reason: "no block is open".to_string(),
    }
}

impl<S: KeyValueStore> ContractErrorsService<S> {
    pub fn new(config: ServiceConfig, stores: ModuleStores<S>, deps: Collaborators) -> Self {
        Self {
            params: ParamsStore::new(stores.params),
            error_log: ErrorLog::new(stores.errors, deps.wasm.clone(), deps.events.clone()),
            subscriptions: SubscriptionRegistry::new(
                stores.subscriptions,
                deps.wasm.clone(),
                deps.rewards,
                deps.bank,
                config.fee_collector.clone(),
            ),
            wasm: deps.wasm,
            events: deps.events,
            block: None,
            last_height: None,
            stats: ServiceStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Get current service statistics.
    pub fn stats(&self) -> ServiceStats {
        self.stats.clone()
    }

    pub fn error_log(&self) -> &ErrorLog<S> {
        &self.error_log
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry<S> {
        &self.subscriptions
    }

    /// Height of the open block, if any.
    pub fn current_height(&self) -> Option<BlockHeight> {
        self.block.as_ref().map(|scope| scope.height)
    }

    /// Faults waiting for delivery in the open block.
    pub fn pending_callbacks(&self) -> usize {
        self.block.as_ref().map_or(0, |scope| scope.queue.len())
    }

    fn track<T>(&mut self, result: ContractErrorsResult<T>) -> ContractErrorsResult<T> {
        if let Err(e) = &result {
            if e.is_rejection() {
                self.stats.rejected_requests += 1;
            }
        }
        result
    }

    // =========================================================================
    // BLOCK LIFECYCLE
    // =========================================================================

    /// Open block `height` with an empty callback queue.
    ///
    /// # Errors
    ///
    /// - `BlockLifecycle`: a block is still open, or `height` is not exactly
    ///   one above the previous block
    pub fn begin_block(&mut self, height: BlockHeight) -> ContractErrorsResult<()> {
        if let Some(open) = &self.block {
            return Err(ContractErrorsError::BlockLifecycle {
                reason: format!("block {} is still open", open.height),
            });
        }
        if let Some(last) = self.last_height {
            if last.checked_add(1) != Some(height) {
                warn!(height, last, "[qc-18] out-of-sequence block height");
                return Err(ContractErrorsError::BlockLifecycle {
                    reason: format!("block {height} does not follow block {last}"),
                });
            }
        }
        debug!(height, "[qc-18] begin block");
        self.block = Some(BlockScope::open(height));
        self.last_height = Some(height);
        Ok(())
    }

    /// Close the open block: deliver queued callbacks, then prune expired
    /// subscriptions, then prune expired errors.
    ///
    /// The queue is dropped whatever the outcome. A `FatalError` means the
    /// store is inconsistent and block processing must stop.
    #[instrument(skip(self))]
    pub fn end_block(&mut self) -> Result<DispatchReport, FatalError> {
        let scope = self.block.take().ok_or(FatalError::NoOpenBlock)?;
        let params = self.params.get().map_err(|e| FatalError::StorageInvariantViolation {
            context: "loading params",
            source: e.into(),
        })?;

        let report = Dispatcher {
            error_log: &mut self.error_log,
            subscriptions: &mut self.subscriptions,
            wasm: self.wasm.as_ref(),
            events: self.events.as_ref(),
            gas_limit: self.config.callback_gas_limit,
        }
        .run(scope, &params)?;

        self.stats.blocks_processed += 1;
        self.stats.callbacks_delivered += report.delivered as u64;
        self.stats.callbacks_failed += report.failed as u64;
        self.stats.subscriptions_pruned += report.subscriptions_pruned as u64;
        self.stats.errors_pruned += report.errors_pruned as u64;
        Ok(report)
    }

    // =========================================================================
    // GENESIS
    // =========================================================================

    /// Install params and re-store every exported error. Records get fresh
    /// ids and deletion heights relative to `height`.
    pub fn init_genesis(&mut self, height: BlockHeight, genesis: GenesisState) -> ContractErrorsResult<()> {
        genesis.validate()?;
        self.params.set(&genesis.params)?;
        let count = genesis.errors.len();
        for record in genesis.errors {
            self.error_log.append_unchecked(height, &genesis.params, record)?;
        }
        info!(height, errors = count, "[qc-18] genesis initialized");
        Ok(())
    }

    /// Params and every stored error in id order.
    pub fn export_genesis(&self) -> ContractErrorsResult<GenesisState> {
        let errors = self
            .error_log
            .export_all()?
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        Ok(GenesisState::new(self.params.get()?, errors))
    }

    fn subscribe(&mut self, msg: MsgSubscribeToError) -> ContractErrorsResult<MsgSubscribeToErrorResponse> {
        let (sender, contract) = msg.validate_basic()?;
        let height = self.current_height().ok_or_else(no_open_block)?;
        let params = self.params.get()?;

        let subscription_valid_till =
            self.subscriptions
                .set(height, &params, &sender, &contract, &msg.fee)?;

        self.events.emit(ContractErrorsEvent::SubscribedToErrors {
            sender,
            contract_address: contract,
            fees_paid: msg.fee,
            subscription_valid_till,
        });
        self.stats.subscriptions += 1;
        info!(
            contract = %contract,
            subscription_valid_till,
            "[qc-18] subscribed to errors"
        );
        Ok(MsgSubscribeToErrorResponse {
            subscription_valid_till,
        })
    }

    fn replace_params(&mut self, msg: MsgUpdateParams) -> ContractErrorsResult<()> {
        msg.validate_basic()?;
        if msg.authority != self.config.authority {
            warn!(authority = %msg.authority, "[qc-18] unauthorized params update");
            return Err(ContractErrorsError::Unauthorized {
                sender: msg.authority,
                reason: "is not authorized to update module params".to_string(),
            });
        }
        self.params.set(&msg.params)?;
        info!(params = ?msg.params, "[qc-18] params updated");
        self.events.emit(ContractErrorsEvent::ParamsUpdated {
            authority: msg.authority,
            new_params: msg.params,
        });
        Ok(())
    }

    fn route(&mut self, record: FaultRecord) -> ContractErrorsResult<Routing> {
        let params = self.params.get()?;
        let scope = self.block.as_mut().ok_or_else(no_open_block)?;

        let routing = Gateway {
            error_log: &mut self.error_log,
            subscriptions: &self.subscriptions,
            wasm: self.wasm.as_ref(),
        }
        .set_error(scope, &params, record)?;

        self.stats.errors_reported += 1;
        if matches!(routing, Routing::Queued { .. }) {
            self.stats.faults_queued += 1;
        }
        Ok(routing)
    }
}

impl ContractErrorsService<InMemoryKVStore> {
    /// Service over fresh in-memory stores.
    pub fn new_in_memory(config: ServiceConfig, deps: Collaborators) -> Self {
        Self::new(config, ModuleStores::in_memory(), deps)
    }
}

/// Create a default service with in-memory adapters (for testing).
#[must_use]
pub fn create_test_service() -> ContractErrorsService<InMemoryKVStore> {
    ContractErrorsService::new_in_memory(
        ServiceConfig::default(),
        Collaborators {
            wasm: Arc::new(MockWasmHost::new()),
            rewards: Arc::new(MockRewardsOwnership::new()),
            bank: Arc::new(MockBank::new()),
            events: Arc::new(TracingEventSink),
        },
    )
}

// =============================================================================
// DRIVING PORT IMPLEMENTATIONS
// =============================================================================

impl<S: KeyValueStore> SudoErrorReporter for ContractErrorsService<S> {
    #[instrument(
        skip(self, record),
        fields(contract = %record.contract_address, module = %record.module_name)
    )]
    fn set_error(&mut self, record: FaultRecord) -> ContractErrorsResult<Routing> {
        let result = self.route(record);
        self.track(result)
    }
}

impl<S: KeyValueStore> ContractErrorsMsgApi for ContractErrorsService<S> {
    #[instrument(skip(self, msg), fields(contract = %msg.contract_address, sender = %msg.sender))]
    fn subscribe_to_error(
        &mut self,
        msg: MsgSubscribeToError,
    ) -> ContractErrorsResult<MsgSubscribeToErrorResponse> {
        let result = self.subscribe(msg);
        self.track(result)
    }

    #[instrument(skip(self, msg), fields(authority = %msg.authority))]
    fn update_params(&mut self, msg: MsgUpdateParams) -> ContractErrorsResult<()> {
        let result = self.replace_params(msg);
        self.track(result)
    }
}

impl<S: KeyValueStore> ContractErrorsQueryApi for ContractErrorsService<S> {
    fn errors(&self, contract_address: &str) -> ContractErrorsResult<QueryErrorsResponse> {
        let contract = contract_address
            .parse::<Address>()
            .map_err(|e| ContractErrorsError::validation(e.to_string()))?;
        Ok(QueryErrorsResponse {
            errors: self.error_log.list_by_contract(&contract)?,
        })
    }

    fn is_subscribed(&self, contract_address: &str) -> ContractErrorsResult<QueryIsSubscribedResponse> {
        let contract = contract_address
            .parse::<Address>()
            .map_err(|e| ContractErrorsError::validation(e.to_string()))?;
        Ok(match self.subscriptions.get(&contract)? {
            Some(subscription_valid_till) => QueryIsSubscribedResponse {
                subscribed: true,
                subscription_valid_till,
            },
            None => QueryIsSubscribedResponse::default(),
        })
    }

    fn params(&self) -> ContractErrorsResult<Params> {
        Ok(self.params.get()?)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_AUTHORITY;
    use crate::domain::value_objects::Coin;
    use crate::msg::{ContractErrorsMsg, ContractErrorsQuery, ContractErrorsQueryResponse};
    use crate::test_utils::TestHarness;

    const CONTRACT: Address = Address::new([0xC0; 20]);

    fn record() -> FaultRecord {
        FaultRecord {
            module_name: "callback".to_string(),
            error_code: 3,
            contract_address: CONTRACT.to_string(),
            input_payload: "{}".to_string(),
            error_message: "failed".to_string(),
        }
    }

    #[test]
    fn test_create_test_service() {
        let service = create_test_service();
        assert_eq!(service.stats(), ServiceStats::default());
        assert_eq!(service.params().unwrap(), Params::default());
        assert_eq!(service.current_height(), None);
    }

    #[test]
    fn test_block_lifecycle_is_enforced() {
        let mut h = TestHarness::new();
        h.wasm.add_contract(CONTRACT, None);

        let err = h.service.set_error(record()).unwrap_err();
        assert!(matches!(err, ContractErrorsError::BlockLifecycle { .. }));
        assert_eq!(h.service.end_block(), Err(FatalError::NoOpenBlock));

        h.service.begin_block(1).unwrap();
        assert!(h.service.begin_block(2).is_err());
        h.service.set_error(record()).unwrap();
        h.service.end_block().unwrap();
        assert_eq!(h.service.current_height(), None);
        assert_eq!(h.service.stats().blocks_processed, 1);
    }

    #[test]
    fn test_block_heights_must_be_consecutive() {
        let mut h = TestHarness::new();
        h.service.begin_block(10).unwrap();
        h.service.end_block().unwrap();

        for height in [10, 9, 12] {
            let err = h.service.begin_block(height).unwrap_err();
            assert!(matches!(err, ContractErrorsError::BlockLifecycle { .. }));
            assert_eq!(h.service.current_height(), None);
        }

        h.service.begin_block(11).unwrap();
        h.service.end_block().unwrap();
        assert_eq!(h.service.stats().blocks_processed, 2);
    }

    #[test]
    fn test_update_params_authority() {
        let mut h = TestHarness::new();
        let params = Params {
            error_stored_time: 5,
            ..Params::default()
        };

        let err = h
            .service
            .update_params(MsgUpdateParams {
                authority: Address::new([0x77; 20]).to_string(),
                params: params.clone(),
            })
            .unwrap_err();
        assert!(matches!(err, ContractErrorsError::Unauthorized { .. }));

        let err = h
            .service
            .update_params(MsgUpdateParams {
                authority: "gov".to_string(),
                params: params.clone(),
            })
            .unwrap_err();
        assert!(matches!(err, ContractErrorsError::Validation { .. }));

        let err = h
            .service
            .update_params(MsgUpdateParams {
                authority: DEFAULT_AUTHORITY.to_string(),
                params: Params {
                    error_stored_time: 0,
                    ..Params::default()
                },
            })
            .unwrap_err();
        assert!(matches!(err, ContractErrorsError::InvalidParams { .. }));
        assert_eq!(h.service.stats().rejected_requests, 3);

        h.service
            .handle_msg(ContractErrorsMsg::UpdateParams(MsgUpdateParams {
                authority: DEFAULT_AUTHORITY.to_string(),
                params: params.clone(),
            }))
            .unwrap();
        assert_eq!(
            h.service.handle_query(ContractErrorsQuery::Params).unwrap(),
            ContractErrorsQueryResponse::Params(params)
        );
        assert_eq!(h.events.names(), vec!["params_updated"]);
    }

    #[test]
    fn test_subscribe_and_query() {
        let mut h = TestHarness::new();
        h.wasm.add_contract(CONTRACT, None);
        h.service.begin_block(100).unwrap();

        let response = h
            .service
            .subscribe_to_error(MsgSubscribeToError {
                sender: CONTRACT.to_string(),
                contract_address: CONTRACT.to_string(),
                fee: Coin::new("aqc", 0),
            })
            .unwrap();
        assert_eq!(
            response.subscription_valid_till,
            100 + Params::default().subscription_period
        );

        let status = h.service.is_subscribed(&CONTRACT.to_string()).unwrap();
        assert!(status.subscribed);
        assert_eq!(status.subscription_valid_till, response.subscription_valid_till);

        let other = Address::new([0x01; 20]).to_string();
        assert_eq!(
            h.service.is_subscribed(&other).unwrap(),
            QueryIsSubscribedResponse::default()
        );
        assert!(h.service.is_subscribed("bogus").is_err());
        assert_eq!(h.events.names(), vec!["subscribed_to_errors"]);
    }

    #[test]
    fn test_genesis_export_then_init() {
        let mut h = TestHarness::new();
        h.wasm.add_contract(CONTRACT, None);
        h.service.begin_block(1).unwrap();
        h.service.set_error(record()).unwrap();
        h.service.set_error(record()).unwrap();
        h.service.end_block().unwrap();

        let exported = h.service.export_genesis().unwrap();
        assert_eq!(exported.params, Params::default());
        assert_eq!(exported.errors, vec![record(), record()]);

        let mut fresh = TestHarness::new();
        fresh.service.init_genesis(50, exported.clone()).unwrap();
        assert_eq!(fresh.service.export_genesis().unwrap(), exported);
        assert_eq!(
            fresh.service.errors(&CONTRACT.to_string()).unwrap().errors.len(),
            2
        );
        assert_eq!(
            fresh.service.error_log().scheduled_at(50 + Params::default().error_stored_time).unwrap(),
            vec![1, 2]
        );
    }
}
