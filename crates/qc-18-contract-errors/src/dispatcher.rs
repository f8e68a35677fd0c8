//! # Dispatcher
//!
//! Runs once per block, after every fault of the block has been routed:
//!
//! 1. **Delivery**: each queued fault gets exactly one bounded-gas sudo call.
//!    A failed or out-of-gas call emits `CallbackFailed` and stores a new
//!    fallback record in the error log.
//! 2. **Subscription pruning** at the current height.
//! 3. **Error log pruning** at the current height.
//!
//! Delivery runs before subscription pruning so a subscription ending this
//! block still receives this block's faults. Error pruning runs last so a
//! fallback record written in step 1 is never removed in the same block.
//!
//! A callback failure is never an error of the dispatcher. A failed write or
//! prune is a [`FatalError`].

use crate::config::MODULE_NAME;
use crate::domain::entities::{FaultRecord, Params, SudoMsg};
use crate::domain::value_objects::{Address, BlockHeight, ErrorId};
use crate::errors::{ContractErrorsError, FatalError, StoreError, SudoCallError};
use crate::events::ContractErrorsEvent;
use crate::metrics;
use crate::ports::outbound::{EventSink, KeyValueStore, WasmHost};
use crate::store::{BlockScope, ErrorLog, SubscriptionRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Error code of fallback records written after a failed callback.
pub const CALLBACK_FAILED_ERROR_CODE: i32 = 1;

/// Summary of one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub height: BlockHeight,
    /// Callbacks that completed within the gas limit.
    pub delivered: usize,
    /// Callbacks that failed; each left one fallback record.
    pub failed: usize,
    /// Faults stored directly because callbacks are disabled.
    pub stored_without_callback: usize,
    pub subscriptions_pruned: usize,
    pub errors_pruned: usize,
}

/// Borrows the stores and collaborators it needs for one block.
pub struct Dispatcher<'a, S: KeyValueStore> {
    pub error_log: &'a mut ErrorLog<S>,
    pub subscriptions: &'a mut SubscriptionRegistry<S>,
    pub wasm: &'a dyn WasmHost,
    pub events: &'a dyn EventSink,
    pub gas_limit: u64,
}

fn fatal(context: &'static str, source: ContractErrorsError) -> FatalError {
    FatalError::StorageInvariantViolation { context, source }
}

/// Record stored in place of a callback that failed.
pub fn fallback_record(original: &FaultRecord, reason: &str) -> Result<FaultRecord, StoreError> {
    let input_payload = serde_json::to_string(original).map_err(|e| StoreError::Codec {
        message: e.to_string(),
    })?;

    Ok(FaultRecord {
        module_name: MODULE_NAME.to_string(),
        error_code: CALLBACK_FAILED_ERROR_CODE,
        contract_address: original.contract_address.clone(),
        input_payload,
        error_message: format!("{reason}. Original payload: {}", original.input_payload),
    })
}

impl<'a, S: KeyValueStore> Dispatcher<'a, S> {
    /// Consume the block scope and run all three steps.
    pub fn run(mut self, scope: BlockScope, params: &Params) -> Result<DispatchReport, FatalError> {
        let height = scope.height;
        let mut report = DispatchReport {
            height,
            ..DispatchReport::default()
        };

        for (error_id, record) in scope.queue.drain() {
            if params.disable_error_callbacks {
                self.error_log
                    .append_unchecked(height, params, record)
                    .map_err(|e| fatal("storing fault with callbacks disabled", e))?;
                metrics::record_callback("skipped");
                report.stored_without_callback += 1;
                continue;
            }

            match self.deliver(error_id, &record) {
                Ok(()) => {
                    metrics::record_callback("delivered");
                    report.delivered += 1;
                }
                Err(reason) => {
                    self.store_fallback(height, params, error_id, record, reason)?;
                    metrics::record_callback("failed");
                    report.failed += 1;
                }
            }
        }
        metrics::set_queue_depth(0);

        report.subscriptions_pruned = self
            .subscriptions
            .prune_at_height(height)
            .map_err(|e| fatal("pruning subscriptions", e))?;

        report.errors_pruned = self
            .error_log
            .prune_at_height(height)
            .map_err(|e| fatal("pruning errors", e))?;

        info!(
            height,
            delivered = report.delivered,
            failed = report.failed,
            subscriptions_pruned = report.subscriptions_pruned,
            errors_pruned = report.errors_pruned,
            "[qc-18] end block"
        );
        Ok(report)
    }

    /// One sudo call. Returns the failure reason.
    fn deliver(&self, error_id: ErrorId, record: &FaultRecord) -> Result<(), String> {
        let contract: Address = record.contract().map_err(|e| e.to_string())?;
        let payload = SudoMsg::Error(record.clone())
            .to_json_bytes()
            .map_err(|e| e.to_string())?;

        let outcome = self
            .wasm
            .sudo(&contract, &payload, self.gas_limit)
            .and_then(|response| {
                if response.gas_used > self.gas_limit {
                    Err(SudoCallError::OutOfGas {
                        limit: self.gas_limit,
                        used: response.gas_used,
                    })
                } else {
                    Ok(response)
                }
            });

        match outcome {
            Ok(response) => {
                debug!(error_id, contract = %contract, gas_used = response.gas_used, "[qc-18] callback delivered");
                Ok(())
            }
            Err(e) => {
                warn!(error_id, contract = %contract, error = %e, "[qc-18] callback failed");
                Err(e.to_string())
            }
        }
    }

    fn store_fallback(
        &mut self,
        height: BlockHeight,
        params: &Params,
        error_id: ErrorId,
        record: FaultRecord,
        reason: String,
    ) -> Result<(), FatalError> {
        let fallback = fallback_record(&record, &reason)
            .map_err(|e| fatal("encoding callback fallback", e.into()))?;

        self.events.emit(ContractErrorsEvent::CallbackFailed {
            error_id,
            record,
            reason,
        });

        // Contract existence was checked at routing; the callback may have
        // removed it since.
        self.error_log
            .append_unchecked(height, params, fallback)
            .map_err(|e| fatal("storing callback fallback", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        InMemoryKVStore, MockBank, MockRewardsOwnership, MockWasmHost, RecordingEventSink,
        SudoBehavior,
    };
    use crate::domain::value_objects::Coin;
    use std::sync::Arc;

    const CONTRACT: Address = Address::new([0xCC; 20]);
    const GAS_LIMIT: u64 = 150_000;

    struct Fixture {
        wasm: Arc<MockWasmHost>,
        events: Arc<RecordingEventSink>,
        error_log: ErrorLog<InMemoryKVStore>,
        subscriptions: SubscriptionRegistry<InMemoryKVStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let wasm = Arc::new(MockWasmHost::new());
            wasm.add_contract(CONTRACT, None);
            let events = Arc::new(RecordingEventSink::new());
            Self {
                error_log: ErrorLog::new(InMemoryKVStore::new(), wasm.clone(), events.clone()),
                subscriptions: SubscriptionRegistry::new(
                    InMemoryKVStore::new(),
                    wasm.clone(),
                    Arc::new(MockRewardsOwnership::new()),
                    Arc::new(MockBank::new()),
                    "fee_collector",
                ),
                wasm,
                events,
            }
        }

        fn run(&mut self, scope: BlockScope, params: &Params) -> Result<DispatchReport, FatalError> {
            Dispatcher {
                error_log: &mut self.error_log,
                subscriptions: &mut self.subscriptions,
                wasm: self.wasm.as_ref(),
                events: self.events.as_ref(),
                gas_limit: GAS_LIMIT,
            }
            .run(scope, params)
        }
    }

    fn record() -> FaultRecord {
        FaultRecord {
            module_name: "callback".to_string(),
            error_code: 7,
            contract_address: CONTRACT.to_string(),
            input_payload: "ping".to_string(),
            error_message: "boom".to_string(),
        }
    }

    fn scope_with(height: BlockHeight, error_id: ErrorId) -> BlockScope {
        let mut scope = BlockScope::open(height);
        scope.queue.enqueue(error_id, record());
        scope
    }

    #[test]
    fn test_successful_delivery_stores_nothing() {
        let mut f = Fixture::new();
        let report = f.run(scope_with(10, 1), &Params::default()).unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 0);
        assert!(f.error_log.list_by_contract(&CONTRACT).unwrap().is_empty());

        let calls = f.wasm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].gas_limit, GAS_LIMIT);
        assert_eq!(calls[0].payload, SudoMsg::Error(record()).to_json_bytes().unwrap());
    }

    #[test]
    fn test_failed_delivery_stores_one_fallback() {
        let mut f = Fixture::new();
        f.wasm
            .set_behavior(&CONTRACT, SudoBehavior::Fail("contract panicked".to_string()));

        let report = f.run(scope_with(10, 1), &Params::default()).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(f.wasm.calls().len(), 1);

        let stored = f.error_log.list_by_contract(&CONTRACT).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].module_name, MODULE_NAME);
        assert_eq!(stored[0].error_code, CALLBACK_FAILED_ERROR_CODE);
        assert_eq!(
            stored[0].input_payload,
            String::from_utf8(record().to_json_bytes().unwrap()).unwrap()
        );
        assert_eq!(
            stored[0].error_message,
            "execution failed: contract panicked. Original payload: ping"
        );
        assert_eq!(f.events.names(), vec!["callback_failed", "error_stored"]);
    }

    #[test]
    fn test_fallback_stored_when_contract_removed_by_callback() {
        let mut f = Fixture::new();
        f.wasm.set_behavior(
            &CONTRACT,
            SudoBehavior::FailAndRemove("migrated away".to_string()),
        );

        let report = f.run(scope_with(10, 1), &Params::default()).unwrap();
        assert_eq!(report.failed, 1);
        assert!(!f.wasm.has_contract(&CONTRACT));

        let stored = f.error_log.list_by_contract(&CONTRACT).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].error_code, CALLBACK_FAILED_ERROR_CODE);
    }

    #[test]
    fn test_disabled_callbacks_store_for_removed_contract() {
        let mut f = Fixture::new();
        // Removed between routing and end of block
        f.wasm.remove_contract(&CONTRACT);
        let params = Params {
            disable_error_callbacks: true,
            ..Params::default()
        };

        let report = f.run(scope_with(10, 1), &params).unwrap();
        assert_eq!(report.stored_without_callback, 1);
        assert_eq!(f.error_log.list_by_contract(&CONTRACT).unwrap(), vec![record()]);
    }

    #[test]
    fn test_out_of_gas_counts_as_failure() {
        let mut f = Fixture::new();
        f.wasm.set_behavior(
            &CONTRACT,
            SudoBehavior::Succeed {
                gas_used: GAS_LIMIT + 1,
            },
        );

        let report = f.run(scope_with(10, 1), &Params::default()).unwrap();
        assert_eq!(report.failed, 1);
        let stored = f.error_log.list_by_contract(&CONTRACT).unwrap();
        assert!(stored[0].error_message.starts_with("out of gas"));
    }

    #[test]
    fn test_disabled_callbacks_store_verbatim() {
        let mut f = Fixture::new();
        let params = Params {
            disable_error_callbacks: true,
            ..Params::default()
        };

        let report = f.run(scope_with(10, 1), &params).unwrap();
        assert_eq!(report.stored_without_callback, 1);
        assert!(f.wasm.calls().is_empty());
        assert_eq!(f.error_log.list_by_contract(&CONTRACT).unwrap(), vec![record()]);
    }

    #[test]
    fn test_delivery_precedes_subscription_pruning() {
        let mut f = Fixture::new();
        let params = Params {
            subscription_period: 5,
            ..Params::default()
        };
        f.subscriptions
            .set(5, &params, &CONTRACT, &CONTRACT, &Coin::new("aqc", 0))
            .unwrap();

        let report = f.run(scope_with(10, 1), &params).unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.subscriptions_pruned, 1);
        assert!(!f.subscriptions.has(&CONTRACT).unwrap());
    }

    #[test]
    fn test_fallback_survives_same_block_error_pruning() {
        let mut f = Fixture::new();
        f.wasm
            .set_behavior(&CONTRACT, SudoBehavior::Fail("nope".to_string()));
        let params = Params {
            error_stored_time: 1,
            ..Params::default()
        };
        // Stored at 9, due at 10
        f.error_log.append(9, &params, record()).unwrap();

        let report = f.run(scope_with(10, 2), &params).unwrap();
        assert_eq!(report.errors_pruned, 1);
        let left = f.error_log.list_by_contract(&CONTRACT).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].module_name, MODULE_NAME);
    }

    #[test]
    fn test_storage_failure_is_fatal() {
        let mut f = Fixture::new();
        f.wasm
            .set_behavior(&CONTRACT, SudoBehavior::Fail("nope".to_string()));
        f.error_log.store_mut().set_fail_writes(true);

        let err = f.run(scope_with(10, 1), &Params::default()).unwrap_err();
        assert!(matches!(
            err,
            FatalError::StorageInvariantViolation {
                context: "storing callback fallback",
                ..
            }
        ));
    }
}
