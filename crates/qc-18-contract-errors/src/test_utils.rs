//! Fully wired service over in-memory adapters, with handles to every mock.

use crate::adapters::{
    InMemoryKVStore, MockBank, MockRewardsOwnership, MockWasmHost, RecordingEventSink,
};
use crate::config::ServiceConfig;
use crate::service::{Collaborators, ContractErrorsService};
use std::sync::Arc;

pub struct TestHarness {
    pub service: ContractErrorsService<InMemoryKVStore>,
    pub wasm: Arc<MockWasmHost>,
    pub rewards: Arc<MockRewardsOwnership>,
    pub bank: Arc<MockBank>,
    pub events: Arc<RecordingEventSink>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let wasm = Arc::new(MockWasmHost::new());
        let rewards = Arc::new(MockRewardsOwnership::new());
        let bank = Arc::new(MockBank::new());
        let events = Arc::new(RecordingEventSink::new());

        let service = ContractErrorsService::new_in_memory(
            config,
            Collaborators {
                wasm: wasm.clone(),
                rewards: rewards.clone(),
                bank: bank.clone(),
                events: events.clone(),
            },
        );

        Self {
            service,
            wasm,
            rewards,
            bank,
            events,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
