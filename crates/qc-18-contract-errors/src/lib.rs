//! # QC-18 Contract Errors - Sudo Error Log & Error Callbacks
//!
//! **Subsystem ID:** 18
//!
//! ## Purpose
//!
//! Lets smart contracts learn about failures of privileged "sudo" calls the
//! chain makes on them, without letting a broken contract stall the chain.
//! Faults of unsubscribed contracts are kept in a pruned error log. A
//! contract may pay for a subscription that redirects its future faults to
//! a single bounded-gas callback at the end of the block.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | ErrorLog | `store/error_log.rs` | Fault records, contract and deletion indexes, id counter |
//! | SubscriptionRegistry | `store/subscriptions.rs` | Subscriptions and expiry index |
//! | CallbackQueue | `store/callback_queue.rs` | Block-scoped pending deliveries |
//! | Gateway | `gateway.rs` | Routes each new fault to exactly one of the above |
//! | Dispatcher | `dispatcher.rs` | Per-block delivery, then pruning |
//! | Service | `service.rs` | Block lifecycle, Msg/Query surface, genesis |
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Record and both indexes written and pruned together | `store/error_log.rs` - `write()`, `prune_at_height()` |
//! | INVARIANT-2 | A fault lands in the log or the queue, never both | `gateway.rs` - `set_error()` |
//! | INVARIANT-3 | One subscription and one expiry entry per contract | `store/subscriptions.rs` - `set()` |
//! | INVARIANT-4 | Subscription fee must match exactly | `store/subscriptions.rs` - `set()` |
//! | INVARIANT-5 | One delivery attempt per fault, one fallback per failure | `dispatcher.rs` - `run()` |
//! | INVARIANT-6 | Error ids strictly increase and are never reused | `store/error_log.rs` - `reserve_id()`, `write()` |
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | Wasm host | `WasmHost` | Contract existence, admin lookup, bounded-gas sudo |
//! | Rewards | `RewardsOwnership` | Contract owner lookup |
//! | Bank | `BankTransfer` | Subscription fee collection |
//! | Events | `EventSink` | Event publication |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_18_contract_errors::prelude::*;
//!
//! service.begin_block(height)?;
//! service.set_error(record)?;
//! let report = service.end_block()?;
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod genesis;
pub mod metrics;
pub mod msg;
pub mod ports;
pub mod service;
pub mod store;
pub mod test_utils;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::entities::{FaultRecord, Params, Subscription, SudoMsg};
    pub use crate::domain::value_objects::{Address, BlockHeight, Coin, ErrorId};

    // Ports
    pub use crate::ports::inbound::{
        ContractErrorsMsgApi, ContractErrorsQueryApi, SudoErrorReporter,
    };
    pub use crate::ports::outbound::{
        BankTransfer, EventSink, KeyValueStore, RewardsOwnership, SudoResponse, WasmHost,
    };

    // Messages and queries
    pub use crate::msg::{
        ContractErrorsMsg, ContractErrorsMsgResponse, ContractErrorsQuery,
        ContractErrorsQueryResponse, MsgSubscribeToError, MsgSubscribeToErrorResponse,
        MsgUpdateParams, QueryErrorsResponse, QueryIsSubscribedResponse,
    };

    // Orchestration
    pub use crate::dispatcher::DispatchReport;
    pub use crate::gateway::Routing;
    pub use crate::genesis::GenesisState;

    // Events and errors
    pub use crate::errors::{ContractErrorsError, ContractErrorsResult, FatalError};
    pub use crate::events::ContractErrorsEvent;

    // Adapters
    pub use crate::adapters::{InMemoryKVStore, RecordingEventSink, TracingEventSink};

    // Service
    pub use crate::config::ServiceConfig;
    pub use crate::service::{
        create_test_service, Collaborators, ContractErrorsService, ModuleStores, ServiceStats,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID.
pub const SUBSYSTEM_ID: u8 = 18;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Contract Errors";

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_id() {
        assert_eq!(SUBSYSTEM_ID, 18);
    }

    #[test]
    fn test_prelude_exports() {
        use prelude::*;
        let _ = Params::default();
        let _ = ServiceConfig::default();
        let _ = create_test_service();
    }
}
