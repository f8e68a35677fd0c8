//! # Stores
//!
//! - `ErrorLog`: durable fault records, their two indexes and the id counter
//! - `SubscriptionRegistry`: subscriptions and their expiry index
//! - `CallbackQueue`: block-scoped pending deliveries
//! - `ParamsStore`: module parameters

pub mod callback_queue;
pub mod error_log;
pub mod params;
pub mod subscriptions;

pub use callback_queue::{BlockScope, CallbackQueue};
pub use error_log::{ErrorLog, StoredError};
pub use params::ParamsStore;
pub use subscriptions::SubscriptionRegistry;
