//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the outbound ports.
//!
//! - `memory_store`: ordered in-memory `KeyValueStore`
//! - `event_sink`: tracing and recording `EventSink`s
//! - `mocks`: wasm host, rewards ownership and bank stand-ins

pub mod event_sink;
pub mod memory_store;
pub mod mocks;

pub use event_sink::*;
pub use memory_store::*;
pub use mocks::*;
