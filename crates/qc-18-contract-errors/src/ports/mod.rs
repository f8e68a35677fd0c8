//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the subsystem and the outside world.
//!
//! - **Driving Ports (Inbound)**: `SudoErrorReporter`, `ContractErrorsMsgApi`,
//!   `ContractErrorsQueryApi`
//! - **Driven Ports (Outbound)**: `KeyValueStore`, `WasmHost`,
//!   `RewardsOwnership`, `BankTransfer`, `EventSink`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
