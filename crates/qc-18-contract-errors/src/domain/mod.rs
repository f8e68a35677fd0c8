//! # Domain Layer
//!
//! Pure domain types: fault records, subscriptions, parameters, and the
//! store key layout. No I/O.

pub mod entities;
pub mod keys;
pub mod value_objects;

pub use entities::*;
pub use keys::KeyPrefix;
pub use value_objects::*;
