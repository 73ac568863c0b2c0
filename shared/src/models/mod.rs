//! Data models
//!
//! Shared by every service: entities, event bodies, and RPC payloads.
//! Identifiers are opaque strings assigned by the owning store.

pub mod order;
pub mod stock;

// Re-exports
pub use order::*;
pub use stock::*;
