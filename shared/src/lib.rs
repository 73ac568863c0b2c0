//! Shared plumbing for the order fulfillment services
//!
//! Service discovery, the RPC channel, the message broker transport, error
//! envelopes, domain models and logging setup used by every service crate.

pub mod broker;
pub mod config;
pub mod discovery;
pub mod error;
pub mod models;
pub mod rpc;
pub mod tasks;
pub mod telemetry;

// Re-exports
pub use axum::Json;
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
