//! Outcome logging shared by the service logging decorators

use std::time::Instant;

use crate::error::{AppResult, ErrorCategory};

/// Log one service call with its duration
///
/// Expected business errors (validation, not found, conflicts) log at `warn`,
/// infrastructure failures at `error`.
pub fn log_call<T>(method: &'static str, started: Instant, result: &AppResult<T>) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match result {
        Ok(_) => tracing::info!(method, elapsed_ms, "call completed"),
        Err(e) if e.code.category() == ErrorCategory::System => tracing::error!(
            method,
            elapsed_ms,
            code = e.code.code(),
            error = %e,
            "call failed"
        ),
        Err(e) => tracing::warn!(
            method,
            elapsed_ms,
            code = e.code.code(),
            error = %e,
            "call rejected"
        ),
    }
}
